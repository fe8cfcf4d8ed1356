//! Constraint-driven spacemap layout.
//!
//! Positions data points on a 2D canvas by compiling a list of constraint
//! declarations into an auxiliary node/edge graph that a force simulation
//! relaxes:
//! - `x` / `y`: linear scale of a numeric field across the canvas
//! - `ordinalx` / `ordinaly`: evenly spaced categories
//! - `xy`: independent linear scales for a 2D point
//! - `map`: pixel anchors projected from latitude/longitude
//! - `link`: data sharing a value meet at one hub node
//!
//! # Example
//!
//! ```ignore
//! use spacemap::{Spacemap, SpacemapOptions};
//!
//! let options = SpacemapOptions::from_json(r#"{
//!     "data": [{"name": "a", "group": "x"}, {"name": "b", "group": "x"}],
//!     "constraints": [{"type": "link", "accessor": "group", "strength": 0.5}],
//!     "label": "name"
//! }"#)?;
//!
//! view! { <Spacemap options=Signal::derive(move || options.clone()) fullscreen=true /> }
//! ```

mod component;
mod constraint;
mod driver;
mod error;
mod events;
mod geo;
mod graph;
mod quadtree;
mod render;
mod scale;
mod simulation;
mod state;
mod theme;
mod types;

pub use component::Spacemap;
pub use constraint::{Axis, ConstraintScale, Evaluation, Snap, evaluate};
pub use driver::{DriverEvents, SimulationDriver};
pub use error::{AccessorError, Error, Result};
pub use events::{Channel, DragEvent, Subscription, TickEvent, ZoomEvent};
pub use geo::{
	GeographicBounds, GeographicMapSurface, LatLng, LatLngBounds, LayerOptions, MapEvents, MapLayer, MercatorMap,
	ProjectionAdapter,
};
pub use graph::{ConstraintGraph, LayoutEdge, LayoutNode, NodeKey, NodeRole, build};
pub use render::{CanvasRenderer, EdgeSprite, NodeSprite, Renderer, Scene};
pub use scale::{LinearScale, PointScale};
pub use simulation::{ALPHA_MIN, ALPHA_START, ForceParams, ForceSimulation, PhysicsEngine};
pub use state::{CarryForward, LayoutState};
pub use theme::{BackgroundStyle, Color, EdgeStyle, LabelStyle, NodePalette, NodeStyle, Theme};
pub use types::{Accessor, ConstraintDecl, ConstraintKind, Datum, Point, Size, SpacemapOptions};
