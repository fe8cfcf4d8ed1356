//! Rendering for the spacemap.
//!
//! [`Scene`] is the renderer-independent list of primitives. Static attributes
//! (radius, color, opacity, label) are derived once per layout generation;
//! positions are re-synced on every tick. [`CanvasRenderer`] draws a scene on
//! a 2D canvas in this order:
//! 1. Background and map graticule (faded by the overlay opacity)
//! 2. Edges
//! 3. Nodes in layout order, each followed by its label

use std::f64::consts::PI;

use web_sys::CanvasRenderingContext2d;

use super::geo::{GeographicMapSurface, LatLng};
use super::graph::NodeRole;
use super::state::LayoutState;
use super::theme::{Color, Theme};
use super::types::{Point, Size};

/// Latitude limit of the Web Mercator projection used for graticule lines.
const MAX_LATITUDE: f64 = 85.0;

/// One node disc and its label.
#[derive(Clone, Debug, PartialEq)]
pub struct NodeSprite {
	/// Not drawn while `None`.
	pub pos: Option<Point>,
	/// Disc radius in pixels.
	pub radius: f64,
	/// Fill color.
	pub color: Color,
	/// Disc opacity: 1 for data nodes, the constraint strength otherwise.
	pub opacity: f64,
	/// Text drawn beside the disc; empty for none.
	pub label: String,
}

/// One spring line.
#[derive(Clone, Debug, PartialEq)]
pub struct EdgeSprite {
	/// Index into [`Scene::nodes`].
	pub source: usize,
	/// Index into [`Scene::nodes`].
	pub target: usize,
	/// Half the constraint strength.
	pub opacity: f64,
}

/// Drawing primitives for one frame.
#[derive(Clone, Debug, Default)]
pub struct Scene {
	generation: Option<u64>,
	/// Canvas size; nothing is drawn until it is known.
	pub size: Option<Size>,
	/// Parallel to the layout nodes.
	pub nodes: Vec<NodeSprite>,
	/// Parallel to the layout edges.
	pub edges: Vec<EdgeSprite>,
	/// Map overlay opacity.
	pub overlay_opacity: f64,
	/// Projected graticule segments. Empty without a map surface.
	pub graticule: Vec<(Point, Point)>,
}

impl Scene {
	/// Layout generation the sprites were derived from.
	pub fn generation(&self) -> Option<u64> {
		self.generation
	}

	/// Brings the scene up to date with `state`. Sprites are rebuilt when the
	/// generation changed, otherwise only positions are copied. Returns
	/// whether the sprites were rebuilt.
	pub fn sync(&mut self, state: &LayoutState, theme: &Theme) -> bool {
		let generation = Some(state.generation());
		let rebuilt = self.generation != generation;
		if rebuilt {
			self.rebuild(state, theme);
			self.generation = generation;
		} else {
			for (sprite, node) in self.nodes.iter_mut().zip(state.nodes()) {
				sprite.pos = node.pos;
			}
		}
		self.size = state.size();
		rebuilt
	}

	fn rebuild(&mut self, state: &LayoutState, theme: &Theme) {
		let graph = state.graph();
		self.nodes = graph
			.nodes
			.iter()
			.zip(state.labels())
			.map(|(node, label)| {
				let (radius, opacity) = match node.role {
					NodeRole::Primary => (theme.node.primary_radius, 1.0),
					NodeRole::Auxiliary { strength, .. } => (theme.node.auxiliary_radius, strength),
				};
				NodeSprite {
					pos: node.pos,
					radius,
					color: theme.palette.for_constraint(node.constraint()),
					opacity,
					label: label.clone(),
				}
			})
			.collect();
		self.edges = graph
			.edges
			.iter()
			.map(|e| EdgeSprite {
				source: e.source,
				target: e.target,
				opacity: e.strength / 2.0,
			})
			.collect();
		self.overlay_opacity = graph.overlay_opacity;
	}

	/// Re-projects the graticule through `surface`, or clears it.
	pub fn project_graticule(&mut self, surface: Option<&dyn GeographicMapSurface>, step: f64) {
		self.graticule.clear();
		let Some(surface) = surface else {
			return;
		};
		if step <= 0.0 {
			return;
		}
		let mut lng = -180.0;
		while lng <= 180.0 {
			self.graticule.push((
				surface.project_to_pixel(LatLng::new(MAX_LATITUDE, lng)),
				surface.project_to_pixel(LatLng::new(-MAX_LATITUDE, lng)),
			));
			lng += step;
		}
		let mut lat = -MAX_LATITUDE + MAX_LATITUDE % step;
		while lat <= MAX_LATITUDE {
			self.graticule.push((
				surface.project_to_pixel(LatLng::new(lat, -180.0)),
				surface.project_to_pixel(LatLng::new(lat, 180.0)),
			));
			lat += step;
		}
	}
}

/// A drawing surface for scenes.
pub trait Renderer {
	/// Draws one frame. Must be idempotent for an unchanged scene.
	fn render(&mut self, scene: &Scene);
}

/// Draws scenes on a 2D canvas context.
pub struct CanvasRenderer {
	ctx: CanvasRenderingContext2d,
	theme: Theme,
}

impl CanvasRenderer {
	/// A renderer drawing on `ctx`.
	pub fn new(ctx: CanvasRenderingContext2d, theme: Theme) -> Self {
		Self { ctx, theme }
	}

	/// Styles in use.
	pub fn theme(&self) -> &Theme {
		&self.theme
	}

	fn draw_background(&self, size: Size) {
		self.ctx.set_fill_style_str(&self.theme.background.color.to_css());
		self.ctx.fill_rect(0.0, 0.0, size.width, size.height);
	}

	fn draw_graticule(&self, scene: &Scene) {
		if scene.graticule.is_empty() || scene.overlay_opacity <= 0.0 {
			return;
		}
		let ctx = &self.ctx;
		ctx.set_global_alpha(scene.overlay_opacity);
		ctx.set_stroke_style_str(&self.theme.background.graticule.to_css());
		ctx.set_line_width(1.0);
		ctx.begin_path();
		for (a, b) in &scene.graticule {
			ctx.move_to(a.x, a.y);
			ctx.line_to(b.x, b.y);
		}
		ctx.stroke();
		ctx.set_global_alpha(1.0);
	}

	fn draw_edges(&self, scene: &Scene) {
		let ctx = &self.ctx;
		ctx.set_stroke_style_str(&self.theme.edge.color.to_css());
		ctx.set_line_width(self.theme.edge.width);
		for edge in &scene.edges {
			let (Some(a), Some(b)) = (scene.nodes[edge.source].pos, scene.nodes[edge.target].pos) else {
				continue;
			};
			ctx.set_global_alpha(edge.opacity);
			ctx.begin_path();
			ctx.move_to(a.x, a.y);
			ctx.line_to(b.x, b.y);
			ctx.stroke();
		}
		ctx.set_global_alpha(1.0);
	}

	fn draw_nodes(&self, scene: &Scene) {
		let ctx = &self.ctx;
		let style = &self.theme.node;
		ctx.set_font(&self.theme.label.font);
		for node in &scene.nodes {
			let Some(p) = node.pos else {
				continue;
			};
			ctx.set_global_alpha(node.opacity);

			ctx.begin_path();
			let _ = ctx.arc(p.x, p.y, node.radius, 0.0, 2.0 * PI);
			ctx.set_fill_style_str(&node.color.to_css());
			ctx.fill();

			if style.border_width > 0.0 {
				ctx.set_stroke_style_str(&style.border_color.to_css());
				ctx.set_line_width(style.border_width);
				ctx.stroke();
			}

			if !node.label.is_empty() {
				ctx.set_fill_style_str(&self.theme.label.color.to_css());
				let _ = ctx.fill_text(&node.label, p.x + node.radius + self.theme.label.offset, p.y + 3.0);
			}
		}
		ctx.set_global_alpha(1.0);
	}
}

impl Renderer for CanvasRenderer {
	fn render(&mut self, scene: &Scene) {
		let Some(size) = scene.size else {
			return;
		};
		self.draw_background(size);
		self.draw_graticule(scene);
		self.draw_edges(scene);
		self.draw_nodes(scene);
	}
}
