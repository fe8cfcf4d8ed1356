//! Geographic map surfaces and the projection adapter.
//!
//! The layout core only talks to [`GeographicMapSurface`]; [`MercatorMap`] is a
//! self-contained Web Mercator backend used when no provider-specific surface
//! is plugged in. [`ProjectionAdapter`] turns surface notifications into pixel
//! anchors for nodes snapped to a `map` constraint.

use std::cell::{Cell, RefCell};
use std::f64::consts::PI;
use std::rc::Rc;

use serde::{Deserialize, Serialize};

use super::constraint::Snap;
use super::error::{Error, Result};
use super::events::{Channel, DragEvent, Subscription, ZoomEvent};
use super::graph::LayoutNode;
use super::types::{Point, Size};

/// Latitude beyond which Web Mercator is undefined.
const MAX_LATITUDE: f64 = 85.051_128_779_806_59;
/// Width in pixels of the whole world at zoom 0.
const TILE_SIZE: f64 = 256.0;

/// A geographic coordinate in degrees.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct LatLng {
	/// Latitude, positive north.
	pub lat: f64,
	/// Longitude, positive east.
	pub lng: f64,
}

impl LatLng {
	/// Creates a coordinate.
	pub const fn new(lat: f64, lng: f64) -> Self {
		Self { lat, lng }
	}
}

/// A rectangle in geographic coordinates.
pub trait GeographicBounds {
	/// Whether `point` lies inside, edges included.
	fn contains(&self, point: LatLng) -> bool;
	/// Grows the bounds to include `point`.
	fn extend(&mut self, point: LatLng);
	/// Midpoint of the bounds.
	fn get_center(&self) -> LatLng;
	/// Whether the two bounds overlap.
	fn intersects(&self, other: &Self) -> bool;
	/// Grows the bounds to include `other`.
	fn union(&mut self, other: &Self);
}

/// Axis-aligned bounds between a south-west and north-east corner.
/// Boxes crossing the antimeridian are not represented.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LatLngBounds {
	/// Minimum latitude and longitude.
	pub south_west: LatLng,
	/// Maximum latitude and longitude.
	pub north_east: LatLng,
}

impl LatLngBounds {
	/// Bounds between two corners.
	pub fn new(south_west: LatLng, north_east: LatLng) -> Self {
		Self {
			south_west,
			north_east,
		}
	}

	/// Zero-area bounds at `point`.
	pub fn from_point(point: LatLng) -> Self {
		Self::new(point, point)
	}
}

impl GeographicBounds for LatLngBounds {
	fn contains(&self, p: LatLng) -> bool {
		(self.south_west.lat..=self.north_east.lat).contains(&p.lat)
			&& (self.south_west.lng..=self.north_east.lng).contains(&p.lng)
	}

	fn extend(&mut self, p: LatLng) {
		self.south_west.lat = self.south_west.lat.min(p.lat);
		self.south_west.lng = self.south_west.lng.min(p.lng);
		self.north_east.lat = self.north_east.lat.max(p.lat);
		self.north_east.lng = self.north_east.lng.max(p.lng);
	}

	fn get_center(&self) -> LatLng {
		LatLng::new(
			(self.south_west.lat + self.north_east.lat) / 2.0,
			(self.south_west.lng + self.north_east.lng) / 2.0,
		)
	}

	fn intersects(&self, other: &Self) -> bool {
		self.south_west.lat <= other.north_east.lat
			&& other.south_west.lat <= self.north_east.lat
			&& self.south_west.lng <= other.north_east.lng
			&& other.south_west.lng <= self.north_east.lng
	}

	fn union(&mut self, other: &Self) {
		self.extend(other.south_west);
		self.extend(other.north_east);
	}
}

/// A drawing layer stacked over the map. Moving layers follow map drags,
/// static layers stay fixed to the viewport.
#[derive(Clone, Debug, PartialEq)]
pub struct MapLayer {
	/// Generated identifier, `maplayer-<n>`.
	pub id: String,
	/// Caller-chosen name, unique per surface.
	pub name: String,
	/// Whether the layer follows map drags.
	pub moving: bool,
}

/// Options for [`GeographicMapSurface::add_layer`].
#[derive(Clone, Copy, Debug)]
pub struct LayerOptions {
	/// Whether the layer follows map drags.
	pub moving: bool,
}

impl Default for LayerOptions {
	fn default() -> Self {
		Self { moving: true }
	}
}

/// Notification streams published by a map surface.
#[derive(Clone, Default)]
pub struct MapEvents {
	/// The map became ready.
	pub load: Channel<()>,
	/// The viewport was redrawn; fired last after every pan, zoom or resize.
	pub draw: Channel<()>,
	/// The viewport was panned.
	pub drag: Channel<DragEvent>,
	/// The zoom level changed.
	pub zoom: Channel<ZoomEvent>,
}

/// Capability contract for a map backend.
pub trait GeographicMapSurface {
	/// Creates the map for a viewport of `size`. Fires `load` once ready.
	fn create_map(&self, size: Size) -> Result<()>;
	/// Layers currently stacked over the map, bottom first.
	fn get_surface(&self) -> Vec<MapLayer>;
	/// Registers a layer; names must be unique.
	fn add_layer(&self, name: &str, options: LayerOptions) -> Result<MapLayer>;
	/// Geographic coordinate under a viewport pixel.
	fn point_to_lat_lng(&self, point: Point) -> LatLng;
	/// Viewport pixel of a geographic coordinate.
	fn lat_lng_to_point(&self, lat_lng: LatLng) -> Point;
	/// Notification channels.
	fn events(&self) -> &MapEvents;

	/// Viewport pixel position of a geographic coordinate.
	fn project_to_pixel(&self, lat_lng: LatLng) -> Point {
		self.lat_lng_to_point(lat_lng)
	}
}

/// Web Mercator map surface with a centre, a zoom level and a viewport.
pub struct MercatorMap {
	center: Cell<LatLng>,
	zoom: Cell<f64>,
	size: Cell<Size>,
	layers: RefCell<Vec<MapLayer>>,
	ready: Cell<bool>,
	events: MapEvents,
}

impl MercatorMap {
	/// A map centred on `center` at `zoom`, not yet created.
	pub fn new(center: LatLng, zoom: f64) -> Self {
		Self {
			center: Cell::new(center),
			zoom: Cell::new(zoom),
			size: Cell::new(Size::new(0.0, 0.0)),
			layers: RefCell::new(Vec::new()),
			ready: Cell::new(false),
			events: MapEvents::default(),
		}
	}

	/// Current centre.
	pub fn center(&self) -> LatLng {
		self.center.get()
	}

	/// Current zoom level.
	pub fn zoom(&self) -> f64 {
		self.zoom.get()
	}

	/// Whether [`GeographicMapSurface::create_map`] succeeded.
	pub fn is_ready(&self) -> bool {
		self.ready.get()
	}

	/// Changes the viewport size, then redraws.
	pub fn resize(&self, size: Size) {
		self.size.set(size);
		self.draw();
	}

	/// Recentres the viewport, then redraws.
	pub fn set_center(&self, center: LatLng) {
		self.center.set(center);
		self.draw();
	}

	/// Pans the viewport by a pixel offset, then redraws.
	pub fn pan_by(&self, offset: Point) {
		let size = self.size.get();
		let moved = Point::new(size.width / 2.0 - offset.x, size.height / 2.0 - offset.y);
		self.center.set(self.point_to_lat_lng(moved));
		self.events.drag.emit(&DragEvent { offset });
		self.draw();
	}

	/// Sets the zoom level (clamped to `0..=20`), then redraws.
	pub fn set_zoom(&self, zoom: f64) {
		let zoom = zoom.clamp(0.0, 20.0);
		if zoom == self.zoom.get() {
			return;
		}
		self.zoom.set(zoom);
		self.events.zoom.emit(&ZoomEvent { zoom });
		self.draw();
	}

	/// Fires `draw` once the map is ready.
	pub fn draw(&self) {
		if self.ready.get() {
			self.events.draw.emit(&());
		}
	}

	fn world_size(&self) -> f64 {
		TILE_SIZE * self.zoom.get().exp2()
	}

	fn to_world(&self, p: LatLng) -> Point {
		let w = self.world_size();
		let lat = p.lat.clamp(-MAX_LATITUDE, MAX_LATITUDE).to_radians();
		Point::new(
			(p.lng + 180.0) / 360.0 * w,
			(0.5 - (PI / 4.0 + lat / 2.0).tan().ln() / (2.0 * PI)) * w,
		)
	}

	fn from_world(&self, p: Point) -> LatLng {
		let w = self.world_size();
		let lng = p.x / w * 360.0 - 180.0;
		let n = PI - 2.0 * PI * p.y / w;
		let lat = n.sinh().atan().to_degrees();
		LatLng::new(lat, lng)
	}
}

impl Default for MercatorMap {
	fn default() -> Self {
		Self::new(LatLng::new(15.0, 0.0), 2.0)
	}
}

impl GeographicMapSurface for MercatorMap {
	fn create_map(&self, size: Size) -> Result<()> {
		if !(size.width > 0.0 && size.height > 0.0) {
			return Err(Error::EngineUnavailable("map viewport"));
		}
		self.size.set(size);
		self.ready.set(true);
		self.events.load.emit(&());
		self.draw();
		Ok(())
	}

	fn get_surface(&self) -> Vec<MapLayer> {
		self.layers.borrow().clone()
	}

	fn add_layer(&self, name: &str, options: LayerOptions) -> Result<MapLayer> {
		let mut layers = self.layers.borrow_mut();
		if layers.iter().any(|l| l.name == name) {
			return Err(Error::DuplicateLayer(name.to_string()));
		}
		let layer = MapLayer {
			id: format!("maplayer-{}", layers.len()),
			name: name.to_string(),
			moving: options.moving,
		};
		layers.push(layer.clone());
		Ok(layer)
	}

	fn point_to_lat_lng(&self, point: Point) -> LatLng {
		let size = self.size.get();
		let c = self.to_world(self.center.get());
		self.from_world(Point::new(
			c.x + point.x - size.width / 2.0,
			c.y + point.y - size.height / 2.0,
		))
	}

	fn lat_lng_to_point(&self, lat_lng: LatLng) -> Point {
		let size = self.size.get();
		let c = self.to_world(self.center.get());
		let p = self.to_world(lat_lng);
		Point::new(
			p.x - c.x + size.width / 2.0,
			p.y - c.y + size.height / 2.0,
		)
	}

	fn events(&self) -> &MapEvents {
		&self.events
	}
}

/// Feeds map-projected anchors into the layout.
///
/// Without a surface the adapter is inert: no node ever receives a map
/// anchor and `map` constraints leave positions untouched.
#[derive(Clone, Default)]
pub struct ProjectionAdapter {
	surface: Option<Rc<dyn GeographicMapSurface>>,
}

impl ProjectionAdapter {
	/// An adapter over `surface`; `None` makes it inert.
	pub fn new(surface: Option<Rc<dyn GeographicMapSurface>>) -> Self {
		Self { surface }
	}

	/// Whether a surface is attached.
	pub fn is_available(&self) -> bool {
		self.surface.is_some()
	}

	/// The attached surface.
	pub fn surface(&self) -> Option<&Rc<dyn GeographicMapSurface>> {
		self.surface.as_ref()
	}

	/// Writes the pixel anchor of every map-snapped node. Returns the number
	/// of nodes updated.
	pub fn project(&self, nodes: &mut [LayoutNode]) -> usize {
		let Some(surface) = &self.surface else {
			return 0;
		};
		let mut projected = 0;
		for node in nodes.iter_mut() {
			if let Snap::Map(anchor) = node.snap {
				node.map = Some(surface.project_to_pixel(anchor));
				projected += 1;
			}
		}
		projected
	}

	/// Calls `on_change` after every redraw. Pans, zooms and resizes all end
	/// in exactly one `draw`, so each viewport change is reported once.
	pub fn watch(&self, on_change: impl Fn() + 'static) -> Option<Subscription> {
		let surface = self.surface.as_ref()?;
		Some(surface.events().draw.subscribe(move |_| on_change()))
	}
}

#[cfg(test)]
mod tests {
	use approx::assert_relative_eq;

	use super::*;

	fn map() -> MercatorMap {
		let map = MercatorMap::new(LatLng::new(0.0, 0.0), 1.0);
		map.create_map(Size::new(512.0, 512.0)).unwrap();
		map
	}

	#[test]
	fn centre_projects_to_viewport_centre() {
		let map = map();
		let p = map.lat_lng_to_point(LatLng::new(0.0, 0.0));
		assert_relative_eq!(p.x, 256.0);
		assert_relative_eq!(p.y, 256.0);
		let edge = map.lat_lng_to_point(LatLng::new(0.0, 180.0));
		assert_relative_eq!(edge.x, 512.0);
	}

	#[test]
	fn projection_round_trips_through_pixels() {
		let map = map();
		let here = LatLng::new(48.85, 2.35);
		let back = map.point_to_lat_lng(map.lat_lng_to_point(here));
		assert_relative_eq!(back.lat, here.lat, epsilon = 1e-9);
		assert_relative_eq!(back.lng, here.lng, epsilon = 1e-9);
	}

	#[test]
	fn panning_moves_points_with_the_drag() {
		let map = map();
		let here = LatLng::new(10.0, 20.0);
		let before = map.lat_lng_to_point(here);
		map.pan_by(Point::new(30.0, -12.0));
		let after = map.lat_lng_to_point(here);
		assert_relative_eq!(after.x - before.x, 30.0, epsilon = 1e-6);
		assert_relative_eq!(after.y - before.y, -12.0, epsilon = 1e-6);
	}

	#[test]
	fn duplicate_layer_names_are_rejected() {
		let map = map();
		let layer = map.add_layer("nodes", LayerOptions::default()).unwrap();
		assert!(layer.moving);
		assert!(matches!(
			map.add_layer("nodes", LayerOptions { moving: false }),
			Err(Error::DuplicateLayer(ref n)) if n == "nodes"
		));
		assert_eq!(map.get_surface().len(), 1);
	}

	#[test]
	fn bounds_grow_and_intersect() {
		let mut a = LatLngBounds::from_point(LatLng::new(0.0, 0.0));
		a.extend(LatLng::new(10.0, 10.0));
		assert!(a.contains(LatLng::new(5.0, 5.0)));
		assert_eq!(a.get_center(), LatLng::new(5.0, 5.0));

		let b = LatLngBounds::new(LatLng::new(20.0, 20.0), LatLng::new(30.0, 30.0));
		assert!(!a.intersects(&b));
		a.union(&b);
		assert!(a.intersects(&b));
		assert_eq!(a.north_east, LatLng::new(30.0, 30.0));
	}

	#[test]
	fn map_events_reach_the_adapter_watcher() {
		use std::cell::Cell;

		let map = Rc::new(map());
		let adapter = ProjectionAdapter::new(Some(map.clone() as Rc<dyn GeographicMapSurface>));
		let hits = Rc::new(Cell::new(0));
		let counter = hits.clone();
		let _subs = adapter.watch(move || counter.set(counter.get() + 1));

		map.pan_by(Point::new(5.0, 5.0));
		map.set_zoom(3.0);
		map.set_zoom(3.0);
		assert_eq!(hits.get(), 2);

		let drags = Rc::new(Cell::new(0));
		let counter = drags.clone();
		let _drag = map.events().drag.subscribe(move |e| {
			assert_eq!(e.offset, Point::new(1.0, 2.0));
			counter.set(counter.get() + 1);
		});
		map.pan_by(Point::new(1.0, 2.0));
		assert_eq!((drags.get(), hits.get()), (1, 3));
	}
}
