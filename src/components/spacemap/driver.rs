//! Simulation driver: owns the physics engine and runs the
//! step → constrain → render cycle.
//!
//! Collaborators are injected at construction. The engine, the renderer and
//! the layout state are only ever touched through the driver, one turn of the
//! host event loop at a time.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use log::{debug, warn};

use super::error::{Error, Result};
use super::events::{Channel, Subscription, TickEvent};
use super::geo::{LatLngBounds, ProjectionAdapter};
use super::render::{Renderer, Scene};
use super::simulation::{ForceParams, PhysicsEngine};
use super::state::{CarryForward, LayoutState};
use super::theme::Theme;
use super::types::{Point, Size, SpacemapOptions};

/// Notifications published by a driver.
#[derive(Clone, Default)]
pub struct DriverEvents {
	/// Fired after every completed tick.
	pub tick: Channel<TickEvent>,
	/// Emit on this channel to request one re-tick.
	pub retick: Channel<()>,
}

/// Owns the layout state and ties a physics engine, a renderer and an
/// optional map projection together. One `tick` is one animation frame.
pub struct SimulationDriver<E: PhysicsEngine, R: Renderer> {
	engine: E,
	renderer: R,
	adapter: ProjectionAdapter,
	theme: Theme,
	state: LayoutState,
	scene: Scene,
	options: SpacemapOptions,
	size: Size,
	events: DriverEvents,
	subscriptions: Vec<Subscription>,
	pending_retick: Rc<Cell<bool>>,
	destroyed: bool,
	settled: bool,
}

impl<E: PhysicsEngine, R: Renderer> SimulationDriver<E, R> {
	/// An idle driver with no layout; call [`set_options`](Self::set_options) to build one.
	pub fn new(engine: E, renderer: R, adapter: ProjectionAdapter, theme: Theme, size: Size) -> Self {
		Self {
			engine,
			renderer,
			adapter,
			theme,
			state: LayoutState::default(),
			scene: Scene::default(),
			options: SpacemapOptions::default(),
			size,
			events: DriverEvents::default(),
			subscriptions: Vec::new(),
			pending_retick: Rc::new(Cell::new(false)),
			destroyed: false,
			settled: false,
		}
	}

	/// Chooses how positions survive a rebuild.
	pub fn with_carry_forward(mut self, carry: CarryForward) -> Self {
		self.state.set_carry_forward(carry);
		self
	}

	/// Wires the retick channel and the map surface notifications to `this`.
	/// Handlers hold a weak reference; a notification arriving while the
	/// driver is busy is replayed at the start of the next tick.
	pub fn connect(this: &Rc<RefCell<Self>>)
	where
		E: 'static,
		R: 'static,
	{
		let mut driver = this.borrow_mut();
		let weak = Rc::downgrade(this);
		let pending = driver.pending_retick.clone();
		let on_retick = driver.events.retick.subscribe(move |_| {
			let Some(driver) = weak.upgrade() else {
				return;
			};
			match driver.try_borrow_mut() {
				Ok(mut driver) => driver.retick(),
				Err(_) => pending.set(true),
			}
		});
		driver.subscriptions.push(on_retick);

		let retick = driver.events.retick.clone();
		let map = driver.adapter.watch(move || retick.emit(&()));
		driver.subscriptions.extend(map);
	}

	/// Channels for tick notifications and re-tick requests.
	pub fn events(&self) -> &DriverEvents {
		&self.events
	}

	/// The current layout.
	pub fn state(&self) -> &LayoutState {
		&self.state
	}

	/// The last scene handed to the renderer.
	pub fn scene(&self) -> &Scene {
		&self.scene
	}

	/// The physics engine.
	pub fn engine(&self) -> &E {
		&self.engine
	}

	/// The renderer.
	pub fn renderer(&self) -> &R {
		&self.renderer
	}

	/// The last accepted options.
	pub fn options(&self) -> &SpacemapOptions {
		&self.options
	}

	/// Canvas size in pixels.
	pub fn size(&self) -> Size {
		self.size
	}

	/// Whether [`destroy`](Self::destroy) has run.
	pub fn is_destroyed(&self) -> bool {
		self.destroyed
	}

	/// Whether the engine is still hot. A cooled driver renders nothing until
	/// a drag, a re-tick or new options reheat it.
	pub fn is_running(&self) -> bool {
		!self.destroyed && self.engine.is_running()
	}

	/// Replaces the options and rebuilds. On error the previous layout and
	/// options stay in place.
	pub fn set_options(&mut self, options: SpacemapOptions) -> Result<()> {
		let size = self.size;
		self.apply(options, size)
	}

	/// Rebuilds for a new canvas size; scales span the canvas.
	pub fn resize(&mut self, size: Size) -> Result<()> {
		if size == self.size {
			return Ok(());
		}
		let options = self.options.clone();
		self.apply(options, size)
	}

	fn apply(&mut self, options: SpacemapOptions, size: Size) -> Result<()> {
		if self.destroyed {
			return Ok(());
		}
		if let Err(e) = self.state.rebuild(&options, size) {
			warn!("spacemap: rejected configuration: {e}");
			return Err(e);
		}
		self.options = options;
		self.size = size;

		if self.state.graph().has_map_constraint() && !self.adapter.is_available() {
			warn!(
				"spacemap: {}, map constraints are inert",
				Error::EngineUnavailable("map projection surface")
			);
		}
		self.adapter.project(self.state.nodes_mut());
		self.refresh_overlay();
		self.run();
		Ok(())
	}

	/// Configures the engine from the current options and warm-starts it.
	fn run(&mut self) {
		self.engine
			.configure(&ForceParams::from_options(&self.options, self.size));
		let (nodes, edges) = self.state.split_mut();
		self.engine.start(nodes, edges);
		self.settled = false;
		self.scene.sync(&self.state, &self.theme);
	}

	fn refresh_overlay(&mut self) {
		let surface = self
			.adapter
			.surface()
			.filter(|_| self.state.graph().overlay_opacity > 0.0);
		self.scene
			.project_graticule(surface.map(|s| &**s), self.theme.background.graticule_step);
	}

	/// Advances the engine one step, snaps constrained nodes and renders.
	/// Returns whether the simulation is still running.
	pub fn tick(&mut self) -> bool {
		if self.destroyed {
			return false;
		}
		if self.pending_retick.take() {
			self.retick();
		}
		let (nodes, edges) = self.state.split_mut();
		if !self.engine.step(nodes, edges) {
			if !self.settled {
				self.settled = true;
				debug!("spacemap: simulation settled (generation {})", self.state.generation());
			}
			return false;
		}
		self.frame();
		true
	}

	fn frame(&mut self) {
		self.state.apply_constraints();
		self.scene.sync(&self.state, &self.theme);
		self.renderer.render(&self.scene);
		self.events.tick.emit(&TickEvent {
			alpha: self.engine.alpha(),
			generation: self.state.generation(),
		});
	}

	/// Re-projects map anchors, runs one constrain/render pass and reheats
	/// the engine without reseeding.
	pub fn retick(&mut self) {
		if self.destroyed {
			return;
		}
		self.adapter.project(self.state.nodes_mut());
		self.refresh_overlay();
		self.engine.resume();
		self.settled = false;
		self.frame();
	}

	/// Ticks synchronously until the engine cools or `max_ticks` is reached.
	/// Returns the number of ticks run.
	pub fn settle(&mut self, max_ticks: usize) -> usize {
		let mut ticks = 0;
		while ticks < max_ticks && self.tick() {
			ticks += 1;
		}
		ticks
	}

	/// Force-stops the engine. The layout stays where it is.
	pub fn stop(&mut self) {
		self.engine.stop();
	}

	/// Stops the engine and detaches every subscription. Nothing is rendered
	/// afterwards.
	pub fn destroy(&mut self) {
		if self.destroyed {
			return;
		}
		self.engine.stop();
		self.subscriptions.clear();
		self.destroyed = true;
		debug!("spacemap: driver destroyed");
	}

	/// Topmost node under `point`.
	pub fn node_at(&self, point: Point) -> Option<usize> {
		self.scene
			.nodes
			.iter()
			.enumerate()
			.rev()
			.find(|(_, n)| n.pos.is_some_and(|p| p.distance(point) <= n.radius))
			.map(|(i, _)| i)
	}

	/// Pins node `index` for the duration of a drag.
	pub fn drag_start(&mut self, index: usize) {
		if !self.destroyed {
			self.engine.drag_start(index);
		}
	}

	/// Moves a dragged node to `point` and reheats the engine.
	pub fn drag_to(&mut self, index: usize, point: Point) {
		if self.destroyed {
			return;
		}
		if let Some(node) = self.state.nodes_mut().get_mut(index) {
			node.pos = Some(point);
		}
		self.engine.drag_to(index, point);
		self.settled = false;
	}

	/// Releases a dragged node.
	pub fn drag_end(&mut self, index: usize) {
		if !self.destroyed {
			self.engine.drag_end(index);
		}
	}

	/// Bounds of every map anchor in the current layout.
	pub fn map_bounds(&self) -> Option<LatLngBounds> {
		self.state.graph().map_bounds()
	}
}

impl<E: PhysicsEngine, R: Renderer> Drop for SimulationDriver<E, R> {
	fn drop(&mut self) {
		self.destroy();
	}
}
