//! Leptos component wrapping the spacemap canvas.
//!
//! The component creates an HTML canvas element, hands a canvas renderer, a
//! force simulation and (with `map` enabled) a Mercator map surface to a
//! [`SimulationDriver`], and ticks the driver from a `requestAnimationFrame`
//! loop while the engine is hot. The loop parks once the engine cools and is
//! woken by every rendered frame (map re-ticks), drags and option changes.
//! Mouse handlers drag nodes through the engine's drag hook; with a map
//! surface, dragging the background pans the map and the wheel zooms it.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use leptos::prelude::*;
use log::warn;
use wasm_bindgen::prelude::*;
use web_sys::{CanvasRenderingContext2d, HtmlCanvasElement, MouseEvent, WheelEvent, Window};

use super::driver::SimulationDriver;
use super::error::Error;
use super::events::{Subscription, TickEvent};
use super::geo::{GeographicBounds, GeographicMapSurface, LayerOptions, MercatorMap, ProjectionAdapter};
use super::render::CanvasRenderer;
use super::simulation::ForceSimulation;
use super::theme::Theme;
use super::types::{Point, Size, SpacemapOptions};

type Driver = SimulationDriver<ForceSimulation, CanvasRenderer>;
type JsCallback = Rc<RefCell<Option<Closure<dyn FnMut()>>>>;

/// An in-progress pointer gesture.
#[derive(Clone, Copy, Debug)]
enum Gesture {
	/// Dragging node `index` through the engine.
	Node(usize),
	/// Panning the map; holds the last pointer position.
	Pan(Point),
}

/// Everything the mounted component owns.
struct SpacemapContext {
	driver: Rc<RefCell<Driver>>,
	map: Option<Rc<MercatorMap>>,
	gesture: Option<Gesture>,
	_subscriptions: Vec<Subscription>,
}

/// The `requestAnimationFrame` loop; at most one frame is pending.
#[derive(Clone, Default)]
struct FrameLoop {
	animate: JsCallback,
	frame: Rc<Cell<Option<i32>>>,
}

impl FrameLoop {
	/// Schedules the next tick unless one is already pending.
	fn wake(&self) {
		if self.frame.get().is_some() {
			return;
		}
		let Some(window) = web_sys::window() else {
			return;
		};
		if let Some(ref cb) = *self.animate.borrow() {
			self.frame
				.set(window.request_animation_frame(cb.as_ref().unchecked_ref()).ok());
		}
	}

	fn cancel(&self, window: &Window) {
		if let Some(id) = self.frame.take() {
			let _ = window.cancel_animation_frame(id);
		}
		self.animate.borrow_mut().take();
	}
}

/// Shared handles released on unmount.
#[derive(Clone, Default)]
struct Handles {
	context: Rc<RefCell<Option<SpacemapContext>>>,
	frames: FrameLoop,
	resize: JsCallback,
}

impl Handles {
	fn teardown(&self) {
		if let Some(c) = self.context.borrow_mut().take() {
			c.driver.borrow_mut().destroy();
		}
		if let Some(window) = web_sys::window() {
			self.frames.cancel(&window);
			if let Some(cb) = self.resize.borrow_mut().take() {
				let _ = window.remove_event_listener_with_callback("resize", cb.as_ref().unchecked_ref());
			}
		}
		self.frames.animate.borrow_mut().take();
	}
}

/// Canvas size: explicit option dimensions win, then the viewport when
/// `fullscreen`, then the parent container.
fn canvas_size(canvas: &HtmlCanvasElement, window: &Window, fullscreen: bool, options: &SpacemapOptions) -> Size {
	let px = |v: Result<JsValue, JsValue>, fallback: f64| v.ok().and_then(|v| v.as_f64()).unwrap_or(fallback);
	let (w, h) = if fullscreen {
		(px(window.inner_width(), 800.0), px(window.inner_height(), 600.0))
	} else {
		let parent = canvas.parent_element();
		(
			parent.as_ref().map_or(800.0, |p| p.client_width() as f64),
			parent.as_ref().map_or(600.0, |p| p.client_height() as f64),
		)
	};
	Size::new(options.width.unwrap_or(w), options.height.unwrap_or(h))
}

fn event_point(canvas_ref: NodeRef<leptos::html::Canvas>, ev: &MouseEvent) -> Option<Point> {
	let canvas: HtmlCanvasElement = canvas_ref.get_untracked()?.into();
	let rect = canvas.get_bounding_client_rect();
	Some(Point::new(
		ev.client_x() as f64 - rect.left(),
		ev.client_y() as f64 - rect.top(),
	))
}

fn end_gesture(context: &Rc<RefCell<Option<SpacemapContext>>>) {
	if let Some(ref mut c) = *context.borrow_mut() {
		if let Some(Gesture::Node(i)) = c.gesture.take() {
			c.driver.borrow_mut().drag_end(i);
		}
	}
}

/// Renders a constraint-driven layout of `options.data` on a canvas element.
///
/// Every change of the `options` signal rebuilds the layout; a rejected
/// configuration is logged and the previous layout stays on screen. The
/// component sizes itself to its parent container by default; set
/// `fullscreen = true` to fill the viewport and follow window resizes.
/// `map = true` attaches a Mercator map surface that feeds `map` constraints.
#[component]
pub fn Spacemap(
	/// Data, constraints and simulation parameters.
	#[prop(into)]
	options: Signal<SpacemapOptions>,
	/// Fill the viewport instead of the parent container.
	#[prop(default = false)]
	fullscreen: bool,
	/// Attach a Mercator map surface.
	#[prop(default = false)]
	map: bool,
	/// Called after every rendered frame.
	#[prop(optional)]
	on_tick: Option<Callback<TickEvent>>,
) -> impl IntoView {
	let canvas_ref = NodeRef::<leptos::html::Canvas>::new();
	let handles = Handles::default();
	let mount = handles.clone();

	Effect::new(move |_| {
		let options = options.get();
		if let Some(c) = mount.context.borrow().as_ref() {
			// rejected options are logged by the driver
			if c.driver.borrow_mut().set_options(options).is_ok() {
				mount.frames.wake();
			}
			return;
		}

		let Some(canvas) = canvas_ref.get() else {
			return;
		};
		let canvas: HtmlCanvasElement = canvas.into();
		let Some(window) = web_sys::window() else {
			return;
		};
		let size = canvas_size(&canvas, &window, fullscreen, &options);
		canvas.set_width(size.width as u32);
		canvas.set_height(size.height as u32);

		let ctx = canvas
			.get_context("2d")
			.ok()
			.flatten()
			.and_then(|ctx| ctx.dyn_into::<CanvasRenderingContext2d>().ok());
		let Some(ctx) = ctx else {
			warn!("spacemap: {}, nothing will be drawn", Error::EngineUnavailable("canvas 2d context"));
			return;
		};

		let theme = Theme::default();
		let surface = map.then(|| Rc::new(MercatorMap::default()));
		let adapter = ProjectionAdapter::new(surface.clone().map(|m| m as Rc<dyn GeographicMapSurface>));
		let driver = Rc::new(RefCell::new(SimulationDriver::new(
			ForceSimulation::default(),
			CanvasRenderer::new(ctx, theme.clone()),
			adapter,
			theme,
			size,
		)));
		SimulationDriver::connect(&driver);

		let frames = mount.frames.clone();
		let mut subscriptions = vec![driver.borrow().events().tick.subscribe(move |_| frames.wake())];
		if let Some(on_tick) = on_tick {
			subscriptions.push(driver.borrow().events().tick.subscribe(move |ev| on_tick.run(*ev)));
		}

		if let Some(m) = &surface {
			let created = m
				.add_layer("spacemap", LayerOptions::default())
				.and_then(|_| m.create_map(size));
			if let Err(e) = created {
				warn!("spacemap: map surface unavailable: {e}");
			}
		}
		let _ = driver.borrow_mut().set_options(options);
		let bounds = driver.borrow().map_bounds();
		if let (Some(m), Some(bounds)) = (&surface, bounds) {
			m.set_center(bounds.get_center());
		}

		*mount.context.borrow_mut() = Some(SpacemapContext {
			driver: driver.clone(),
			map: surface.clone(),
			gesture: None,
			_subscriptions: subscriptions,
		});

		if fullscreen {
			let (driver_resize, map_resize, canvas_resize) = (driver.clone(), surface, canvas.clone());
			let frames_resize = mount.frames.clone();
			let resize = Closure::<dyn FnMut()>::new(move || {
				let Some(win) = web_sys::window() else {
					return;
				};
				let size = canvas_size(&canvas_resize, &win, true, driver_resize.borrow().options());
				canvas_resize.set_width(size.width as u32);
				canvas_resize.set_height(size.height as u32);
				let resized = driver_resize.borrow_mut().resize(size);
				if let Some(m) = &map_resize {
					m.resize(size);
				}
				if resized.is_ok() {
					frames_resize.wake();
				}
			});
			let _ = window.add_event_listener_with_callback("resize", resize.as_ref().unchecked_ref());
			*mount.resize.borrow_mut() = Some(resize);
		}

		let frames = mount.frames.clone();
		*mount.frames.animate.borrow_mut() = Some(Closure::new(move || {
			frames.frame.set(None);
			let running = {
				let mut d = driver.borrow_mut();
				!d.is_destroyed() && d.tick()
			};
			if running {
				frames.wake();
			}
		}));
		mount.frames.wake();
	});

	let teardown = StoredValue::new_local(handles.clone());
	on_cleanup(move || {
		teardown.try_with_value(Handles::teardown);
	});

	let (context_md, frames_md) = (handles.context.clone(), handles.frames.clone());
	let on_mousedown = move |ev: MouseEvent| {
		let Some(p) = event_point(canvas_ref, &ev) else {
			return;
		};
		if let Some(ref mut c) = *context_md.borrow_mut() {
			let hit = c.driver.borrow().node_at(p);
			c.gesture = match hit {
				Some(i) => {
					c.driver.borrow_mut().drag_start(i);
					frames_md.wake();
					Some(Gesture::Node(i))
				}
				None if c.map.is_some() => Some(Gesture::Pan(p)),
				None => None,
			};
		}
	};

	let (context_mm, frames_mm) = (handles.context.clone(), handles.frames.clone());
	let on_mousemove = move |ev: MouseEvent| {
		let Some(p) = event_point(canvas_ref, &ev) else {
			return;
		};
		let mut pan = None;
		if let Some(ref mut c) = *context_mm.borrow_mut() {
			match c.gesture {
				Some(Gesture::Node(i)) => {
					c.driver.borrow_mut().drag_to(i, p);
					frames_mm.wake();
				}
				Some(Gesture::Pan(last)) => {
					c.gesture = Some(Gesture::Pan(p));
					pan = c.map.clone().map(|m| (m, Point::new(p.x - last.x, p.y - last.y)));
				}
				None => {}
			}
		}
		// the map notifies the driver synchronously, so no borrow may be held
		if let Some((m, offset)) = pan {
			m.pan_by(offset);
		}
	};

	let context_mu = handles.context.clone();
	let on_mouseup = move |_: MouseEvent| end_gesture(&context_mu);

	let context_ml = handles.context.clone();
	let on_mouseleave = move |_: MouseEvent| end_gesture(&context_ml);

	let context_wh = handles.context.clone();
	let on_wheel = move |ev: WheelEvent| {
		let map = context_wh.borrow().as_ref().and_then(|c| c.map.clone());
		if let Some(m) = map {
			ev.prevent_default();
			let step = if ev.delta_y() > 0.0 { -1.0 } else { 1.0 };
			m.set_zoom(m.zoom() + step);
		}
	};

	view! {
		<canvas
			node_ref=canvas_ref
			class="spacemap-canvas"
			on:mousedown=on_mousedown
			on:mousemove=on_mousemove
			on:mouseup=on_mouseup
			on:mouseleave=on_mouseleave
			on:wheel=on_wheel
			style="display: block; cursor: grab;"
		/>
	}
}
