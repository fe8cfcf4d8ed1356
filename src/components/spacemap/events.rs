//! Typed publish/subscribe channels.
//!
//! Each event kind gets its own [`Channel`] with a fixed payload type.
//! Handlers run in subscription order. Dropping (or disposing) the returned
//! [`Subscription`] detaches the handler.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use super::types::Point;

type Handler<T> = Rc<dyn Fn(&T)>;

struct Slots<T> {
	next_id: u64,
	handlers: Vec<(u64, Handler<T>)>,
}

/// A single-threaded event channel carrying payloads of type `T`.
pub struct Channel<T> {
	slots: Rc<RefCell<Slots<T>>>,
}

impl<T> Clone for Channel<T> {
	fn clone(&self) -> Self {
		Self {
			slots: self.slots.clone(),
		}
	}
}

impl<T> Default for Channel<T> {
	fn default() -> Self {
		Self {
			slots: Rc::new(RefCell::new(Slots {
				next_id: 0,
				handlers: Vec::new(),
			})),
		}
	}
}

impl<T: 'static> Channel<T> {
	/// A channel with no subscribers.
	pub fn new() -> Self {
		Self::default()
	}

	/// Adds `handler` after every existing subscriber.
	#[must_use = "dropping the subscription detaches the handler"]
	pub fn subscribe(&self, handler: impl Fn(&T) + 'static) -> Subscription {
		let id = {
			let mut slots = self.slots.borrow_mut();
			let id = slots.next_id;
			slots.next_id += 1;
			slots.handlers.push((id, Rc::new(handler)));
			id
		};
		let weak: Weak<RefCell<Slots<T>>> = Rc::downgrade(&self.slots);
		Subscription {
			detach: Some(Box::new(move || {
				if let Some(slots) = weak.upgrade() {
					slots.borrow_mut().handlers.retain(|(h, _)| *h != id);
				}
			})),
		}
	}

	/// Delivers `payload` to every handler subscribed at the time of the call.
	pub fn emit(&self, payload: &T) {
		let handlers: Vec<Handler<T>> = self
			.slots
			.borrow()
			.handlers
			.iter()
			.map(|(_, h)| h.clone())
			.collect();
		for handler in handlers {
			handler(payload);
		}
	}

	/// Number of attached handlers.
	pub fn subscriber_count(&self) -> usize {
		self.slots.borrow().handlers.len()
	}
}

/// Handle for a subscribed handler.
pub struct Subscription {
	detach: Option<Box<dyn FnOnce()>>,
}

impl Subscription {
	/// Detaches the handler now.
	pub fn dispose(mut self) {
		self.detach_now();
	}

	fn detach_now(&mut self) {
		if let Some(detach) = self.detach.take() {
			detach();
		}
	}
}

impl Drop for Subscription {
	fn drop(&mut self) {
		self.detach_now();
	}
}

/// Map pan by a pixel offset.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DragEvent {
	/// How far the map content moved on screen.
	pub offset: Point,
}

/// Map zoom level change.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ZoomEvent {
	/// The new zoom level.
	pub zoom: f64,
}

/// Fired after every completed simulation tick.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TickEvent {
	/// Engine temperature after the step.
	pub alpha: f64,
	/// Layout generation that was rendered.
	pub generation: u64,
}
