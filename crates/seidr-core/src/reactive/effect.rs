//! Effect - Reactive Side Effects
//!
//! `Effect` runs a closure once immediately and again whenever one of its
//! dependencies changes. Dependencies are passed explicitly, matching the
//! explicit parent lists used by [`Signal::computed`](super::Signal::computed).
//!
//! ## Example
//!
//! ```ignore
//! use seidr_core::reactive::{Effect, Signal};
//!
//! let count = Signal::new(0);
//! let doubled = Signal::new(0);
//!
//! let (c, d) = (count.clone(), doubled.clone());
//! let _effect = Effect::new(&[&count], move || d.set(c.get() * 2));
//!
//! count.set(5);
//! assert_eq!(doubled.get(), 10);
//! ```

use core::cell::RefCell;

extern crate alloc;
use alloc::rc::Rc;
use alloc::vec::Vec;

use super::observable::{Subscription, Trackable};

/// A side effect bound to a fixed set of dependencies
///
/// Dropping the effect (or calling [`Effect::dispose`]) releases every
/// subscription it holds.
pub struct Effect {
	subscriptions: Vec<Subscription>,
}

impl Effect {
	/// Create a new Effect and run it once
	///
	/// Re-entrant triggers (the effect writing to one of its own
	/// dependencies) are ignored rather than recursing.
	pub fn new<F>(deps: &[&dyn Trackable], f: F) -> Self
	where
		F: FnMut() + 'static,
	{
		let f = Rc::new(RefCell::new(f));
		(&mut *f.borrow_mut())();

		let subscriptions = deps
			.iter()
			.map(|dep| {
				let f = f.clone();
				Subscription::attach(
					&dep.handle(),
					Rc::new(move || {
						if let Ok(mut run) = f.try_borrow_mut() {
							(&mut *run)();
						}
					}),
				)
			})
			.collect();

		Self { subscriptions }
	}

	/// Number of dependencies this effect is subscribed to
	pub fn dependency_count(&self) -> usize {
		self.subscriptions.len()
	}

	/// Release all subscriptions
	pub fn dispose(&mut self) {
		self.subscriptions.clear();
	}
}

impl core::fmt::Debug for Effect {
	fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
		f.debug_struct("Effect")
			.field("dependencies", &self.subscriptions.len())
			.finish()
	}
}
