//! Type-erased view of a reactive value.
//!
//! Capture scopes and hydration registries hold values of many different
//! `T`s side by side. [`Observable`] is the object-safe surface they work
//! against; [`Signal<T>`](super::Signal) implements it for every `T`.

use core::fmt;

extern crate alloc;
use alloc::rc::{Rc, Weak};

use super::error::ReactiveError;
use super::runtime::{NodeId, ObserverId};

/// Callback invoked after a reactive value changed.
pub type ObserverFn = Rc<dyn Fn()>;

/// Object-safe handle to a reactive value.
pub trait Observable {
	/// The stable id assigned at construction.
	fn id(&self) -> NodeId;

	/// Whether the value is computed from parents.
	fn is_derived(&self) -> bool;

	/// Parent ids in derivation order (empty for roots).
	fn parent_ids(&self) -> Vec<NodeId>;

	/// Serializes the current value to JSON.
	///
	/// Fails with [`ReactiveError::NotSerializable`] when the value was
	/// created without a JSON codec.
	fn to_json(&self) -> Result<serde_json::Value, ReactiveError>;

	/// Replaces the current value with a deserialized JSON value and notifies
	/// observers.
	fn set_json(&self, value: serde_json::Value) -> Result<(), ReactiveError>;

	/// Registers an observer that runs after every change.
	fn subscribe(&self, observer: ObserverFn) -> ObserverId;

	/// Removes a previously registered observer. Unknown ids are ignored.
	fn unsubscribe(&self, id: ObserverId);

	/// Number of currently registered observers.
	fn observer_count(&self) -> usize;

	/// Releases every observer registration held by or on this value.
	///
	/// The value stays readable afterwards but no longer propagates changes
	/// and no longer follows its parents.
	fn destroy(&self);
}

impl fmt::Debug for dyn Observable {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Observable")
			.field("id", &self.id())
			.field("derived", &self.is_derived())
			.finish()
	}
}

/// Types that can hand out an [`Observable`] handle.
///
/// Used to pass heterogeneous dependency lists, e.g. to
/// [`Signal::computed`](super::Signal::computed).
pub trait Trackable {
	/// Returns the type-erased handle.
	fn handle(&self) -> Rc<dyn Observable>;
}

impl Trackable for Rc<dyn Observable> {
	fn handle(&self) -> Rc<dyn Observable> {
		self.clone()
	}
}

/// RAII subscription guard.
///
/// Dropping the guard unsubscribes the observer. The guard only holds a weak
/// reference to its source, so it never keeps a value alive on its own.
#[must_use = "dropping a Subscription immediately unsubscribes the observer"]
pub struct Subscription {
	source: Weak<dyn Observable>,
	id: ObserverId,
}

impl Subscription {
	pub(crate) fn new(source: &Rc<dyn Observable>, id: ObserverId) -> Self {
		Self {
			source: Rc::downgrade(source),
			id,
		}
	}

	/// Subscribes `observer` to `source` and returns the guard.
	pub fn attach(source: &Rc<dyn Observable>, observer: ObserverFn) -> Self {
		let id = source.subscribe(observer);
		Self::new(source, id)
	}

	/// The observer id held by this guard.
	pub fn id(&self) -> ObserverId {
		self.id
	}

	/// Keeps the observer registered for the lifetime of its source.
	pub fn forget(self) {
		core::mem::forget(self);
	}
}

impl Drop for Subscription {
	fn drop(&mut self) {
		if let Some(source) = self.source.upgrade() {
			source.unsubscribe(self.id);
		}
	}
}

impl fmt::Debug for Subscription {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Subscription")
			.field("id", &self.id)
			.field("alive", &(self.source.strong_count() > 0))
			.finish()
	}
}
