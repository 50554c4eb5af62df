//! Reactive Runtime
//!
//! This module owns the process-wide pieces of the reactive system:
//!
//! 1. **Stable ids**: every [`Signal`](super::Signal) receives a [`NodeId`] at
//!    construction from a monotonic atomic counter.
//! 2. **Observer ids**: subscriptions are keyed by [`ObserverId`] so they can be
//!    released individually.
//! 3. **Registration hook**: an injected [`RegistrationHook`] is invoked
//!    synchronously whenever a reactive value is created or derived. The
//!    reactive primitive itself knows nothing about SSR; the rendering layer
//!    installs a hook that forwards registrations to whatever capture scope
//!    or hydration registry is active.
//!
//! ## Example
//!
//! ```ignore
//! use seidr_core::reactive::{RegistrationHook, Observable, set_registration_hook};
//! use std::rc::Rc;
//!
//! struct Logger;
//!
//! impl RegistrationHook for Logger {
//!     fn on_create(&self, node: &Rc<dyn Observable>) {
//!         println!("created {:?}", node.id());
//!     }
//!
//!     fn on_derive(&self, _node: &Rc<dyn Observable>, _parents: &[Rc<dyn Observable>]) {}
//! }
//!
//! set_registration_hook(Rc::new(Logger));
//! ```

use core::cell::RefCell;
use core::fmt;
use core::sync::atomic::{AtomicU64, Ordering};

extern crate alloc;
use alloc::rc::Rc;

use super::observable::Observable;

/// Stable, opaque identifier of a reactive value
///
/// Ids are assigned once at construction and never reused within a process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(u64);

impl NodeId {
	/// Create a new unique NodeId
	pub fn new() -> Self {
		static COUNTER: AtomicU64 = AtomicU64::new(0);
		Self(COUNTER.fetch_add(1, Ordering::Relaxed))
	}

	/// Returns the raw numeric value of this id.
	pub fn as_u64(&self) -> u64 {
		self.0
	}
}

impl Default for NodeId {
	fn default() -> Self {
		Self::new()
	}
}

impl fmt::Display for NodeId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "node-{}", self.0)
	}
}

/// Identifier of a single observer subscription on a reactive value
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ObserverId(u64);

impl ObserverId {
	/// Create a new unique ObserverId
	pub fn new() -> Self {
		static COUNTER: AtomicU64 = AtomicU64::new(0);
		Self(COUNTER.fetch_add(1, Ordering::Relaxed))
	}
}

impl Default for ObserverId {
	fn default() -> Self {
		Self::new()
	}
}

/// Callback interface invoked by reactive values as they come into existence.
///
/// Both methods run synchronously inside the constructor, before the new
/// value is handed back to the caller. Implementations must not assume a
/// particular environment: the same hook serves server capture and client
/// replay.
pub trait RegistrationHook {
	/// Called once for every newly constructed reactive value (root or derived).
	fn on_create(&self, node: &Rc<dyn Observable>);

	/// Called once for every derived value, right after `on_create`, with its
	/// parents in the exact order they were supplied at derivation.
	fn on_derive(&self, node: &Rc<dyn Observable>, parents: &[Rc<dyn Observable>]);
}

// Thread-local hook slot
//
// Reactive values are `!Send` (`Rc`-based), so every value lives and dies on
// the thread that created it. One hook per thread is therefore sufficient.
thread_local! {
	static REGISTRATION_HOOK: RefCell<Option<Rc<dyn RegistrationHook>>> = const { RefCell::new(None) };
}

/// Installs the registration hook for the current thread.
///
/// Returns the previously installed hook, if any.
pub fn set_registration_hook(hook: Rc<dyn RegistrationHook>) -> Option<Rc<dyn RegistrationHook>> {
	REGISTRATION_HOOK.with(|slot| slot.borrow_mut().replace(hook))
}

/// Removes the registration hook for the current thread.
pub fn clear_registration_hook() -> Option<Rc<dyn RegistrationHook>> {
	REGISTRATION_HOOK.with(|slot| slot.borrow_mut().take())
}

/// Returns whether a registration hook is installed on the current thread.
pub fn has_registration_hook() -> bool {
	REGISTRATION_HOOK
		.try_with(|slot| slot.borrow().is_some())
		.unwrap_or(false)
}

/// Runs `f` with the installed hook, if any.
///
/// The hook is cloned out of the slot before `f` runs so that the hook may
/// itself construct reactive values without re-entering the slot borrow.
pub(crate) fn with_hook<F>(f: F)
where
	F: FnOnce(&dyn RegistrationHook),
{
	let hook = REGISTRATION_HOOK
		.try_with(|slot| slot.borrow().clone())
		.ok()
		.flatten();
	if let Some(hook) = hook {
		f(hook.as_ref());
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use serial_test::serial;

	struct NoopHook;

	impl RegistrationHook for NoopHook {
		fn on_create(&self, _node: &Rc<dyn Observable>) {}
		fn on_derive(&self, _node: &Rc<dyn Observable>, _parents: &[Rc<dyn Observable>]) {}
	}

	#[test]
	fn test_node_id_uniqueness() {
		let id1 = NodeId::new();
		let id2 = NodeId::new();
		let id3 = NodeId::new();

		assert_ne!(id1, id2);
		assert_ne!(id2, id3);
		assert_ne!(id1, id3);
	}

	#[test]
	fn test_node_id_is_monotonic() {
		let first = NodeId::new();
		let second = NodeId::new();
		assert!(second > first);
	}

	#[test]
	fn test_node_id_display() {
		let id = NodeId(7);
		assert_eq!(id.to_string(), "node-7");
	}

	#[test]
	#[serial(registration_hook)]
	fn test_set_and_clear_hook() {
		clear_registration_hook();
		assert!(!has_registration_hook());

		let previous = set_registration_hook(Rc::new(NoopHook));
		assert!(previous.is_none());
		assert!(has_registration_hook());

		let removed = clear_registration_hook();
		assert!(removed.is_some());
		assert!(!has_registration_hook());
	}
}
