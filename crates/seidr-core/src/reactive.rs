//! Reactive system for Seidr
//!
//! - [`Signal`]: reactive value (root, derived or computed)
//! - [`Effect`]: side effect bound to explicit dependencies
//! - [`Observable`]: type-erased handle used by capture and hydration
//! - [`RegistrationHook`]: injected callback announcing new values

mod effect;
mod error;
mod observable;
mod runtime;
mod signal;

pub use effect::Effect;
pub use error::ReactiveError;
pub use observable::{Observable, ObserverFn, Subscription, Trackable};
pub use runtime::{
	NodeId, ObserverId, RegistrationHook, clear_registration_hook, has_registration_hook,
	set_registration_hook,
};
pub use signal::Signal;
