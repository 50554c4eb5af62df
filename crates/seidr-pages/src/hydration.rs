//! Client-side hydration
//!
//! Hydration reconnects server-rendered markup to live reactive state
//! without re-running server-only work.
//!
//! ## Lifecycle
//!
//! ```text
//! Idle -> ContextSet -> Replaying -> ApplyingBindings -> Cleared
//! ```
//!
//! 1. **ContextSet**: the payload is installed in the thread's hydration
//!    slot together with an empty replay registry
//! 2. **Replaying**: the component is constructed again; every reactive
//!    value is appended to the registry in construction order, and captured
//!    roots are restored the moment they are constructed
//! 3. **ApplyingBindings**: bound elements restore the roots their paths
//!    lead to, and the page replaces the server markup
//! 4. **Cleared**: the slot is released (a nested call restores the outer
//!    payload)
//!
//! Every problem along the way is recovered locally and reported as a
//! [`HydrationError`] on the returned [`HydrationHandle`].

mod error;
mod mount;
mod runtime;
mod session;

pub use error::HydrationError;
pub use runtime::{HydrationHandle, hydrate, hydrate_from_json, read_state};
pub use session::{HydrationPhase, is_hydrating};

pub(crate) use session::current_session;
