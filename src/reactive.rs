//! Reactive primitives
//!
//! Signals, derived values and effects from seidr-core, together with the
//! registration hook used by the capture and hydration machinery.

pub use seidr_core::reactive::*;
