//! Seidr Core - reactive primitives
//!
//! This crate provides the reactive value used by the Seidr rendering
//! library. It deliberately knows nothing about server-side rendering or
//! hydration: those layers observe value construction through an injected
//! [`RegistrationHook`](reactive::RegistrationHook).
//!
//! ## Example
//!
//! ```ignore
//! use seidr_core::reactive::Signal;
//!
//! let a = Signal::new(2);
//! let b = a.derive(|x| x * 2);
//! let (a2, b2) = (a.clone(), b.clone());
//! let sum = Signal::computed(&[&a, &b], move || a2.get() + b2.get());
//!
//! a.set(3);
//! assert_eq!(sum.get(), 9);
//! ```

#![warn(missing_docs)]

pub mod reactive;

pub use reactive::{Effect, Observable, ReactiveError, Signal, Subscription, Trackable};
