//! Seidr Pages - server rendering and hydration for reactive pages
//!
//! Renders components built on [`seidr_core`] signals to HTML on the server,
//! captures the reactive state behind that HTML, and reconnects it on the
//! client without re-running server-only work.
//!
//! ## Architecture
//!
//! - [`context`]: per-request render contexts (task-local)
//! - [`component`]: the `Component` trait and the `Page` tree
//! - [`ssr`]: capture scopes, the dependency graph, hydration data and the
//!   renderer
//! - [`hydration`]: client-side replay and binding application
//! - [`dom`]: the in-memory DOM that hydration mounts into
//! - [`logging`]: logging macros
//!
//! ## Example
//!
//! ```ignore
//! use seidr_pages::{Component, IntoPage, Page, Signal, hydrate, render_to_string};
//! use seidr_pages::dom::Node;
//!
//! struct Counter;
//!
//! impl Component for Counter {
//!     fn render(&self) -> Page {
//!         let count = Signal::new(1);
//!         let doubled = count.derive(|n| n * 2);
//!         Page::element("span")
//!             .prop("textContent", &doubled)
//!             .into_page()
//!     }
//!
//!     fn name() -> &'static str {
//!         "Counter"
//!     }
//! }
//!
//! // Server
//! let output = render_to_string(&Counter).await?;
//!
//! // Client
//! let app = Node::element("div");
//! app.set_inner_html(&output.html);
//! let handle = hydrate(&Counter, &app, output.hydration_data);
//! ```

#![warn(missing_docs)]

pub mod component;
pub mod context;
pub mod dom;
pub mod hydration;
pub mod logging;
pub mod ssr;

mod registration;

#[doc(hidden)]
pub use tracing as __tracing;

pub use component::{Component, IntoPage, Page, PageElement, TEXT_CONTENT_PROP};
pub use context::{
	ContextError, RenderContext, current_context, current_context_or_default, run_with_context,
	run_with_context_sync, server_only,
};
pub use hydration::{
	HydrationError, HydrationHandle, HydrationPhase, hydrate, hydrate_from_json, is_hydrating,
	read_state,
};
pub use seidr_core::reactive::{Effect, Observable, Signal, Subscription, Trackable};
pub use ssr::{
	CaptureError, CaptureMode, HydrationData, RenderError, RenderOutput, SsrOptions, SsrRenderer,
	provide_state, render_to_string, state_signal,
};
