//! # Seidr
//!
//! Server-side rendering with lossless client hydration for signal-based
//! reactive pages.
//!
//! A component is rendered once on the server. Every reactive value it
//! creates is registered in a per-request capture scope; after rendering, the
//! values that the page actually displays are serialized together with the
//! dependency graph that connects them. The client renders the same component
//! again, gets each root value back as it is constructed, and attaches live
//! updates to the server markup without re-running server-only work.
//!
//! ## Feature Flags
//!
//! - `pages` (default) - server rendering and hydration (`seidr-pages`)
//! - `debug-hooks` - verbose capture and hydration logging
//!
//! ## Quick Example
//!
//! ```rust,ignore
//! use seidr::prelude::*;
//!
//! struct Greeting {
//!     name: String,
//! }
//!
//! impl Component for Greeting {
//!     fn render(&self) -> Page {
//!         let name = Signal::new(self.name.clone());
//!         let text = name.derive(|name| format!("Hello, {}!", name));
//!         PageElement::new("h1").prop(TEXT_CONTENT_PROP, &text).into_page()
//!     }
//!
//!     fn name() -> &'static str {
//!         "Greeting"
//!     }
//! }
//!
//! // Server
//! let page = SsrRenderer::new().render_page(&Greeting { name: "Ada".into() }).await?;
//!
//! // Client
//! let handle = hydrate_from_json(&Greeting { name: String::new() }, &container, &payload)?;
//! ```

pub mod reactive;

#[cfg(feature = "pages")]
pub mod pages;

// Re-export the reactive core
pub use seidr_core::{Effect, Observable, ReactiveError, Signal, Subscription, Trackable};

// Re-export rendering and hydration
#[cfg(feature = "pages")]
pub use seidr_pages::{
	CaptureMode, Component, HydrationData, HydrationError, HydrationHandle, IntoPage, Page,
	PageElement, RenderError, RenderOutput, SsrOptions, SsrRenderer, TEXT_CONTENT_PROP, hydrate,
	hydrate_from_json, read_state, render_to_string, server_only,
};

/// Convenience re-exports for components and entry points.
pub mod prelude {
	pub use crate::{Effect, Signal, Trackable};

	#[cfg(feature = "pages")]
	pub use crate::{
		Component, HydrationData, IntoPage, Page, PageElement, SsrOptions, SsrRenderer,
		TEXT_CONTENT_PROP, hydrate, hydrate_from_json, render_to_string, server_only,
	};

	#[cfg(feature = "pages")]
	pub use seidr_pages::{provide_state, read_state, state_signal};
}
