//! Server rendering and hydration
//!
//! This module provides access to seidr-pages: render contexts, capture
//! scopes, hydration data and the client hydration driver.
//!
//! ## Example
//!
//! ```rust,ignore
//! use seidr::pages::dom::Node;
//! use seidr::pages::{hydrate, render_to_string};
//!
//! let output = render_to_string(&Counter { start: 2 }).await?;
//!
//! let container = Node::element("div");
//! container.set_inner_html(&output.html);
//! let handle = hydrate(&Counter { start: 0 }, &container, output.hydration_data);
//! assert!(handle.is_clean());
//! ```

// Re-export all seidr-pages functionality
pub use seidr_pages::*;
