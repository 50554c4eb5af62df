//! Component system
//!
//! Components build a [`Page`] tree. The same tree is rendered to HTML on
//! the server and mounted into the DOM on the client.
//!
//! ## Features
//!
//! - **Component trait**: a named construction function
//! - **Page enum**: elements, text, fragments and reactive regions
//! - **Reactive props**: [`PageElement::prop`] binds a signal to an element
//!   property and records the binding for hydration
//!
//! ## Usage
//!
//! ```ignore
//! use seidr_pages::component::{IntoPage, Page};
//! use seidr_core::Signal;
//!
//! let name = Signal::new("World".to_string());
//! let page = Page::element("p")
//!     .attr("class", "greeting")
//!     .prop("textContent", &name)
//!     .into_page();
//! let html = page.render_to_string();
//! ```

mod page;
mod r#trait;

pub use page::{IntoPage, Page, PageElement, PropBinding, ReactiveRegion, TEXT_CONTENT_PROP};
pub use r#trait::Component;
