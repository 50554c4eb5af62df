//! In-memory DOM
//!
//! A small, single-threaded document model used as the hydration target:
//! server markup is parsed into a container with [`Node::set_inner_html`],
//! and hydration replaces the server nodes with live ones.
//!
//! ## Example
//!
//! ```ignore
//! use seidr_pages::dom::Node;
//!
//! let app = Node::element("div");
//! app.set_inner_html("<p>Hello</p>");
//! assert_eq!(app.text_content(), "Hello");
//! ```

mod node;
mod parser;

pub(crate) use node::is_void_element;
pub use node::{Node, NodeKind};
pub use parser::parse_fragment;
