//! Component trait definition.

use super::page::Page;

/// Trait for renderable units that can be server-rendered and hydrated.
///
/// `render` is the construction function: it must create reactive values and
/// bind element properties in the same order every time it runs, because
/// that order is how the client matches its values to the server's.
///
/// # Example
///
/// ```ignore
/// use seidr_pages::component::{Component, IntoPage, Page};
/// use seidr_core::Signal;
///
/// struct Counter {
///     start: i32,
/// }
///
/// impl Component for Counter {
///     fn render(&self) -> Page {
///         let count = Signal::new(self.start);
///         Page::element("span")
///             .prop("textContent", &count)
///             .into_page()
///     }
///
///     fn name() -> &'static str {
///         "Counter"
///     }
/// }
/// ```
pub trait Component: 'static {
	/// Renders the component to a Page.
	fn render(&self) -> Page;

	/// Returns the component's name, used for the root boundary markers.
	fn name() -> &'static str
	where
		Self: Sized;
}
