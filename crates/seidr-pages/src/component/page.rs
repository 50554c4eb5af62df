//! Page tree and the element builder.
//!
//! A [`Page`] is what a component's `render` returns. It is rendered to HTML
//! on the server and mounted into the in-memory DOM on the client.
//!
//! Reactive properties are attached with [`PageElement::prop`]. The first
//! `prop` call on an element gives it an element id from the current render
//! context; the server records a binding for it, the client applies the
//! recorded bindings. Because ids are handed out in construction order, the
//! same component code yields the same ids in both passes.

use std::borrow::Cow;
use std::fmt;
use std::rc::Rc;

use seidr_core::reactive::{Observable, Signal, Trackable};

use crate::context::current_context_or_default;
use crate::dom::Node;
use crate::ssr::markers::{Marker, SEIDR_ID_ATTR, html_escape, html_escape_attr};

/// Property name that drives an element's text instead of an attribute.
pub const TEXT_CONTENT_PROP: &str = "textContent";

/// A reactive property: a name and the value that drives it.
#[derive(Clone)]
pub struct PropBinding {
	name: Cow<'static, str>,
	source: Rc<dyn Observable>,
	read: Rc<dyn Fn() -> String>,
}

impl PropBinding {
	/// The property name.
	pub fn name(&self) -> &str {
		&self.name
	}

	/// The driving value.
	pub fn source(&self) -> &Rc<dyn Observable> {
		&self.source
	}

	/// Formats the current value.
	pub fn current(&self) -> String {
		(self.read)()
	}

	/// Whether this property drives the element's text.
	pub fn is_text_content(&self) -> bool {
		self.name == TEXT_CONTENT_PROP
	}
}

impl fmt::Debug for PropBinding {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("PropBinding")
			.field("name", &self.name)
			.field("source", &self.source.id())
			.finish()
	}
}

/// A region re-rendered whenever one of its dependencies changes.
#[derive(Clone)]
pub struct ReactiveRegion {
	deps: Vec<Rc<dyn Observable>>,
	render: Rc<dyn Fn() -> Page>,
}

impl ReactiveRegion {
	/// The values this region depends on.
	pub fn deps(&self) -> &[Rc<dyn Observable>] {
		&self.deps
	}

	/// Produces the region's current content.
	pub fn render(&self) -> Page {
		(self.render)()
	}
}

impl fmt::Debug for ReactiveRegion {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("ReactiveRegion")
			.field("deps", &self.deps.len())
			.finish()
	}
}

/// A unified representation of renderable content.
#[derive(Debug, Clone)]
pub enum Page {
	/// An element.
	Element(PageElement),
	/// A text node.
	Text(Cow<'static, str>),
	/// Several pages without a wrapper element.
	Fragment(Vec<Page>),
	/// Content recomputed when its dependencies change.
	Reactive(ReactiveRegion),
	/// Renders nothing.
	Empty,
}

/// An element in the page tree.
#[derive(Debug, Clone)]
pub struct PageElement {
	tag: Cow<'static, str>,
	attrs: Vec<(Cow<'static, str>, Cow<'static, str>)>,
	props: Vec<PropBinding>,
	children: Vec<Page>,
	is_void: bool,
	seidr_id: Option<u64>,
}

impl PageElement {
	/// Creates a new element.
	pub fn new(tag: impl Into<Cow<'static, str>>) -> Self {
		let tag = tag.into();
		let is_void = crate::dom::is_void_element(&tag);
		Self {
			tag,
			attrs: Vec::new(),
			props: Vec::new(),
			children: Vec::new(),
			is_void,
			seidr_id: None,
		}
	}

	/// Adds a static attribute.
	pub fn attr(
		mut self,
		name: impl Into<Cow<'static, str>>,
		value: impl Into<Cow<'static, str>>,
	) -> Self {
		self.attrs.push((name.into(), value.into()));
		self
	}

	/// Binds property `name` to `signal`.
	///
	/// `"textContent"` drives the element's text; any other name is rendered
	/// as an attribute. The value is formatted with `Display` whenever it is
	/// rendered.
	pub fn prop<T>(mut self, name: impl Into<Cow<'static, str>>, signal: &Signal<T>) -> Self
	where
		T: fmt::Display + 'static,
	{
		let element_id = *self
			.seidr_id
			.get_or_insert_with(|| current_context_or_default().next_id());
		let name = name.into();
		let source = signal.handle();
		crate::registration::bind_property(&source, element_id, &name);

		let reader = signal.clone();
		self.props.push(PropBinding {
			name,
			source,
			read: Rc::new(move || reader.with(|value| value.to_string())),
		});
		self
	}

	/// Adds a child.
	pub fn child(mut self, child: impl IntoPage) -> Self {
		self.children.push(child.into_page());
		self
	}

	/// Adds several children.
	pub fn children(mut self, children: impl IntoIterator<Item = impl IntoPage>) -> Self {
		self.children
			.extend(children.into_iter().map(IntoPage::into_page));
		self
	}

	/// Returns the tag name.
	pub fn tag_name(&self) -> &str {
		&self.tag
	}

	/// Returns the static attributes.
	pub fn attrs(&self) -> &[(Cow<'static, str>, Cow<'static, str>)] {
		&self.attrs
	}

	/// Returns the reactive properties.
	pub fn props(&self) -> &[PropBinding] {
		&self.props
	}

	/// Returns the children.
	pub fn child_pages(&self) -> &[Page] {
		&self.children
	}

	/// Returns whether this is a void element.
	pub fn is_void(&self) -> bool {
		self.is_void
	}

	/// The element id, present once a reactive property was bound.
	pub fn seidr_id(&self) -> Option<u64> {
		self.seidr_id
	}

	/// The `textContent` property, if bound.
	pub fn text_prop(&self) -> Option<&PropBinding> {
		self.props.iter().find(|prop| prop.is_text_content())
	}

	/// Attributes to emit, in order: static, element id, reactive.
	pub fn rendered_attrs(&self, markers: bool) -> Vec<(String, String)> {
		let mut attrs: Vec<(String, String)> = self
			.attrs
			.iter()
			.map(|(name, value)| (name.to_string(), value.to_string()))
			.collect();
		if markers && let Some(id) = self.seidr_id {
			attrs.push((SEIDR_ID_ATTR.to_string(), id.to_string()));
		}
		attrs.extend(
			self.props
				.iter()
				.filter(|prop| !prop.is_text_content())
				.map(|prop| (prop.name.to_string(), prop.current())),
		);
		attrs
	}
}

impl Page {
	/// Creates an element.
	pub fn element(tag: impl Into<Cow<'static, str>>) -> PageElement {
		PageElement::new(tag)
	}

	/// Creates a text page.
	pub fn text(content: impl Into<Cow<'static, str>>) -> Self {
		Self::Text(content.into())
	}

	/// Creates a fragment.
	pub fn fragment(children: impl IntoIterator<Item = impl IntoPage>) -> Self {
		Self::Fragment(children.into_iter().map(IntoPage::into_page).collect())
	}

	/// Creates a region that re-renders `render` whenever one of `deps`
	/// changes.
	///
	/// The region's content is produced when the page is rendered or
	/// mounted, not when it is constructed.
	pub fn reactive<F>(deps: &[&dyn Trackable], render: F) -> Self
	where
		F: Fn() -> Page + 'static,
	{
		let deps: Vec<Rc<dyn Observable>> = deps.iter().map(|dep| dep.handle()).collect();
		crate::registration::track_region(&deps);
		Self::Reactive(ReactiveRegion {
			deps,
			render: Rc::new(render),
		})
	}

	/// Creates an empty page.
	pub fn empty() -> Self {
		Self::Empty
	}

	/// Renders to HTML with hydration markers.
	pub fn render_to_string(&self) -> String {
		self.render_html(true)
	}

	/// Renders to HTML, with or without hydration markers.
	pub fn render_html(&self, markers: bool) -> String {
		let mut output = String::new();
		self.render_inner(&mut output, markers);
		output
	}

	fn render_inner(&self, output: &mut String, markers: bool) {
		match self {
			Page::Element(el) => {
				output.push('<');
				output.push_str(el.tag_name());

				for (name, value) in el.rendered_attrs(markers) {
					output.push(' ');
					output.push_str(&name);
					output.push_str("=\"");
					output.push_str(&html_escape_attr(&value));
					output.push('"');
				}

				if el.is_void() {
					output.push_str(" />");
					return;
				}
				output.push('>');
				match el.text_prop() {
					Some(text) => output.push_str(&html_escape(&text.current())),
					None => {
						for child in el.child_pages() {
							child.render_inner(output, markers);
						}
					}
				}
				output.push_str("</");
				output.push_str(el.tag_name());
				output.push('>');
			}
			Page::Text(text) => output.push_str(&html_escape(text)),
			Page::Fragment(children) => {
				for child in children {
					child.render_inner(output, markers);
				}
			}
			Page::Reactive(region) => {
				if markers {
					output.push_str(&Marker::DynStart.to_html());
				}
				region.render().render_inner(output, markers);
				if markers {
					output.push_str(&Marker::DynEnd.to_html());
				}
			}
			Page::Empty => {}
		}
	}

	/// Builds detached DOM nodes for this page without live bindings.
	pub fn to_static_nodes(&self) -> Vec<Node> {
		crate::dom::parse_fragment(&self.render_to_string())
	}
}

/// Conversion into a [`Page`].
pub trait IntoPage {
	/// Converts self into a Page.
	fn into_page(self) -> Page;
}

impl IntoPage for Page {
	fn into_page(self) -> Page {
		self
	}
}

impl IntoPage for PageElement {
	fn into_page(self) -> Page {
		Page::Element(self)
	}
}

impl IntoPage for String {
	fn into_page(self) -> Page {
		Page::Text(Cow::Owned(self))
	}
}

impl IntoPage for &'static str {
	fn into_page(self) -> Page {
		Page::Text(Cow::Borrowed(self))
	}
}

impl<T: IntoPage> IntoPage for Option<T> {
	fn into_page(self) -> Page {
		match self {
			Some(page) => page.into_page(),
			None => Page::Empty,
		}
	}
}

impl<T: IntoPage> IntoPage for Vec<T> {
	fn into_page(self) -> Page {
		Page::fragment(self)
	}
}

impl IntoPage for () {
	fn into_page(self) -> Page {
		Page::Empty
	}
}

impl<A: IntoPage, B: IntoPage> IntoPage for (A, B) {
	fn into_page(self) -> Page {
		Page::Fragment(vec![self.0.into_page(), self.1.into_page()])
	}
}

impl<A: IntoPage, B: IntoPage, C: IntoPage> IntoPage for (A, B, C) {
	fn into_page(self) -> Page {
		Page::Fragment(vec![
			self.0.into_page(),
			self.1.into_page(),
			self.2.into_page(),
		])
	}
}
