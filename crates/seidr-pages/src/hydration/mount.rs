//! Mounting a page tree into the DOM.
//!
//! Builds live nodes from a [`Page`]: every reactive property keeps its node
//! up to date through a subscription, and every reactive region re-renders
//! the nodes between its two comment markers when a dependency changes.

use std::cell::RefCell;
use std::rc::Rc;

use seidr_core::reactive::Subscription;

use crate::component::{Page, PageElement, PropBinding};
use crate::dom::Node;
use crate::ssr::markers::Marker;

/// A mounted root: its boundary comments and the subscriptions keeping it live.
pub(crate) struct MountedRoot {
	pub(crate) start: Node,
	pub(crate) end: Node,
	pub(crate) subscriptions: Vec<Subscription>,
	/// Whether the server markup was found and replaced.
	pub(crate) replaced: bool,
}

/// Replaces the server markup of root `name` inside `container` with live
/// nodes built from `page`.
///
/// Without the root boundary comments the content is appended to
/// `container` between fresh boundaries.
pub(crate) fn mount_root(container: &Node, name: &str, page: &Page) -> MountedRoot {
	let mut subscriptions = Vec::new();

	if let Some((start, end)) = find_boundaries(container, name)
		&& let Some(parent) = end.parent()
	{
		remove_between(&parent, &start, &end);
		insert_page(page, &parent, Some(&end), &mut subscriptions);
		return MountedRoot {
			start,
			end,
			subscriptions,
			replaced: true,
		};
	}

	let start = Node::comment(Marker::RootStart(name.to_string()).comment_data());
	let end = Node::comment(Marker::RootEnd(name.to_string()).comment_data());
	container.append_child(&start);
	insert_page(page, container, None, &mut subscriptions);
	container.append_child(&end);
	MountedRoot {
		start,
		end,
		subscriptions,
		replaced: false,
	}
}

fn find_boundaries(container: &Node, name: &str) -> Option<(Node, Node)> {
	let start = container.find(&is_marker(Marker::RootStart(name.to_string())))?;
	let parent = start.parent()?;
	let end = parent
		.children()
		.into_iter()
		.skip_while(|node| !node.ptr_eq(&start))
		.find(is_marker(Marker::RootEnd(name.to_string())))?;
	Some((start, end))
}

fn is_marker(expected: Marker) -> impl Fn(&Node) -> bool {
	move |node: &Node| {
		node.comment_data()
			.and_then(|data| Marker::parse(&data))
			.is_some_and(|marker| marker == expected)
	}
}

/// Removes the siblings strictly between `start` and `end`.
pub(crate) fn remove_between(parent: &Node, start: &Node, end: &Node) {
	let doomed: Vec<Node> = parent
		.children()
		.into_iter()
		.skip_while(|node| !node.ptr_eq(start))
		.skip(1)
		.take_while(|node| !node.ptr_eq(end))
		.collect();
	for node in doomed {
		parent.remove_child(&node);
	}
}

/// Inserts the nodes for `page` into `parent` before `before`.
pub(crate) fn insert_page(
	page: &Page,
	parent: &Node,
	before: Option<&Node>,
	subscriptions: &mut Vec<Subscription>,
) {
	match page {
		Page::Element(element) => {
			let node = create_element(element, subscriptions);
			parent.insert_before(&node, before);
		}
		Page::Text(text) => parent.insert_before(&Node::text(text.to_string()), before),
		Page::Fragment(children) => {
			for child in children {
				insert_page(child, parent, before, subscriptions);
			}
		}
		Page::Reactive(region) => {
			let start = Node::comment(Marker::DynStart.comment_data());
			let end = Node::comment(Marker::DynEnd.comment_data());
			parent.insert_before(&start, before);
			parent.insert_before(&end, before);

			let inner: Rc<RefCell<Vec<Subscription>>> = Rc::new(RefCell::new(Vec::new()));
			let refresh: Rc<dyn Fn()> = {
				let region = region.clone();
				Rc::new(move || {
					let Some(parent) = end.parent() else {
						return;
					};
					remove_between(&parent, &start, &end);
					let mut fresh = Vec::new();
					insert_page(&region.render(), &parent, Some(&end), &mut fresh);
					*inner.borrow_mut() = fresh;
				})
			};

			refresh();
			for dep in region.deps() {
				subscriptions.push(Subscription::attach(dep, refresh.clone()));
			}
		}
		Page::Empty => {}
	}
}

fn create_element(element: &PageElement, subscriptions: &mut Vec<Subscription>) -> Node {
	let node = Node::element(element.tag_name());
	for (name, value) in element.rendered_attrs(true) {
		node.set_attr(&name, value);
	}

	match element.text_prop() {
		Some(text) => node.set_text_content(&text.current()),
		None => {
			for child in element.child_pages() {
				insert_page(child, &node, None, subscriptions);
			}
		}
	}

	for prop in element.props() {
		let target = node.clone();
		let binding = prop.clone();
		subscriptions.push(Subscription::attach(
			prop.source(),
			Rc::new(move || apply_prop(&target, &binding)),
		));
	}
	node
}

fn apply_prop(node: &Node, prop: &PropBinding) {
	let value = prop.current();
	if prop.is_text_content() {
		node.set_text_content(&value);
	} else {
		node.set_attr(prop.name(), value);
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::component::{IntoPage, TEXT_CONTENT_PROP};
	use crate::context::run_with_context_sync;
	use rstest::rstest;
	use seidr_core::reactive::Signal;

	#[rstest]
	fn test_props_stay_live() {
		let container = Node::element("div");
		let count = Signal::new(1);
		let title = Signal::new("one".to_string());
		let page = run_with_context_sync(|| {
			PageElement::new("span")
				.prop(TEXT_CONTENT_PROP, &count)
				.prop("title", &title)
				.into_page()
		});

		let mut subscriptions = Vec::new();
		insert_page(&page, &container, None, &mut subscriptions);
		assert_eq!(
			container.inner_html(),
			r#"<span data-seidr-id="0" title="one">1</span>"#
		);

		count.set(2);
		title.set("two".into());
		assert_eq!(
			container.inner_html(),
			r#"<span data-seidr-id="0" title="two">2</span>"#
		);

		drop(subscriptions);
		count.set(3);
		assert_eq!(container.text_content(), "2");
	}

	#[rstest]
	fn test_region_rerenders_between_markers() {
		let container = Node::element("div");
		let items = Signal::new(vec!["a".to_string()]);
		let source = items.clone();
		let page = Page::fragment(vec![
			Page::text("["),
			Page::reactive(&[&items], move || {
				Page::fragment(
					source
						.get()
						.into_iter()
						.map(|item| PageElement::new("li").child(item)),
				)
			}),
			Page::text("]"),
		]);

		let mut subscriptions = Vec::new();
		insert_page(&page, &container, None, &mut subscriptions);
		assert_eq!(
			container.inner_html(),
			"[<!--seidr-dyn--><li>a</li><!--/seidr-dyn-->]"
		);

		items.set(vec!["b".into(), "c".into()]);
		assert_eq!(
			container.inner_html(),
			"[<!--seidr-dyn--><li>b</li><li>c</li><!--/seidr-dyn-->]"
		);
	}

	#[rstest]
	fn test_mount_root_replaces_server_markup() {
		let container = Node::element("div");
		container.set_inner_html("<!--seidr-start:App--><p>server</p><!--seidr-end:App-->");

		let mounted = mount_root(&container, "App", &Page::text("client"));
		assert!(mounted.replaced);
		assert_eq!(
			container.inner_html(),
			"<!--seidr-start:App-->client<!--seidr-end:App-->"
		);
	}

	#[rstest]
	fn test_mount_root_without_markers_appends() {
		let container = Node::element("div");
		container.set_inner_html("<p>server</p>");

		let mounted = mount_root(&container, "App", &Page::text("client"));
		assert!(!mounted.replaced);
		assert_eq!(
			container.inner_html(),
			"<p>server</p><!--seidr-start:App-->client<!--seidr-end:App-->"
		);
		assert!(mounted.start.parent().is_some());
		assert!(mounted.end.parent().is_some());
	}

	#[rstest]
	fn test_remove_between() {
		let parent = Node::element("div");
		parent.set_inner_html("a<!--s-->b<i>c</i><!--e-->d");
		let children = parent.children();
		remove_between(&parent, &children[1], &children[4]);
		assert_eq!(parent.inner_html(), "a<!--s--><!--e-->d");
	}
}
