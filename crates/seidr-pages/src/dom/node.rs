//! Reference-counted DOM nodes.

use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

use crate::ssr::markers::{html_escape, html_escape_attr};

/// Elements that never have children or a closing tag.
pub(crate) fn is_void_element(tag: &str) -> bool {
	matches!(
		tag,
		"area"
			| "base" | "br"
			| "col" | "embed"
			| "hr" | "img"
			| "input" | "link"
			| "meta" | "source"
			| "track" | "wbr"
	)
}

/// What a node is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
	/// An element with a lowercase tag name and ordered attributes.
	Element {
		/// Tag name.
		tag: String,
		/// Attributes in insertion order.
		attrs: Vec<(String, String)>,
	},
	/// A text node.
	Text(String),
	/// A comment node (data without `<!--` / `-->`).
	Comment(String),
}

struct NodeData {
	kind: NodeKind,
	parent: Weak<RefCell<NodeData>>,
	children: Vec<Node>,
}

/// A DOM node handle. Clones refer to the same node.
#[derive(Clone)]
pub struct Node(Rc<RefCell<NodeData>>);

impl Node {
	fn from_kind(kind: NodeKind) -> Self {
		Self(Rc::new(RefCell::new(NodeData {
			kind,
			parent: Weak::new(),
			children: Vec::new(),
		})))
	}

	/// Creates a detached element.
	pub fn element(tag: impl Into<String>) -> Self {
		Self::from_kind(NodeKind::Element {
			tag: tag.into().to_ascii_lowercase(),
			attrs: Vec::new(),
		})
	}

	/// Creates a detached text node.
	pub fn text(content: impl Into<String>) -> Self {
		Self::from_kind(NodeKind::Text(content.into()))
	}

	/// Creates a detached comment node.
	pub fn comment(data: impl Into<String>) -> Self {
		Self::from_kind(NodeKind::Comment(data.into()))
	}

	/// A copy of this node's kind.
	pub fn kind(&self) -> NodeKind {
		self.0.borrow().kind.clone()
	}

	/// Tag name for elements.
	pub fn tag_name(&self) -> Option<String> {
		match &self.0.borrow().kind {
			NodeKind::Element { tag, .. } => Some(tag.clone()),
			_ => None,
		}
	}

	/// Whether this is an element.
	pub fn is_element(&self) -> bool {
		matches!(self.0.borrow().kind, NodeKind::Element { .. })
	}

	/// Comment data for comment nodes.
	pub fn comment_data(&self) -> Option<String> {
		match &self.0.borrow().kind {
			NodeKind::Comment(data) => Some(data.clone()),
			_ => None,
		}
	}

	/// Whether both handles refer to the same node.
	pub fn ptr_eq(&self, other: &Node) -> bool {
		Rc::ptr_eq(&self.0, &other.0)
	}

	/// Reads an attribute.
	pub fn attr(&self, name: &str) -> Option<String> {
		match &self.0.borrow().kind {
			NodeKind::Element { attrs, .. } => attrs
				.iter()
				.find(|(key, _)| key == name)
				.map(|(_, value)| value.clone()),
			_ => None,
		}
	}

	/// Sets an attribute, replacing an existing value. Ignored on non-elements.
	pub fn set_attr(&self, name: &str, value: impl Into<String>) {
		if let NodeKind::Element { attrs, .. } = &mut self.0.borrow_mut().kind {
			let value = value.into();
			match attrs.iter_mut().find(|(key, _)| key == name) {
				Some(slot) => slot.1 = value,
				None => attrs.push((name.to_string(), value)),
			}
		}
	}

	/// Removes an attribute, returning its old value.
	pub fn remove_attr(&self, name: &str) -> Option<String> {
		if let NodeKind::Element { attrs, .. } = &mut self.0.borrow_mut().kind {
			let index = attrs.iter().position(|(key, _)| key == name)?;
			return Some(attrs.remove(index).1);
		}
		None
	}

	/// The parent node, if attached.
	pub fn parent(&self) -> Option<Node> {
		self.0.borrow().parent.upgrade().map(Node)
	}

	/// Child nodes in order.
	pub fn children(&self) -> Vec<Node> {
		self.0.borrow().children.clone()
	}

	/// Number of children.
	pub fn child_count(&self) -> usize {
		self.0.borrow().children.len()
	}

	/// Position of `child` among this node's children.
	pub fn index_of(&self, child: &Node) -> Option<usize> {
		self.0
			.borrow()
			.children
			.iter()
			.position(|candidate| candidate.ptr_eq(child))
	}

	fn detach(child: &Node) {
		if let Some(parent) = child.parent() {
			parent.remove_child(child);
		}
	}

	/// Appends `child`, moving it out of its current parent first.
	pub fn append_child(&self, child: &Node) {
		Self::detach(child);
		child.0.borrow_mut().parent = Rc::downgrade(&self.0);
		self.0.borrow_mut().children.push(child.clone());
	}

	/// Inserts `child` before `reference`, or appends when `reference` is
	/// `None` or not a child of this node.
	pub fn insert_before(&self, child: &Node, reference: Option<&Node>) {
		Self::detach(child);
		child.0.borrow_mut().parent = Rc::downgrade(&self.0);
		let index = reference.and_then(|reference| self.index_of(reference));
		let mut data = self.0.borrow_mut();
		match index {
			Some(index) => data.children.insert(index, child.clone()),
			None => data.children.push(child.clone()),
		}
	}

	/// Removes `child`. Returns `false` when it is not a child of this node.
	pub fn remove_child(&self, child: &Node) -> bool {
		let Some(index) = self.index_of(child) else {
			return false;
		};
		self.0.borrow_mut().children.remove(index);
		child.0.borrow_mut().parent = Weak::new();
		true
	}

	/// Removes every child.
	pub fn clear_children(&self) {
		let children = std::mem::take(&mut self.0.borrow_mut().children);
		for child in children {
			child.0.borrow_mut().parent = Weak::new();
		}
	}

	/// Concatenated text of this node and its descendants (comments excluded).
	pub fn text_content(&self) -> String {
		let mut out = String::new();
		self.collect_text(&mut out);
		out
	}

	fn collect_text(&self, out: &mut String) {
		let data = self.0.borrow();
		match &data.kind {
			NodeKind::Text(text) => out.push_str(text),
			NodeKind::Comment(_) => {}
			NodeKind::Element { .. } => {
				for child in &data.children {
					child.collect_text(out);
				}
			}
		}
	}

	/// Replaces the children of an element with a single text node, or the
	/// content of a text/comment node.
	pub fn set_text_content(&self, text: &str) {
		{
			let mut data = self.0.borrow_mut();
			match &mut data.kind {
				NodeKind::Text(content) | NodeKind::Comment(content) => {
					*content = text.to_string();
					return;
				}
				NodeKind::Element { .. } => {}
			}
		}
		self.clear_children();
		if !text.is_empty() {
			self.append_child(&Node::text(text));
		}
	}

	/// Serializes the children of this node.
	pub fn inner_html(&self) -> String {
		let mut out = String::new();
		for child in self.0.borrow().children.iter() {
			child.write_html(&mut out);
		}
		out
	}

	/// Serializes this node and its children.
	pub fn outer_html(&self) -> String {
		let mut out = String::new();
		self.write_html(&mut out);
		out
	}

	/// Replaces the children of this node with parsed `html`.
	pub fn set_inner_html(&self, html: &str) {
		self.clear_children();
		for node in super::parse_fragment(html) {
			self.append_child(&node);
		}
	}

	fn write_html(&self, out: &mut String) {
		let data = self.0.borrow();
		match &data.kind {
			NodeKind::Text(text) => out.push_str(&html_escape(text)),
			NodeKind::Comment(comment) => {
				out.push_str("<!--");
				out.push_str(comment);
				out.push_str("-->");
			}
			NodeKind::Element { tag, attrs } => {
				out.push('<');
				out.push_str(tag);
				for (name, value) in attrs {
					out.push(' ');
					out.push_str(name);
					out.push_str("=\"");
					out.push_str(&html_escape_attr(value));
					out.push('"');
				}
				if is_void_element(tag) {
					out.push_str(" />");
					return;
				}
				out.push('>');
				for child in &data.children {
					child.write_html(out);
				}
				out.push_str("</");
				out.push_str(tag);
				out.push('>');
			}
		}
	}

	/// First descendant (depth-first, excluding `self`) matching `predicate`.
	pub fn find(&self, predicate: &dyn Fn(&Node) -> bool) -> Option<Node> {
		for child in self.children() {
			if predicate(&child) {
				return Some(child);
			}
			if let Some(found) = child.find(predicate) {
				return Some(found);
			}
		}
		None
	}

	/// All descendants (depth-first, excluding `self`) matching `predicate`.
	pub fn find_all(&self, predicate: &dyn Fn(&Node) -> bool) -> Vec<Node> {
		let mut found = Vec::new();
		self.collect_matching(predicate, &mut found);
		found
	}

	fn collect_matching(&self, predicate: &dyn Fn(&Node) -> bool, found: &mut Vec<Node>) {
		for child in self.children() {
			if predicate(&child) {
				found.push(child.clone());
			}
			child.collect_matching(predicate, found);
		}
	}

	/// First descendant element whose attribute `name` equals `value`.
	pub fn find_by_attr(&self, name: &str, value: &str) -> Option<Node> {
		self.find(&|node| node.attr(name).as_deref() == Some(value))
	}
}

impl PartialEq for Node {
	fn eq(&self, other: &Self) -> bool {
		self.ptr_eq(other)
	}
}

impl fmt::Debug for Node {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.outer_html())
	}
}
