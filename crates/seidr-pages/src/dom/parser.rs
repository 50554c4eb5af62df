//! Tolerant HTML fragment parser.
//!
//! Good enough to load server-rendered markup back into a [`Node`] tree:
//! elements, attributes (quoted, unquoted or bare), void elements,
//! comments, text with the common character references, and raw text in
//! `<script>` / `<style>`. Malformed input never fails: stray closing tags
//! are dropped and unclosed elements are closed at the end of input.

use super::node::{Node, is_void_element};

/// Parses `html` into a list of top-level nodes.
pub fn parse_fragment(html: &str) -> Vec<Node> {
	let mut parser = Parser {
		input: html,
		pos: 0,
		roots: Vec::new(),
		stack: Vec::new(),
	};
	parser.run();
	parser.roots
}

struct Parser<'a> {
	input: &'a str,
	pos: usize,
	roots: Vec<Node>,
	stack: Vec<(String, Node)>,
}

impl<'a> Parser<'a> {
	fn rest(&self) -> &'a str {
		&self.input[self.pos..]
	}

	fn attach(&mut self, node: Node) {
		match self.stack.last() {
			Some((_, parent)) => parent.append_child(&node),
			None => self.roots.push(node),
		}
	}

	fn run(&mut self) {
		while self.pos < self.input.len() {
			let rest = self.rest();
			if let Some(after) = rest.strip_prefix("<!--") {
				let (data, consumed) = match after.find("-->") {
					Some(end) => (&after[..end], 4 + end + 3),
					None => (after, rest.len()),
				};
				self.pos += consumed;
				self.attach(Node::comment(data));
			} else if rest.starts_with("</") {
				self.close_tag();
			} else if starts_open_tag(rest) {
				self.open_tag();
			} else if rest.starts_with("<!") {
				// Doctype or other declaration.
				let end = rest.find('>').map_or(rest.len(), |i| i + 1);
				self.pos += end;
			} else {
				// Text up to the next '<' that starts markup (a lone '<' is text).
				let end = rest
					.char_indices()
					.skip(1)
					.find(|&(i, c)| c == '<' && starts_markup(&rest[i..]))
					.map_or(rest.len(), |(i, _)| i);
				let text = decode_entities(&rest[..end]);
				self.pos += end;
				self.attach(Node::text(text));
			}
		}
	}

	fn close_tag(&mut self) {
		let rest = self.rest();
		let end = rest.find('>').map_or(rest.len(), |i| i + 1);
		let name = rest[2..end]
			.trim_end_matches('>')
			.trim()
			.to_ascii_lowercase();
		self.pos += end;

		if let Some(index) = self.stack.iter().rposition(|(tag, _)| *tag == name) {
			self.stack.truncate(index);
		}
	}

	fn open_tag(&mut self) {
		let rest = self.rest();
		let name_len = rest[1..]
			.find(|c: char| c.is_ascii_whitespace() || c == '>' || c == '/')
			.unwrap_or(rest.len() - 1);
		let tag = rest[1..1 + name_len].to_ascii_lowercase();
		self.pos += 1 + name_len;

		let element = Node::element(tag.clone());
		let self_closing = self.parse_attributes(&element);
		self.attach(element.clone());

		if self_closing || is_void_element(&tag) {
			return;
		}
		if matches!(tag.as_str(), "script" | "style") {
			let rest = self.rest();
			let closing = format!("</{}", tag);
			let end = rest.to_ascii_lowercase().find(&closing).unwrap_or(rest.len());
			if end > 0 {
				element.append_child(&Node::text(&rest[..end]));
			}
			self.pos += end;
			self.close_tag_if_present();
			return;
		}
		self.stack.push((tag, element));
	}

	fn close_tag_if_present(&mut self) {
		if self.rest().starts_with("</") {
			let rest = self.rest();
			let end = rest.find('>').map_or(rest.len(), |i| i + 1);
			self.pos += end;
		}
	}

	/// Parses attributes up to and including `>`. Returns whether the tag
	/// ended with `/>`.
	fn parse_attributes(&mut self, element: &Node) -> bool {
		loop {
			let rest = self.rest();
			let trimmed = rest.trim_start();
			self.pos += rest.len() - trimmed.len();

			if trimmed.is_empty() {
				return false;
			}
			if trimmed.starts_with("/>") {
				self.pos += 2;
				return true;
			}
			if trimmed.starts_with('>') {
				self.pos += 1;
				return false;
			}
			if trimmed.starts_with('/') {
				self.pos += 1;
				continue;
			}

			let name_len = trimmed
				.find(|c: char| c.is_ascii_whitespace() || c == '=' || c == '>' || c == '/')
				.unwrap_or(trimmed.len());
			let name = trimmed[..name_len].to_ascii_lowercase();
			self.pos += name_len;

			let rest = self.rest();
			let after_name = rest.trim_start();
			if let Some(value_part) = after_name.strip_prefix('=') {
				self.pos += rest.len() - after_name.len() + 1;
				let value_rest = value_part.trim_start();
				self.pos += value_part.len() - value_rest.len();
				let value = self.attribute_value(value_rest);
				element.set_attr(&name, decode_entities(&value));
			} else {
				element.set_attr(&name, "");
			}
		}
	}

	fn attribute_value(&mut self, rest: &str) -> String {
		if let Some(quote) = rest.chars().next().filter(|c| *c == '"' || *c == '\'') {
			let body = &rest[1..];
			let end = body.find(quote).unwrap_or(body.len());
			let consumed = 1 + end + usize::from(end < body.len());
			self.pos += consumed;
			body[..end].to_string()
		} else {
			let end = rest
				.find(|c: char| c.is_ascii_whitespace() || c == '>')
				.unwrap_or(rest.len());
			self.pos += end;
			rest[..end].to_string()
		}
	}
}

fn starts_open_tag(rest: &str) -> bool {
	rest.strip_prefix('<')
		.is_some_and(|after| after.starts_with(|c: char| c.is_ascii_alphabetic()))
}

/// Whether `rest` begins with something the parser does not treat as text.
fn starts_markup(rest: &str) -> bool {
	rest.starts_with("</") || rest.starts_with("<!") || starts_open_tag(rest)
}

/// Decodes the character references emitted by the renderer plus numeric ones.
pub(crate) fn decode_entities(text: &str) -> String {
	if !text.contains('&') {
		return text.to_string();
	}

	let mut out = String::with_capacity(text.len());
	let mut rest = text;
	while let Some(amp) = rest.find('&') {
		out.push_str(&rest[..amp]);
		rest = &rest[amp..];
		let Some(semi) = rest.find(';').filter(|&i| i <= 12) else {
			out.push('&');
			rest = &rest[1..];
			continue;
		};
		let entity = &rest[1..semi];
		let decoded = match entity {
			"amp" => Some('&'),
			"lt" => Some('<'),
			"gt" => Some('>'),
			"quot" => Some('"'),
			"apos" => Some('\''),
			"nbsp" => Some('\u{a0}'),
			_ => entity
				.strip_prefix("#x")
				.or_else(|| entity.strip_prefix("#X"))
				.and_then(|hex| u32::from_str_radix(hex, 16).ok())
				.or_else(|| entity.strip_prefix('#').and_then(|dec| dec.parse().ok()))
				.and_then(char::from_u32),
		};
		match decoded {
			Some(c) => {
				out.push(c);
				rest = &rest[semi + 1..];
			}
			None => {
				out.push('&');
				rest = &rest[1..];
			}
		}
	}
	out.push_str(rest);
	out
}
