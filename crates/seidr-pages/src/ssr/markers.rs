//! Hydration markers for SSR.
//!
//! These markers are embedded in the SSR-rendered HTML so the client can
//! find what it has to replace:
//!
//! - `data-seidr-id="N"` on every element with a reactive property; `N` is
//!   the element id bindings are keyed by
//! - `<!--seidr-start:NAME-->` / `<!--seidr-end:NAME-->` around the output
//!   of the root component `NAME`
//! - `<!--seidr-dyn-->` / `<!--/seidr-dyn-->` around each reactive region

/// The attribute name for element ids.
pub const SEIDR_ID_ATTR: &str = "data-seidr-id";

const ROOT_START_PREFIX: &str = "seidr-start:";
const ROOT_END_PREFIX: &str = "seidr-end:";
const DYN_START: &str = "seidr-dyn";
const DYN_END: &str = "/seidr-dyn";

/// A structural marker recognized in comment data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Marker {
	/// Start of a root component's output.
	RootStart(String),
	/// End of a root component's output.
	RootEnd(String),
	/// Start of a reactive region.
	DynStart,
	/// End of a reactive region.
	DynEnd,
}

impl Marker {
	/// Parses the text of an HTML comment (without `<!--` / `-->`).
	pub fn parse(comment: &str) -> Option<Self> {
		let comment = comment.trim();
		if let Some(name) = comment.strip_prefix(ROOT_START_PREFIX) {
			Some(Marker::RootStart(name.to_string()))
		} else if let Some(name) = comment.strip_prefix(ROOT_END_PREFIX) {
			Some(Marker::RootEnd(name.to_string()))
		} else if comment == DYN_START {
			Some(Marker::DynStart)
		} else if comment == DYN_END {
			Some(Marker::DynEnd)
		} else {
			None
		}
	}

	/// The comment text of this marker.
	pub fn comment_data(&self) -> String {
		match self {
			Marker::RootStart(name) => format!("{}{}", ROOT_START_PREFIX, name),
			Marker::RootEnd(name) => format!("{}{}", ROOT_END_PREFIX, name),
			Marker::DynStart => DYN_START.to_string(),
			Marker::DynEnd => DYN_END.to_string(),
		}
	}

	/// The full HTML comment.
	pub fn to_html(&self) -> String {
		format!("<!--{}-->", self.comment_data())
	}
}

/// Generates a root boundary start comment.
pub fn root_start(name: &str) -> String {
	Marker::RootStart(name.to_string()).to_html()
}

/// Generates a root boundary end comment.
pub fn root_end(name: &str) -> String {
	Marker::RootEnd(name.to_string()).to_html()
}

/// Wraps rendered component output in root boundary comments.
pub fn wrap_root(name: &str, body: &str) -> String {
	format!("{}{}{}", root_start(name), body, root_end(name))
}

/// Escapes a string for use in an HTML attribute value.
pub(crate) fn html_escape_attr(s: &str) -> String {
	s.replace('&', "&amp;")
		.replace('"', "&quot;")
		.replace('<', "&lt;")
		.replace('>', "&gt;")
}

/// Escapes text content.
pub(crate) fn html_escape(s: &str) -> String {
	s.replace('&', "&amp;")
		.replace('<', "&lt;")
		.replace('>', "&gt;")
		.replace('"', "&quot;")
		.replace('\'', "&#x27;")
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;

	#[rstest]
	#[case("seidr-start:Counter", Some(Marker::RootStart("Counter".into())))]
	#[case(" seidr-end:Counter ", Some(Marker::RootEnd("Counter".into())))]
	#[case("seidr-dyn", Some(Marker::DynStart))]
	#[case("/seidr-dyn", Some(Marker::DynEnd))]
	#[case("just a comment", None)]
	fn test_parse_marker(#[case] data: &str, #[case] expected: Option<Marker>) {
		assert_eq!(Marker::parse(data), expected);
	}

	#[rstest]
	fn test_root_boundaries() {
		assert_eq!(root_start("App"), "<!--seidr-start:App-->");
		assert_eq!(root_end("App"), "<!--seidr-end:App-->");
		assert_eq!(
			wrap_root("App", "<p>hi</p>"),
			"<!--seidr-start:App--><p>hi</p><!--seidr-end:App-->"
		);
		assert_eq!(Marker::DynEnd.to_html(), "<!--/seidr-dyn-->");
	}

	#[rstest]
	fn test_html_escape_attr() {
		assert_eq!(html_escape_attr("hello"), "hello");
		assert_eq!(html_escape_attr("a&b"), "a&amp;b");
		assert_eq!(html_escape_attr("a\"b"), "a&quot;b");
		assert_eq!(html_escape_attr("<script>"), "&lt;script&gt;");
	}

	#[rstest]
	fn test_html_escape() {
		assert_eq!(html_escape("<b>'x'</b>"), "&lt;b&gt;&#x27;x&#x27;&lt;/b&gt;");
	}
}
