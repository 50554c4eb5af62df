//! SSR renderer for component-based server-side rendering.
//!
//! A render runs in three steps inside its own render context:
//!
//! 1. the component is constructed with a capture scope active, so every
//!    reactive value and property binding is recorded
//! 2. queued server-only work is awaited until none is left
//! 3. the page is rendered to HTML and the scope is captured into
//!    [`HydrationData`]
//!
//! Server-only work runs while the scope is inactive, so values it creates
//! never take up numeric ids the client could not reproduce.

use serde::Deserialize;

use super::data::HydrationData;
use super::markers::wrap_root;
use super::registry::push_scope;
use super::scope::{CaptureError, CaptureMode, SsrScope};
use crate::component::Component;
use crate::context::{ContextError, current_context, run_with_context};
use crate::registration;

use std::rc::Rc;

/// Options for SSR rendering.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct SsrOptions {
	/// Whether to include element ids and boundary comments.
	pub include_hydration_markers: bool,
	/// Whether to minify the output.
	pub minify: bool,
	/// Whether `render_page` embeds the hydration data script.
	pub include_state_script: bool,
	/// Language attribute for the HTML element.
	pub lang: String,
	/// Which roots the capture keeps.
	pub capture_mode: CaptureMode,
}

impl Default for SsrOptions {
	fn default() -> Self {
		Self {
			include_hydration_markers: true,
			minify: false,
			include_state_script: true,
			lang: "en".to_string(),
			capture_mode: CaptureMode::Auto,
		}
	}
}

impl SsrOptions {
	/// Creates new default options.
	pub fn new() -> Self {
		Self::default()
	}

	/// Sets the language.
	pub fn lang(mut self, lang: impl Into<String>) -> Self {
		self.lang = lang.into();
		self
	}

	/// Disables hydration markers.
	pub fn no_hydration(mut self) -> Self {
		self.include_hydration_markers = false;
		self
	}

	/// Leaves the hydration data script out of full pages.
	pub fn no_state_script(mut self) -> Self {
		self.include_state_script = false;
		self
	}

	/// Enables minification.
	pub fn minify(mut self) -> Self {
		self.minify = true;
		self
	}

	/// Sets the capture mode.
	///
	/// # Example
	///
	/// ```ignore
	/// let options = SsrOptions::new().capture_mode(CaptureMode::Full);
	/// ```
	pub fn capture_mode(mut self, mode: CaptureMode) -> Self {
		self.capture_mode = mode;
		self
	}
}

/// Errors that fail a server render.
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
	/// Context misuse or a failed pending task.
	#[error(transparent)]
	Context(#[from] ContextError),

	/// The capture could not produce hydration data.
	#[error(transparent)]
	Capture(#[from] CaptureError),

	/// Hydration data could not be encoded.
	#[error("failed to encode hydration data: {0}")]
	Encode(#[from] serde_json::Error),
}

/// Result of rendering one component.
#[derive(Debug, Clone)]
pub struct RenderOutput {
	/// Rendered markup for the component.
	pub html: String,
	/// Data the client needs to hydrate that markup.
	pub hydration_data: HydrationData,
}

/// The main SSR renderer.
#[derive(Debug, Clone, Default)]
pub struct SsrRenderer {
	options: SsrOptions,
}

impl SsrRenderer {
	/// Creates a new renderer with default options.
	pub fn new() -> Self {
		Self::default()
	}

	/// Creates a new renderer with custom options.
	pub fn with_options(options: SsrOptions) -> Self {
		Self { options }
	}

	/// Returns the options.
	pub fn options(&self) -> &SsrOptions {
		&self.options
	}

	/// Renders a component to markup plus hydration data.
	///
	/// Establishes its own render context; concurrent calls are isolated
	/// from each other.
	///
	/// # Errors
	///
	/// Fails when a pending server task fails or when the capture cannot
	/// produce hydration data. There is no partial output on error.
	pub async fn render<C: Component>(&self, component: &C) -> Result<RenderOutput, RenderError> {
		registration::ensure_installed();
		run_with_context(self.render_in_context(component)).await
	}

	async fn render_in_context<C: Component>(
		&self,
		component: &C,
	) -> Result<RenderOutput, RenderError> {
		let context = current_context()?;
		let scope = Rc::new(SsrScope::with_mode(self.options.capture_mode));
		crate::debug_log!("render {}: context {}", C::name(), context.id());

		let page = {
			let _active = push_scope(context.id(), scope.clone());
			component.render()
		};

		context.drain_pending().await?;

		let markers = self.options.include_hydration_markers;
		let body = {
			let _active = push_scope(context.id(), scope.clone());
			page.render_html(markers)
		};
		let html = if markers {
			wrap_root(C::name(), &body)
		} else {
			body
		};

		let mut hydration_data = scope.capture_hydration_data()?;
		hydration_data.render_context_id = Some(context.id());
		crate::debug_log!(
			"render {}: captured {} root(s), {} bound element(s)",
			C::name(),
			hydration_data.observables.len(),
			hydration_data.bindings.len()
		);

		Ok(RenderOutput {
			html,
			hydration_data,
		})
	}

	/// Renders a component into a complete HTML document.
	///
	/// The hydration data is embedded as an inline script when
	/// `include_state_script` is set.
	pub async fn render_page<C: Component>(&self, component: &C) -> Result<String, RenderError> {
		let output = self.render(component).await?;
		self.wrap_in_html(&output.html, &output.hydration_data)
	}

	/// Wraps rendered content in a complete HTML document.
	pub fn wrap_in_html(&self, content: &str, data: &HydrationData) -> Result<String, RenderError> {
		let mut html = String::with_capacity(content.len() + 1024);

		html.push_str("<!DOCTYPE html>\n");
		html.push_str(&format!(
			"<html lang=\"{}\">\n",
			super::markers::html_escape_attr(&self.options.lang)
		));

		html.push_str("<head>\n");
		html.push_str("<meta charset=\"UTF-8\">\n");
		html.push_str(
			"<meta name=\"viewport\" content=\"width=device-width, initial-scale=1.0\">\n",
		);
		html.push_str("</head>\n");

		html.push_str("<body>\n");
		html.push_str("<div id=\"app\">");
		html.push_str(content);
		html.push_str("</div>\n");

		if self.options.include_state_script && !data.is_empty() {
			html.push_str(&data.to_script_tag()?);
			html.push('\n');
		}

		html.push_str("</body>\n");
		html.push_str("</html>");

		if self.options.minify {
			Ok(minify_html(&html))
		} else {
			Ok(html)
		}
	}
}

/// Renders a component with default options.
///
/// Equivalent to `SsrRenderer::new().render(component)`.
pub async fn render_to_string<C: Component>(component: &C) -> Result<RenderOutput, RenderError> {
	SsrRenderer::new().render(component).await
}

/// Maximum input size for HTML minification (1 MiB).
///
/// Larger inputs are returned unmodified.
const MINIFY_HTML_MAX_INPUT_SIZE: usize = 1024 * 1024;

/// Collapses runs of whitespace outside `<pre>` blocks.
fn minify_html(html: &str) -> String {
	if html.len() > MINIFY_HTML_MAX_INPUT_SIZE {
		return html.to_string();
	}

	let mut result = String::with_capacity(html.len());
	let mut prev_was_whitespace = false;
	let mut in_pre = false;
	let mut chars = html.char_indices();

	while let Some((byte_pos, c)) = chars.next() {
		let remaining = &html[byte_pos..];

		if !in_pre
			&& c == '<'
			&& remaining.strip_prefix("<pre").is_some_and(|after| {
				after.starts_with(|ch: char| ch == '>' || ch.is_ascii_whitespace())
					|| after.is_empty()
			}) {
			in_pre = true;
		}

		if in_pre && remaining.starts_with("</pre>") {
			result.push_str("</pre>");
			chars.nth(4);
			in_pre = false;
			prev_was_whitespace = false;
			continue;
		}

		if in_pre {
			result.push(c);
		} else if c.is_whitespace() {
			if !prev_was_whitespace {
				result.push(' ');
				prev_was_whitespace = true;
			}
		} else {
			result.push(c);
			prev_was_whitespace = false;
		}
	}

	result
}
