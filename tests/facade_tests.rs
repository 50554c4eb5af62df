//! Integration tests for the `seidr` facade
//!
//! Verifies that a full server render and client hydration can be written
//! against the facade's prelude alone.

use rstest::*;
use seidr::pages::dom::Node;
use seidr::prelude::*;
use serde_json::json;

struct Greeting {
	name: String,
}

impl Component for Greeting {
	fn render(&self) -> Page {
		let name = Signal::new(self.name.clone());
		let text = name.derive(|name| format!("Hello, {}!", name));
		PageElement::new("h1")
			.prop(TEXT_CONTENT_PROP, &text)
			.into_page()
	}

	fn name() -> &'static str {
		"Greeting"
	}
}

#[tokio::test]
async fn test_page_round_trip_through_facade() {
	let server = Greeting {
		name: "Ada".into(),
	};
	let output = render_to_string(&server).await.unwrap();
	let payload = output.hydration_data.to_json().unwrap();

	let container = Node::element("div");
	container.set_inner_html(&output.html);
	let handle = hydrate_from_json(
		&Greeting {
			name: String::new(),
		},
		&container,
		&payload,
	)
	.unwrap();

	assert!(handle.is_clean());
	assert_eq!(container.text_content(), "Hello, Ada!");
	assert_eq!(handle.value_json(0), Some(json!("Ada")));
}

#[rstest]
fn test_reactive_core_reexports() {
	let count = Signal::new(1);
	let doubled = count.derive(|n| n * 2);
	count.set(4);
	assert_eq!(doubled.get(), 8);
	assert!(seidr::reactive::NodeId::new() != count.id());
}
