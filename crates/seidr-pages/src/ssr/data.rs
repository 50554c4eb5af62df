//! Hydration data: the payload handed from the server render to the client.
//!
//! ```json
//! {
//!   "observables": { "0": 2 },
//!   "bindings": { "0": [{ "seidrId": 2, "prop": "textContent", "paths": [[0, 0]] }] },
//!   "graph": {
//!     "nodes": [{ "id": 0, "parents": [] }, { "id": 1, "parents": [0] }, { "id": 2, "parents": [1] }],
//!     "rootIds": [0]
//!   },
//!   "renderContextID": 17,
//!   "state": { "$0": 2, "theme": "dark" }
//! }
//! ```
//!
//! Map keys are numbers rendered as strings, as JSON requires.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::graph::{DependencyGraph, GraphError, Path, find_paths_to_roots, resolve_path};
use super::state::StateKey;

/// Global variable the inline script assigns the payload to.
pub const HYDRATION_GLOBAL: &str = "__SEIDR_HYDRATION__";

/// Id of the `<script>` element emitted by [`HydrationData::to_script_tag`].
pub const HYDRATION_SCRIPT_ID: &str = "seidr-hydration";

/// One reactive property of one element.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BindingRecord {
	/// Numeric id of the bound value.
	pub seidr_id: usize,
	/// Property name the value drives.
	pub prop: String,
	/// Paths from the bound value to each of its roots.
	pub paths: Vec<Path>,
}

/// Everything the client needs to restore one render.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HydrationData {
	/// Captured root values by numeric id.
	pub observables: BTreeMap<usize, serde_json::Value>,
	/// Binding records by element id.
	pub bindings: BTreeMap<u64, Vec<BindingRecord>>,
	/// Dependency graph of every registered value.
	pub graph: DependencyGraph,
	/// Id of the render context that produced this payload.
	#[serde(rename = "renderContextID", skip_serializing_if = "Option::is_none")]
	pub render_context_id: Option<u64>,
	/// Named state entries.
	#[serde(skip_serializing_if = "BTreeMap::is_empty")]
	pub state: BTreeMap<StateKey, serde_json::Value>,
}

/// A contract violation found by [`HydrationData::validate`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DataError {
	/// The graph itself is malformed.
	#[error("invalid dependency graph: {0}")]
	Graph(#[from] GraphError),

	/// An `observables` key names a node that is not a root.
	#[error("captured value {0} does not belong to a root node")]
	ObservableNotRoot(usize),

	/// A binding points at a missing node or carries an unusable path.
	#[error("binding `{prop}` on element {element_id} is invalid: {source}")]
	Binding {
		/// Element carrying the binding.
		element_id: u64,
		/// Bound property.
		prop: String,
		/// What was wrong.
		#[source]
		source: GraphError,
	},

	/// An observable state entry names a node that is not a root.
	#[error("state entry {0} does not belong to a root node")]
	StateNotRoot(StateKey),
}

impl HydrationData {
	/// Creates an empty payload.
	pub fn new() -> Self {
		Self::default()
	}

	/// Whether there is nothing to restore.
	pub fn is_empty(&self) -> bool {
		self.observables.is_empty()
			&& self.bindings.is_empty()
			&& self.graph.is_empty()
			&& self.state.is_empty()
	}

	/// Looks up a captured root value, falling back to its state entry.
	pub fn root_value(&self, id: usize) -> Option<&serde_json::Value> {
		self.observables
			.get(&id)
			.or_else(|| self.state.get(&StateKey::Observable(id)))
	}

	/// Looks up a plain state entry.
	pub fn plain_state(&self, name: &str) -> Option<&serde_json::Value> {
		self.state.get(&StateKey::Plain(name.to_string()))
	}

	/// Binding records of one element (empty when it has none).
	pub fn bindings_for(&self, element_id: u64) -> &[BindingRecord] {
		self.bindings
			.get(&element_id)
			.map(Vec::as_slice)
			.unwrap_or_default()
	}

	/// Serializes to a JSON string.
	pub fn to_json(&self) -> Result<String, serde_json::Error> {
		serde_json::to_string(self)
	}

	/// Serializes to pretty-printed JSON.
	pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
		serde_json::to_string_pretty(self)
	}

	/// Deserializes from a JSON string.
	pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
		serde_json::from_str(json)
	}

	/// Generates a `<script>` tag assigning the payload to
	/// `window.__SEIDR_HYDRATION__`.
	pub fn to_script_tag(&self) -> Result<String, serde_json::Error> {
		let json = self.to_json()?;
		Ok(format!(
			r#"<script id="{}">window.{} = {};</script>"#,
			HYDRATION_SCRIPT_ID,
			HYDRATION_GLOBAL,
			escape_json_for_script(&json)
		))
	}

	/// Checks that every numeric id and path refers to the graph.
	///
	/// Hydration tolerates violations binding by binding; this reports the
	/// first one up front.
	pub fn validate(&self) -> Result<(), DataError> {
		self.graph.validate()?;

		if let Some(&id) = self.observables.keys().find(|&&id| !self.graph.is_root(id)) {
			return Err(DataError::ObservableNotRoot(id));
		}

		for (&element_id, records) in &self.bindings {
			for record in records {
				let fail = |source| DataError::Binding {
					element_id,
					prop: record.prop.clone(),
					source,
				};
				self.graph.node(record.seidr_id).map_err(fail)?;
				for path in &record.paths {
					resolve_path(&self.graph, record.seidr_id, path).map_err(fail)?;
				}
			}
		}

		for key in self.state.keys() {
			if let StateKey::Observable(id) = key
				&& !self.graph.is_root(*id)
			{
				return Err(DataError::StateNotRoot(key.clone()));
			}
		}
		Ok(())
	}

	/// Recomputes the paths of one binding from the graph.
	pub fn expected_paths(&self, seidr_id: usize) -> Result<Vec<Path>, GraphError> {
		find_paths_to_roots(&self.graph, seidr_id)
	}
}

/// Escapes JSON content for safe embedding in HTML script tags.
///
/// Replaces `</` with `<\/`: JavaScript reads both the same inside string
/// literals, but HTML parsers no longer see a closing tag.
pub(crate) fn escape_json_for_script(json: &str) -> String {
	json.replace("</", "<\\/")
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::ssr::graph::GraphNode;
	use rstest::{fixture, rstest};
	use serde_json::json;

	/// a(0) <- b(1) <- c(2), c bound to element 0
	#[fixture]
	fn chain() -> HydrationData {
		let mut data = HydrationData::new();
		data.graph = DependencyGraph {
			nodes: vec![
				GraphNode {
					id: 0,
					parents: vec![],
				},
				GraphNode {
					id: 1,
					parents: vec![0],
				},
				GraphNode {
					id: 2,
					parents: vec![1],
				},
			],
			root_ids: vec![0],
		};
		data.observables.insert(0, json!(2));
		data.bindings.insert(
			0,
			vec![BindingRecord {
				seidr_id: 2,
				prop: "textContent".into(),
				paths: vec![vec![0, 0]],
			}],
		);
		data.render_context_id = Some(17);
		data
	}

	#[rstest]
	fn test_wire_format(chain: HydrationData) {
		let value: serde_json::Value = serde_json::from_str(&chain.to_json().unwrap()).unwrap();
		assert_eq!(
			value,
			json!({
				"observables": {"0": 2},
				"bindings": {"0": [{"seidrId": 2, "prop": "textContent", "paths": [[0, 0]]}]},
				"graph": {
					"nodes": [
						{"id": 0, "parents": []},
						{"id": 1, "parents": [0]},
						{"id": 2, "parents": [1]}
					],
					"rootIds": [0]
				},
				"renderContextID": 17
			})
		);
	}

	#[rstest]
	fn test_json_round_trip_preserves_state(mut chain: HydrationData) {
		chain.state.insert(StateKey::Observable(0), json!(2));
		chain.state.insert(StateKey::Plain("theme".into()), json!("dark"));

		let back = HydrationData::from_json(&chain.to_json().unwrap()).unwrap();
		assert_eq!(back, chain);
		assert_eq!(back.plain_state("theme"), Some(&json!("dark")));
	}

	#[rstest]
	fn test_missing_fields_default() {
		let data = HydrationData::from_json("{}").unwrap();
		assert!(data.is_empty());
		assert_eq!(data.render_context_id, None);
	}

	#[rstest]
	fn test_root_value_falls_back_to_state(mut chain: HydrationData) {
		chain.observables.clear();
		assert_eq!(chain.root_value(0), None);
		chain.state.insert(StateKey::Observable(0), json!(9));
		assert_eq!(chain.root_value(0), Some(&json!(9)));
	}

	#[rstest]
	fn test_script_tag_escapes_closing_tags() {
		let mut data = HydrationData::new();
		data.graph.nodes.push(GraphNode {
			id: 0,
			parents: vec![],
		});
		data.graph.root_ids.push(0);
		data.observables.insert(0, json!("</script><script>alert(1)</script>"));

		let tag = data.to_script_tag().unwrap();
		assert!(tag.starts_with(r#"<script id="seidr-hydration">window.__SEIDR_HYDRATION__ = "#));
		assert!(!tag.contains("</script><script>alert"));
		assert!(tag.contains("<\\/script>"));
		assert!(tag.ends_with("</script>"));
	}

	#[rstest]
	fn test_validate_accepts_consistent_payload(chain: HydrationData) {
		assert_eq!(chain.validate(), Ok(()));
		assert_eq!(chain.expected_paths(2).unwrap(), chain.bindings[&0][0].paths);
	}

	#[rstest]
	fn test_validate_rejects_derived_observable(mut chain: HydrationData) {
		chain.observables.insert(1, json!(4));
		assert_eq!(chain.validate(), Err(DataError::ObservableNotRoot(1)));
	}

	#[rstest]
	fn test_validate_rejects_bad_binding(mut chain: HydrationData) {
		chain.bindings.get_mut(&0).unwrap()[0].paths = vec![vec![0, 3]];
		assert!(matches!(
			chain.validate(),
			Err(DataError::Binding {
				element_id: 0,
				source: GraphError::ParentIndexOutOfRange { node: 1, index: 3, .. },
				..
			})
		));

		chain.bindings.get_mut(&0).unwrap()[0].seidr_id = 10;
		assert!(matches!(
			chain.validate(),
			Err(DataError::Binding {
				source: GraphError::NodeOutOfRange { id: 10, .. },
				..
			})
		));
	}

	#[rstest]
	fn test_validate_rejects_state_on_derived(mut chain: HydrationData) {
		chain.state.insert(StateKey::Observable(2), json!(8));
		assert_eq!(
			chain.validate(),
			Err(DataError::StateNotRoot(StateKey::Observable(2)))
		);
	}
}
