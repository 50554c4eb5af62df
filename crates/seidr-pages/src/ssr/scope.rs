//! Capture scope
//!
//! An [`SsrScope`] accumulates, for one render pass, every reactive value
//! created or touched while it is active, the parent lists of derived
//! values, and the element properties bound to reactive values. At the end
//! of the pass [`SsrScope::capture_hydration_data`] turns that into a
//! [`HydrationData`] payload and releases everything it held.
//!
//! ## Registration order
//!
//! The first registration of a value fixes its numeric id. The client
//! replays construction with the same rules, so the order must only depend
//! on the order of construction and first touch:
//!
//! 1. `register` on construction
//! 2. `register_derived` right after, which also registers any parent not
//!    seen before (a parent created outside this scope lands *after* its
//!    child)
//! 3. `register_binding` registers the bound value if it is still unknown
//! 4. `register_region` does the same for each dependency of a reactive
//!    region
//!
//! ## Capture modes
//!
//! | Mode | Roots captured |
//! |------|----------------|
//! | `Full` | every root |
//! | `Pruned` | roots that are ancestors of a bound value or region dependency |
//! | `Auto` | `Pruned` when bindings or regions exist, `Full` otherwise |

use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, HashMap};
use std::rc::Rc;

use indexmap::{IndexMap, IndexSet};
use seidr_core::reactive::{NodeId, Observable, ReactiveError};
use serde::{Deserialize, Serialize};

use super::data::{BindingRecord, HydrationData};
use super::graph::{self, GraphError, build_graph, find_paths_to_roots};
use super::state::StateKey;

/// Which root values a capture includes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CaptureMode {
	/// `Pruned` if any binding or region was recorded, otherwise `Full`.
	#[default]
	Auto,
	/// Capture every root value.
	Full,
	/// Capture only roots reachable from a bound value or region dependency.
	Pruned,
}

impl CaptureMode {
	/// Resolves `Auto` against the number of recorded pruning seeds
	/// (bindings plus region dependencies).
	pub fn resolve(self, seed_count: usize) -> CaptureMode {
		match self {
			CaptureMode::Auto if seed_count == 0 => CaptureMode::Full,
			CaptureMode::Auto => CaptureMode::Pruned,
			other => other,
		}
	}
}

/// Errors raised while capturing hydration data.
#[derive(Debug, thiserror::Error)]
pub enum CaptureError {
	/// A captured value could not be converted to JSON.
	#[error("failed to capture reactive value: {0}")]
	Serialization(#[from] ReactiveError),

	/// The recorded parent links do not form a usable graph.
	#[error("failed to build dependency graph: {0}")]
	Graph(#[from] GraphError),

	/// A plain state name collides with the observable key form.
	#[error("state key `{0}` is reserved for observable entries")]
	ReservedStateKey(String),

	/// A plain state value could not be converted to JSON.
	#[error("failed to serialize state entry `{name}`: {source}")]
	StateSerialize {
		/// Name of the entry.
		name: String,
		/// Underlying serde error.
		#[source]
		source: serde_json::Error,
	},

	/// State was provided outside of a server render.
	#[error("no capture scope is active in the current render context")]
	NoActiveScope,
}

/// Bound value (by registration position), element and property.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct Binding {
	value: usize,
	element_id: u64,
	prop: String,
}

#[derive(Default)]
struct ScopeState {
	observables: IndexMap<NodeId, Rc<dyn Observable>>,
	parents: HashMap<NodeId, Vec<NodeId>>,
	bindings: IndexSet<Binding>,
	region_deps: IndexSet<usize>,
	element_ids: IndexSet<u64>,
	plain_state: IndexMap<StateKey, serde_json::Value>,
	signal_state: Vec<(String, usize)>,
}

/// Per-render accumulator of registrations.
///
/// Dropping a scope releases any values it still holds.
#[derive(Default)]
pub struct SsrScope {
	inner: RefCell<ScopeState>,
	mode: Cell<CaptureMode>,
}

impl SsrScope {
	/// Creates an empty scope in [`CaptureMode::Auto`].
	pub fn new() -> Self {
		Self::default()
	}

	/// Creates an empty scope with an explicit capture mode.
	pub fn with_mode(mode: CaptureMode) -> Self {
		let scope = Self::default();
		scope.mode.set(mode);
		scope
	}

	/// The configured capture mode.
	pub fn mode(&self) -> CaptureMode {
		self.mode.get()
	}

	/// Changes the capture mode.
	pub fn set_mode(&self, mode: CaptureMode) {
		self.mode.set(mode);
	}

	/// Adds a value and returns its registration position.
	///
	/// Later calls for the same id return the original position.
	pub fn register(&self, node: &Rc<dyn Observable>) -> usize {
		let mut state = self.inner.borrow_mut();
		let entry = state.observables.entry(node.id());
		let position = entry.index();
		entry.or_insert_with(|| {
			crate::debug_log!("scope: registered {} as #{}", node.id(), position);
			node.clone()
		});
		position
	}

	/// Records the ordered parent list of a derived value.
	///
	/// Parents not yet registered are registered here, after the derived
	/// value itself. Only the first call for a given value is kept.
	pub fn register_derived(&self, node: &Rc<dyn Observable>, parents: &[Rc<dyn Observable>]) {
		for parent in parents {
			self.register(parent);
		}
		let mut state = self.inner.borrow_mut();
		state
			.parents
			.entry(node.id())
			.or_insert_with(|| parents.iter().map(|parent| parent.id()).collect());
	}

	/// Records that `prop` of element `element_id` is driven by `node`.
	///
	/// Repeating the same (value, element, property) triple has no effect.
	pub fn register_binding(&self, node: &Rc<dyn Observable>, element_id: u64, prop: &str) {
		let value = self.register(node);
		let mut state = self.inner.borrow_mut();
		state.element_ids.insert(element_id);
		state.bindings.insert(Binding {
			value,
			element_id,
			prop: prop.to_string(),
		});
	}

	/// Records the dependencies of a reactive region.
	///
	/// Region content is rebuilt from these values on the client, so their
	/// roots are kept by pruned capture like those of bound values.
	pub fn register_region(&self, deps: &[Rc<dyn Observable>]) {
		for dep in deps {
			let position = self.register(dep);
			self.inner.borrow_mut().region_deps.insert(position);
		}
	}

	pub(crate) fn record_plain_state(&self, key: StateKey, value: serde_json::Value) {
		self.inner.borrow_mut().plain_state.insert(key, value);
	}

	pub(crate) fn record_signal_state(&self, name: &str, node: &Rc<dyn Observable>) {
		let position = self.register(node);
		self.inner
			.borrow_mut()
			.signal_state
			.push((name.to_string(), position));
	}

	/// Number of registered values.
	pub fn observable_count(&self) -> usize {
		self.inner.borrow().observables.len()
	}

	/// Number of distinct bindings.
	pub fn binding_count(&self) -> usize {
		self.inner.borrow().bindings.len()
	}

	/// Number of distinct region dependencies.
	pub fn region_dependency_count(&self) -> usize {
		self.inner.borrow().region_deps.len()
	}

	/// Bound element ids in first-seen order.
	pub fn element_ids(&self) -> Vec<u64> {
		self.inner.borrow().element_ids.iter().copied().collect()
	}

	/// Whether nothing has been registered.
	pub fn is_empty(&self) -> bool {
		let state = self.inner.borrow();
		state.observables.is_empty() && state.plain_state.is_empty()
	}

	/// Releases every registered value and forgets all records.
	pub fn clear(&self) {
		let state = std::mem::take(&mut *self.inner.borrow_mut());
		for node in state.observables.values() {
			node.destroy();
		}
	}

	/// Builds the hydration payload and clears the scope.
	///
	/// Registered values are destroyed whether or not the capture succeeds.
	///
	/// # Errors
	///
	/// - [`CaptureError::Serialization`] when a captured root has no JSON form
	/// - [`CaptureError::Graph`] when the recorded links are inconsistent
	pub fn capture_hydration_data(&self) -> Result<HydrationData, CaptureError> {
		let state = std::mem::take(&mut *self.inner.borrow_mut());
		let mode = self
			.mode
			.get()
			.resolve(state.bindings.len() + state.region_deps.len());
		let result = capture(&state, mode);
		for node in state.observables.values() {
			node.destroy();
		}
		result
	}
}

impl Drop for SsrScope {
	fn drop(&mut self) {
		self.clear();
	}
}

impl std::fmt::Debug for SsrScope {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		let state = self.inner.borrow();
		f.debug_struct("SsrScope")
			.field("mode", &self.mode.get())
			.field("observables", &state.observables.len())
			.field("bindings", &state.bindings.len())
			.field("regions", &state.region_deps.len())
			.field("state", &(state.plain_state.len() + state.signal_state.len()))
			.finish()
	}
}

fn capture(state: &ScopeState, mode: CaptureMode) -> Result<HydrationData, CaptureError> {
	let graph = build_graph(state.observables.keys().copied(), &state.parents)?;
	let value_at = |id: usize| -> Result<serde_json::Value, CaptureError> {
		let (_, node) = state
			.observables
			.get_index(id)
			.ok_or(GraphError::NodeOutOfRange {
				id,
				len: state.observables.len(),
			})?;
		Ok(node.to_json()?)
	};

	let captured_roots: Vec<usize> = match mode {
		CaptureMode::Pruned => {
			let seeds = state
				.bindings
				.iter()
				.map(|binding| binding.value)
				.chain(state.region_deps.iter().copied());
			graph::ancestors(&graph, seeds)?
				.into_iter()
				.filter(|&id| graph.is_root(id))
				.collect()
		}
		CaptureMode::Full | CaptureMode::Auto => graph.root_ids.clone(),
	};

	let mut observables = BTreeMap::new();
	for id in captured_roots {
		// A derived value with no parents is constant; nothing to restore.
		if state.observables[id].is_derived() {
			continue;
		}
		observables.insert(id, value_at(id)?);
	}

	let mut bindings: BTreeMap<u64, Vec<BindingRecord>> = BTreeMap::new();
	for binding in &state.bindings {
		bindings
			.entry(binding.element_id)
			.or_default()
			.push(BindingRecord {
				seidr_id: binding.value,
				prop: binding.prop.clone(),
				paths: find_paths_to_roots(&graph, binding.value)?,
			});
	}

	let mut entries: BTreeMap<StateKey, serde_json::Value> = state
		.plain_state
		.iter()
		.map(|(key, value)| (key.clone(), value.clone()))
		.collect();
	for (_name, id) in &state.signal_state {
		crate::debug_log!("scope: state signal `{}` captured as ${}", _name, id);
		entries.insert(StateKey::Observable(*id), value_at(*id)?);
	}

	Ok(HydrationData {
		observables,
		bindings,
		graph,
		render_context_id: None,
		state: entries,
	})
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;
	use seidr_core::reactive::Signal;
	use serde_json::json;

	fn register_tree(scope: &SsrScope, values: &[Rc<dyn Observable>]) {
		for value in values {
			scope.register(value);
			if value.is_derived() {
				// Parents in this helper are always registered already.
				let parents: Vec<Rc<dyn Observable>> = value
					.parent_ids()
					.iter()
					.map(|id| {
						values
							.iter()
							.find(|candidate| candidate.id() == *id)
							.unwrap()
							.clone()
					})
					.collect();
				scope.register_derived(value, &parents);
			}
		}
	}

	#[rstest]
	fn test_register_is_idempotent() {
		let scope = SsrScope::new();
		let a = Signal::new(1);
		scope.register(&a.handle());
		scope.register(&a.handle());
		assert_eq!(scope.observable_count(), 1);
	}

	#[rstest]
	fn test_full_capture_without_bindings() {
		let scope = SsrScope::new();
		let a = Signal::new(1);
		let b = Signal::new("x".to_string());
		let c = a.derive(|x| x + 1);
		register_tree(&scope, &[a.handle(), b.handle(), c.handle()]);

		let data = scope.capture_hydration_data().unwrap();

		assert_eq!(data.observables.len(), 2);
		assert_eq!(data.observables[&0], json!(1));
		assert_eq!(data.observables[&1], json!("x"));
		assert!(data.bindings.is_empty());
		assert_eq!(data.graph.root_ids, vec![0, 1]);
	}

	#[rstest]
	fn test_pruned_capture_keeps_only_bound_ancestors() {
		let scope = SsrScope::new();
		let a = Signal::new(2);
		let unrelated = Signal::new(99);
		let c = a.derive(|x| x * 2);
		register_tree(&scope, &[a.handle(), unrelated.handle(), c.handle()]);
		scope.register_binding(&c.handle(), 0, "textContent");

		let data = scope.capture_hydration_data().unwrap();

		assert_eq!(data.observables.keys().copied().collect::<Vec<_>>(), vec![0]);
		assert_eq!(
			data.bindings[&0],
			vec![BindingRecord {
				seidr_id: 2,
				prop: "textContent".into(),
				paths: vec![vec![0]],
			}]
		);
	}

	#[rstest]
	#[case::auto(CaptureMode::Auto, vec![0])]
	#[case::full(CaptureMode::Full, vec![0, 1])]
	#[case::pruned(CaptureMode::Pruned, vec![0])]
	fn test_capture_modes_with_binding(#[case] mode: CaptureMode, #[case] expected: Vec<usize>) {
		let scope = SsrScope::with_mode(mode);
		let bound = Signal::new(1);
		let free = Signal::new(2);
		register_tree(&scope, &[bound.handle(), free.handle()]);
		scope.register_binding(&bound.handle(), 0, "value");

		let data = scope.capture_hydration_data().unwrap();
		assert_eq!(data.observables.keys().copied().collect::<Vec<_>>(), expected);
	}

	#[rstest]
	fn test_pruned_mode_without_bindings_captures_nothing() {
		let scope = SsrScope::with_mode(CaptureMode::Pruned);
		let a = Signal::new(1);
		scope.register(&a.handle());

		let data = scope.capture_hydration_data().unwrap();
		assert!(data.observables.is_empty());
		assert_eq!(data.graph.len(), 1);
	}

	#[rstest]
	fn test_duplicate_binding_recorded_once() {
		let scope = SsrScope::new();
		let a = Signal::new(1);
		scope.register_binding(&a.handle(), 3, "value");
		scope.register_binding(&a.handle(), 3, "value");
		scope.register_binding(&a.handle(), 3, "title");

		assert_eq!(scope.binding_count(), 2);
		assert_eq!(scope.element_ids(), vec![3]);
		let data = scope.capture_hydration_data().unwrap();
		assert_eq!(data.bindings[&3].len(), 2);
	}

	#[rstest]
	fn test_register_derived_adds_unseen_parents_after_child() {
		let scope = SsrScope::new();
		let a = Signal::new(4);
		let b = a.derive(|x| x + 1);
		scope.register(&b.handle());
		scope.register_derived(&b.handle(), &[a.handle()]);
		scope.register_binding(&b.handle(), 0, "value");

		let data = scope.capture_hydration_data().unwrap();
		assert_eq!(data.graph.nodes[0].parents, vec![1]);
		assert_eq!(data.observables[&1], json!(4));
		assert_eq!(data.bindings[&0][0].paths, vec![vec![0]]);
	}

	#[rstest]
	fn test_capture_destroys_and_clears() {
		let scope = SsrScope::new();
		let a = Signal::new(1);
		let b = a.derive(|x| x * 3);
		register_tree(&scope, &[a.handle(), b.handle()]);
		assert_eq!(a.observer_count(), 1);

		scope.capture_hydration_data().unwrap();

		assert_eq!(scope.observable_count(), 0);
		assert_eq!(scope.binding_count(), 0);
		assert_eq!(a.observer_count(), 0);
	}

	#[rstest]
	fn test_opaque_root_fails_capture_and_still_clears() {
		let scope = SsrScope::new();
		let handle = Signal::opaque(Rc::new(()));
		scope.register(&handle.handle());

		let err = scope.capture_hydration_data().unwrap_err();
		assert!(matches!(
			err,
			CaptureError::Serialization(ReactiveError::NotSerializable(_))
		));
		assert_eq!(scope.observable_count(), 0);
	}

	#[rstest]
	fn test_non_string_map_keys_fail_capture() {
		let scope = SsrScope::new();
		let mut map = std::collections::HashMap::new();
		map.insert(vec![1u8], 1);
		let value = Signal::new(map);
		scope.register(&value.handle());

		let err = scope.capture_hydration_data().unwrap_err();
		assert!(matches!(
			err,
			CaptureError::Serialization(ReactiveError::Serialize { .. })
		));
	}

	#[rstest]
	fn test_opaque_root_skipped_when_pruned_away() {
		let scope = SsrScope::new();
		let handle = Signal::opaque(Rc::new(()));
		let count = Signal::new(3);
		scope.register(&handle.handle());
		scope.register_binding(&count.handle(), 0, "value");

		let data = scope.capture_hydration_data().unwrap();
		assert_eq!(data.observables.keys().copied().collect::<Vec<_>>(), vec![1]);
	}

	#[rstest]
	fn test_plain_and_signal_state_entries() {
		let scope = SsrScope::new();
		let a = Signal::new(7);
		scope.register(&Signal::new(0).handle());
		scope.record_plain_state(StateKey::Plain("theme".into()), json!("dark"));
		scope.record_signal_state("count", &a.handle());

		let data = scope.capture_hydration_data().unwrap();
		assert_eq!(data.state[&StateKey::Plain("theme".into())], json!("dark"));
		assert_eq!(data.state[&StateKey::Observable(1)], json!(7));
	}

	#[rstest]
	fn test_pruned_capture_keeps_region_dependencies() {
		let scope = SsrScope::new();
		let label = Signal::new("L".to_string());
		let items = Signal::new(vec!["x".to_string(), "y".to_string()]);
		let unrelated = Signal::new(0);
		register_tree(&scope, &[label.handle(), items.handle(), unrelated.handle()]);
		scope.register_binding(&label.handle(), 0, "textContent");
		scope.register_region(&[items.handle()]);
		assert_eq!(scope.region_dependency_count(), 1);

		let data = scope.capture_hydration_data().unwrap();
		assert_eq!(data.observables.keys().copied().collect::<Vec<_>>(), vec![0, 1]);
		assert_eq!(data.observables[&1], json!(["x", "y"]));
	}

	#[rstest]
	fn test_region_alone_selects_pruned_capture() {
		let scope = SsrScope::new();
		let base = Signal::new(2);
		let doubled = base.derive(|x| x * 2);
		let unrelated = Signal::new(0);
		register_tree(&scope, &[base.handle(), doubled.handle(), unrelated.handle()]);
		scope.register_region(&[doubled.handle()]);

		let data = scope.capture_hydration_data().unwrap();
		assert!(data.bindings.is_empty());
		assert_eq!(data.observables.keys().copied().collect::<Vec<_>>(), vec![0]);
	}

	#[rstest]
	fn test_drop_releases_values() {
		let a = Signal::new(1);
		let b = a.derive(|x| x + 1);
		{
			let scope = SsrScope::new();
			register_tree(&scope, &[a.handle(), b.handle()]);
		}
		assert_eq!(a.observer_count(), 0);
	}
}
