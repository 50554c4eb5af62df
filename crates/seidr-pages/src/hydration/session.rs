//! Hydration session and the current-session slot.
//!
//! A session holds the payload being hydrated, the replay registry and the
//! warnings collected so far. Exactly one session is current per thread;
//! installing a session saves the previous one and the guard puts it back.

use std::cell::{Cell, RefCell};
use std::collections::HashSet;
use std::rc::Rc;

use indexmap::IndexMap;
use seidr_core::reactive::{NodeId, Observable};

use super::error::HydrationError;
use crate::ssr::data::HydrationData;
use crate::ssr::graph::resolve_path;

/// Where a hydration call is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HydrationPhase {
	/// No data installed yet.
	#[default]
	Idle,
	/// Data installed and the replay registry reset.
	ContextSet,
	/// The component is being constructed again.
	Replaying,
	/// The constructed tree is being mounted and bound.
	ApplyingBindings,
	/// The session slot was released.
	Cleared,
}

pub(crate) struct HydrationSession {
	data: HydrationData,
	phase: Cell<HydrationPhase>,
	registry: RefCell<IndexMap<NodeId, Rc<dyn Observable>>>,
	applied: RefCell<HashSet<(u64, String)>>,
	seen_elements: RefCell<HashSet<u64>>,
	warnings: RefCell<Vec<HydrationError>>,
}

impl HydrationSession {
	pub(crate) fn new(data: HydrationData) -> Self {
		Self {
			data,
			phase: Cell::new(HydrationPhase::Idle),
			registry: RefCell::new(IndexMap::new()),
			applied: RefCell::new(HashSet::new()),
			seen_elements: RefCell::new(HashSet::new()),
			warnings: RefCell::new(Vec::new()),
		}
	}

	pub(crate) fn data(&self) -> &HydrationData {
		&self.data
	}

	pub(crate) fn phase(&self) -> HydrationPhase {
		self.phase.get()
	}

	pub(crate) fn set_phase(&self, phase: HydrationPhase) {
		crate::debug_log!("hydration: {:?} -> {:?}", self.phase.get(), phase);
		self.phase.set(phase);
	}

	pub(crate) fn warn(&self, warning: HydrationError) {
		crate::warn_log!("hydration: {}", warning);
		self.warnings.borrow_mut().push(warning);
	}

	/// Adds a value to the replay registry, first touch wins.
	fn register(&self, node: &Rc<dyn Observable>) -> usize {
		let mut registry = self.registry.borrow_mut();
		let entry = registry.entry(node.id());
		let position = entry.index();
		entry.or_insert_with(|| node.clone());
		position
	}

	fn entry(&self, position: usize) -> Option<Rc<dyn Observable>> {
		self.registry
			.borrow()
			.get_index(position)
			.map(|(_, node)| node.clone())
	}

	/// Registers a newly constructed value and restores a captured root.
	pub(crate) fn on_create(&self, node: &Rc<dyn Observable>) {
		let position = self.register(node);
		if node.is_derived() {
			return;
		}
		if let Some(value) = self.data.root_value(position) {
			crate::debug_log!("hydration: restoring #{} ({})", position, node.id());
			if let Err(err) = node.set_json(value.clone()) {
				self.warn(HydrationError::RestoreFailed {
					id: position,
					reason: err.to_string(),
				});
			}
		}
	}

	/// Registers parents first seen through a derivation.
	pub(crate) fn on_derive(&self, node: &Rc<dyn Observable>, parents: &[Rc<dyn Observable>]) {
		self.register(node);
		for parent in parents {
			self.register(parent);
		}
	}

	/// Registers region dependencies first touched by the region.
	pub(crate) fn on_region(&self, deps: &[Rc<dyn Observable>]) {
		for dep in deps {
			self.register(dep);
		}
	}

	/// Applies the records for `prop` of element `element_id`.
	///
	/// Each path of each record is walked to its root; roots whose value
	/// differs from the captured one are set, which recomputes every derived
	/// value in between. Problems are recorded as warnings and skip only the
	/// affected path.
	pub(crate) fn apply_binding(&self, node: &Rc<dyn Observable>, element_id: u64, prop: &str) {
		self.seen_elements.borrow_mut().insert(element_id);
		if !self
			.applied
			.borrow_mut()
			.insert((element_id, prop.to_string()))
		{
			return;
		}
		// The bound value may be touched here for the first time.
		self.register(node);

		for record in self
			.data
			.bindings_for(element_id)
			.iter()
			.filter(|record| record.prop == prop)
		{
			let Some(entry) = self.entry(record.seidr_id) else {
				self.warn(HydrationError::MissingRegistryEntry {
					element_id,
					seidr_id: record.seidr_id,
				});
				continue;
			};
			if entry.id() != node.id() {
				self.warn(HydrationError::BindingMismatch {
					element_id,
					seidr_id: record.seidr_id,
				});
				continue;
			}
			for path in &record.paths {
				let root = match resolve_path(&self.data.graph, record.seidr_id, path) {
					Ok(root) => root,
					Err(source) => {
						self.warn(HydrationError::GraphConsistency { element_id, source });
						continue;
					}
				};
				self.restore_root(element_id, root);
			}
		}
	}

	fn restore_root(&self, element_id: u64, root: usize) {
		let Some(node) = self.entry(root) else {
			self.warn(HydrationError::MissingRegistryEntry {
				element_id,
				seidr_id: root,
			});
			return;
		};
		// Parentless computed values are graph roots with nothing captured.
		if node.is_derived() {
			return;
		}
		let Some(value) = self.data.root_value(root) else {
			self.warn(HydrationError::MissingRootValue { root });
			return;
		};
		if node.to_json().ok().as_ref() == Some(value) {
			return;
		}
		if let Err(err) = node.set_json(value.clone()) {
			self.warn(HydrationError::RestoreFailed {
				id: root,
				reason: err.to_string(),
			});
		}
	}

	/// Warns about bound elements of the payload that were never constructed.
	pub(crate) fn report_unmatched(&self) {
		let unmatched: Vec<u64> = {
			let seen = self.seen_elements.borrow();
			self.data
				.bindings
				.keys()
				.filter(|id| !seen.contains(id))
				.copied()
				.collect()
		};
		for element_id in unmatched {
			self.warn(HydrationError::UnmatchedElement(element_id));
		}
	}

	/// Empties the session, returning the registry in order and the warnings.
	pub(crate) fn finish(&self) -> (Vec<Rc<dyn Observable>>, Vec<HydrationError>) {
		let registry = std::mem::take(&mut *self.registry.borrow_mut());
		self.applied.borrow_mut().clear();
		self.seen_elements.borrow_mut().clear();
		let warnings = std::mem::take(&mut *self.warnings.borrow_mut());
		(registry.into_values().collect(), warnings)
	}
}

thread_local! {
	static CURRENT_SESSION: RefCell<Option<Rc<HydrationSession>>> = const { RefCell::new(None) };
}

/// Restores the previously current session on drop.
#[must_use = "the session is uninstalled as soon as the guard is dropped"]
pub(crate) struct SessionGuard {
	previous: Option<Rc<HydrationSession>>,
}

impl Drop for SessionGuard {
	fn drop(&mut self) {
		let previous = self.previous.take();
		let _ = CURRENT_SESSION.try_with(|slot| *slot.borrow_mut() = previous);
	}
}

/// Makes `session` current and resets it to [`HydrationPhase::ContextSet`].
pub(crate) fn enter(session: Rc<HydrationSession>) -> SessionGuard {
	session.set_phase(HydrationPhase::ContextSet);
	let previous = CURRENT_SESSION.with(|slot| slot.borrow_mut().replace(session));
	if previous.is_some() {
		crate::debug_log!("hydration: nested call, saving the outer session");
	}
	SessionGuard { previous }
}

pub(crate) fn current_session() -> Option<Rc<HydrationSession>> {
	CURRENT_SESSION
		.try_with(|slot| slot.borrow().clone())
		.ok()
		.flatten()
}

/// Whether a hydration call is in progress on this thread.
pub fn is_hydrating() -> bool {
	CURRENT_SESSION
		.try_with(|slot| slot.borrow().is_some())
		.unwrap_or(false)
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::ssr::data::BindingRecord;
	use crate::ssr::graph::{DependencyGraph, GraphNode};
	use rstest::{fixture, rstest};
	use seidr_core::reactive::Signal;
	use serde_json::json;

	fn node(id: usize, parents: Vec<usize>) -> GraphNode {
		GraphNode { id, parents }
	}

	/// `a -> b`, `b` bound to element 0.
	#[fixture]
	fn chain_data() -> HydrationData {
		let mut data = HydrationData::new();
		data.graph = DependencyGraph {
			nodes: vec![node(0, vec![]), node(1, vec![0])],
			root_ids: vec![0],
		};
		data.observables.insert(0, json!(7));
		data.bindings.insert(
			0,
			vec![BindingRecord {
				seidr_id: 1,
				prop: "value".into(),
				paths: vec![vec![0]],
			}],
		);
		data
	}

	#[rstest]
	fn test_on_create_restores_root(chain_data: HydrationData) {
		let session = HydrationSession::new(chain_data);
		let a = Signal::new(0);
		session.on_create(&a.handle());
		assert_eq!(a.get(), 7);
		assert_eq!(session.finish().0.len(), 1);
	}

	#[rstest]
	fn test_on_create_mismatched_type_warns(chain_data: HydrationData) {
		let session = HydrationSession::new(chain_data);
		let a = Signal::new("text".to_string());
		session.on_create(&a.handle());
		let (_, warnings) = session.finish();
		assert!(matches!(
			warnings.as_slice(),
			[HydrationError::RestoreFailed { id: 0, .. }]
		));
	}

	#[rstest]
	fn test_apply_binding_sets_root_through_path(chain_data: HydrationData) {
		let session = HydrationSession::new(chain_data);
		let a = Signal::new(0);
		let b = a.derive(|x| x + 1);
		// Registered without restoring, as if the value changed afterwards.
		session.register(&a.handle());
		session.register(&b.handle());

		session.apply_binding(&b.handle(), 0, "value");
		assert_eq!(a.get(), 7);
		assert_eq!(b.get(), 8);

		// Applying twice is a no-op.
		a.set(1);
		session.apply_binding(&b.handle(), 0, "value");
		assert_eq!(a.get(), 1);
	}

	#[rstest]
	fn test_missing_registry_entry_is_warning(chain_data: HydrationData) {
		let session = HydrationSession::new(chain_data);
		let unrelated = Signal::new(0);
		session.apply_binding(&unrelated.handle(), 0, "value");

		let (_, warnings) = session.finish();
		assert_eq!(
			warnings,
			vec![HydrationError::MissingRegistryEntry {
				element_id: 0,
				seidr_id: 1
			}]
		);
	}

	#[rstest]
	fn test_bad_path_is_warning(mut chain_data: HydrationData) {
		chain_data.bindings.get_mut(&0).unwrap()[0].paths = vec![vec![3]];
		let session = HydrationSession::new(chain_data);
		let a = Signal::new(0);
		let b = a.derive(|x| x + 1);
		session.register(&a.handle());
		session.apply_binding(&b.handle(), 0, "value");

		let (_, warnings) = session.finish();
		assert!(matches!(
			warnings.as_slice(),
			[HydrationError::GraphConsistency { element_id: 0, .. }]
		));
	}

	#[rstest]
	fn test_diverged_registry_entry_is_warning(chain_data: HydrationData) {
		let session = HydrationSession::new(chain_data);
		let a = Signal::new(0);
		let stray = Signal::new(0);
		let b = a.derive(|x| x + 1);
		session.register(&a.handle());
		session.register(&stray.handle());

		session.apply_binding(&b.handle(), 0, "value");

		assert_eq!(a.get(), 0);
		let (_, warnings) = session.finish();
		assert_eq!(
			warnings,
			vec![HydrationError::BindingMismatch {
				element_id: 0,
				seidr_id: 1
			}]
		);
	}

	#[rstest]
	fn test_parentless_derived_root_is_not_restored() {
		let mut data = HydrationData::new();
		data.graph = DependencyGraph {
			nodes: vec![node(0, vec![])],
			root_ids: vec![0],
		};
		data.bindings.insert(
			0,
			vec![BindingRecord {
				seidr_id: 0,
				prop: "value".into(),
				paths: vec![vec![]],
			}],
		);
		let session = HydrationSession::new(data);
		let constant = Signal::computed(&[], || 7);
		session.on_create(&constant.handle());

		session.apply_binding(&constant.handle(), 0, "value");

		assert_eq!(constant.get(), 7);
		assert!(session.finish().1.is_empty());
	}

	#[rstest]
	fn test_on_region_registers_unseen_dependencies() {
		let session = HydrationSession::new(HydrationData::new());
		let a = Signal::new(1);
		let b = Signal::new(2);
		session.register(&a.handle());
		session.on_region(&[b.handle(), a.handle()]);

		let (registry, _) = session.finish();
		let ids: Vec<NodeId> = registry.iter().map(|node| node.id()).collect();
		assert_eq!(ids, vec![a.id(), b.id()]);
	}

	#[rstest]
	fn test_report_unmatched(chain_data: HydrationData) {
		let session = HydrationSession::new(chain_data);
		session.report_unmatched();
		let (_, warnings) = session.finish();
		assert_eq!(warnings, vec![HydrationError::UnmatchedElement(0)]);
	}

	#[rstest]
	fn test_nested_enter_restores_outer() {
		assert!(!is_hydrating());
		let outer = Rc::new(HydrationSession::new(HydrationData::new()));
		let inner = Rc::new(HydrationSession::new(HydrationData::new()));
		{
			let _outer = enter(outer.clone());
			{
				let _inner = enter(inner.clone());
				assert!(Rc::ptr_eq(&current_session().unwrap(), &inner));
			}
			assert!(Rc::ptr_eq(&current_session().unwrap(), &outer));
			assert_eq!(outer.phase(), HydrationPhase::ContextSet);
		}
		assert!(!is_hydrating());
	}
}
