//! Hydration entry points.

use std::rc::Rc;

use seidr_core::reactive::Observable;
use serde::de::DeserializeOwned;

use super::error::HydrationError;
use super::mount::{MountedRoot, mount_root, remove_between};
use super::session::{self, HydrationPhase, HydrationSession, current_session};
use crate::component::Component;
use crate::context::run_with_context_sync;
use crate::dom::Node;
use crate::registration;
use crate::ssr::data::HydrationData;

/// Hydrates server-rendered markup inside `container`.
///
/// Runs `component.render()` again with `data` installed: each reactive
/// value takes the position the server gave it, captured roots get their
/// server values back as they are constructed, and bound elements restore
/// the roots their bindings lead to. The server markup between the
/// component's root boundary comments is then replaced with live nodes.
///
/// Problems never abort the call. They are logged and collected on the
/// returned handle; see [`HydrationHandle::warnings`].
///
/// # Example
///
/// ```ignore
/// let container = Node::element("div");
/// container.set_inner_html(&output.html);
/// let handle = hydrate(&Counter { start: 0 }, &container, output.hydration_data);
/// assert!(handle.warnings().is_empty());
/// ```
pub fn hydrate<C: Component>(component: &C, container: &Node, data: HydrationData) -> HydrationHandle {
	registration::ensure_installed();

	let session = Rc::new(HydrationSession::new(data));
	if let Err(err) = session.data().validate() {
		session.warn(HydrationError::InvalidData(err.to_string()));
	}

	let mounted = {
		let _installed = session::enter(session.clone());
		run_with_context_sync(|| {
			session.set_phase(HydrationPhase::Replaying);
			let page = component.render();

			session.set_phase(HydrationPhase::ApplyingBindings);
			let mounted = mount_root(container, C::name(), &page);
			if !mounted.replaced {
				session.warn(HydrationError::MarkerNotFound(C::name().to_string()));
			}
			session.report_unmatched();
			mounted
		})
	};
	session.set_phase(HydrationPhase::Cleared);

	let (registry, warnings) = session.finish();
	crate::debug_log!(
		"hydrated {}: {} value(s), {} warning(s)",
		C::name(),
		registry.len(),
		warnings.len()
	);

	HydrationHandle {
		mounted: Some(mounted),
		registry,
		warnings,
		phase: session.phase(),
	}
}

/// Decodes `json` and hydrates with it.
///
/// # Errors
///
/// Returns [`HydrationError::Decode`] when `json` is not valid hydration
/// data. Nothing is mounted in that case.
pub fn hydrate_from_json<C: Component>(
	component: &C,
	container: &Node,
	json: &str,
) -> Result<HydrationHandle, HydrationError> {
	let data =
		HydrationData::from_json(json).map_err(|err| HydrationError::Decode(err.to_string()))?;
	Ok(hydrate(component, container, data))
}

/// Reads a plain state entry of the payload being hydrated.
///
/// Returns `None` outside of hydration, when the entry is absent, or when it
/// does not deserialize into `T`.
pub fn read_state<T: DeserializeOwned>(name: &str) -> Option<T> {
	let session = current_session()?;
	let value = session.data().plain_state(name)?;
	serde_json::from_value(value.clone()).ok()
}

/// A live, hydrated component.
///
/// Keeps the replayed values and the DOM subscriptions alive. Dropping the
/// handle stops updates but leaves the nodes in place; [`unmount`] removes
/// them.
///
/// [`unmount`]: HydrationHandle::unmount
pub struct HydrationHandle {
	mounted: Option<MountedRoot>,
	registry: Vec<Rc<dyn Observable>>,
	warnings: Vec<HydrationError>,
	phase: HydrationPhase,
}

impl HydrationHandle {
	/// Problems found while hydrating, in the order they occurred.
	pub fn warnings(&self) -> &[HydrationError] {
		&self.warnings
	}

	/// Whether hydration completed without warnings.
	pub fn is_clean(&self) -> bool {
		self.warnings.is_empty()
	}

	/// The final phase of the hydration call.
	pub fn phase(&self) -> HydrationPhase {
		self.phase
	}

	/// Number of values constructed during replay.
	pub fn observable_count(&self) -> usize {
		self.registry.len()
	}

	/// The value constructed at position `id` during replay.
	pub fn observable(&self, id: usize) -> Option<&Rc<dyn Observable>> {
		self.registry.get(id)
	}

	/// Current JSON value of the root at position `id`.
	///
	/// `None` for unknown positions and for values without a JSON form
	/// (derived or opaque values).
	pub fn value_json(&self, id: usize) -> Option<serde_json::Value> {
		self.observable(id)?.to_json().ok()
	}

	/// Removes the mounted nodes, including the boundary comments, and stops
	/// all updates.
	pub fn unmount(mut self) {
		if let Some(MountedRoot {
			start,
			end,
			subscriptions,
			..
		}) = self.mounted.take()
		{
			drop(subscriptions);
			if let Some(parent) = end.parent() {
				remove_between(&parent, &start, &end);
				parent.remove_child(&start);
				parent.remove_child(&end);
			}
		}
		for node in self.registry.drain(..) {
			node.destroy();
		}
	}
}

impl std::fmt::Debug for HydrationHandle {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("HydrationHandle")
			.field("phase", &self.phase)
			.field("observables", &self.registry.len())
			.field("warnings", &self.warnings)
			.field("mounted", &self.mounted.is_some())
			.finish()
	}
}
