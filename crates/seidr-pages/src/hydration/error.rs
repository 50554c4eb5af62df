//! Hydration-time problems.
//!
//! None of these abort a hydration call. Each one is logged, the affected
//! binding or region is skipped, and the problem is kept on the
//! [`HydrationHandle`](super::HydrationHandle) for inspection.

use crate::ssr::graph::GraphError;

/// A problem found while hydrating.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HydrationError {
	/// A binding names a value the client never constructed.
	#[error("element {element_id}: no value #{seidr_id} in the replay registry")]
	MissingRegistryEntry {
		/// Element the binding belongs to.
		element_id: u64,
		/// Numeric id that was looked up.
		seidr_id: usize,
	},

	/// The registry entry at a binding's numeric id is not the bound value.
	///
	/// Construction on the client diverged from the server render.
	#[error("element {element_id}: value #{seidr_id} in the replay registry is not the bound value")]
	BindingMismatch {
		/// Element the binding belongs to.
		element_id: u64,
		/// Numeric id recorded by the server.
		seidr_id: usize,
	},

	/// A binding path does not fit the graph.
	#[error("element {element_id}: {source}")]
	GraphConsistency {
		/// Element the binding belongs to.
		element_id: u64,
		/// What was wrong with the path.
		#[source]
		source: GraphError,
	},

	/// A path ends at a root with no captured value.
	#[error("no captured value for root #{root}")]
	MissingRootValue {
		/// Numeric id of the root.
		root: usize,
	},

	/// A captured value could not be written into its reactive value.
	#[error("failed to restore value #{id}: {reason}")]
	RestoreFailed {
		/// Numeric id of the value.
		id: usize,
		/// Description of the failure.
		reason: String,
	},

	/// The root boundary comments were not found in the container.
	#[error("hydration markers for `{0}` not found, mounting fresh content")]
	MarkerNotFound(String),

	/// The payload has bindings for an element the client never created.
	#[error("element {0} from the server was not constructed on the client")]
	UnmatchedElement(u64),

	/// The payload failed validation.
	#[error("invalid hydration data: {0}")]
	InvalidData(String),

	/// The payload could not be decoded.
	#[error("failed to decode hydration data: {0}")]
	Decode(String),
}
