//! Errors raised by reactive values.

use super::runtime::NodeId;

/// Errors that can occur when converting reactive values to or from JSON.
#[derive(Debug, thiserror::Error)]
pub enum ReactiveError {
	/// The value was created without a JSON codec (see `Signal::opaque`).
	#[error("reactive value {0} holds an opaque value that cannot be serialized")]
	NotSerializable(NodeId),

	/// The value has a codec but serialization failed.
	#[error("failed to serialize reactive value {id}: {source}")]
	Serialize {
		/// The value being serialized.
		id: NodeId,
		/// Underlying serde error.
		#[source]
		source: serde_json::Error,
	},

	/// A JSON value could not be converted into the value's type.
	#[error("failed to deserialize into reactive value {id}: {source}")]
	Deserialize {
		/// The value being written.
		id: NodeId,
		/// Underlying serde error.
		#[source]
		source: serde_json::Error,
	},
}
