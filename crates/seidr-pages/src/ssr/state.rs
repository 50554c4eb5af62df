//! Named global state carried next to the hydration graph.
//!
//! Entries in `HydrationData::state` come in two kinds:
//!
//! - **Observable entries** hold the value of a root signal created through
//!   [`state_signal`]. They are keyed by the signal's numeric id and written
//!   as `"$<id>"` on the wire, e.g. `"$3"`.
//! - **Plain entries** hold a JSON value provided with [`provide_state`] and
//!   are keyed by name.
//!
//! In memory the two are kept apart by [`StateKey`]; the `$` prefix only
//! exists in the serialized form. Plain names that would read back as an
//! observable key are rejected.

use std::fmt;
use std::str::FromStr;

use serde::de::{self, Deserializer, Visitor};
use serde::{Deserialize, Serialize, Serializer};

use seidr_core::reactive::Signal;
use serde::de::DeserializeOwned;

use super::registry::active_scope;
use super::scope::CaptureError;

/// Wire prefix of observable state keys.
pub const OBSERVABLE_KEY_PREFIX: char = '$';

/// Key of one entry in the hydration state map.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum StateKey {
	/// Value of the root signal with this numeric id.
	Observable(usize),
	/// Plain JSON value stored under this name.
	Plain(String),
}

impl StateKey {
	/// Creates a plain key, rejecting names that collide with the
	/// observable form.
	pub fn plain(name: impl Into<String>) -> Result<Self, CaptureError> {
		let name = name.into();
		match name.parse::<StateKey>() {
			Ok(StateKey::Plain(_)) => Ok(StateKey::Plain(name)),
			_ => Err(CaptureError::ReservedStateKey(name)),
		}
	}
}

impl fmt::Display for StateKey {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			StateKey::Observable(id) => write!(f, "{}{}", OBSERVABLE_KEY_PREFIX, id),
			StateKey::Plain(name) => f.write_str(name),
		}
	}
}

impl FromStr for StateKey {
	type Err = std::convert::Infallible;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		if let Some(digits) = s.strip_prefix(OBSERVABLE_KEY_PREFIX)
			&& !digits.is_empty()
			&& digits.bytes().all(|b| b.is_ascii_digit())
			&& (digits == "0" || !digits.starts_with('0'))
			&& let Ok(id) = digits.parse()
		{
			return Ok(StateKey::Observable(id));
		}
		Ok(StateKey::Plain(s.to_string()))
	}
}

impl Serialize for StateKey {
	fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
		serializer.collect_str(self)
	}
}

impl<'de> Deserialize<'de> for StateKey {
	fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
		struct KeyVisitor;

		impl Visitor<'_> for KeyVisitor {
			type Value = StateKey;

			fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
				f.write_str("a state key string")
			}

			fn visit_str<E: de::Error>(self, v: &str) -> Result<StateKey, E> {
				v.parse().map_err(E::custom)
			}
		}

		deserializer.deserialize_str(KeyVisitor)
	}
}

/// Records a plain JSON value under `name` in the active capture scope.
///
/// During hydration this is a no-op; read the value back with
/// [`read_state`](crate::hydration::read_state).
///
/// # Errors
///
/// - [`CaptureError::ReservedStateKey`] for names of the form `$<digits>`
/// - [`CaptureError::StateSerialize`] when `value` cannot become JSON
/// - [`CaptureError::NoActiveScope`] outside of a server render
pub fn provide_state<T>(name: &str, value: &T) -> Result<(), CaptureError>
where
	T: Serialize + ?Sized,
{
	if crate::hydration::is_hydrating() {
		return Ok(());
	}
	let key = StateKey::plain(name)?;
	let json = serde_json::to_value(value).map_err(|source| CaptureError::StateSerialize {
		name: name.to_string(),
		source,
	})?;
	let scope = active_scope().ok_or(CaptureError::NoActiveScope)?;
	scope.record_plain_state(key, json);
	Ok(())
}

/// Creates a root signal whose value travels in the state map.
///
/// The signal is captured even when no element binds it, so the client
/// sees the server's value after hydration. `name` is only used for
/// diagnostics; the wire key is the signal's numeric id.
pub fn state_signal<T>(name: &str, initial: T) -> Signal<T>
where
	T: Serialize + DeserializeOwned + 'static,
{
	let signal = Signal::new(initial);
	if let Some(scope) = active_scope() {
		scope.record_signal_state(name, &signal.handle());
	}
	signal
}
