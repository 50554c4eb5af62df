//! Signal - Reactive Value
//!
//! `Signal<T>` holds a value, notifies observers when it changes, and can be
//! derived from one or more parent signals.
//!
//! ## Key Features
//!
//! - **Roots and derived values**: [`Signal::new`] creates a root;
//!   [`Signal::derive`] and [`Signal::computed`] create derived values whose
//!   parents are recorded in the order they were supplied.
//! - **Synchronous propagation**: `set()` notifies observers immediately;
//!   derived values recompute from their parents at that point.
//! - **Registration hook**: construction announces the new value to the
//!   thread's [`RegistrationHook`](super::RegistrationHook).
//! - **JSON codec**: roots created with `new` can be serialized and restored
//!   through their type-erased [`Observable`] handle.
//!
//! ## Example
//!
//! ```ignore
//! use seidr_core::reactive::Signal;
//!
//! let count = Signal::new(2);
//! let doubled = count.derive(|n| n * 2);
//! assert_eq!(doubled.get(), 4);
//!
//! count.set(5);
//! assert_eq!(doubled.get(), 10);
//! ```

use core::cell::RefCell;
use core::fmt;

extern crate alloc;
use alloc::boxed::Box;
use alloc::rc::{Rc, Weak};
use alloc::vec::Vec;

use serde::Serialize;
use serde::de::DeserializeOwned;

use super::error::ReactiveError;
use super::observable::{Observable, ObserverFn, Subscription, Trackable};
use super::runtime::{NodeId, ObserverId, with_hook};

type EncodeFn<T> = fn(&T) -> Result<serde_json::Value, serde_json::Error>;
type DecodeFn<T> = fn(serde_json::Value) -> Result<T, serde_json::Error>;
type RecomputeFn<T> = Box<dyn Fn() -> Option<T>>;

/// Encodes `value` and checks that the result decodes back into `T`.
///
/// `serde_json` writes non-finite floats as `null`, which no float type
/// accepts on the way back; such values fail here instead of at restore.
fn encode_json<T: Serialize + DeserializeOwned>(
	value: &T,
) -> Result<serde_json::Value, serde_json::Error> {
	let json = serde_json::to_value(value)?;
	serde_json::from_value::<T>(json.clone())?;
	Ok(json)
}

fn decode_json<T: DeserializeOwned>(value: serde_json::Value) -> Result<T, serde_json::Error> {
	serde_json::from_value(value)
}

struct Codec<T> {
	encode: EncodeFn<T>,
	decode: DecodeFn<T>,
}

/// Subscription this value holds on one of its parents.
struct Upstream {
	source: Weak<dyn Observable>,
	observer: ObserverId,
}

pub(crate) struct SignalInner<T: 'static> {
	id: NodeId,
	value: RefCell<T>,
	codec: Option<Codec<T>>,
	parents: Vec<NodeId>,
	recompute: Option<RecomputeFn<T>>,
	upstream: RefCell<Vec<Upstream>>,
	observers: RefCell<Vec<(ObserverId, ObserverFn)>>,
}

impl<T: 'static> SignalInner<T> {
	fn notify(&self) {
		// Snapshot first: observers may subscribe or unsubscribe while running.
		let observers: Vec<ObserverFn> = self
			.observers
			.borrow()
			.iter()
			.map(|(_, observer)| observer.clone())
			.collect();
		for observer in observers {
			observer();
		}
	}

	fn replace(&self, value: T) {
		*self.value.borrow_mut() = value;
		self.notify();
	}

	fn recompute(&self) {
		if let Some(compute) = &self.recompute
			&& let Some(value) = compute()
		{
			self.replace(value);
		}
	}

	fn release_upstream(&self) {
		let upstream = core::mem::take(&mut *self.upstream.borrow_mut());
		for link in upstream {
			if let Some(source) = link.source.upgrade() {
				source.unsubscribe(link.observer);
			}
		}
	}
}

impl<T: 'static> Observable for SignalInner<T> {
	fn id(&self) -> NodeId {
		self.id
	}

	fn is_derived(&self) -> bool {
		self.recompute.is_some()
	}

	fn parent_ids(&self) -> Vec<NodeId> {
		self.parents.clone()
	}

	fn to_json(&self) -> Result<serde_json::Value, ReactiveError> {
		let codec = self
			.codec
			.as_ref()
			.ok_or(ReactiveError::NotSerializable(self.id))?;
		(codec.encode)(&self.value.borrow()).map_err(|source| ReactiveError::Serialize {
			id: self.id,
			source,
		})
	}

	fn set_json(&self, value: serde_json::Value) -> Result<(), ReactiveError> {
		let codec = self
			.codec
			.as_ref()
			.ok_or(ReactiveError::NotSerializable(self.id))?;
		let decoded = (codec.decode)(value).map_err(|source| ReactiveError::Deserialize {
			id: self.id,
			source,
		})?;
		self.replace(decoded);
		Ok(())
	}

	fn subscribe(&self, observer: ObserverFn) -> ObserverId {
		let id = ObserverId::new();
		self.observers.borrow_mut().push((id, observer));
		id
	}

	fn unsubscribe(&self, id: ObserverId) {
		self.observers
			.borrow_mut()
			.retain(|(observer_id, _)| *observer_id != id);
	}

	fn observer_count(&self) -> usize {
		self.observers.borrow().len()
	}

	fn destroy(&self) {
		self.observers.borrow_mut().clear();
		self.release_upstream();
	}
}

impl<T: 'static> Drop for SignalInner<T> {
	fn drop(&mut self) {
		self.release_upstream();
	}
}

/// A reactive value
///
/// `Signal<T>` is a cheap handle: clones share the same underlying value,
/// id and observer list.
///
/// ## Type Parameter
///
/// * `T` - The type of value stored in the signal. Must be `'static`.
pub struct Signal<T: 'static> {
	inner: Rc<SignalInner<T>>,
}

impl<T: 'static> Clone for Signal<T> {
	fn clone(&self) -> Self {
		Self {
			inner: self.inner.clone(),
		}
	}
}

impl<T> Signal<T>
where
	T: Serialize + DeserializeOwned + 'static,
{
	/// Create a new root Signal with a JSON codec
	///
	/// Roots created this way can be captured into hydration data and
	/// restored from it.
	///
	/// # Example
	///
	/// ```ignore
	/// let count = Signal::new(0);
	/// assert_eq!(count.get(), 0);
	/// ```
	pub fn new(value: T) -> Self {
		let codec = Codec {
			encode: encode_json::<T>,
			decode: decode_json::<T>,
		};
		Self::root(value, Some(codec))
	}
}

impl<T: 'static> Signal<T> {
	/// Create a new root Signal without a JSON codec
	///
	/// Use this for values that only make sense in memory (handles, closures,
	/// caches). Capturing such a value into hydration data is an error.
	pub fn opaque(value: T) -> Self {
		Self::root(value, None)
	}

	fn root(value: T, codec: Option<Codec<T>>) -> Self {
		let signal = Self {
			inner: Rc::new(SignalInner {
				id: NodeId::new(),
				value: RefCell::new(value),
				codec,
				parents: Vec::new(),
				recompute: None,
				upstream: RefCell::new(Vec::new()),
				observers: RefCell::new(Vec::new()),
			}),
		};
		let handle = signal.handle();
		with_hook(|hook| hook.on_create(&handle));
		signal
	}

	fn derived(initial: T, recompute: RecomputeFn<T>, parents: Vec<Rc<dyn Observable>>) -> Self {
		let inner = Rc::new(SignalInner {
			id: NodeId::new(),
			value: RefCell::new(initial),
			codec: None,
			parents: parents.iter().map(|parent| parent.id()).collect(),
			recompute: Some(recompute),
			upstream: RefCell::new(Vec::new()),
			observers: RefCell::new(Vec::new()),
		});

		let weak = Rc::downgrade(&inner);
		for parent in &parents {
			let weak = weak.clone();
			let observer = parent.subscribe(Rc::new(move || {
				if let Some(child) = weak.upgrade() {
					child.recompute();
				}
			}));
			inner.upstream.borrow_mut().push(Upstream {
				source: Rc::downgrade(parent),
				observer,
			});
		}

		let signal = Self { inner };
		let handle = signal.handle();
		with_hook(|hook| {
			hook.on_create(&handle);
			hook.on_derive(&handle, &parents);
		});
		signal
	}

	/// Create a value derived from this one
	///
	/// The result recomputes `f` whenever this signal changes.
	///
	/// # Example
	///
	/// ```ignore
	/// let a = Signal::new(2);
	/// let b = a.derive(|x| x * 2);
	/// let c = b.derive(|x| x * 2);
	/// assert_eq!(c.get(), 8);
	/// ```
	pub fn derive<U, F>(&self, f: F) -> Signal<U>
	where
		U: 'static,
		F: Fn(&T) -> U + 'static,
	{
		let initial = f(&self.inner.value.borrow());
		let parent = Rc::downgrade(&self.inner);
		let recompute: RecomputeFn<U> =
			Box::new(move || parent.upgrade().map(|parent| f(&parent.value.borrow())));
		Signal::derived(initial, recompute, vec![self.handle()])
	}

	/// Create a value computed from an explicit, ordered list of parents
	///
	/// The order of `deps` is significant: it is the index basis for
	/// dependency paths in hydration data.
	///
	/// # Example
	///
	/// ```ignore
	/// let a = Signal::new(5);
	/// let b = Signal::new(3);
	/// let (a2, b2) = (a.clone(), b.clone());
	/// let sum = Signal::computed(&[&a, &b], move || a2.get() + b2.get());
	/// assert_eq!(sum.get(), 8);
	/// ```
	pub fn computed<F>(deps: &[&dyn Trackable], f: F) -> Self
	where
		F: Fn() -> T + 'static,
	{
		let parents: Vec<Rc<dyn Observable>> = deps.iter().map(|dep| dep.handle()).collect();
		let initial = f();
		Self::derived(initial, Box::new(move || Some(f())), parents)
	}

	/// Get a clone of the current value
	pub fn get(&self) -> T
	where
		T: Clone,
	{
		self.inner.value.borrow().clone()
	}

	/// Borrow the current value
	///
	/// `f` must not write to this same signal.
	pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
		f(&self.inner.value.borrow())
	}

	/// Set the signal to a new value and notify observers
	///
	/// Setting a derived value is allowed but is overwritten on the next
	/// parent change.
	pub fn set(&self, value: T) {
		self.inner.replace(value);
	}

	/// Update the value in place and notify observers once
	pub fn update<F>(&self, f: F)
	where
		F: FnOnce(&mut T),
	{
		f(&mut self.inner.value.borrow_mut());
		self.inner.notify();
	}

	/// Observe changes to this signal
	///
	/// `f` receives the new value after every change. The observer stays
	/// registered until the returned [`Subscription`] is dropped.
	pub fn observe<F>(&self, f: F) -> Subscription
	where
		F: Fn(&T) + 'static,
	{
		let weak = Rc::downgrade(&self.inner);
		let handle = self.handle();
		Subscription::attach(
			&handle,
			Rc::new(move || {
				if let Some(inner) = weak.upgrade() {
					f(&inner.value.borrow());
				}
			}),
		)
	}

	/// Get the stable id of this signal
	pub fn id(&self) -> NodeId {
		self.inner.id
	}

	/// Whether this signal is derived from parents
	pub fn is_derived(&self) -> bool {
		self.inner.is_derived()
	}

	/// Parent ids in derivation order
	pub fn parent_ids(&self) -> Vec<NodeId> {
		self.inner.parent_ids()
	}

	/// Number of observers currently registered on this signal
	pub fn observer_count(&self) -> usize {
		self.inner.observer_count()
	}

	/// Release all observer registrations held by or on this signal
	pub fn destroy(&self) {
		self.inner.destroy();
	}

	/// Returns the type-erased handle for this signal
	pub fn handle(&self) -> Rc<dyn Observable> {
		self.inner.clone()
	}
}

impl<T: 'static> Trackable for Signal<T> {
	fn handle(&self) -> Rc<dyn Observable> {
		Signal::handle(self)
	}
}

impl<T: fmt::Debug + 'static> fmt::Debug for Signal<T> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Signal")
			.field("id", &self.inner.id)
			.field("value", &*self.inner.value.borrow())
			.field("derived", &self.is_derived())
			.finish()
	}
}
