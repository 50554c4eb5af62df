//! Render-context store
//!
//! Every server render runs inside its own [`RenderContext`], held in
//! task-local storage so that it follows the render future across every
//! suspension point. Two renders in flight at the same time therefore never
//! observe each other's context, even when their polls interleave.
//!
//! ## Features
//!
//! - **Task-local**: installed with [`run_with_context`] (async) or
//!   [`run_with_context_sync`] (hydration, which is synchronous)
//! - **Unique ids**: each context receives a fresh numeric id from a wrapping
//!   atomic counter; id 0 is reserved for the implicit default context
//! - **Sequential element ids**: [`RenderContext::next_id`] hands out the
//!   deterministic marker ids used to match server and client elements
//! - **Pending work**: futures queued with [`RenderContext::spawn_pending`]
//!   are awaited by [`RenderContext::drain_pending`] until none remain
//!
//! Calling [`current_context`] outside of a context is an error;
//! [`current_context_or_default`] instead falls back to a per-thread default
//! context with id 0, which is the behaviour the client relies on.

use std::cell::{Cell, RefCell};
use std::error::Error;
use std::fmt;
use std::future::Future;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

use futures::future::{LocalBoxFuture, join_all};

/// Context ids wrap at this modulus (largest integer a JSON number holds exactly).
pub const CONTEXT_ID_MODULUS: u64 = 1 << 53;

/// Id of the implicit default context.
pub const DEFAULT_CONTEXT_ID: u64 = 0;

/// Boxed error produced by a pending server task.
pub type PendingError = Box<dyn Error + 'static>;

type PendingTask = LocalBoxFuture<'static, Result<(), PendingError>>;

/// Errors raised by the render-context store.
#[derive(Debug, thiserror::Error)]
pub enum ContextError {
	/// A context-dependent API was called with no active render context.
	#[error(
		"render context not initialized: wrap the call in `run_with_context` or `run_with_context_sync`"
	)]
	NotInitialized,

	/// A pending server task failed.
	#[error("pending server task failed: {0}")]
	PendingTask(#[source] PendingError),
}

struct ContextInner {
	id: u64,
	counter: Cell<u64>,
	pending: RefCell<Vec<PendingTask>>,
}

/// Isolation unit for one render request.
///
/// Cloning is cheap; clones share the same counter and pending list.
#[derive(Clone)]
pub struct RenderContext {
	inner: Rc<ContextInner>,
}

impl RenderContext {
	fn with_id(id: u64) -> Self {
		Self {
			inner: Rc::new(ContextInner {
				id,
				counter: Cell::new(0),
				pending: RefCell::new(Vec::new()),
			}),
		}
	}

	/// Creates a context with a freshly allocated id.
	pub fn new() -> Self {
		Self::with_id(allocate_context_id())
	}

	/// The numeric id of this context.
	pub fn id(&self) -> u64 {
		self.inner.id
	}

	/// Whether this is the implicit default context.
	pub fn is_default(&self) -> bool {
		self.inner.id == DEFAULT_CONTEXT_ID
	}

	/// Returns the next sequential id in this context (starting at 0).
	pub fn next_id(&self) -> u64 {
		let id = self.inner.counter.get();
		self.inner.counter.set(id + 1);
		id
	}

	/// Number of ids handed out so far.
	pub fn issued_ids(&self) -> u64 {
		self.inner.counter.get()
	}

	/// Queues a future that must complete before the render is finalized.
	pub fn spawn_pending<F, E>(&self, future: F)
	where
		F: Future<Output = Result<(), E>> + 'static,
		E: Error + 'static,
	{
		self.inner.pending.borrow_mut().push(Box::pin(async move {
			future.await.map_err(|e| Box::new(e) as PendingError)
		}));
	}

	/// Number of queued futures not yet awaited.
	pub fn pending_count(&self) -> usize {
		self.inner.pending.borrow().len()
	}

	/// Awaits every pending future, including futures queued while draining.
	///
	/// Each round awaits the whole current batch before checking for newly
	/// queued work; the loop ends when a round finds nothing left. The first
	/// failure (in queue order) of a round is returned after that round
	/// completes.
	pub async fn drain_pending(&self) -> Result<(), ContextError> {
		loop {
			let batch = std::mem::take(&mut *self.inner.pending.borrow_mut());
			if batch.is_empty() {
				return Ok(());
			}
			crate::debug_log!(
				"render context {}: awaiting {} pending task(s)",
				self.id(),
				batch.len()
			);
			for result in join_all(batch).await {
				result.map_err(ContextError::PendingTask)?;
			}
		}
	}
}

impl Default for RenderContext {
	fn default() -> Self {
		Self::new()
	}
}

impl fmt::Debug for RenderContext {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("RenderContext")
			.field("id", &self.inner.id)
			.field("issued_ids", &self.inner.counter.get())
			.field("pending", &self.inner.pending.borrow().len())
			.finish()
	}
}

fn allocate_context_id() -> u64 {
	static NEXT_CONTEXT_ID: AtomicU64 = AtomicU64::new(0);
	let raw = NEXT_CONTEXT_ID.fetch_add(1, Ordering::Relaxed);
	raw % (CONTEXT_ID_MODULUS - 1) + 1
}

tokio::task_local! {
	/// Task-local render context. Follows the render future across awaits.
	static RENDER_CONTEXT: RenderContext;
}

thread_local! {
	static DEFAULT_CONTEXT: RenderContext = RenderContext::with_id(DEFAULT_CONTEXT_ID);
}

/// Runs `future` inside a fresh render context.
///
/// The context stays current for every poll of `future`, including
/// continuations after `.await` points.
pub async fn run_with_context<F>(future: F) -> F::Output
where
	F: Future,
{
	RENDER_CONTEXT.scope(RenderContext::new(), future).await
}

/// Runs `f` synchronously inside a fresh render context.
pub fn run_with_context_sync<F, R>(f: F) -> R
where
	F: FnOnce() -> R,
{
	RENDER_CONTEXT.sync_scope(RenderContext::new(), f)
}

/// Returns the current render context.
///
/// # Errors
///
/// Returns [`ContextError::NotInitialized`] when called outside
/// [`run_with_context`] / [`run_with_context_sync`].
pub fn current_context() -> Result<RenderContext, ContextError> {
	RENDER_CONTEXT
		.try_with(RenderContext::clone)
		.map_err(|_| ContextError::NotInitialized)
}

/// Returns the current render context, or the thread's default context (id 0).
pub fn current_context_or_default() -> RenderContext {
	current_context().unwrap_or_else(|_| DEFAULT_CONTEXT.with(RenderContext::clone))
}

/// Queues server-only work on the current render context.
///
/// The render awaits the future before producing HTML. During hydration the
/// future is dropped without being polled, so server-only side effects are
/// never replayed on the client.
///
/// # Errors
///
/// Returns [`ContextError::NotInitialized`] when called on the server
/// outside of a render context.
pub fn server_only<F, E>(future: F) -> Result<(), ContextError>
where
	F: Future<Output = Result<(), E>> + 'static,
	E: Error + 'static,
{
	if crate::hydration::is_hydrating() {
		crate::debug_log!("hydration: skipping server-only task");
		return Ok(());
	}
	current_context()?.spawn_pending(future);
	Ok(())
}
