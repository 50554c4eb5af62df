//! Active capture scopes, keyed by render context.
//!
//! Each render context owns a stack of [`SsrScope`]s; the top of the stack
//! for the *current* context is the active scope that registrations go to.
//! Looking scopes up by context id (never through one shared pointer) keeps
//! concurrent renders from seeing each other's registrations.
//!
//! Reactive values are `Rc`-based and never leave the thread that created
//! them, so the map is kept per thread.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use super::scope::SsrScope;
use crate::context::current_context;

thread_local! {
	static ACTIVE_SCOPES: RefCell<HashMap<u64, Vec<Rc<SsrScope>>>> = RefCell::new(HashMap::new());
}

/// Makes `scope` the active scope of context `context_id` until the returned
/// guard is dropped.
#[must_use = "the scope is popped as soon as the guard is dropped"]
pub fn push_scope(context_id: u64, scope: Rc<SsrScope>) -> ScopeGuard {
	ACTIVE_SCOPES.with(|scopes| {
		scopes
			.borrow_mut()
			.entry(context_id)
			.or_default()
			.push(scope)
	});
	crate::debug_log!("scope pushed for render context {}", context_id);
	ScopeGuard { context_id }
}

/// Removes and returns the active scope of context `context_id`.
pub fn pop_scope(context_id: u64) -> Option<Rc<SsrScope>> {
	ACTIVE_SCOPES
		.try_with(|scopes| {
			let mut scopes = scopes.borrow_mut();
			let stack = scopes.get_mut(&context_id)?;
			let scope = stack.pop();
			if stack.is_empty() {
				scopes.remove(&context_id);
			}
			scope
		})
		.ok()
		.flatten()
}

/// The active scope of context `context_id`, if any.
pub fn active_scope_for(context_id: u64) -> Option<Rc<SsrScope>> {
	ACTIVE_SCOPES.with(|scopes| {
		scopes
			.borrow()
			.get(&context_id)
			.and_then(|stack| stack.last().cloned())
	})
}

/// The active scope of the current render context, if any.
///
/// Returns `None` outside of a render context.
pub fn active_scope() -> Option<Rc<SsrScope>> {
	current_context()
		.ok()
		.and_then(|context| active_scope_for(context.id()))
}

/// Number of render contexts that currently have an active scope.
pub fn active_context_count() -> usize {
	ACTIVE_SCOPES.with(|scopes| scopes.borrow().len())
}

/// Pops the scope pushed by [`push_scope`] when dropped.
#[derive(Debug)]
pub struct ScopeGuard {
	context_id: u64,
}

impl ScopeGuard {
	/// The render context this guard belongs to.
	pub fn context_id(&self) -> u64 {
		self.context_id
	}
}

impl Drop for ScopeGuard {
	fn drop(&mut self) {
		pop_scope(self.context_id);
	}
}
