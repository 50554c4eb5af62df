//! Routing of reactive registrations.
//!
//! The reactive core announces every new value through its registration
//! hook. This module installs the hook for the current thread and forwards
//! each announcement to whichever consumer is active: the hydration session
//! on the client, or the capture scope of the current render context on the
//! server. Outside of both, announcements are dropped.

use std::cell::Cell;
use std::rc::Rc;

use seidr_core::reactive::{
	Observable, RegistrationHook, has_registration_hook, set_registration_hook,
};

use crate::hydration::current_session;
use crate::ssr::registry::active_scope;

struct SeidrHook;

impl RegistrationHook for SeidrHook {
	fn on_create(&self, node: &Rc<dyn Observable>) {
		if let Some(session) = current_session() {
			session.on_create(node);
		} else if let Some(scope) = active_scope() {
			scope.register(node);
		}
	}

	fn on_derive(&self, node: &Rc<dyn Observable>, parents: &[Rc<dyn Observable>]) {
		if let Some(session) = current_session() {
			session.on_derive(node, parents);
		} else if let Some(scope) = active_scope() {
			scope.register_derived(node, parents);
		}
	}
}

thread_local! {
	static INSTALLED: Cell<bool> = const { Cell::new(false) };
}

/// Installs the hook on this thread unless it is already in place.
pub(crate) fn ensure_installed() {
	if INSTALLED.with(Cell::get) && has_registration_hook() {
		return;
	}
	if set_registration_hook(Rc::new(SeidrHook)).is_some() {
		crate::warn_log!("replaced a foreign registration hook on this thread");
	}
	INSTALLED.with(|installed| installed.set(true));
}

/// Announces that `prop` of element `element_id` is driven by `node`.
///
/// Records the binding when capturing and applies the captured binding
/// when hydrating.
pub(crate) fn bind_property(node: &Rc<dyn Observable>, element_id: u64, prop: &str) {
	if let Some(session) = current_session() {
		session.apply_binding(node, element_id, prop);
	} else if let Some(scope) = active_scope() {
		scope.register_binding(node, element_id, prop);
	}
}

/// Announces the dependencies of a reactive region.
///
/// The capture scope keeps their roots; the hydration session registers
/// any it has not seen yet, in the same order.
pub(crate) fn track_region(deps: &[Rc<dyn Observable>]) {
	if let Some(session) = current_session() {
		session.on_region(deps);
	} else if let Some(scope) = active_scope() {
		scope.register_region(deps);
	}
}
