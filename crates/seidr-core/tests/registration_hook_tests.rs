//! Integration tests for the registration hook
//!
//! These tests verify that:
//! 1. Every constructed value announces itself synchronously
//! 2. Derived values report their parents in derivation order
//! 3. Values created without a hook behave normally

use rstest::rstest;
use seidr_core::reactive::{
	NodeId, Observable, RegistrationHook, Signal, clear_registration_hook, set_registration_hook,
};
use serial_test::serial;
use std::cell::RefCell;
use std::rc::Rc;

#[derive(Debug, Clone, PartialEq)]
enum Event {
	Created(NodeId, bool),
	Derived(NodeId, Vec<NodeId>),
}

#[derive(Default)]
struct RecordingHook {
	events: RefCell<Vec<Event>>,
}

impl RegistrationHook for RecordingHook {
	fn on_create(&self, node: &Rc<dyn Observable>) {
		self.events
			.borrow_mut()
			.push(Event::Created(node.id(), node.is_derived()));
	}

	fn on_derive(&self, node: &Rc<dyn Observable>, parents: &[Rc<dyn Observable>]) {
		self.events.borrow_mut().push(Event::Derived(
			node.id(),
			parents.iter().map(|p| p.id()).collect(),
		));
	}
}

fn install() -> Rc<RecordingHook> {
	let hook = Rc::new(RecordingHook::default());
	set_registration_hook(hook.clone());
	hook
}

#[rstest]
#[serial(registration_hook)]
fn test_root_creation_is_announced() {
	let hook = install();

	let a = Signal::new(1);

	assert_eq!(*hook.events.borrow(), vec![Event::Created(a.id(), false)]);
	clear_registration_hook();
}

#[rstest]
#[serial(registration_hook)]
fn test_derive_announces_create_then_parents() {
	let hook = install();

	let a = Signal::new(2);
	let b = a.derive(|x| x * 2);

	assert_eq!(
		*hook.events.borrow(),
		vec![
			Event::Created(a.id(), false),
			Event::Created(b.id(), true),
			Event::Derived(b.id(), vec![a.id()]),
		]
	);
	clear_registration_hook();
}

#[rstest]
#[serial(registration_hook)]
fn test_computed_reports_parents_in_supplied_order() {
	let hook = install();

	let a = Signal::new(5);
	let b = Signal::new("x".to_string());
	let (a2, b2) = (a.clone(), b.clone());
	let label = Signal::computed(&[&b, &a], move || format!("{}{}", b2.get(), a2.get()));

	let events = hook.events.borrow();
	assert_eq!(
		events.last(),
		Some(&Event::Derived(label.id(), vec![b.id(), a.id()]))
	);
	assert_eq!(label.get(), "x5");
	drop(events);
	clear_registration_hook();
}

#[rstest]
#[serial(registration_hook)]
fn test_hook_can_write_root_during_construction() {
	struct Overwrite;

	impl RegistrationHook for Overwrite {
		fn on_create(&self, node: &Rc<dyn Observable>) {
			if !node.is_derived() {
				node.set_json(serde_json::json!(40)).unwrap();
			}
		}

		fn on_derive(&self, _node: &Rc<dyn Observable>, _parents: &[Rc<dyn Observable>]) {}
	}

	set_registration_hook(Rc::new(Overwrite));

	let a = Signal::new(1);
	let b = a.derive(|x| x + 2);

	// The root was overwritten before the derivation read it.
	assert_eq!(a.get(), 40);
	assert_eq!(b.get(), 42);
	clear_registration_hook();
}

#[rstest]
#[serial(registration_hook)]
fn test_values_without_hook() {
	clear_registration_hook();

	let a = Signal::new(3);
	let b = a.derive(|x| x + 1);
	a.set(4);
	assert_eq!(b.get(), 5);
}
