mod common;

use common::setup;
use hashbrown::HashMap;
use reactive_dom::{
	memory::{ElementId, MemoryPlatform},
	Error,
};

#[test]
fn writes_reach_the_element_synchronously() {
	let (platform, dom) = setup();
	let div = dom.create("div", &[], vec![]).unwrap();
	let element = *div.element();

	div.attrs().set("title", "x").unwrap();
	assert_eq!(platform.attribute(element, "title").as_deref(), Some("x"));
	assert_eq!(div.attrs().get("title").as_deref(), Some("x"));
	assert!(div.attrs().contains("title"));
	assert_eq!(div.attrs().len(), 1);

	div.attrs().remove("title").unwrap();
	assert_eq!(platform.attribute(element, "title"), None);
	assert!(div.attrs().is_empty());
}

#[test]
fn own_writes_do_not_echo() {
	let (platform, dom) = setup();
	let div = dom.create("div", &[], vec![]).unwrap();

	div.attrs().set("a", "1").unwrap();
	div.attrs().set("b", "2").unwrap();
	div.attrs().set("a", "3").unwrap();
	assert!(div.is_echo_suppressed());

	platform.run_microtasks();
	assert!(!div.is_echo_suppressed());
	assert_eq!(div.attrs().get("a").as_deref(), Some("3"));
	assert_eq!(div.attrs().get("b").as_deref(), Some("2"));
	assert_eq!(platform.attribute(*div.element(), "a").as_deref(), Some("3"));
}

#[test]
fn external_changes_are_absorbed() {
	let (platform, dom) = setup();
	let div = dom.create("div", &[], vec![]).unwrap();
	let element = *div.element();
	platform.run_until_idle();

	platform.set_attribute(element, "data-x", "1").unwrap();
	assert_eq!(div.attrs().get("data-x"), None);
	platform.run_microtasks();
	assert_eq!(div.attrs().get("data-x").as_deref(), Some("1"));

	// Only the current value is absorbed.
	platform.set_attribute(element, "data-x", "2").unwrap();
	platform.set_attribute(element, "data-x", "3").unwrap();
	platform.run_microtasks();
	assert_eq!(div.attrs().get("data-x").as_deref(), Some("3"));

	platform.remove_attribute(element, "data-x").unwrap();
	platform.run_microtasks();
	assert!(!div.attrs().contains("data-x"));
}

#[test]
fn external_changes_during_the_suppression_window_are_discarded() {
	let (platform, dom) = setup();
	let div = dom.create("div", &[], vec![]).unwrap();
	let element = *div.element();
	platform.run_until_idle();

	div.attrs().set("a", "1").unwrap();
	platform.set_attribute(element, "b", "2").unwrap();
	platform.run_microtasks();
	assert!(!div.attrs().contains("b"));

	// The window closes after one turn.
	platform.set_attribute(element, "c", "3").unwrap();
	platform.run_microtasks();
	assert_eq!(div.attrs().get("c").as_deref(), Some("3"));
}

#[test]
fn unchanged_writes_are_no_ops() {
	let (platform, dom) = setup();
	let div = dom.create("div", &[("a", "1")], vec![]).unwrap();
	platform.run_until_idle();
	assert!(!div.is_echo_suppressed());

	div.attrs().set("a", "1").unwrap();
	assert!(!div.is_echo_suppressed());

	div.attrs().remove("missing").unwrap();
	assert!(!div.is_echo_suppressed());
}

#[test]
fn rejected_writes_leave_the_store_unchanged() {
	let (platform, dom) = setup();
	let div = dom.create("div", &[], vec![]).unwrap();
	platform.run_until_idle();

	assert!(matches!(div.attrs().set("bad name", "x"), Err(Error::Platform(_))));
	assert!(div.attrs().is_empty());
	assert!(!div.is_echo_suppressed());
}

#[test]
fn handles_share_the_store() {
	let (_platform, dom) = setup();
	let div = dom.create("div", &[], vec![]).unwrap();
	let other = dom.wrap(div.element());

	div.attrs().set("title", "shared").unwrap();
	assert_eq!(other.attrs().get("title").as_deref(), Some("shared"));
	assert_eq!(other.attrs().to_map(), div.attrs().to_map());
}

#[test]
fn changes_to_an_element_detached_before_delivery_are_reconciled_quietly() {
	let (platform, dom) = setup();
	let div = dom.create("div", &[("title", "old")], vec![]).unwrap();
	dom.mount(&div, "body").unwrap();
	let element = *div.element();
	platform.run_until_idle();

	platform.set_attribute(element, "title", "new").unwrap();
	platform.set_attribute(element, "data-x", "1").unwrap();
	platform.remove(element);
	assert!(!platform.is_connected(element));
	platform.run_microtasks();

	assert_eq!(div.attrs().get("title").as_deref(), Some("new"));
	assert_eq!(div.attrs().get("data-x").as_deref(), Some("1"));
	assert_eq!(div.attrs().to_map(), platform_attributes(&platform, element, &["title", "data-x"]));

	// The detached wrapper keeps working in both directions.
	platform.remove_attribute(element, "data-x").unwrap();
	platform.run_microtasks();
	assert!(!div.attrs().contains("data-x"));
	div.attrs().set("title", "mine").unwrap();
	assert_eq!(platform.attribute(element, "title").as_deref(), Some("mine"));
}

fn platform_attributes(platform: &MemoryPlatform, element: ElementId, names: &[&str]) -> HashMap<String, String> {
	names.iter().filter_map(|&name| platform.attribute(element, name).map(|value| (name.to_owned(), value))).collect()
}
