mod common;

use common::setup;
use reactive_dom::{memory::MemoryPlatform, Dom, NodeList};

fn items(dom: &Dom<MemoryPlatform>, count: usize) -> NodeList<MemoryPlatform> {
	let list = dom.create("ul", &[], vec![]).unwrap();
	dom.mount(&list, "body").unwrap();
	for i in 0..count {
		let index = i.to_string();
		let item = dom.create("li", &[("data-index", index.as_str())], vec![]).unwrap();
		list.append_child(&item).unwrap();
	}
	dom.select_all("li", false).unwrap()
}

#[test]
fn bulk_writes_wait_for_the_next_paint() {
	let (platform, dom) = setup();
	let items = items(&dom, 3);

	items.add_class("active");
	items.set_attr("role", "listitem");
	items.set_style("color", "red");
	platform.run_microtasks();
	assert!(items.iter().all(|item| !item.has_class("active")));
	assert!(items.iter().all(|item| !item.attrs().contains("role")));

	platform.run_animation_frame();
	for item in &items {
		assert!(item.has_class("active"));
		assert_eq!(item.attrs().get("role").as_deref(), Some("listitem"));
		assert_eq!(item.style("color").as_deref(), Some("red"));
		assert_eq!(platform.attribute(*item.element(), "class").as_deref(), Some("active"));
	}

	items.remove_class("active");
	items.toggle_class("odd");
	items.remove_attr("role");
	platform.run_animation_frame();
	for item in &items {
		assert!(!item.has_class("active"));
		assert!(item.has_class("odd"));
		assert!(!item.attrs().contains("role"));
	}
}

#[test]
fn failed_bulk_writes_do_not_stop_the_batch() {
	let (platform, dom) = setup();
	let items = items(&dom, 2);

	items.set_attr("bad name", "x");
	items.set_attr("good", "y");
	platform.run_animation_frame();
	assert!(items.iter().all(|item| item.attrs().get("good").as_deref() == Some("y")));
}

#[test]
fn empty_lists_schedule_nothing() {
	let (platform, dom) = setup();
	let empty = dom.select_all("nothing", false).unwrap();
	assert!(empty.is_empty());
	empty.add_class("x");
	platform.run_until_idle();
}

#[test]
fn combinators() {
	let (_platform, dom) = setup();
	let items = items(&dom, 4);

	let indices = items.map(|item| item.attrs().get("data-index").unwrap());
	assert_eq!(indices, ["0", "1", "2", "3"]);

	let even = items.filter(|item| item.attrs().get("data-index").map_or(false, |i| i.parse::<usize>().unwrap() % 2 == 0));
	assert_eq!(even.len(), 2);
	assert_eq!(even[1], items[2]);

	let third = items.find(|item| item.attrs().get("data-index").as_deref() == Some("2"));
	assert_eq!(third.as_ref(), Some(&items[2]));

	let mut count = 0;
	items.for_each(|_| count += 1);
	assert_eq!(count, 4);

	let collected: NodeList<_> = items.iter().rev().cloned().collect();
	assert_eq!(collected.first(), items.last());
}
