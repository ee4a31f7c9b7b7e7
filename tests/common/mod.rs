#![allow(dead_code)]

use reactive_dom::{memory::MemoryPlatform, Dom};
use tracing_subscriber::EnvFilter;

pub fn init_tracing() {
	tracing_subscriber::fmt()
		.with_env_filter(EnvFilter::from_default_env())
		.with_test_writer()
		.try_init()
		.ok();
}

pub fn setup() -> (MemoryPlatform, Dom<MemoryPlatform>) {
	init_tracing();
	let platform = MemoryPlatform::new();
	let dom = Dom::new(platform.clone()).unwrap();
	(platform, dom)
}
