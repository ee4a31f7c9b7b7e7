mod common;

use common::{init_tracing, setup};
use reactive_dom::{memory::MemoryPlatform, ConfigurationError, Dom, Error, RouteContext};
use std::{cell::RefCell, rc::Rc};

type Log = Rc<RefCell<Vec<String>>>;

fn recorder(log: &Log, name: &'static str) -> impl Fn(&RouteContext) + 'static {
	let log = log.clone();
	move |context| {
		let mut params: Vec<_> = context.params.iter().map(|(k, v)| format!("{}={}", k, v)).collect();
		params.sort();
		log.borrow_mut().push(format!("{} {} {}", name, context.path, params.join(",")).trim_end().to_owned());
	}
}

#[test]
fn initial_dispatch_sees_all_routes_registered_together() {
	let (platform, dom) = setup();
	platform.set_location_hash("#/b");
	platform.run_until_idle();

	let log = Log::default();
	dom.route("/a", recorder(&log, "a")).unwrap();
	dom.route("/b", recorder(&log, "b")).unwrap();
	assert!(log.borrow().is_empty());

	platform.run_until_idle();
	assert_eq!(*log.borrow(), ["b /b"]);
}

#[test]
fn initial_dispatch_waits_for_ready() {
	init_tracing();
	let platform = MemoryPlatform::loading();
	let dom = Dom::new(platform.clone()).unwrap();

	let log = Log::default();
	dom.route_default(recorder(&log, "default"));
	platform.run_until_idle();
	assert!(log.borrow().is_empty());

	platform.finish_loading();
	platform.run_until_idle();
	assert_eq!(*log.borrow(), ["default /"]);
}

#[test]
fn navigation_dispatches_with_parameters() {
	let (platform, dom) = setup();
	let log = Log::default();
	dom.route("/user/:id", recorder(&log, "user")).unwrap();
	dom.route("/post/:year/:slug", recorder(&log, "post")).unwrap();
	platform.run_until_idle();
	assert!(log.borrow().is_empty());

	dom.navigate("/user/42");
	platform.run_until_idle();
	dom.navigate("#/post/2024/hello-world");
	platform.run_until_idle();

	assert_eq!(*log.borrow(), ["user /user/42 id=42", "post /post/2024/hello-world slug=hello-world,year=2024"]);
}

#[test]
fn navigating_to_the_current_location_does_nothing() {
	let (platform, dom) = setup();
	let log = Log::default();
	dom.route("/x", recorder(&log, "x")).unwrap();
	dom.navigate("/x");
	platform.run_until_idle();
	assert_eq!(log.borrow().len(), 2);

	dom.navigate("/x");
	platform.run_until_idle();
	assert_eq!(log.borrow().len(), 2);
}

#[test]
fn first_match_wins() {
	let (platform, dom) = setup();
	let log = Log::default();
	dom.route("/user/:id", recorder(&log, "param")).unwrap();
	dom.route("/user/me", recorder(&log, "literal")).unwrap();
	dom.route("*", recorder(&log, "wildcard")).unwrap();
	platform.run_until_idle();

	dom.navigate("/user/me");
	platform.run_until_idle();
	dom.navigate("/elsewhere");
	platform.run_until_idle();

	assert_eq!(*log.borrow(), ["wildcard /", "param /user/me id=me", "wildcard /elsewhere"]);
}

#[test]
fn patterns_are_anchored() {
	let (platform, dom) = setup();
	let log = Log::default();
	dom.route("/user", recorder(&log, "user")).unwrap();
	dom.route_default(recorder(&log, "default"));
	platform.run_until_idle();

	dom.navigate("/user/extra");
	platform.run_until_idle();
	dom.navigate("/prefix/user");
	platform.run_until_idle();
	dom.navigate("/user");
	platform.run_until_idle();

	assert_eq!(*log.borrow(), ["default /", "default /user/extra", "default /prefix/user", "user /user"]);
}

#[test]
fn reregistration_replaces_in_place() {
	let (platform, dom) = setup();
	let log = Log::default();
	dom.route("/x", recorder(&log, "first")).unwrap();
	dom.route("*", recorder(&log, "wildcard")).unwrap();
	dom.route("/x", recorder(&log, "replacement")).unwrap();
	platform.run_until_idle();
	log.borrow_mut().clear();

	dom.navigate("/x");
	platform.run_until_idle();
	assert_eq!(*log.borrow(), ["replacement /x"]);
}

#[test]
fn query_strings_are_decoded() {
	let (platform, dom) = setup();
	let query = Rc::new(RefCell::new(None));
	dom.route("/search", {
		let query = query.clone();
		move |context| *query.borrow_mut() = Some(context.query.clone())
	})
	.unwrap();
	platform.run_until_idle();

	dom.navigate("/search?q=reactive+dom&page=2");
	platform.run_until_idle();

	let query = query.borrow_mut().take().unwrap();
	assert_eq!(query.get("q").map(String::as_str), Some("reactive dom"));
	assert_eq!(query.get("page").map(String::as_str), Some("2"));
}

#[test]
fn the_selector_cache_is_cleared_before_handlers_run() {
	let (platform, dom) = setup();
	let cached_during_dispatch = Rc::new(RefCell::new(Vec::new()));
	dom.route("/page", {
		let dom = dom.clone();
		let cached_during_dispatch = cached_during_dispatch.clone();
		move |_| cached_during_dispatch.borrow_mut().push(dom.invalidate("p"))
	})
	.unwrap();
	platform.run_until_idle();

	let _p = dom.select_all("p", true).unwrap();
	dom.navigate("/page");
	platform.run_until_idle();
	assert_eq!(*cached_during_dispatch.borrow(), [false]);
}

#[test]
fn handlers_may_navigate() {
	let (platform, dom) = setup();
	let log = Log::default();
	dom.route("/old", {
		let dom = dom.clone();
		move |_| dom.navigate("/new")
	})
	.unwrap();
	dom.route("/new", recorder(&log, "new")).unwrap();
	platform.run_until_idle();

	dom.navigate("/old");
	platform.run_until_idle();
	assert_eq!(*log.borrow(), ["new /new"]);
	assert_eq!(reactive_dom::Platform::location_hash(&platform), "#/new");
}

#[test]
fn invalid_patterns_are_rejected() {
	let (_platform, dom) = setup();
	assert!(matches!(
		dom.route("", |_| ()),
		Err(Error::Configuration(ConfigurationError::InvalidRoutePattern { .. }))
	));
	assert!(matches!(
		dom.route("/:id/:id", |_| ()),
		Err(Error::Configuration(ConfigurationError::InvalidRoutePattern { .. }))
	));
}

#[test]
fn dispatch_can_be_triggered_manually() {
	let (platform, dom) = setup();
	let log = Log::default();
	dom.route_default(recorder(&log, "default"));
	platform.run_until_idle();

	dom.dispatch();
	assert_eq!(*log.borrow(), ["default /", "default /"]);
}
