//! The [`Platform`] of the browser's main thread, on top of [`web_sys`].

use crate::{
	platform::{ChangeCallback, ChangeKind, ChangeRecord, Channel, Child, ObserveOptions, Platform, Task},
	Dom, Error, Result,
};
use core::{
	cell::{Cell, RefCell},
	fmt::{self, Debug, Formatter},
};
use js_sys::{Array, Function, Object, WeakMap};
use std::rc::Rc;
use tracing::{error, trace, warn};
use wasm_bindgen::{closure::Closure, JsCast, JsValue};
use web_sys::{AddEventListenerOptions, Document, Element, EventTarget, MutationObserver, MutationObserverInit, MutationRecord, Node, Text, Window};

/// The current window's document.
///
/// Clones refer to the same document and share element keys.
#[derive(Debug, Clone)]
pub struct WebPlatform {
	window: Window,
	document: Document,
	keys: WeakMap,
	next_key: Rc<Cell<u64>>,
}

impl WebPlatform {
	/// # Errors
	///
	/// Iff there is no window or it has no document, e.g. in a worker.
	pub fn new() -> Result<Self> {
		let window = web_sys::window().ok_or_else(|| Error::Platform("No window found.".to_owned()))?;
		let document = window.document().ok_or_else(|| Error::Platform("The window has no document.".to_owned()))?;
		Ok(Self {
			window,
			document,
			keys: WeakMap::new(),
			next_key: Rc::default(),
		})
	}

	fn queue_microtask(&self, task: Task) {
		self.window.queue_microtask(Closure::once_into_js(move || task()).unchecked_ref());
	}
}

thread_local! {
	static DOM: RefCell<Option<Dom<WebPlatform>>> = RefCell::new(None);
}

/// The [`Dom`] of the current window's document, created with default [`Options`](`crate::Options`) on first use.
///
/// # Errors
///
/// Iff [`WebPlatform::new`] or [`Dom::new`] fails. The next call tries again in that case.
pub fn dom() -> Result<Dom<WebPlatform>> {
	DOM.with(|dom| {
		if let Some(dom) = &*dom.borrow() {
			return Ok(dom.clone());
		}
		let created = Dom::new(WebPlatform::new()?)?;
		*dom.borrow_mut() = Some(created.clone());
		Ok(created)
	})
}

fn describe(error: &JsValue) -> String {
	match error.dyn_ref::<js_sys::Error>() {
		Some(error) => format!("{}: {}", String::from(error.name()), String::from(error.message())),
		None => format!("{:?}", error),
	}
}

fn js_error(error: JsValue) -> Error {
	Error::Platform(describe(&error))
}

enum Registration {
	Observer {
		observer: MutationObserver,
		callback: Closure<dyn FnMut(Array, MutationObserver)>,
	},
	Listener {
		target: EventTarget,
		event: &'static str,
		callback: Closure<dyn FnMut()>,
	},
}

/// Disconnects an observer or removes an event listener when dropped.
#[must_use = "The subscription is cancelled when dropped."]
pub struct WebSubscription {
	platform: WebPlatform,
	registration: Option<Registration>,
}

impl Debug for WebSubscription {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		let kind = match &self.registration {
			Some(Registration::Observer { .. }) => "observer",
			Some(Registration::Listener { event, .. }) => *event,
			None => "cancelled",
		};
		f.debug_tuple("WebSubscription").field(&kind).finish()
	}
}

impl Drop for WebSubscription {
	fn drop(&mut self) {
		let registration = match self.registration.take() {
			Some(registration) => registration,
			None => return,
		};
		match &registration {
			Registration::Observer { observer, .. } => observer.disconnect(),
			Registration::Listener { target, event, callback } => {
				if let Err(error) = target.remove_event_listener_with_callback(event, callback.as_ref().unchecked_ref()) {
					warn!(event, error = %describe(&error), "Failed to remove event listener.");
				}
			}
		}
		// The subscription may be dropped from within its own callback, which must stay alive until that returns.
		self.platform.queue_microtask(Box::new(move || {
			trace!("Freeing subscription callback.");
			drop(registration);
		}));
	}
}

fn change_record(record: &MutationRecord) -> ChangeRecord<Element> {
	let kind = match record.type_().as_str() {
		"attributes" => ChangeKind::Attribute {
			name: record.attribute_name().unwrap_or_default(),
		},
		"childList" => ChangeKind::ChildList,
		_ => ChangeKind::CharacterData,
	};
	ChangeRecord {
		target: record.target().and_then(|target| target.dyn_into::<Element>().ok()),
		kind,
	}
}

impl Platform for WebPlatform {
	type Element = Element;
	type Subscription = WebSubscription;

	#[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss, clippy::cast_sign_loss)]
	fn element_key(&self, element: &Element) -> u64 {
		let object: &Object = element.as_ref();
		if let Some(key) = self.keys.get(object).as_f64() {
			return key as u64;
		}
		let key = self.next_key.get();
		self.next_key.set(key + 1);
		self.keys.set(object, &JsValue::from_f64(key as f64));
		key
	}

	fn tag_name(&self, element: &Element) -> String {
		element.tag_name()
	}

	fn attribute(&self, element: &Element, name: &str) -> Option<String> {
		element.get_attribute(name)
	}

	fn attributes(&self, element: &Element) -> Vec<(String, String)> {
		element
			.get_attribute_names()
			.iter()
			.filter_map(|name| name.as_string())
			.filter_map(|name| element.get_attribute(&name).map(|value| (name, value)))
			.collect()
	}

	fn set_attribute(&self, element: &Element, name: &str, value: &str) -> Result<()> {
		element.set_attribute(name, value).map_err(js_error)
	}

	fn remove_attribute(&self, element: &Element, name: &str) -> Result<()> {
		element.remove_attribute(name).map_err(js_error)
	}

	fn text_content(&self, element: &Element) -> String {
		element.text_content().unwrap_or_default()
	}

	fn set_text_content(&self, element: &Element, text: &str) {
		element.set_text_content((!text.is_empty()).then(|| text));
	}

	fn child_nodes(&self, element: &Element) -> Vec<Child<Element>> {
		let children = element.child_nodes();
		(0..children.length())
			.filter_map(|i| children.get(i))
			.filter_map(|child| {
				if let Some(text) = child.dyn_ref::<Text>() {
					Some(Child::Text(text.data()))
				} else {
					child.dyn_into::<Element>().ok().map(Child::Node)
				}
			})
			.collect()
	}

	fn create_element(&self, tag: &str) -> Result<Element> {
		self.document.create_element(tag).map_err(js_error)
	}

	fn append_child(&self, parent: &Element, child: &Element) -> Result<()> {
		let child: &Node = child.as_ref();
		parent.append_child(child).map(drop).map_err(js_error)
	}

	fn append_text(&self, parent: &Element, text: &str) -> Result<()> {
		let text = self.document.create_text_node(text);
		parent.append_child(text.as_ref()).map(drop).map_err(js_error)
	}

	fn remove(&self, element: &Element) {
		element.remove();
	}

	fn document_element(&self) -> Option<Element> {
		self.document.document_element()
	}

	fn query_selector_all(&self, selector: &str) -> Result<Vec<Element>> {
		let found = self.document.query_selector_all(selector).map_err(|error| Error::selector_syntax(selector, describe(&error)))?;
		Ok((0..found.length()).filter_map(|i| found.get(i)).filter_map(|node| node.dyn_into::<Element>().ok()).collect())
	}

	fn query_selector(&self, selector: &str) -> Result<Option<Element>> {
		self.document.query_selector(selector).map_err(|error| Error::selector_syntax(selector, describe(&error)))
	}

	#[allow(deprecated)]
	fn observe(&self, target: &Element, options: ObserveOptions, mut callback: ChangeCallback<Element>) -> Result<WebSubscription> {
		let callback = Closure::wrap(Box::new(move |records: Array, _: MutationObserver| {
			let records: Vec<_> = records.iter().map(|record| change_record(record.unchecked_ref())).collect();
			callback(&records);
		}) as Box<dyn FnMut(Array, MutationObserver)>);
		let observer = MutationObserver::new(callback.as_ref().unchecked_ref()).map_err(js_error)?;

		let mut init = MutationObserverInit::new();
		init.attributes(options.attributes);
		init.child_list(options.child_list);
		init.subtree(options.subtree);
		observer.observe_with_options(target.as_ref(), &init).map_err(js_error)?;

		Ok(WebSubscription {
			platform: self.clone(),
			registration: Some(Registration::Observer { observer, callback }),
		})
	}

	fn defer(&self, channel: Channel, task: Task) {
		match channel {
			Channel::EndOfTurn => self.queue_microtask(task),
			Channel::NextPaint => {
				let callback = Closure::once_into_js(move |_: f64| task());
				if let Err(error) = self.window.request_animation_frame(callback.unchecked_ref()) {
					error!(error = %describe(&error), "Failed to request an animation frame. The deferred task is dropped.");
				}
			}
		}
	}

	fn location_hash(&self) -> String {
		self.window.location().hash().unwrap_or_else(|error| {
			warn!(error = %describe(&error), "Failed to read the location hash.");
			String::new()
		})
	}

	fn set_location_hash(&self, hash: &str) {
		if let Err(error) = self.window.location().set_hash(hash) {
			error!(error = %describe(&error), "Failed to set the location hash.");
		}
	}

	fn on_navigate(&self, callback: Box<dyn FnMut()>) -> Result<WebSubscription> {
		let callback = Closure::wrap(callback);
		let target: &EventTarget = self.window.as_ref();
		target.add_event_listener_with_callback("hashchange", callback.as_ref().unchecked_ref()).map_err(js_error)?;
		Ok(WebSubscription {
			platform: self.clone(),
			registration: Some(Registration::Listener {
				target: target.clone(),
				event: "hashchange",
				callback,
			}),
		})
	}

	fn is_ready(&self) -> bool {
		self.document.ready_state() != "loading"
	}

	#[allow(deprecated)]
	fn on_ready(&self, task: Task) {
		let callback: Function = Closure::once_into_js(move || task()).unchecked_into();
		let mut options = AddEventListenerOptions::new();
		options.once(true);
		if let Err(error) = self
			.document
			.add_event_listener_with_callback_and_add_event_listener_options("DOMContentLoaded", &callback, &options)
		{
			error!(error = %describe(&error), "Failed to listen for DOMContentLoaded. The ready callback is dropped.");
		}
	}
}
