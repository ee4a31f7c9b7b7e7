//! A headless [`Platform`] with an explicit event loop.
//!
//! Nothing happens asynchronously on its own: change records, deferred tasks, navigation and ready events
//! are queued and only run when the host calls [`MemoryPlatform::run_microtasks`], [`MemoryPlatform::run_task`],
//! [`MemoryPlatform::run_animation_frame`] or [`MemoryPlatform::run_until_idle`].
//!
//! Ordering follows the browser's: Mutation records are delivered in one notification microtask per burst,
//! which is queued when the first record of the burst is, and microtasks are drained after every task and animation frame callback.

mod document;
mod selector;

use self::{
	document::{Document, NodeKind, BODY, DOCUMENT, HEAD, HTML},
	selector::SelectorList,
};
use crate::{
	platform::{ChangeCallback, ChangeKind, ChangeRecord, Child, Channel, ObserveOptions, Platform, Task},
	Error, Result,
};
use core::{
	cell::{Cell, RefCell},
	fmt::{self, Debug, Formatter},
	mem,
};
use std::{
	collections::VecDeque,
	rc::{Rc, Weak},
};
use tracing::{instrument, trace};

/// An element of a [`MemoryPlatform`] document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ElementId(usize);

type SharedChangeCallback = Rc<RefCell<ChangeCallback<ElementId>>>;
type SharedListener = Rc<RefCell<Box<dyn FnMut()>>>;

struct Observer {
	id: u64,
	target: usize,
	options: ObserveOptions,
	callback: SharedChangeCallback,
	pending: Vec<ChangeRecord<ElementId>>,
}

#[derive(Default)]
struct EventLoop {
	microtasks: VecDeque<Task>,
	tasks: VecDeque<Task>,
	animation_frames: Vec<Task>,
	delivery_queued: bool,
	ready_tasks: Vec<Task>,
}

struct Inner {
	document: RefCell<Document>,
	observers: RefCell<Vec<Observer>>,
	navigation_listeners: RefCell<Vec<(u64, SharedListener)>>,
	event_loop: RefCell<EventLoop>,
	location_hash: RefCell<String>,
	ready: Cell<bool>,
	next_subscription: Cell<u64>,
}

/// A headless document (`<html><head></head><body></body></html>`) and its event loop.
///
/// Clones are handles to the same document.
#[derive(Clone)]
pub struct MemoryPlatform(Rc<Inner>);

impl Debug for MemoryPlatform {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		f.debug_struct("MemoryPlatform")
			.field("nodes", &self.0.document.try_borrow().map(|document| document.len()).ok())
			.field("location_hash", &self.0.location_hash.try_borrow().ok())
			.field("ready", &self.0.ready.get())
			.finish_non_exhaustive()
	}
}

impl Default for MemoryPlatform {
	fn default() -> Self {
		Self::new()
	}
}

/// Cancels an observation or navigation listener when dropped.
#[must_use = "The subscription is cancelled when dropped."]
pub struct MemorySubscription {
	platform: Weak<Inner>,
	id: u64,
}

impl Debug for MemorySubscription {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		f.debug_tuple("MemorySubscription").field(&self.id).finish()
	}
}

impl Drop for MemorySubscription {
	fn drop(&mut self) {
		let inner = match self.platform.upgrade() {
			Some(inner) => inner,
			None => return,
		};
		// Callbacks are dropped only after the borrows are released, as they may own further subscriptions.
		let observer = {
			let mut observers = inner.observers.borrow_mut();
			observers.iter().position(|observer| observer.id == self.id).map(|i| observers.remove(i))
		};
		let listener = {
			let mut listeners = inner.navigation_listeners.borrow_mut();
			listeners.iter().position(|(id, _)| *id == self.id).map(|i| listeners.remove(i))
		};
		trace!(id = self.id, observer = observer.is_some(), listener = listener.is_some(), "Cancelled subscription.");
		drop((observer, listener));
	}
}

impl MemoryPlatform {
	/// Creates a document that is already [ready](`Platform::is_ready`).
	#[must_use]
	pub fn new() -> Self {
		Self(Rc::new(Inner {
			document: RefCell::new(Document::new()),
			observers: RefCell::default(),
			navigation_listeners: RefCell::default(),
			event_loop: RefCell::default(),
			location_hash: RefCell::default(),
			ready: Cell::new(true),
			next_subscription: Cell::new(0),
		}))
	}

	/// Creates a document that is still loading, until [`MemoryPlatform::finish_loading`] is called.
	#[must_use]
	pub fn loading() -> Self {
		let platform = Self::new();
		platform.0.ready.set(false);
		platform
	}

	/// Marks the document as ready and queues a task running the pending ready callbacks.
	pub fn finish_loading(&self) {
		if self.0.ready.replace(true) {
			return;
		}
		let ready_tasks = mem::take(&mut self.0.event_loop.borrow_mut().ready_tasks);
		self.queue_task(Box::new(move || {
			for task in ready_tasks {
				task();
			}
		}));
	}

	#[must_use]
	pub fn head(&self) -> ElementId {
		ElementId(HEAD)
	}

	#[must_use]
	pub fn body(&self) -> ElementId {
		ElementId(BODY)
	}

	#[must_use]
	pub fn parent(&self, element: ElementId) -> Option<ElementId> {
		self.0.document.borrow().parent_element(element.0).map(ElementId)
	}

	/// Whether `element` is part of the document.
	#[must_use]
	pub fn is_connected(&self, element: ElementId) -> bool {
		self.0.document.borrow().is_inclusive_ancestor(DOCUMENT, element.0)
	}

	/// Number of active observations, mainly useful to check subscriptions are cancelled.
	#[must_use]
	pub fn observer_count(&self) -> usize {
		self.0.observers.borrow().len()
	}

	// Event loop.

	fn queue_microtask(&self, task: Task) {
		self.0.event_loop.borrow_mut().microtasks.push_back(task);
	}

	fn queue_task(&self, task: Task) {
		self.0.event_loop.borrow_mut().tasks.push_back(task);
	}

	/// Runs microtasks until there are none left, including those queued meanwhile.
	pub fn run_microtasks(&self) {
		loop {
			let task = self.0.event_loop.borrow_mut().microtasks.pop_front();
			match task {
				Some(task) => task(),
				None => break,
			}
		}
	}

	/// Runs the oldest queued task (navigation or ready event), then all microtasks.
	///
	/// Returns whether there was a task to run.
	pub fn run_task(&self) -> bool {
		let task = self.0.event_loop.borrow_mut().tasks.pop_front();
		match task {
			Some(task) => {
				task();
				self.run_microtasks();
				true
			}
			None => false,
		}
	}

	/// Runs the animation frame callbacks queued so far, each followed by a microtask checkpoint.
	///
	/// Callbacks queued meanwhile run in the next frame.
	pub fn run_animation_frame(&self) {
		let frame = mem::take(&mut self.0.event_loop.borrow_mut().animation_frames);
		trace!(callbacks = frame.len(), "Running animation frame.");
		for callback in frame {
			callback();
			self.run_microtasks();
		}
	}

	/// Runs microtasks, tasks and animation frames until no work is queued.
	pub fn run_until_idle(&self) {
		loop {
			self.run_microtasks();
			if self.run_task() {
				continue;
			}
			if self.0.event_loop.borrow().animation_frames.is_empty() {
				break;
			}
			self.run_animation_frame();
		}
	}

	// Change records.

	fn queue_record(&self, target: usize, kind: &ChangeKind) {
		let document = self.0.document.borrow();
		let mut queued = false;
		for observer in self.0.observers.borrow_mut().iter_mut() {
			let wanted = match kind {
				ChangeKind::Attribute { .. } => observer.options.attributes,
				ChangeKind::ChildList => observer.options.child_list,
				ChangeKind::CharacterData => false,
			};
			let in_scope = observer.target == target || (observer.options.subtree && document.is_inclusive_ancestor(observer.target, target));
			if wanted && in_scope {
				observer.pending.push(ChangeRecord {
					target: document.is_element(target).then(|| ElementId(target)),
					kind: kind.clone(),
				});
				queued = true;
			}
		}
		drop(document);

		if queued {
			let mut event_loop = self.0.event_loop.borrow_mut();
			if !event_loop.delivery_queued {
				event_loop.delivery_queued = true;
				let platform = Rc::downgrade(&self.0);
				event_loop.microtasks.push_back(Box::new(move || {
					if let Some(platform) = platform.upgrade() {
						MemoryPlatform(platform).deliver_records();
					}
				}));
			}
		}
	}

	#[instrument]
	fn deliver_records(&self) {
		self.0.event_loop.borrow_mut().delivery_queued = false;
		let batches: Vec<_> = self
			.0
			.observers
			.borrow_mut()
			.iter_mut()
			.filter(|observer| !observer.pending.is_empty())
			.map(|observer| (observer.id, observer.callback.clone(), mem::take(&mut observer.pending)))
			.collect();
		for (id, callback, records) in batches {
			// An earlier callback in this batch may have cancelled this subscription.
			if !self.0.observers.borrow().iter().any(|observer| observer.id == id) {
				continue;
			}
			trace!(id, records = records.len(), "Delivering change records.");
			(&mut *callback.borrow_mut())(&records);
		}
	}

	fn next_subscription_id(&self) -> u64 {
		let id = self.0.next_subscription.get();
		self.0.next_subscription.set(id + 1);
		id
	}

	// Native mutations. These are also how tests act like an unrelated script.

	/// # Errors
	///
	/// Iff `name` is not a valid attribute name.
	pub fn set_attribute(&self, element: ElementId, name: &str, value: &str) -> Result<()> {
		validate_attribute_name(name)?;
		self.0.document.borrow_mut().set_attribute(element.0, name, value);
		self.queue_record(element.0, &ChangeKind::Attribute { name: name.to_owned() });
		Ok(())
	}

	/// # Errors
	///
	/// Iff `name` is not a valid attribute name.
	pub fn remove_attribute(&self, element: ElementId, name: &str) -> Result<()> {
		validate_attribute_name(name)?;
		let removed = self.0.document.borrow_mut().remove_attribute(element.0, name);
		if removed {
			self.queue_record(element.0, &ChangeKind::Attribute { name: name.to_owned() });
		}
		Ok(())
	}

	#[must_use]
	pub fn attribute(&self, element: ElementId, name: &str) -> Option<String> {
		self.0.document.borrow().attribute(element.0, name).map(ToOwned::to_owned)
	}

	/// # Errors
	///
	/// Iff `child` is an inclusive ancestor of `parent`.
	pub fn append_child(&self, parent: ElementId, child: ElementId) -> Result<()> {
		let old_parent = {
			let mut document = self.0.document.borrow_mut();
			if document.is_inclusive_ancestor(child.0, parent.0) {
				return Err(Error::Platform("HierarchyRequestError: the new child is an ancestor of the parent".to_owned()));
			}
			let old_parent = document.detach(child.0);
			document.insert(parent.0, child.0);
			old_parent
		};
		if let Some(old_parent) = old_parent {
			self.queue_record(old_parent, &ChangeKind::ChildList);
		}
		self.queue_record(parent.0, &ChangeKind::ChildList);
		Ok(())
	}

	pub fn remove(&self, element: ElementId) {
		let parent = self.0.document.borrow_mut().detach(element.0);
		if let Some(parent) = parent {
			self.queue_record(parent, &ChangeKind::ChildList);
		}
	}

	pub fn set_text_content(&self, element: ElementId, text: &str) {
		let changed = {
			let mut document = self.0.document.borrow_mut();
			let had_children = document.clear_children(element.0);
			if !text.is_empty() {
				let text = document.create_text(text);
				document.insert(element.0, text);
			}
			had_children || !text.is_empty()
		};
		if changed {
			self.queue_record(element.0, &ChangeKind::ChildList);
		}
	}

	/// Changes the location fragment as if the user navigated, queueing a navigation event iff it changed.
	pub fn set_location_hash(&self, hash: &str) {
		let hash = match hash.trim_start_matches('#') {
			"" => String::new(),
			fragment => format!("#{}", fragment),
		};
		if *self.0.location_hash.borrow() == hash {
			return;
		}
		trace!(%hash, "Location hash changed.");
		*self.0.location_hash.borrow_mut() = hash;

		let platform = Rc::downgrade(&self.0);
		self.queue_task(Box::new(move || {
			let platform = match platform.upgrade() {
				Some(platform) => platform,
				None => return,
			};
			let listeners: Vec<_> = platform.navigation_listeners.borrow().clone();
			for (id, listener) in listeners {
				if platform.navigation_listeners.borrow().iter().any(|(active, _)| *active == id) {
					(&mut *listener.borrow_mut())();
				}
			}
		}));
	}
}

fn validate_attribute_name(name: &str) -> Result<()> {
	if name.is_empty() || name.chars().any(|c| c.is_whitespace() || c.is_control() || matches!(c, '"' | '\'' | '>' | '/' | '=')) {
		Err(Error::Platform(format!("InvalidCharacterError: {:?} is not a valid attribute name", name)))
	} else {
		Ok(())
	}
}

fn validate_tag_name(tag: &str) -> Result<()> {
	let mut chars = tag.chars();
	let valid = chars.next().map_or(false, |c| c.is_ascii_alphabetic()) && chars.all(|c| c.is_ascii_alphanumeric() || c == '-');
	if valid {
		Ok(())
	} else {
		Err(Error::Platform(format!("InvalidCharacterError: {:?} is not a valid tag name", tag)))
	}
}

impl Platform for MemoryPlatform {
	type Element = ElementId;
	type Subscription = MemorySubscription;

	fn element_key(&self, element: &ElementId) -> u64 {
		element.0 as u64
	}

	fn tag_name(&self, element: &ElementId) -> String {
		self.0.document.borrow().tag(element.0).map(str::to_ascii_uppercase).unwrap_or_default()
	}

	fn attribute(&self, element: &ElementId, name: &str) -> Option<String> {
		MemoryPlatform::attribute(self, *element, name)
	}

	fn attributes(&self, element: &ElementId) -> Vec<(String, String)> {
		self.0.document.borrow().attributes(element.0).to_vec()
	}

	fn set_attribute(&self, element: &ElementId, name: &str, value: &str) -> Result<()> {
		MemoryPlatform::set_attribute(self, *element, name, value)
	}

	fn remove_attribute(&self, element: &ElementId, name: &str) -> Result<()> {
		MemoryPlatform::remove_attribute(self, *element, name)
	}

	fn text_content(&self, element: &ElementId) -> String {
		self.0.document.borrow().text_content(element.0)
	}

	fn set_text_content(&self, element: &ElementId, text: &str) {
		MemoryPlatform::set_text_content(self, *element, text);
	}

	fn child_nodes(&self, element: &ElementId) -> Vec<Child<ElementId>> {
		let document = self.0.document.borrow();
		document
			.children(element.0)
			.iter()
			.filter_map(|&child| match document.kind(child)? {
				NodeKind::Element { .. } => Some(Child::Node(ElementId(child))),
				NodeKind::Text(text) => Some(Child::Text(text.clone())),
				NodeKind::Document => None,
			})
			.collect()
	}

	fn create_element(&self, tag: &str) -> Result<ElementId> {
		validate_tag_name(tag)?;
		Ok(ElementId(self.0.document.borrow_mut().create_element(tag)))
	}

	fn append_child(&self, parent: &ElementId, child: &ElementId) -> Result<()> {
		MemoryPlatform::append_child(self, *parent, *child)
	}

	fn append_text(&self, parent: &ElementId, text: &str) -> Result<()> {
		{
			let mut document = self.0.document.borrow_mut();
			let text = document.create_text(text);
			document.insert(parent.0, text);
		}
		self.queue_record(parent.0, &ChangeKind::ChildList);
		Ok(())
	}

	fn remove(&self, element: &ElementId) {
		MemoryPlatform::remove(self, *element);
	}

	fn document_element(&self) -> Option<ElementId> {
		Some(ElementId(HTML))
	}

	fn query_selector_all(&self, selector: &str) -> Result<Vec<ElementId>> {
		let selector = SelectorList::parse(selector)?;
		let document = self.0.document.borrow();
		let mut candidates = Vec::new();
		document.descendant_elements(DOCUMENT, &mut candidates);
		Ok(candidates.into_iter().filter(|&candidate| selector.matches(&document, candidate)).map(ElementId).collect())
	}

	fn observe(&self, target: &ElementId, options: ObserveOptions, callback: ChangeCallback<ElementId>) -> Result<MemorySubscription> {
		let id = self.next_subscription_id();
		self.0.observers.borrow_mut().push(Observer {
			id,
			target: target.0,
			options,
			callback: Rc::new(RefCell::new(callback)),
			pending: Vec::new(),
		});
		Ok(MemorySubscription {
			platform: Rc::downgrade(&self.0),
			id,
		})
	}

	fn defer(&self, channel: Channel, task: Task) {
		match channel {
			Channel::EndOfTurn => self.queue_microtask(task),
			Channel::NextPaint => self.0.event_loop.borrow_mut().animation_frames.push(task),
		}
	}

	fn location_hash(&self) -> String {
		self.0.location_hash.borrow().clone()
	}

	fn set_location_hash(&self, hash: &str) {
		MemoryPlatform::set_location_hash(self, hash);
	}

	fn on_navigate(&self, callback: Box<dyn FnMut()>) -> Result<MemorySubscription> {
		let id = self.next_subscription_id();
		self.0.navigation_listeners.borrow_mut().push((id, Rc::new(RefCell::new(callback))));
		Ok(MemorySubscription {
			platform: Rc::downgrade(&self.0),
			id,
		})
	}

	fn is_ready(&self) -> bool {
		self.0.ready.get()
	}

	fn on_ready(&self, task: Task) {
		if self.0.ready.get() {
			self.queue_task(task);
		} else {
			self.0.event_loop.borrow_mut().ready_tasks.push(task);
		}
	}
}
