//! The capabilities this crate needs from a document host.
//!
//! [`Dom`](`crate::Dom`) and everything below it are written against [`Platform`] only.
//! [`WebPlatform`](`crate::web::WebPlatform`) implements it on top of [`web_sys`] in the browser,
//! [`MemoryPlatform`](`crate::memory::MemoryPlatform`) implements it as a headless document with an explicit event loop.

use crate::Result;
use core::fmt::Debug;

/// One of two deferred execution channels with distinct ordering guarantees.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Channel {
	/// Runs after the currently executing synchronous code, before the platform delivers further change records.
	///
	/// Microtask-equivalent.
	EndOfTurn,
	/// Runs before the next paint.
	///
	/// Animation-frame-equivalent.
	NextPaint,
}

/// Which mutations a subscription created through [`Platform::observe`] is interested in.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ObserveOptions {
	pub attributes: bool,
	pub child_list: bool,
	pub subtree: bool,
}
impl ObserveOptions {
	/// Attribute changes on the target element itself.
	#[must_use]
	pub fn attributes() -> Self {
		Self {
			attributes: true,
			..Self::default()
		}
	}

	/// Child list changes anywhere below (and including) the target element.
	#[must_use]
	pub fn child_list_subtree() -> Self {
		Self {
			child_list: true,
			subtree: true,
			..Self::default()
		}
	}
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChangeKind {
	Attribute { name: String },
	ChildList,
	CharacterData,
}

/// A single mutation, as delivered in a batch to a subscription callback.
#[derive(Debug, Clone)]
pub struct ChangeRecord<E> {
	/// [`None`] iff the target isn't an element (e.g. for [`ChangeKind::CharacterData`]).
	pub target: Option<E>,
	pub kind: ChangeKind,
}

/// An entry of an element's child list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Child<N> {
	Node(N),
	Text(String),
}
impl<N> Child<N> {
	pub fn as_node(&self) -> Option<&N> {
		match self {
			Child::Node(node) => Some(node),
			Child::Text(_) => None,
		}
	}

	pub fn as_text(&self) -> Option<&str> {
		match self {
			Child::Node(_) => None,
			Child::Text(text) => Some(text.as_str()),
		}
	}
}

impl<N> From<&str> for Child<N> {
	fn from(text: &str) -> Self {
		Child::Text(text.to_owned())
	}
}
impl<N> From<String> for Child<N> {
	fn from(text: String) -> Self {
		Child::Text(text)
	}
}

pub type ChangeCallback<E> = Box<dyn FnMut(&[ChangeRecord<E>])>;
pub type Task = Box<dyn FnOnce()>;

/// A single-threaded document host.
///
/// Implementations are cheap handles: clones refer to the same document.
///
/// # Re-entrancy
///
/// Callbacks are never invoked synchronously from within a method of this trait,
/// and all callbacks may call back into the platform.
pub trait Platform: Clone + Debug + 'static {
	type Element: Clone + Debug + 'static;
	/// Dropping this cancels the subscription it was returned for.
	type Subscription: 'static;

	/// A key that is unique to `element` for as long as it is alive and never reused for another element.
	///
	/// This must not keep `element` alive.
	fn element_key(&self, element: &Self::Element) -> u64;

	fn tag_name(&self, element: &Self::Element) -> String;
	fn attribute(&self, element: &Self::Element, name: &str) -> Option<String>;
	fn attributes(&self, element: &Self::Element) -> Vec<(String, String)>;

	/// # Errors
	///
	/// Iff the platform rejects the attribute name.
	fn set_attribute(&self, element: &Self::Element, name: &str, value: &str) -> Result<()>;

	/// Removing a missing attribute is not an error.
	///
	/// # Errors
	///
	/// Iff the platform rejects the attribute name.
	fn remove_attribute(&self, element: &Self::Element, name: &str) -> Result<()>;

	fn text_content(&self, element: &Self::Element) -> String;
	fn set_text_content(&self, element: &Self::Element, text: &str);
	fn child_nodes(&self, element: &Self::Element) -> Vec<Child<Self::Element>>;

	/// Creates a new, unmounted element.
	///
	/// # Errors
	///
	/// Iff the platform rejects the tag name.
	fn create_element(&self, tag: &str) -> Result<Self::Element>;

	/// Appends `child` to `parent`, detaching it from its previous parent first.
	///
	/// # Errors
	///
	/// Iff the platform rejects the insertion (e.g. because it would create a cycle).
	fn append_child(&self, parent: &Self::Element, child: &Self::Element) -> Result<()>;
	fn append_text(&self, parent: &Self::Element, text: &str) -> Result<()>;

	/// Detaches `element` from its parent, if it has one.
	fn remove(&self, element: &Self::Element);

	/// The root element of the document (`<html>`), if there is one.
	fn document_element(&self) -> Option<Self::Element>;

	/// All elements in the document matching `selector`, in document order.
	///
	/// # Errors
	///
	/// [`Error::SelectorSyntax`](`crate::Error::SelectorSyntax`) iff `selector` is malformed.
	fn query_selector_all(&self, selector: &str) -> Result<Vec<Self::Element>>;

	/// The first element in document order matching `selector`.
	///
	/// # Errors
	///
	/// [`Error::SelectorSyntax`](`crate::Error::SelectorSyntax`) iff `selector` is malformed.
	fn query_selector(&self, selector: &str) -> Result<Option<Self::Element>> {
		Ok(self.query_selector_all(selector)?.into_iter().next())
	}

	/// Subscribes `callback` to batched, asynchronously delivered change records for `target`.
	///
	/// # Errors
	///
	/// Iff the platform refuses the subscription.
	fn observe(&self, target: &Self::Element, options: ObserveOptions, callback: ChangeCallback<Self::Element>) -> Result<Self::Subscription>;

	fn defer(&self, channel: Channel, task: Task);

	/// The location's fragment, including the leading `#` if not empty.
	fn location_hash(&self) -> String;

	/// Changes the location's fragment. Iff that changes it, a navigation event is delivered later.
	fn set_location_hash(&self, hash: &str);

	/// Subscribes `callback` to fragment changes.
	///
	/// # Errors
	///
	/// Iff the platform refuses the subscription.
	fn on_navigate(&self, callback: Box<dyn FnMut()>) -> Result<Self::Subscription>;

	/// Whether the document has finished parsing (`interactive` or `complete`).
	fn is_ready(&self) -> bool;

	/// Runs `task` once when the document becomes ready. Must only be called while not [ready](`Platform::is_ready`).
	fn on_ready(&self, task: Task);
}
