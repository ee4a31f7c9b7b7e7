use crate::{
	attributes::{Attributes, Suppression},
	bridge,
	identity::IdentityCache,
	platform::{Child, Platform},
	Result,
};
use core::{
	cell::RefCell,
	fmt::{self, Debug, Formatter},
};
use hashbrown::HashMap;
use std::rc::Rc;
use tracing::{error, instrument, trace};

/// The model of a single DOM element.
///
/// There is at most one wrapper per element at a time: [`Dom::wrap`](`crate::Dom::wrap`) and selections return handles to the
/// existing wrapper while any handle to it is alive, and handles compare equal iff they refer to the same wrapper.
///
/// The wrapper's attribute store is kept in sync with the element in both directions:
/// Writes through [`Node::attrs`] are forwarded synchronously, while changes made to the element by other code
/// are absorbed once the platform delivers the corresponding change records.
pub struct Node<P: Platform>(Rc<NodeInner<P>>);

pub(crate) struct NodeInner<P: Platform> {
	cache: Rc<IdentityCache<P>>,
	pub(crate) key: u64,
	pub(crate) element: P::Element,
	tag: String,
	pub(crate) attributes: RefCell<HashMap<String, String>>,
	pub(crate) suppression: Rc<Suppression>,
	subscription: RefCell<Option<P::Subscription>>,
}

impl<P: Platform> NodeInner<P> {
	pub(crate) fn platform(&self) -> &P {
		self.cache.platform()
	}
}

impl<P: Platform> Drop for NodeInner<P> {
	fn drop(&mut self) {
		self.cache.forget(self.key);
	}
}

impl<P: Platform> Node<P> {
	/// Creates the wrapper for `element`, seeding its store and subscribing it to `element`'s attribute changes.
	///
	/// Only [`IdentityCache`] should call this.
	pub(crate) fn new(cache: Rc<IdentityCache<P>>, element: P::Element, key: u64) -> Self {
		let platform = cache.platform();
		let tag = platform.tag_name(&element);
		let attributes = platform.attributes(&element).into_iter().collect();
		let inner = Rc::new(NodeInner {
			cache,
			key,
			element,
			tag,
			attributes: RefCell::new(attributes),
			suppression: Rc::default(),
			subscription: RefCell::new(None),
		});
		match bridge::subscribe(&inner) {
			Ok(subscription) => *inner.subscription.borrow_mut() = Some(subscription),
			Err(error) => error!(%error, tag = %inner.tag, "Failed to observe element; external attribute changes won't be absorbed."),
		}
		Self(inner)
	}

	pub(crate) fn inner(&self) -> &Rc<NodeInner<P>> {
		&self.0
	}

	pub(crate) fn from_inner(inner: Rc<NodeInner<P>>) -> Self {
		Self(inner)
	}

	/// The tag name, as reported by the platform when the wrapper was created.
	#[must_use]
	pub fn tag(&self) -> &str {
		&self.0.tag
	}

	/// The native element.
	#[must_use]
	pub fn element(&self) -> &P::Element {
		&self.0.element
	}

	#[must_use]
	pub fn attrs(&self) -> Attributes<'_, P> {
		Attributes::new(self)
	}

	/// The concatenated text content of the element and its descendants.
	#[must_use]
	pub fn text(&self) -> String {
		self.0.platform().text_content(&self.0.element)
	}

	/// Replaces all children with a single text node (or none if `text` is empty).
	#[instrument(skip(self, text), fields(tag = %self.tag()))]
	pub fn set_text(&self, text: &str) {
		if cfg!(feature = "dangerous-logging") {
			trace!(text, "Replacing text content.");
		} else {
			trace!("Replacing text content.");
		}
		let platform = self.0.platform();
		platform.set_text_content(&self.0.element, text);
		self.0.suppression.engage(platform);
	}

	/// The current children, wrapped. This is recomputed on each call.
	#[must_use]
	pub fn children(&self) -> Vec<Child<Node<P>>> {
		self.0
			.platform()
			.child_nodes(&self.0.element)
			.into_iter()
			.map(|child| match child {
				Child::Node(element) => Child::Node(IdentityCache::wrap(&self.0.cache, &element)),
				Child::Text(text) => Child::Text(text),
			})
			.collect()
	}

	/// Appends `child`, moving it if it's already mounted elsewhere.
	///
	/// # Errors
	///
	/// Iff the platform rejects the insertion, e.g. because `child` contains `self`.
	#[instrument(skip(self, child), fields(tag = %self.tag(), child = %child.tag()))]
	pub fn append_child(&self, child: &Node<P>) -> Result<()> {
		let platform = self.0.platform();
		platform.append_child(&self.0.element, &child.0.element)?;
		self.0.suppression.engage(platform);
		Ok(())
	}

	/// Appends a text node.
	///
	/// # Errors
	///
	/// Iff the platform rejects the insertion.
	pub fn append_text(&self, text: &str) -> Result<()> {
		let platform = self.0.platform();
		platform.append_text(&self.0.element, text)?;
		self.0.suppression.engage(platform);
		Ok(())
	}

	/// Detaches the element from its parent. The wrapper stays valid.
	pub fn remove(&self) {
		self.0.platform().remove(&self.0.element);
	}

	/// Whether change records for this element are currently being discarded,
	/// because this wrapper wrote to it during the current turn.
	#[must_use]
	pub fn is_echo_suppressed(&self) -> bool {
		self.0.suppression.is_active()
	}
}

impl<P: Platform> Clone for Node<P> {
	fn clone(&self) -> Self {
		Self(self.0.clone())
	}
}

impl<P: Platform> PartialEq for Node<P> {
	fn eq(&self, other: &Self) -> bool {
		Rc::ptr_eq(&self.0, &other.0)
	}
}
impl<P: Platform> Eq for Node<P> {}

impl<P: Platform> Debug for Node<P> {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		f.debug_struct("Node").field("tag", &self.0.tag).field("element", &self.0.element).finish_non_exhaustive()
	}
}

impl<P: Platform> From<Node<P>> for Child<Node<P>> {
	fn from(node: Node<P>) -> Self {
		Child::Node(node)
	}
}
