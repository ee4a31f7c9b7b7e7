//! Attribute interception: reads come from the wrapper's store, writes go through to the element
//! while suppressing the resulting change records.

use crate::{
	node::Node,
	platform::{Channel, Platform},
	Result,
};
use core::cell::Cell;
use hashbrown::HashMap;
use std::rc::Rc;
use tracing::{instrument, trace};

/// Per-wrapper echo suppression.
///
/// Engaged synchronously right after each write made through the wrapper,
/// released once per burst on the next [`Channel::EndOfTurn`].
///
/// The release is scheduled after the burst's first native write, so it runs after the platform's
/// delivery of that write's change records, which is queued by the write itself.
#[derive(Debug, Default)]
pub(crate) struct Suppression {
	active: Cell<bool>,
	release_queued: Cell<bool>,
}
impl Suppression {
	pub(crate) fn is_active(&self) -> bool {
		self.active.get()
	}

	pub(crate) fn engage<P: Platform>(self: &Rc<Self>, platform: &P) {
		self.active.set(true);
		if self.release_queued.replace(true) {
			return;
		}
		let suppression = Rc::downgrade(self);
		platform.defer(
			Channel::EndOfTurn,
			Box::new(move || {
				if let Some(suppression) = suppression.upgrade() {
					suppression.active.set(false);
					suppression.release_queued.set(false);
					trace!("Released echo suppression.");
				}
			}),
		);
	}
}

/// The attribute store of a [`Node`], as returned by [`Node::attrs`].
///
/// Reads return the last known value, which includes writes made through any handle to the same wrapper
/// and external changes as of the last delivered change record batch.
#[derive(Debug)]
pub struct Attributes<'a, P: Platform> {
	node: &'a Node<P>,
}
impl<'a, P: Platform> Attributes<'a, P> {
	pub(crate) fn new(node: &'a Node<P>) -> Self {
		Self { node }
	}

	#[must_use]
	pub fn get(&self, name: &str) -> Option<String> {
		self.node.inner().attributes.borrow().get(name).cloned()
	}

	#[must_use]
	pub fn contains(&self, name: &str) -> bool {
		self.node.inner().attributes.borrow().contains_key(name)
	}

	#[must_use]
	pub fn len(&self) -> usize {
		self.node.inner().attributes.borrow().len()
	}

	#[must_use]
	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}

	/// A snapshot of the store.
	#[must_use]
	pub fn to_map(&self) -> HashMap<String, String> {
		self.node.inner().attributes.borrow().clone()
	}

	/// Sets the attribute `name` on both the store and the element.
	///
	/// Nothing happens if the stored value is already `value`.
	///
	/// # Errors
	///
	/// Iff the platform rejects `name`. The store is left unchanged in that case.
	#[instrument(skip(self, value), fields(tag = %self.node.tag()))]
	pub fn set(&self, name: &str, value: &str) -> Result<()> {
		let inner = self.node.inner();
		if inner.attributes.borrow().get(name).map(String::as_str) == Some(value) {
			trace!("Unchanged.");
			return Ok(());
		}
		if cfg!(feature = "dangerous-logging") {
			trace!(value, "Writing attribute.");
		} else {
			trace!("Writing attribute.");
		}

		let platform = inner.platform();
		platform.set_attribute(&inner.element, name, value)?;
		inner.suppression.engage(platform);
		inner.attributes.borrow_mut().insert(name.to_owned(), value.to_owned());
		Ok(())
	}

	/// Removes the attribute `name` from both the store and the element.
	///
	/// Nothing happens if the store doesn't contain `name`.
	///
	/// # Errors
	///
	/// Iff the platform rejects `name`. The store is left unchanged in that case.
	#[instrument(skip(self), fields(tag = %self.node.tag()))]
	pub fn remove(&self, name: &str) -> Result<()> {
		let inner = self.node.inner();
		if !inner.attributes.borrow().contains_key(name) {
			trace!("Already absent.");
			return Ok(());
		}

		let platform = inner.platform();
		platform.remove_attribute(&inner.element, name)?;
		inner.suppression.engage(platform);
		inner.attributes.borrow_mut().remove(name);
		trace!("Removed attribute.");
		Ok(())
	}
}
