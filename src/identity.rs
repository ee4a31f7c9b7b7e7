use crate::{node::Node, node::NodeInner, platform::Platform};
use core::cell::{Cell, RefCell};
use hashbrown::HashMap;
use std::rc::{Rc, Weak};
use tracing::trace;

/// Maps live elements to their one wrapper, without keeping either alive.
pub(crate) struct IdentityCache<P: Platform> {
	platform: P,
	nodes: RefCell<HashMap<u64, Weak<NodeInner<P>>>>,
	/// Set iff [`IdentityCache::forget`] couldn't remove an entry. Dead entries are then purged on the next insertion.
	has_dead_entries: Cell<bool>,
}
impl<P: Platform> IdentityCache<P> {
	pub(crate) fn new(platform: P) -> Self {
		Self {
			platform,
			nodes: RefCell::default(),
			has_dead_entries: Cell::new(false),
		}
	}

	pub(crate) fn platform(&self) -> &P {
		&self.platform
	}

	/// Returns the existing wrapper for `element` or creates it.
	pub(crate) fn wrap(this: &Rc<Self>, element: &P::Element) -> Node<P> {
		let key = this.platform.element_key(element);
		let existing = this.nodes.borrow().get(&key).and_then(Weak::upgrade);
		if let Some(existing) = existing {
			return Node::from_inner(existing);
		}

		let node = Node::new(this.clone(), element.clone(), key);
		let mut nodes = this.nodes.borrow_mut();
		if this.has_dead_entries.replace(false) {
			let before = nodes.len();
			nodes.retain(|_, entry| entry.strong_count() > 0);
			trace!(purged = before - nodes.len(), "Purged dead wrapper entries.");
		}
		nodes.insert(key, Rc::downgrade(node.inner()));
		drop(nodes);
		trace!(key, tag = node.tag(), "Created wrapper.");
		node
	}

	/// Called as a wrapper is dropped.
	pub(crate) fn forget(&self, key: u64) {
		match self.nodes.try_borrow_mut() {
			Ok(mut nodes) => {
				if nodes.get(&key).map_or(false, |node| node.strong_count() == 0) {
					nodes.remove(&key);
					trace!(key, "Forgot wrapper.");
				}
			}
			Err(_) => {
				trace!(key, "Wrapper dropped while the identity map was borrowed. Deferring its removal.");
				self.has_dead_entries.set(true);
			}
		}
	}

	/// The number of live wrappers, plus any dead entries not purged yet.
	pub(crate) fn len(&self) -> usize {
		self.nodes.borrow().len()
	}
}

#[cfg(test)]
mod tests {
	use super::IdentityCache;
	use crate::memory::MemoryPlatform;
	use std::rc::Rc;

	#[test]
	fn entries_left_behind_by_a_blocked_forget_are_purged_on_the_next_insertion() {
		let platform = MemoryPlatform::new();
		let cache = Rc::new(IdentityCache::new(platform.clone()));

		let body = IdentityCache::wrap(&cache, &platform.body());
		let borrowed = cache.nodes.borrow_mut();
		drop(body);
		drop(borrowed);
		assert_eq!(cache.len(), 1);
		assert!(cache.has_dead_entries.get());

		let head = IdentityCache::wrap(&cache, &platform.head());
		assert_eq!(cache.len(), 1);
		assert!(!cache.has_dead_entries.get());
		assert_eq!(head.tag(), "HEAD");
	}

	#[test]
	fn dropped_wrappers_are_forgotten() {
		let platform = MemoryPlatform::new();
		let cache = Rc::new(IdentityCache::new(platform.clone()));

		let body = IdentityCache::wrap(&cache, &platform.body());
		assert_eq!(IdentityCache::wrap(&cache, &platform.body()), body);
		assert_eq!(cache.len(), 1);
		drop(body);
		assert_eq!(cache.len(), 0);
		assert!(!cache.has_dead_entries.get());
	}
}
