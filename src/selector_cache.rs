use hashbrown::HashMap;
use std::{
	collections::BTreeMap,
	rc::{Rc, Weak},
};
use tracing::{debug, warn};

/// A bounded, least-recently-used cache from selector strings to weakly held result sequences.
///
/// Each entry refers to the members of its sequence individually, so it stays valid for as long as
/// every member is alive elsewhere, regardless of whether the sequence it was created from still is.
/// The cache never keeps a member alive: once any member of a cached sequence is gone,
/// looking it up is a miss (and purges the entry).
#[derive(Debug)]
pub struct SelectorCache<T: ?Sized> {
	capacity: usize,
	entries: HashMap<String, Entry<T>>,
	/// Stamp → key, oldest first.
	recency: BTreeMap<u64, String>,
	next_stamp: u64,
}

#[derive(Debug)]
struct Entry<T: ?Sized> {
	stamp: u64,
	members: Box<[Weak<T>]>,
}

impl<T: ?Sized> SelectorCache<T> {
	pub const DEFAULT_CAPACITY: usize = 100;

	/// A `capacity` of 0 disables caching.
	#[must_use]
	pub fn new(capacity: usize) -> Self {
		Self {
			capacity,
			entries: HashMap::new(),
			recency: BTreeMap::new(),
			next_stamp: 0,
		}
	}

	#[must_use]
	pub fn capacity(&self) -> usize {
		self.capacity
	}

	/// The number of entries, including stale ones that haven't been looked up since a member was dropped.
	#[must_use]
	pub fn len(&self) -> usize {
		self.entries.len()
	}

	#[must_use]
	pub fn is_empty(&self) -> bool {
		self.entries.is_empty()
	}

	/// Looks up `selector`, marking it as most recently used on a hit.
	pub fn get(&mut self, selector: &str) -> Option<Vec<Rc<T>>> {
		let entry = self.entries.get_mut(selector)?;
		match entry.members.iter().map(Weak::upgrade).collect::<Option<Vec<_>>>() {
			Some(members) => {
				let stamp = self.next_stamp;
				self.next_stamp += 1;
				let old_stamp = core::mem::replace(&mut entry.stamp, stamp);
				if let Some(key) = self.recency.remove(&old_stamp) {
					self.recency.insert(stamp, key);
				}
				Some(members)
			}
			None => {
				warn!(selector, "Cached selection was already reclaimed. Treating it as a miss.");
				let old_stamp = entry.stamp;
				self.entries.remove(selector);
				self.recency.remove(&old_stamp);
				None
			}
		}
	}

	/// Caches `members` for `selector`, evicting the least recently used entry if this exceeds the capacity.
	pub fn set<'a>(&mut self, selector: &str, members: impl IntoIterator<Item = &'a Rc<T>>)
	where
		T: 'a,
	{
		if self.capacity == 0 {
			return;
		}
		let stamp = self.next_stamp;
		self.next_stamp += 1;
		let entry = Entry {
			stamp,
			members: members.into_iter().map(Rc::downgrade).collect(),
		};
		if let Some(replaced) = self.entries.insert(selector.to_owned(), entry) {
			self.recency.remove(&replaced.stamp);
		}
		self.recency.insert(stamp, selector.to_owned());

		while self.entries.len() > self.capacity {
			let oldest = match self.recency.keys().next() {
				Some(&oldest) => oldest,
				None => break,
			};
			if let Some(evicted) = self.recency.remove(&oldest) {
				self.entries.remove(&evicted);
				debug!(selector = %evicted, "Evicted least recently used selection.");
			}
		}
	}

	/// Returns whether an entry was removed.
	pub fn delete(&mut self, selector: &str) -> bool {
		match self.entries.remove(selector) {
			Some(entry) => {
				self.recency.remove(&entry.stamp);
				true
			}
			None => false,
		}
	}

	pub fn clear(&mut self) {
		if !self.entries.is_empty() {
			debug!(entries = self.entries.len(), "Clearing selector cache.");
		}
		self.entries.clear();
		self.recency.clear();
	}
}

impl<T: ?Sized> Default for SelectorCache<T> {
	fn default() -> Self {
		Self::new(Self::DEFAULT_CAPACITY)
	}
}

#[cfg(test)]
mod tests {
	use super::SelectorCache;
	use std::rc::Rc;

	fn value(s: &str) -> Rc<str> {
		Rc::from(s)
	}

	fn joined(members: Option<Vec<Rc<str>>>) -> Option<String> {
		members.map(|members| members.iter().map(|member| &**member).collect::<Vec<_>>().join(","))
	}

	#[test]
	fn evicts_least_recently_inserted() {
		let mut cache = SelectorCache::new(2);
		let (a, b, c) = (value("a"), value("b"), value("c"));
		cache.set("a", [&a]);
		cache.set("b", [&b]);
		cache.set("c", [&c]);
		assert_eq!(cache.len(), 2);
		assert!(cache.get("a").is_none());
		assert_eq!(joined(cache.get("b")).as_deref(), Some("b"));
		assert_eq!(joined(cache.get("c")).as_deref(), Some("c"));
	}

	#[test]
	fn get_promotes() {
		let mut cache = SelectorCache::new(2);
		let (a, b, c) = (value("a"), value("b"), value("c"));
		cache.set("a", [&a]);
		cache.set("b", [&b]);
		assert!(cache.get("a").is_some());
		cache.set("c", [&c]);
		assert!(cache.get("a").is_some());
		assert!(cache.get("b").is_none());
	}

	#[test]
	fn misses_do_not_touch_recency() {
		let mut cache = SelectorCache::new(2);
		let (a, b) = (value("a"), value("b"));
		cache.set("a", [&a]);
		assert!(cache.get("missing").is_none());
		assert!(cache.get("missing").is_none());
		assert_eq!(cache.next_stamp, 1);
		cache.set("b", [&b]);
		assert_eq!(cache.next_stamp, 2);
	}

	#[test]
	fn overwrite_keeps_one_entry() {
		let mut cache = SelectorCache::new(2);
		let (first, second) = (value("first"), value("second"));
		cache.set("a", [&first]);
		cache.set("a", [&first, &second]);
		assert_eq!(cache.len(), 1);
		assert_eq!(joined(cache.get("a")).as_deref(), Some("first,second"));
	}

	#[test]
	fn entries_outlive_the_sequence_they_were_built_from() {
		let mut cache = SelectorCache::new(2);
		let (a, b) = (value("a"), value("b"));
		let sequence = vec![a.clone(), b.clone()];
		cache.set("ab", &sequence);
		drop(sequence);
		assert_eq!(joined(cache.get("ab")).as_deref(), Some("a,b"));
	}

	#[test]
	fn does_not_keep_members_alive() {
		let mut cache = SelectorCache::new(2);
		let (a, b) = (value("a"), value("b"));
		cache.set("ab", [&a, &b]);
		drop(b);
		assert_eq!(cache.len(), 1);
		assert!(cache.get("ab").is_none());
		assert!(cache.is_empty());
	}

	#[test]
	fn empty_sequences_are_cached() {
		let mut cache = SelectorCache::<str>::new(2);
		cache.set("none", []);
		assert_eq!(cache.get("none").map(|members| members.len()), Some(0));
	}

	#[test]
	fn delete_and_clear() {
		let mut cache = SelectorCache::new(4);
		let (a, b) = (value("a"), value("b"));
		cache.set("a", [&a]);
		cache.set("b", [&b]);
		assert!(cache.delete("a"));
		assert!(!cache.delete("a"));
		assert!(cache.get("a").is_none());
		cache.clear();
		assert!(cache.get("b").is_none());
		assert!(cache.is_empty());
	}

	#[test]
	fn zero_capacity_caches_nothing() {
		let mut cache = SelectorCache::new(0);
		let a = value("a");
		cache.set("a", [&a]);
		assert!(cache.get("a").is_none());
	}
}
