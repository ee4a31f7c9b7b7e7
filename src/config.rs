use crate::SelectorCache;

/// Runtime configuration of a [`Dom`](`crate::Dom`).
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub struct Options {
	/// How many selections [`Dom::select_all`](`crate::Dom::select_all`) remembers. 0 disables the selector cache.
	pub selector_cache_capacity: usize,
}

impl Default for Options {
	fn default() -> Self {
		Self {
			selector_cache_capacity: SelectorCache::<()>::DEFAULT_CAPACITY,
		}
	}
}

impl Options {
	#[must_use]
	pub fn with_selector_cache_capacity(mut self, capacity: usize) -> Self {
		self.selector_cache_capacity = capacity;
		self
	}
}
