use crate::{
	config::Options,
	identity::IdentityCache,
	node::{Node, NodeInner},
	node_list::NodeList,
	platform::{ChangeKind, ChangeRecord, Channel, Child, ObserveOptions, Platform},
	router::{self, RouteContext, RoutePattern, Router},
	ConfigurationError, Error, Result, SelectorCache,
};
use core::{
	cell::RefCell,
	fmt::{self, Debug, Formatter},
};
use std::rc::{Rc, Weak};
use tracing::{debug, error, instrument, trace};

/// Where [`Dom::mount`] attaches a node.
pub enum MountTarget<'a, P: Platform> {
	Node(&'a Node<P>),
	Element(&'a P::Element),
	/// The first element matching this selector. [`ConfigurationError::MountTargetMissing`] if there is none.
	Selector(&'a str),
}
impl<'a, P: Platform> From<&'a Node<P>> for MountTarget<'a, P> {
	fn from(node: &'a Node<P>) -> Self {
		Self::Node(node)
	}
}
impl<'a, P: Platform> From<&'a str> for MountTarget<'a, P> {
	fn from(selector: &'a str) -> Self {
		Self::Selector(selector)
	}
}

/// The registry tying wrappers, the selector cache and the router of one document together.
///
/// This is a cheap handle: clones refer to the same registry.
///
/// Nothing here is called while an internal borrow is held, so route handlers and deferred tasks
/// may freely call back into the [`Dom`] (including [`Dom::route`] and [`Dom::navigate`]).
/// Note that a handler which captures its [`Dom`] keeps it alive.
pub struct Dom<P: Platform>(Rc<DomInner<P>>);

struct DomInner<P: Platform> {
	platform: P,
	options: Options,
	identity: Rc<IdentityCache<P>>,
	selectors: RefCell<SelectorCache<NodeInner<P>>>,
	router: RefCell<Router>,
	invalidation: RefCell<Option<P::Subscription>>,
	navigation: RefCell<Option<P::Subscription>>,
}

impl<P: Platform> Dom<P> {
	/// # Errors
	///
	/// Iff the document has no root element or the platform refuses to observe it.
	pub fn new(platform: P) -> Result<Self> {
		Self::with_options(platform, Options::default())
	}

	/// # Errors
	///
	/// Iff the document has no root element or the platform refuses to observe it.
	#[instrument(skip(platform))]
	pub fn with_options(platform: P, options: Options) -> Result<Self> {
		let root = platform.document_element().ok_or_else(|| Error::Platform("The document has no root element.".to_owned()))?;
		let dom = Self(Rc::new(DomInner {
			identity: Rc::new(IdentityCache::new(platform.clone())),
			selectors: RefCell::new(SelectorCache::new(options.selector_cache_capacity)),
			router: RefCell::default(),
			invalidation: RefCell::new(None),
			navigation: RefCell::new(None),
			platform,
			options,
		}));

		// Any structural change anywhere may change any selection's result.
		let weak = Rc::downgrade(&dom.0);
		let invalidation = dom.0.platform.observe(
			&root,
			ObserveOptions::child_list_subtree(),
			Box::new(move |records: &[ChangeRecord<P::Element>]| {
				if let Some(inner) = weak.upgrade() {
					if records.iter().any(|record| record.kind == ChangeKind::ChildList) {
						trace!(records = records.len(), "Document structure changed.");
						inner.selectors.borrow_mut().clear();
					}
				}
			}),
		)?;
		*dom.0.invalidation.borrow_mut() = Some(invalidation);
		Ok(dom)
	}

	#[must_use]
	pub fn platform(&self) -> &P {
		&self.0.platform
	}

	#[must_use]
	pub fn options(&self) -> &Options {
		&self.0.options
	}

	/// Returns the wrapper for `element`, creating it if there is none alive.
	#[must_use]
	pub fn wrap(&self, element: &P::Element) -> Node<P> {
		IdentityCache::wrap(&self.0.identity, element)
	}

	/// The number of wrappers currently alive.
	#[must_use]
	pub fn live_wrappers(&self) -> usize {
		self.0.identity.len()
	}

	/// Wraps the first element matching `selector`.
	///
	/// With `use_cache`, this goes through the same cache entry as [`Dom::select_all`] and returns its first node.
	///
	/// # Errors
	///
	/// [`Error::SelectorSyntax`] iff `selector` is malformed.
	#[instrument(skip(self))]
	pub fn select(&self, selector: &str, use_cache: bool) -> Result<Option<Node<P>>> {
		if use_cache {
			return Ok(self.select_all(selector, true)?.first().cloned());
		}
		Ok(self.0.platform.query_selector(selector)?.map(|element| self.wrap(&element)))
	}

	/// Wraps all elements matching `selector`, in document order.
	///
	/// With `use_cache`, the previous result is reused if the document structure hasn't changed since it was cached
	/// and all of its nodes are still alive elsewhere.
	///
	/// # Errors
	///
	/// [`Error::SelectorSyntax`] iff `selector` is malformed.
	#[instrument(skip(self))]
	pub fn select_all(&self, selector: &str, use_cache: bool) -> Result<NodeList<P>> {
		if use_cache {
			let cached = self.0.selectors.borrow_mut().get(selector);
			if let Some(nodes) = cached {
				trace!(len = nodes.len(), "Selector cache hit.");
				return Ok(nodes.into_iter().map(Node::from_inner).collect());
			}
		}

		let list: NodeList<P> = self.0.platform.query_selector_all(selector)?.iter().map(|element| self.wrap(element)).collect();
		if use_cache {
			self.0.selectors.borrow_mut().set(selector, list.iter().map(Node::inner));
		}
		Ok(list)
	}

	/// Creates an unmounted element with the given attributes and children.
	///
	/// # Errors
	///
	/// Iff the platform rejects the tag, an attribute name or a child.
	#[instrument(skip(self, attributes, children))]
	pub fn create(&self, tag: &str, attributes: &[(&str, &str)], children: Vec<Child<Node<P>>>) -> Result<Node<P>> {
		let element = self.0.platform.create_element(tag)?;
		let node = self.wrap(&element);
		for (name, value) in attributes {
			node.attrs().set(name, value)?;
		}
		for child in children {
			match child {
				Child::Node(child) => node.append_child(&child)?,
				Child::Text(text) => node.append_text(&text)?,
			}
		}
		Ok(node)
	}

	/// Appends `node` to `target` and returns it.
	///
	/// # Errors
	///
	/// [`ConfigurationError::MountTargetMissing`] iff `target` is a selector that matches nothing,
	/// [`Error::SelectorSyntax`] iff it is a malformed selector,
	/// or another [`Error`] iff the platform rejects the insertion.
	pub fn mount<'a>(&self, node: &Node<P>, target: impl Into<MountTarget<'a, P>>) -> Result<Node<P>> {
		let parent = match target.into() {
			MountTarget::Node(parent) => parent.clone(),
			MountTarget::Element(element) => self.wrap(element),
			MountTarget::Selector(selector) => self.select(selector, false)?.ok_or_else(|| ConfigurationError::MountTargetMissing { selector: selector.to_owned() })?,
		};
		debug!(tag = node.tag(), parent = parent.tag(), "Mounting.");
		parent.append_child(node)?;
		Ok(node.clone())
	}

	/// Drops the cached selection for `selector`. Returns whether there was one.
	pub fn invalidate(&self, selector: &str) -> bool {
		self.0.selectors.borrow_mut().delete(selector)
	}

	/// Drops all cached selections.
	pub fn clear_all(&self) {
		self.0.selectors.borrow_mut().clear();
	}

	/// Registers `handler` for paths matching `pattern`. See [`router`](`crate::router`) for the syntax.
	///
	/// Routes are tried in registration order and only the first match is called.
	/// Registering the same pattern again replaces the handler in place.
	///
	/// The first registration (including [`Dom::route_default`]) starts listening to navigation
	/// and schedules a dispatch for when the document is ready.
	///
	/// # Errors
	///
	/// [`ConfigurationError::InvalidRoutePattern`] iff `pattern` is empty or repeats a parameter name.
	pub fn route(&self, pattern: &str, handler: impl Fn(&RouteContext) + 'static) -> Result<()> {
		let pattern = RoutePattern::compile(pattern)?;
		self.0.router.borrow_mut().register(pattern, Rc::new(handler));
		self.ensure_initialized();
		Ok(())
	}

	/// Registers the handler called when no route matches. Replaces any previous default handler.
	pub fn route_default(&self, handler: impl Fn(&RouteContext) + 'static) {
		self.0.router.borrow_mut().set_default(Rc::new(handler));
		self.ensure_initialized();
	}

	/// Changes the location fragment to `path`. The matching route is dispatched on the resulting navigation event.
	pub fn navigate(&self, path: &str) {
		debug!(path, "Navigating.");
		self.0.platform.set_location_hash(path);
	}

	fn ensure_initialized(&self) {
		if !self.0.router.borrow_mut().mark_initialized() {
			return;
		}
		debug!("Initializing router.");

		let weak = Rc::downgrade(&self.0);
		match self.0.platform.on_navigate(Box::new(move || {
			if let Some(inner) = weak.upgrade() {
				Dom(inner).dispatch();
			}
		})) {
			Ok(subscription) => *self.0.navigation.borrow_mut() = Some(subscription),
			Err(error) => error!(%error, "Failed to listen to navigation events."),
		}

		// Deferred so that routes registered right after this one are considered too.
		let weak: Weak<DomInner<P>> = Rc::downgrade(&self.0);
		let platform = self.0.platform.clone();
		self.on_ready(move || {
			platform.defer(
				Channel::EndOfTurn,
				Box::new(move || {
					if let Some(inner) = weak.upgrade() {
						Dom(inner).dispatch();
					}
				}),
			);
		});
	}

	/// Calls the handler for the current location, clearing the selector cache first.
	#[instrument(skip(self))]
	pub fn dispatch(&self) {
		let (path, query) = router::parse_location(&self.0.platform.location_hash());
		self.clear_all();
		let resolved = self.0.router.borrow().resolve(&path);
		match resolved {
			Some((handler, params)) => {
				debug!(%path, "Dispatching.");
				handler(&RouteContext { path, params, query });
			}
			None => trace!(%path, "No route matched and there is no default handler."),
		}
	}

	/// Calls `callback` once the document is ready, immediately if it already is.
	pub fn on_ready(&self, callback: impl FnOnce() + 'static) {
		if self.0.platform.is_ready() {
			callback();
		} else {
			self.0.platform.on_ready(Box::new(callback));
		}
	}
}

impl<P: Platform> Clone for Dom<P> {
	fn clone(&self) -> Self {
		Self(self.0.clone())
	}
}

impl<P: Platform> Debug for Dom<P> {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		f.debug_struct("Dom")
			.field("platform", &self.0.platform)
			.field("options", &self.0.options)
			.field("live_wrappers", &self.0.identity.len())
			.field("routes", &self.0.router.try_borrow().map(|router| router.len()).ok())
			.finish_non_exhaustive()
	}
}
