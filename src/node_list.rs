use crate::{
	node::Node,
	platform::{Channel, Platform},
	Result,
};
use core::{
	fmt::{self, Debug, Formatter},
	ops::Deref,
	slice,
};
use std::rc::Rc;
use tracing::warn;

/// An immutable, cheaply clonable sequence of [`Node`]s, usually the result of a selection.
///
/// Derefs to a slice for indexing and iteration.
/// The bulk write methods don't write immediately, but on the next [`Channel::NextPaint`].
pub struct NodeList<P: Platform> {
	nodes: Rc<[Node<P>]>,
}

impl<P: Platform> NodeList<P> {
	#[must_use]
	pub fn map<T>(&self, f: impl FnMut(&Node<P>) -> T) -> Vec<T> {
		self.nodes.iter().map(f).collect()
	}

	#[must_use]
	pub fn filter(&self, mut predicate: impl FnMut(&Node<P>) -> bool) -> Self {
		self.nodes.iter().filter(|&node| predicate(node)).cloned().collect()
	}

	#[must_use]
	pub fn find(&self, mut predicate: impl FnMut(&Node<P>) -> bool) -> Option<Node<P>> {
		self.nodes.iter().find(|&node| predicate(node)).cloned()
	}

	pub fn for_each(&self, f: impl FnMut(&Node<P>)) {
		self.nodes.iter().for_each(f);
	}

	/// Sets `name` to `value` on each node on the next paint.
	pub fn set_attr(&self, name: &str, value: &str) {
		let (name, value) = (name.to_owned(), value.to_owned());
		self.defer_each("set_attr", move |node| node.attrs().set(&name, &value));
	}

	/// Removes `name` from each node on the next paint.
	pub fn remove_attr(&self, name: &str) {
		let name = name.to_owned();
		self.defer_each("remove_attr", move |node| node.attrs().remove(&name));
	}

	pub fn add_class(&self, class: &str) {
		let class = class.to_owned();
		self.defer_each("add_class", move |node| node.add_class(&class));
	}

	pub fn remove_class(&self, class: &str) {
		let class = class.to_owned();
		self.defer_each("remove_class", move |node| node.remove_class(&class));
	}

	pub fn toggle_class(&self, class: &str) {
		let class = class.to_owned();
		self.defer_each("toggle_class", move |node| node.toggle_class(&class).map(drop));
	}

	pub fn set_style(&self, property: &str, value: &str) {
		let (property, value) = (property.to_owned(), value.to_owned());
		self.defer_each("set_style", move |node| node.set_style(&property, &value));
	}

	fn defer_each(&self, operation: &'static str, write: impl Fn(&Node<P>) -> Result<()> + 'static) {
		let platform = match self.nodes.first() {
			Some(first) => first.inner().platform().clone(),
			None => return,
		};
		let nodes = self.nodes.clone();
		platform.defer(
			Channel::NextPaint,
			Box::new(move || {
				for node in nodes.iter() {
					if let Err(error) = write(node) {
						warn!(operation, %error, tag = node.tag(), "Deferred bulk write failed.");
					}
				}
			}),
		);
	}
}

impl<P: Platform> Clone for NodeList<P> {
	fn clone(&self) -> Self {
		Self { nodes: self.nodes.clone() }
	}
}

impl<P: Platform> Debug for NodeList<P> {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		f.debug_list().entries(self.nodes.iter()).finish()
	}
}

impl<P: Platform> Deref for NodeList<P> {
	type Target = [Node<P>];

	fn deref(&self) -> &Self::Target {
		&self.nodes
	}
}

impl<P: Platform> From<Rc<[Node<P>]>> for NodeList<P> {
	fn from(nodes: Rc<[Node<P>]>) -> Self {
		Self { nodes }
	}
}

impl<P: Platform> From<Vec<Node<P>>> for NodeList<P> {
	fn from(nodes: Vec<Node<P>>) -> Self {
		Self { nodes: nodes.into() }
	}
}

impl<P: Platform> FromIterator<Node<P>> for NodeList<P> {
	fn from_iter<I: IntoIterator<Item = Node<P>>>(iter: I) -> Self {
		Self {
			nodes: iter.into_iter().collect(),
		}
	}
}

impl<'a, P: Platform> IntoIterator for &'a NodeList<P> {
	type Item = &'a Node<P>;
	type IntoIter = slice::Iter<'a, Node<P>>;

	fn into_iter(self) -> Self::IntoIter {
		self.nodes.iter()
	}
}
