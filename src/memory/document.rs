use core::mem;

pub(super) const DOCUMENT: usize = 0;
pub(super) const HTML: usize = 1;
pub(super) const HEAD: usize = 2;
pub(super) const BODY: usize = 3;

#[derive(Debug)]
pub(super) enum NodeKind {
	Document,
	Element { tag: String, attributes: Vec<(String, String)> },
	Text(String),
}

#[derive(Debug)]
pub(super) struct NodeData {
	pub(super) parent: Option<usize>,
	pub(super) children: Vec<usize>,
	pub(super) kind: NodeKind,
}

/// Arena of every node ever created. Nodes are never freed, so indices stay valid.
#[derive(Debug)]
pub(super) struct Document {
	nodes: Vec<NodeData>,
}
impl Document {
	pub(super) fn new() -> Self {
		let mut document = Self {
			nodes: vec![NodeData {
				parent: None,
				children: Vec::new(),
				kind: NodeKind::Document,
			}],
		};
		let html = document.create_element("html");
		let head = document.create_element("head");
		let body = document.create_element("body");
		document.insert(DOCUMENT, html);
		document.insert(html, head);
		document.insert(html, body);
		debug_assert_eq!((html, head, body), (HTML, HEAD, BODY));
		document
	}

	pub(super) fn len(&self) -> usize {
		self.nodes.len()
	}

	fn push(&mut self, kind: NodeKind) -> usize {
		self.nodes.push(NodeData {
			parent: None,
			children: Vec::new(),
			kind,
		});
		self.nodes.len() - 1
	}

	pub(super) fn create_element(&mut self, tag: &str) -> usize {
		self.push(NodeKind::Element {
			tag: tag.to_ascii_lowercase(),
			attributes: Vec::new(),
		})
	}

	pub(super) fn create_text(&mut self, text: &str) -> usize {
		self.push(NodeKind::Text(text.to_owned()))
	}

	pub(super) fn is_element(&self, id: usize) -> bool {
		matches!(self.nodes.get(id), Some(NodeData { kind: NodeKind::Element { .. }, .. }))
	}

	pub(super) fn tag(&self, id: usize) -> Option<&str> {
		match &self.nodes.get(id)?.kind {
			NodeKind::Element { tag, .. } => Some(tag),
			NodeKind::Document | NodeKind::Text(_) => None,
		}
	}

	pub(super) fn attributes(&self, id: usize) -> &[(String, String)] {
		match self.nodes.get(id).map(|node| &node.kind) {
			Some(NodeKind::Element { attributes, .. }) => attributes,
			_ => &[],
		}
	}

	fn attributes_mut(&mut self, id: usize) -> Option<&mut Vec<(String, String)>> {
		match &mut self.nodes.get_mut(id)?.kind {
			NodeKind::Element { attributes, .. } => Some(attributes),
			NodeKind::Document | NodeKind::Text(_) => None,
		}
	}

	pub(super) fn attribute(&self, id: usize, name: &str) -> Option<&str> {
		self.attributes(id).iter().find(|(n, _)| n == name).map(|(_, value)| value.as_str())
	}

	pub(super) fn set_attribute(&mut self, id: usize, name: &str, value: &str) {
		if let Some(attributes) = self.attributes_mut(id) {
			match attributes.iter_mut().find(|(n, _)| n == name) {
				Some((_, existing)) => value.clone_into(existing),
				None => attributes.push((name.to_owned(), value.to_owned())),
			}
		}
	}

	/// Returns whether the attribute was present.
	pub(super) fn remove_attribute(&mut self, id: usize, name: &str) -> bool {
		match self.attributes_mut(id) {
			Some(attributes) => {
				let before = attributes.len();
				attributes.retain(|(n, _)| n != name);
				attributes.len() != before
			}
			None => false,
		}
	}

	pub(super) fn parent(&self, id: usize) -> Option<usize> {
		self.nodes.get(id)?.parent
	}

	pub(super) fn parent_element(&self, id: usize) -> Option<usize> {
		self.parent(id).filter(|&parent| self.is_element(parent))
	}

	pub(super) fn children(&self, id: usize) -> &[usize] {
		self.nodes.get(id).map_or(&[], |node| &node.children)
	}

	pub(super) fn kind(&self, id: usize) -> Option<&NodeKind> {
		self.nodes.get(id).map(|node| &node.kind)
	}

	pub(super) fn is_inclusive_ancestor(&self, ancestor: usize, mut node: usize) -> bool {
		loop {
			if node == ancestor {
				return true;
			}
			match self.parent(node) {
				Some(parent) => node = parent,
				None => return false,
			}
		}
	}

	/// Detaches `id` and returns its former parent.
	pub(super) fn detach(&mut self, id: usize) -> Option<usize> {
		let parent = self.nodes.get_mut(id)?.parent.take()?;
		self.nodes[parent].children.retain(|&child| child != id);
		Some(parent)
	}

	/// `child` must be detached.
	pub(super) fn insert(&mut self, parent: usize, child: usize) {
		debug_assert!(self.nodes[child].parent.is_none());
		self.nodes[child].parent = Some(parent);
		self.nodes[parent].children.push(child);
	}

	/// Detaches all children of `id`. Returns whether there were any.
	pub(super) fn clear_children(&mut self, id: usize) -> bool {
		let children = match self.nodes.get_mut(id) {
			Some(node) => mem::take(&mut node.children),
			None => return false,
		};
		for &child in &children {
			self.nodes[child].parent = None;
		}
		!children.is_empty()
	}

	pub(super) fn text_content(&self, id: usize) -> String {
		let mut text = String::new();
		self.collect_text(id, &mut text);
		text
	}

	fn collect_text(&self, id: usize, text: &mut String) {
		match self.kind(id) {
			Some(NodeKind::Text(data)) => text.push_str(data),
			Some(_) => {
				for &child in self.children(id) {
					self.collect_text(child, text);
				}
			}
			None => (),
		}
	}

	/// Elements strictly below `id`, in document order.
	pub(super) fn descendant_elements(&self, id: usize, out: &mut Vec<usize>) {
		for &child in self.children(id) {
			if self.is_element(child) {
				out.push(child);
			}
			self.descendant_elements(child, out);
		}
	}
}
