//! Absorbs attribute changes made to a wrapped element by anything other than its wrapper.

use crate::{
	node::NodeInner,
	platform::{ChangeKind, ChangeRecord, ObserveOptions, Platform},
	Result,
};
use std::rc::Rc;
use tracing::{debug, trace, trace_span};

/// Subscribes `node` to attribute changes on its own element.
///
/// The subscription only holds `node` weakly, so it's cancelled when `node` is dropped.
pub(crate) fn subscribe<P: Platform>(node: &Rc<NodeInner<P>>) -> Result<P::Subscription> {
	let weak = Rc::downgrade(node);
	node.platform().observe(
		&node.element,
		ObserveOptions::attributes(),
		Box::new(move |records: &[ChangeRecord<P::Element>]| match weak.upgrade() {
			Some(node) => reconcile(&node, records),
			None => trace!("Wrapper was reclaimed before its change records were delivered."),
		}),
	)
}

fn reconcile<P: Platform>(node: &NodeInner<P>, records: &[ChangeRecord<P::Element>]) {
	let span = trace_span!("reconcile", records = records.len());
	let _enter = span.enter();

	let platform = node.platform();
	for record in records {
		let name = match &record.kind {
			ChangeKind::Attribute { name } => name,
			ChangeKind::ChildList | ChangeKind::CharacterData => continue,
		};
		if record.target.as_ref().map(|target| platform.element_key(target)) != Some(node.key) {
			continue;
		}
		if node.suppression.is_active() {
			trace!(%name, "Discarded own change.");
			continue;
		}

		// Read the current value rather than trusting the record, as later changes may already have been applied.
		let current = platform.attribute(&node.element, name);
		let mut attributes = node.attributes.borrow_mut();
		match current {
			Some(value) if attributes.get(name) != Some(&value) => {
				if cfg!(feature = "dangerous-logging") {
					debug!(%name, %value, "Absorbed external attribute change.");
				} else {
					debug!(%name, "Absorbed external attribute change.");
				}
				attributes.insert(name.clone(), value);
			}
			Some(_) => (),
			None => {
				if attributes.remove(name).is_some() {
					debug!(%name, "Absorbed external attribute removal.");
				}
			}
		}
	}
}
