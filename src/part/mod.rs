//! The live bindings of rendered templates.
//!
//! All parts below one render root live in a single arena, the [`PartTree`].
//! Parts refer to each other by [`PartKey`], so a part can be updated from outside of a render
//! through a [`PartHandle`](`crate::PartHandle`) without holding references into the tree.

use crate::{
	directive::{self, DirectiveSlot, PartInfo, PartType},
	dom::Dom,
	Error, Value,
};
use core::{any::Any, cell::RefCell};
use slotmap::{new_key_type, SecondaryMap, SlotMap};
use std::rc::{Rc, Weak};
use tracing::{instrument, trace};

pub(crate) mod attribute;
pub(crate) mod child;

pub(crate) use attribute::AttributePart;
pub(crate) use child::ChildPart;

new_key_type! {
	/// Identifies a part within its render root.
	pub struct PartKey;
}

pub(crate) struct Part<D: Dom> {
	pub(crate) parent: Option<PartKey>,
	pub(crate) kind: PartKind<D>,
}

pub(crate) enum PartKind<D: Dom> {
	Child(ChildPart<D>),
	Attribute(AttributePart<D>),
	/// Only the element; directives do all the work.
	Element(D::Node),
}

/// Everything below one render root.
pub(crate) struct PartTree<D: Dom> {
	pub(crate) dom: D,
	/// Imports template content.
	pub(crate) scope: D,
	pub(crate) host: Option<Rc<dyn Any>>,
	pub(crate) connected: bool,
	pub(crate) parts: SlotMap<PartKey, Part<D>>,
	pub(crate) directives: SecondaryMap<PartKey, Vec<DirectiveSlot<D>>>,
	pub(crate) root: PartKey,
	pub(crate) this: Weak<RefCell<PartTree<D>>>,
}

impl<D: Dom> PartTree<D> {
	/// Creates a tree whose root part spans from `start` to `end`.
	pub(crate) fn new_shared(dom: D, scope: Option<D>, host: Option<Rc<dyn Any>>, connected: bool, start: D::Node, end: Option<D::Node>) -> Rc<RefCell<Self>> {
		Rc::new_cyclic(|this| {
			let mut parts = SlotMap::with_key();
			let root = parts.insert(Part {
				parent: None,
				kind: PartKind::Child(ChildPart::new(start, end)),
			});
			RefCell::new(Self {
				scope: scope.unwrap_or_else(|| dom.clone()),
				dom,
				host,
				connected,
				parts,
				directives: SecondaryMap::new(),
				root,
				this: this.clone(),
			})
		})
	}

	pub(crate) fn child(&self, key: PartKey) -> Option<&ChildPart<D>> {
		match &self.parts.get(key)?.kind {
			PartKind::Child(child) => Some(child),
			_ => None,
		}
	}

	pub(crate) fn child_mut(&mut self, key: PartKey) -> Option<&mut ChildPart<D>> {
		match &mut self.parts.get_mut(key)?.kind {
			PartKind::Child(child) => Some(child),
			_ => None,
		}
	}

	pub(crate) fn attribute_mut(&mut self, key: PartKey) -> Option<&mut AttributePart<D>> {
		match &mut self.parts.get_mut(key)?.kind {
			PartKind::Attribute(attribute) => Some(attribute),
			_ => None,
		}
	}

	pub(crate) fn part_info(&self, key: PartKey) -> Result<PartInfo, Error> {
		let part = self.parts.get(key).ok_or_else(|| Error::directive("part", "the part was removed"))?;
		Ok(match &part.kind {
			PartKind::Child(_) => PartInfo {
				part_type: PartType::Child,
				name: None,
				tag_name: None,
				strings: None,
			},
			PartKind::Attribute(attribute) => PartInfo {
				part_type: directive::part_type(attribute.kind),
				name: Some(attribute.name.clone()),
				tag_name: Some(self.dom.local_name(&attribute.element)),
				strings: attribute.strings.clone(),
			},
			PartKind::Element(element) => PartInfo {
				part_type: PartType::Element,
				name: None,
				tag_name: Some(self.dom.local_name(element)),
				strings: None,
			},
		})
	}

	/// The parts owned by the committed value of `key`, in document order.
	pub(crate) fn owned_parts(&self, key: PartKey) -> Vec<PartKey> {
		self.child(key).map_or_else(Vec::new, ChildPart::owned_parts)
	}

	/// Notifies every directive of the tree, parents before children.
	#[instrument(level = "debug", skip(self))]
	pub(crate) fn set_connected(&mut self, connected: bool) {
		if self.connected == connected {
			return;
		}
		self.connected = connected;

		let mut stack = vec![self.root];
		while let Some(key) = stack.pop() {
			if let Some(slots) = self.directives.get_mut(key) {
				slots.sort_by_key(|slot| (slot.index, slot.depth));
				for slot in slots {
					slot.set_connected(connected);
				}
			}
			stack.extend(self.owned_parts(key).into_iter().rev());
		}
	}

	/// Disconnects the directives of `key` and everything below it, then removes those parts from the arena.
	pub(crate) fn remove_subtree(&mut self, key: PartKey) {
		directive::drop_all_slots(self, key);
		for owned in self.owned_parts(key) {
			self.remove_subtree(owned);
		}
		if self.parts.remove(key).is_some() {
			trace!(?key, "Removed part.");
		}
	}
}

/// Commits `value` to the binding `index` of `key`, resolving directives from `depth`.
pub(crate) fn set_value_at<D: Dom>(tree: &mut PartTree<D>, key: PartKey, index: usize, value: Value<D>, depth: usize) -> Result<(), Error> {
	let part_type = tree.parts.get(key).map(|part| match part.kind {
		PartKind::Child(_) => PartType::Child,
		PartKind::Attribute(_) => PartType::Attribute,
		PartKind::Element(_) => PartType::Element,
	});
	match part_type {
		None => {
			trace!(?key, "Dropped value for a removed part.");
			Ok(())
		}
		Some(PartType::Child) => child::set_child_value(tree, key, value, depth),
		Some(PartType::Element) => directive::resolve(tree, key, 0, value, depth).map(drop),
		Some(_) => attribute::set_value_at(tree, key, index, value, depth),
	}
}
