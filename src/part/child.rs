//! Child bindings, which own the range of nodes between two markers.

use super::{PartKey, PartKind, PartTree};
use crate::{
	directive,
	dom::{Dom, NodeType},
	instance::{self, TemplateInstance},
	sanitize::{self, Sanitizer, SinkKind},
	template::{self, TemplateResult},
	Error, Value,
};
use core::mem;
use std::rc::Rc;
use tracing::{instrument, trace, trace_span};

pub(crate) enum Committed<D: Dom> {
	Nothing,
	/// The value of the text node that directly follows the start marker.
	Text(Value<D>),
	Node(D::Node),
	Template(TemplateInstance),
	/// One item part per list entry, in order.
	List(Vec<PartKey>),
}

pub(crate) struct ChildPart<D: Dom> {
	pub(crate) start: D::Node,
	/// `None` means the end of the parent node.
	pub(crate) end: Option<D::Node>,
	pub(crate) committed: Committed<D>,
	text_sanitizer: Option<Sanitizer>,
}

impl<D: Dom> ChildPart<D> {
	pub(crate) fn new(start: D::Node, end: Option<D::Node>) -> Self {
		Self {
			start,
			end,
			committed: Committed::Nothing,
			text_sanitizer: None,
		}
	}

	pub(crate) fn owned_parts(&self) -> Vec<PartKey> {
		match &self.committed {
			Committed::Template(instance) => instance.parts.iter().flatten().copied().collect(),
			Committed::List(parts) => parts.clone(),
			Committed::Nothing | Committed::Text(_) | Committed::Node(_) => Vec::new(),
		}
	}
}

fn anchors<D: Dom>(tree: &PartTree<D>, key: PartKey) -> Option<(D::Node, Option<D::Node>)> {
	let child = tree.child(key)?;
	Some((child.start.clone(), child.end.clone()))
}

/// The node the range lives in, or the one it will live in once the enclosing template is inserted.
fn container<D: Dom>(tree: &PartTree<D>, key: PartKey) -> Option<D::Node> {
	let (start, _) = anchors(tree, key)?;
	let parent = tree.dom.parent_node(&start)?;
	if tree.dom.node_type(&parent) == NodeType::Fragment {
		if let Some(owner) = tree.parts.get(key).and_then(|part| part.parent) {
			return container(tree, owner).or(Some(parent));
		}
	}
	Some(parent)
}

/// Commits `value`, after resolving directives from `depth` on.
#[instrument(level = "trace", skip(tree, value), fields(value = value.kind_name()))]
pub(crate) fn set_child_value<D: Dom>(tree: &mut PartTree<D>, key: PartKey, value: Value<D>, depth: usize) -> Result<(), Error> {
	let value = directive::resolve(tree, key, 0, value, depth)?;
	let Some((start, end)) = anchors(tree, key) else {
		trace!("The part was removed while resolving its value.");
		return Ok(());
	};

	let Some(parent) = tree.dom.parent_node(&start) else {
		return Err(Error::DetachedPart);
	};
	if let Some(end) = &end {
		if tree.dom.parent_node(end).as_ref() != Some(&parent) {
			return Err(Error::DetachedPart);
		}
	}

	match value {
		Value::NoChange => {
			trace!("No change.");
			Ok(())
		}
		Value::Nothing | Value::Null => clear_to_nothing(tree, key),
		Value::Text(text) if text.is_empty() => clear_to_nothing(tree, key),
		value if value.is_primitive() => {
			if let Some(Committed::Text(committed)) = tree.child(key).map(|child| &child.committed) {
				if committed.is_same(&value) {
					trace!("Unchanged primitive.");
					return Ok(());
				}
			}
			commit_text(tree, key, value)
		}
		Value::Template(result) => commit_template(tree, key, &result),
		Value::Node(node) => commit_node(tree, key, node),
		Value::List(items) => commit_list(tree, key, &items),
		value => commit_text(tree, key, value),
	}
}

fn clear_to_nothing<D: Dom>(tree: &mut PartTree<D>, key: PartKey) -> Result<(), Error> {
	if !matches!(tree.child(key).map(|child| &child.committed), Some(Committed::Nothing)) {
		clear(tree, key);
	}
	if let Some(child) = tree.child_mut(key) {
		child.committed = Committed::Nothing;
	}
	Ok(())
}

fn text_sanitizer<D: Dom>(tree: &mut PartTree<D>, key: PartKey) -> Option<Sanitizer> {
	if !sanitize::is_active() {
		return None;
	}
	if let Some(sanitizer) = tree.child(key).and_then(|child| child.text_sanitizer.clone()) {
		return Some(sanitizer);
	}
	let tag_name = container(tree, key).map(|parent| tree.dom.local_name(&parent)).unwrap_or_default();
	let sanitizer = sanitize::sanitizer_for(&tag_name, "data", SinkKind::Text)?;
	if let Some(child) = tree.child_mut(key) {
		child.text_sanitizer = Some(sanitizer.clone());
	}
	Some(sanitizer)
}

fn commit_text<D: Dom>(tree: &mut PartTree<D>, key: PartKey, value: Value<D>) -> Result<(), Error> {
	let mut text = value.to_js_string();
	if let Some(sanitizer) = text_sanitizer(tree, key) {
		text = sanitizer(&text);
	}

	let existing = match tree.child(key) {
		Some(ChildPart {
			start,
			committed: Committed::Text(committed),
			..
		}) if committed.is_primitive() => tree.dom.next_sibling(start),
		_ => None,
	};
	match existing {
		Some(node) => tree.dom.set_node_value(&node, &text),
		None => {
			let node = tree.dom.create_text(&text);
			commit_node(tree, key, node)?;
		}
	}

	if let Some(child) = tree.child_mut(key) {
		child.committed = Committed::Text(value);
	}
	Ok(())
}

fn commit_node<D: Dom>(tree: &mut PartTree<D>, key: PartKey, node: D::Node) -> Result<(), Error> {
	if let Some(Committed::Node(committed)) = tree.child(key).map(|child| &child.committed) {
		if *committed == node {
			return Ok(());
		}
	}
	clear(tree, key);

	if sanitize::is_active() {
		if let Some(parent) = container(tree, key) {
			let tag = tree.dom.local_name(&parent);
			if tag.eq_ignore_ascii_case("style") || tag.eq_ignore_ascii_case("script") {
				return Err(Error::UnsafeBinding { tag });
			}
		}
	}

	insert(tree, key, &node, None)?;
	if let Some(child) = tree.child_mut(key) {
		child.committed = Committed::Node(node);
	}
	Ok(())
}

/// Inserts `node` into the range of `key`, before `before` or at its end.
fn insert<D: Dom>(tree: &PartTree<D>, key: PartKey, node: &D::Node, before: Option<&D::Node>) -> Result<(), Error> {
	let (start, end) = anchors(tree, key).ok_or(Error::DetachedPart)?;
	let parent = tree.dom.parent_node(&start).ok_or(Error::DetachedPart)?;
	tree.dom.insert_before(&parent, node, before.or(end.as_ref()));
	Ok(())
}

fn commit_template<D: Dom>(tree: &mut PartTree<D>, key: PartKey, result: &TemplateResult<D>) -> Result<(), Error> {
	let template = template::template_for(result.literal())?;
	if result.values().len() != template.value_count() {
		return Err(Error::ValueCount {
			expected: template.value_count(),
			found: result.values().len(),
		});
	}

	if let Some(Committed::Template(committed)) = tree.child(key).map(|child| &child.committed) {
		if Rc::ptr_eq(&committed.template, &template) {
			let span = trace_span!("Updating template instance", parts = committed.parts.len());
			let _enter = span.enter();
			let parts = committed.parts.clone();
			return instance::update(tree, &template, &parts, result.values());
		}
	}

	let span = trace_span!("Creating template instance", parts = template.parts().len());
	let _enter = span.enter();
	let (created, fragment) = instance::clone(tree, key, template.clone());
	if let Err(error) = instance::update(tree, &template, &created.parts, result.values()) {
		for part in created.parts.iter().flatten() {
			tree.remove_subtree(*part);
		}
		return Err(error);
	}
	commit_node(tree, key, fragment)?;
	if let Some(child) = tree.child_mut(key) {
		child.committed = Committed::Template(created);
	}
	Ok(())
}

/// Positional reconciliation: item parts are reused by index, extra ones appended and trailing ones removed.
fn commit_list<D: Dom>(tree: &mut PartTree<D>, key: PartKey, items: &[Value<D>]) -> Result<(), Error> {
	let mut item_parts = match tree.child_mut(key).map(|child| mem::replace(&mut child.committed, Committed::Nothing)) {
		Some(Committed::List(item_parts)) => item_parts,
		Some(other) => {
			if let Some(child) = tree.child_mut(key) {
				child.committed = other;
			}
			clear(tree, key);
			Vec::new()
		}
		None => return Ok(()),
	};

	let mut result = Ok(());
	let mut index = 0;
	for item in items {
		let item_part = if index == item_parts.len() {
			match insert_item(tree, key, None) {
				Ok(item_part) => {
					item_parts.push(item_part);
					item_part
				}
				Err(error) => {
					result = Err(error);
					break;
				}
			}
		} else {
			item_parts[index]
		};
		if let Err(error) = set_child_value(tree, item_part, item.clone(), 0) {
			result = Err(error);
			index += 1;
			break;
		}
		index += 1;
	}

	if result.is_ok() && index < item_parts.len() {
		trace!(kept = index, removed = item_parts.len() - index, "Shrinking list.");
		let from = match index.checked_sub(1).and_then(|last| anchors(tree, item_parts[last])) {
			Some((_, Some(end))) => tree.dom.next_sibling(&end),
			_ => anchors(tree, key).and_then(|(start, _)| tree.dom.next_sibling(&start)),
		};
		let removed = item_parts.split_off(index);
		clear_range(tree, key, from, &removed);
	}

	if let Some(child) = tree.child_mut(key) {
		child.committed = Committed::List(item_parts);
	}
	result
}

/// Creates an item part with its own start and end markers.
fn insert_item<D: Dom>(tree: &mut PartTree<D>, key: PartKey, before: Option<&D::Node>) -> Result<PartKey, Error> {
	let start = tree.dom.create_comment("");
	let end = tree.dom.create_comment("");
	insert(tree, key, &start, before)?;
	insert(tree, key, &end, before)?;
	Ok(tree.parts.insert(super::Part {
		parent: Some(key),
		kind: PartKind::Child(ChildPart::new(start, Some(end))),
	}))
}

/// Removes everything between the markers of `key`, after disconnecting the parts owned by its value.
pub(crate) fn clear<D: Dom>(tree: &mut PartTree<D>, key: PartKey) {
	let owned = match tree.child_mut(key) {
		Some(child) => {
			let owned = child.owned_parts();
			child.committed = Committed::Nothing;
			owned
		}
		None => return,
	};
	let from = anchors(tree, key).and_then(|(start, _)| tree.dom.next_sibling(&start));
	clear_range(tree, key, from, &owned);
}

fn clear_range<D: Dom>(tree: &mut PartTree<D>, key: PartKey, from: Option<D::Node>, parts: &[PartKey]) {
	for part in parts {
		tree.remove_subtree(*part);
	}

	let Some((start, end)) = anchors(tree, key) else {
		return;
	};
	let Some(parent) = tree.dom.parent_node(&start) else {
		return;
	};
	let mut next = from;
	while let Some(node) = next {
		if Some(&node) == end.as_ref() {
			break;
		}
		next = tree.dom.next_sibling(&node);
		tree.dom.remove_child(&parent, &node);
	}
}

pub(crate) fn committed_list<D: Dom>(tree: &PartTree<D>, key: PartKey) -> Option<Vec<PartKey>> {
	match &tree.child(key)?.committed {
		Committed::List(parts) => Some(parts.clone()),
		_ => None,
	}
}

pub(crate) fn set_committed_list<D: Dom>(tree: &mut PartTree<D>, key: PartKey, parts: Vec<PartKey>) {
	if let Some(child) = tree.child_mut(key) {
		child.committed = Committed::List(parts);
	}
}

/// Creates an empty item part in `key`, before the item `before` or at the end.
pub(crate) fn insert_part<D: Dom>(tree: &mut PartTree<D>, key: PartKey, before: Option<PartKey>) -> Result<PartKey, Error> {
	let before = before.and_then(|before| anchors(tree, before)).map(|(start, _)| start);
	insert_item(tree, key, before.as_ref())
}

/// Moves the nodes of the item `part`, markers included, before the item `before` or to the end of `key`.
pub(crate) fn move_part<D: Dom>(tree: &mut PartTree<D>, key: PartKey, part: PartKey, before: Option<PartKey>) -> Result<(), Error> {
	let (part_start, part_end) = anchors(tree, part).ok_or(Error::DetachedPart)?;
	let (_, container_end) = anchors(tree, key).ok_or(Error::DetachedPart)?;
	let reference = match before {
		Some(before) => Some(anchors(tree, before).ok_or(Error::DetachedPart)?.0),
		None => container_end,
	};
	let parent = tree.dom.parent_node(&part_start).ok_or(Error::DetachedPart)?;

	let stop = part_end.as_ref().and_then(|end| tree.dom.next_sibling(end));
	if stop == reference {
		return Ok(());
	}
	let mut next = Some(part_start);
	while let Some(node) = next {
		if Some(&node) == stop.as_ref() {
			break;
		}
		next = tree.dom.next_sibling(&node);
		tree.dom.insert_before(&parent, &node, reference.as_ref());
	}
	Ok(())
}

/// Clears the item `part` and removes its markers.
pub(crate) fn remove_part<D: Dom>(tree: &mut PartTree<D>, part: PartKey) {
	let Some((start, end)) = anchors(tree, part) else {
		return;
	};
	tree.remove_subtree(part);

	let Some(parent) = tree.dom.parent_node(&start) else {
		return;
	};
	let stop = end.as_ref().and_then(|end| tree.dom.next_sibling(end));
	let mut next = Some(start);
	while let Some(node) = next {
		if Some(&node) == stop.as_ref() {
			break;
		}
		next = tree.dom.next_sibling(&node);
		tree.dom.remove_child(&parent, &node);
	}
}
