//! Stateful bindings.
//!
//! A [`DirectiveResult`] in a binding is resolved against the directive instance that already sits at
//! that position, so the instance keeps its state across renders. Instances are notified when their
//! part is disconnected (cleared, or its root toggled via [`RootPart::set_connected`](`crate::RootPart::set_connected`))
//! and reconnected.

use crate::{
	dom::Dom,
	part::{child, PartKey, PartKind, PartTree},
	template::AttributeKind,
	Error, Value,
};
use core::{
	any::{type_name, Any, TypeId},
	cell::RefCell,
	fmt::{self, Debug, Formatter},
};
use std::rc::{Rc, Weak};
use tracing::{debug, instrument, trace};

/// The kind of binding a directive is placed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PartType {
	Child,
	Attribute,
	Property,
	BooleanAttribute,
	Event,
	Element,
}

/// Where a directive is bound, as seen by [`Directive::new`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartInfo {
	pub part_type: PartType,
	/// The attribute, property or event name.
	pub name: Option<String>,
	/// Local name of the element, for attribute and element bindings.
	pub tag_name: Option<String>,
	/// The static text of an attribute interpolation with more than one value.
	pub strings: Option<Vec<String>>,
}

impl PartInfo {
	/// Whether the binding holds exactly one value, without surrounding text.
	#[must_use]
	pub fn is_single_expression(&self) -> bool {
		self.strings.is_none()
	}
}

/// A directive implementation. Each binding position holds at most one instance per nesting depth.
pub trait Directive<D: Dom>: Sized + 'static {
	/// What the directive receives on each render.
	type Args: Clone + 'static;

	/// Creates the instance. Returning an error refuses the binding position.
	fn new(part: &PartInfo) -> Result<Self, Error>;

	/// Produces a value from `args` without looking at the part.
	fn render(&mut self, args: Self::Args) -> Value<D>;

	/// Produces the value to commit. [`Value::NoChange`] leaves the part as it is,
	/// and returning another directive nests it one level deeper.
	fn update(&mut self, part: &mut PartRef<'_, D>, args: Self::Args) -> Result<Value<D>, Error> {
		let _ = part;
		Ok(self.render(args))
	}

	/// The part was cleared, or its root was disconnected.
	fn disconnected(&mut self) {}

	/// The root was reconnected after [`Directive::disconnected`].
	fn reconnected(&mut self) {}
}

pub(crate) trait ErasedDirective<D: Dom> {
	fn name(&self) -> &'static str;
	fn update(&mut self, part: &mut PartRef<'_, D>, args: Rc<dyn Any>) -> Result<Value<D>, Error>;
	fn disconnected(&mut self);
	fn reconnected(&mut self);
}

impl<D: Dom, T: Directive<D>> ErasedDirective<D> for T {
	fn name(&self) -> &'static str {
		type_name::<T>()
	}

	fn update(&mut self, part: &mut PartRef<'_, D>, args: Rc<dyn Any>) -> Result<Value<D>, Error> {
		let args = args
			.downcast::<T::Args>()
			.map_err(|_| Error::directive(type_name::<T>(), "received arguments of another directive"))?;
		let args = Rc::try_unwrap(args).unwrap_or_else(|args| (*args).clone());
		Directive::update(self, part, args)
	}

	fn disconnected(&mut self) {
		Directive::disconnected(self);
	}

	fn reconnected(&mut self) {
		Directive::reconnected(self);
	}
}

type Create<D> = fn(&PartInfo) -> Result<Box<dyn ErasedDirective<D>>, Error>;

/// A directive invocation, to be used as a binding value.
pub struct DirectiveResult<D: Dom> {
	kind: TypeId,
	name: &'static str,
	create: Create<D>,
	args: Rc<dyn Any>,
}

impl<D: Dom> Clone for DirectiveResult<D> {
	fn clone(&self) -> Self {
		Self {
			kind: self.kind,
			name: self.name,
			create: self.create,
			args: self.args.clone(),
		}
	}
}

impl<D: Dom> Debug for DirectiveResult<D> {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		f.debug_struct("DirectiveResult").field("directive", &self.name).finish_non_exhaustive()
	}
}

impl<D: Dom> DirectiveResult<D> {
	#[must_use]
	pub fn name(&self) -> &'static str {
		self.name
	}

	#[must_use]
	pub fn is_same(&self, other: &Self) -> bool {
		self.kind == other.kind && crate::value::rc_ptr_eq(&self.args, &other.args)
	}
}

/// Wraps `args` for the directive `T`.
pub fn directive<D: Dom, T: Directive<D>>(args: T::Args) -> DirectiveResult<D> {
	DirectiveResult {
		kind: TypeId::of::<T>(),
		name: type_name::<T>(),
		create: |info| Ok(Box::new(T::new(info)?)),
		args: Rc::new(args),
	}
}

/// A directive instance at one (sub-index, depth) position of a part.
pub(crate) struct DirectiveSlot<D: Dom> {
	pub(crate) index: usize,
	pub(crate) depth: usize,
	pub(crate) kind: TypeId,
	pub(crate) connected: bool,
	pub(crate) directive: Box<dyn ErasedDirective<D>>,
}

impl<D: Dom> DirectiveSlot<D> {
	pub(crate) fn set_connected(&mut self, connected: bool) {
		if self.connected != connected {
			self.connected = connected;
			if connected {
				self.directive.reconnected();
			} else {
				self.directive.disconnected();
			}
		}
	}
}

fn take_slot<D: Dom>(tree: &mut PartTree<D>, key: PartKey, index: usize, depth: usize) -> Option<DirectiveSlot<D>> {
	let slots = tree.directives.get_mut(key)?;
	let position = slots.iter().position(|slot| slot.index == index && slot.depth == depth)?;
	Some(slots.remove(position))
}

/// Disconnects and drops the directives of `key` at `index` from `depth` on.
pub(crate) fn drop_slots_from<D: Dom>(tree: &mut PartTree<D>, key: PartKey, index: usize, depth: usize) {
	if let Some(slots) = tree.directives.get_mut(key) {
		let mut dropped: Vec<DirectiveSlot<D>> = Vec::new();
		let mut i = 0;
		while i < slots.len() {
			if slots[i].index == index && slots[i].depth >= depth {
				dropped.push(slots.remove(i));
			} else {
				i += 1;
			}
		}
		dropped.sort_by_key(|slot| slot.depth);
		for mut slot in dropped {
			trace!(directive = slot.directive.name(), "Dropping directive.");
			slot.set_connected(false);
		}
	}
}

/// Disconnects and drops every directive of `key`.
pub(crate) fn drop_all_slots<D: Dom>(tree: &mut PartTree<D>, key: PartKey) {
	if let Some(mut slots) = tree.directives.remove(key) {
		slots.sort_by_key(|slot| (slot.index, slot.depth));
		for slot in &mut slots {
			slot.set_connected(false);
		}
	}
}

/// Resolves `value` for the binding `index` of `key`, running directives until a plain value comes out.
#[instrument(level = "trace", skip(tree, value), fields(value = value.kind_name()))]
pub(crate) fn resolve<D: Dom>(tree: &mut PartTree<D>, key: PartKey, index: usize, value: Value<D>, depth: usize) -> Result<Value<D>, Error> {
	let result = match value {
		Value::Directive(result) => result,
		value => {
			drop_slots_from(tree, key, index, depth);
			return Ok(value);
		}
	};

	let mut slot = match take_slot(tree, key, index, depth) {
		Some(slot) if slot.kind == result.kind => slot,
		previous => {
			if let Some(mut previous) = previous {
				debug!(previous = previous.directive.name(), next = result.name, "Directive kind changed.");
				previous.set_connected(false);
			}
			drop_slots_from(tree, key, index, depth + 1);
			let info = tree.part_info(key)?;
			DirectiveSlot {
				index,
				depth,
				kind: result.kind,
				connected: tree.connected,
				directive: (result.create)(&info)?,
			}
		}
	};

	let output = {
		let mut part = PartRef { tree, key, index, depth };
		slot.directive.update(&mut part, result.args)
	};
	if tree.parts.contains_key(key) {
		if let Some(slots) = tree.directives.entry(key) {
			slots.or_default().push(slot);
		}
	}
	resolve(tree, key, index, output?, depth + 1)
}

/// Access to the part a directive is bound to, during [`Directive::update`].
pub struct PartRef<'a, D: Dom> {
	tree: &'a mut PartTree<D>,
	key: PartKey,
	index: usize,
	depth: usize,
}

impl<'a, D: Dom> PartRef<'a, D> {
	#[must_use]
	pub fn dom(&self) -> &D {
		&self.tree.dom
	}

	/// Where this directive is bound.
	pub fn info(&self) -> Result<PartInfo, Error> {
		self.tree.part_info(self.key)
	}

	/// The element of an attribute or element binding.
	#[must_use]
	pub fn element(&self) -> Option<D::Node> {
		match &self.tree.parts.get(self.key)?.kind {
			PartKind::Attribute(attribute) => Some(attribute.element.clone()),
			PartKind::Element(element) => Some(element.clone()),
			PartKind::Child(_) => None,
		}
	}

	/// The `host` given in [`RenderOptions`](`crate::RenderOptions`).
	#[must_use]
	pub fn host(&self) -> Option<Rc<dyn Any>> {
		self.tree.host.clone()
	}

	#[must_use]
	pub fn is_connected(&self) -> bool {
		self.tree.connected
	}

	/// A handle for pushing values into this binding later, from outside of a render.
	#[must_use]
	pub fn handle(&self) -> PartHandle<D> {
		PartHandle {
			tree: self.tree.this.clone(),
			key: self.key,
			index: self.index,
			depth: self.depth,
		}
	}

	/// Forgets the committed value of an attribute binding, so that the next value is written even if it's the same.
	pub fn reset_committed(&mut self) {
		if let Some(PartKind::Attribute(attribute)) = self.tree.parts.get_mut(self.key).map(|part| &mut part.kind) {
			if let Some(committed) = attribute.committed.get_mut(self.index) {
				*committed = Value::Object(Rc::new(()));
			}
		}
	}

	/// The item parts committed to this child binding, if its value is a list.
	#[must_use]
	pub fn committed_parts(&self) -> Option<Vec<PartKey>> {
		child::committed_list(self.tree, self.key)
	}

	/// Replaces the committed value of this child binding with a list of its (already placed) item parts.
	pub fn set_committed_parts(&mut self, parts: Vec<PartKey>) {
		child::set_committed_list(self.tree, self.key, parts);
	}

	/// Creates an empty item part in this child binding, before `before` or at the end.
	pub fn insert_part(&mut self, before: Option<PartKey>) -> Result<PartKey, Error> {
		child::insert_part(self.tree, self.key, before)
	}

	/// Moves the content of the item part `part` before `before`, or to the end.
	pub fn move_part(&mut self, part: PartKey, before: Option<PartKey>) -> Result<(), Error> {
		child::move_part(self.tree, self.key, part, before)
	}

	/// Commits `value` to an item part.
	pub fn set_child_value(&mut self, part: PartKey, value: Value<D>) -> Result<(), Error> {
		child::set_child_value(self.tree, part, value, 0)
	}

	/// Clears an item part and removes it with its markers.
	pub fn remove_part(&mut self, part: PartKey) {
		child::remove_part(self.tree, part);
	}
}

/// A weak reference to a binding, for pushing values into it asynchronously.
pub struct PartHandle<D: Dom> {
	tree: Weak<RefCell<PartTree<D>>>,
	key: PartKey,
	index: usize,
	depth: usize,
}

impl<D: Dom> Clone for PartHandle<D> {
	fn clone(&self) -> Self {
		Self {
			tree: self.tree.clone(),
			key: self.key,
			index: self.index,
			depth: self.depth,
		}
	}
}

impl<D: Dom> Debug for PartHandle<D> {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		f.debug_struct("PartHandle").field("key", &self.key).field("index", &self.index).field("depth", &self.depth).finish()
	}
}

impl<D: Dom> PartHandle<D> {
	pub(crate) fn new(tree: Weak<RefCell<PartTree<D>>>, key: PartKey, index: usize, depth: usize) -> Self {
		Self { tree, key, index, depth }
	}

	/// Commits `value` as if the directive had returned it.
	///
	/// Does nothing if the part has been cleared in the meantime.
	#[instrument(skip(self, value))]
	pub fn set_value(&self, value: impl Into<Value<D>>) -> Result<(), Error> {
		let Some(tree) = self.tree.upgrade() else {
			trace!("The part tree is gone.");
			return Ok(());
		};
		let mut tree = tree.try_borrow_mut().map_err(|_| Error::Reentrant)?;
		crate::part::set_value_at(&mut tree, self.key, self.index, value.into(), self.depth + 1)
	}

	/// Whether the bound part still exists and its root is connected.
	#[must_use]
	pub fn is_connected(&self) -> bool {
		self.tree
			.upgrade()
			.and_then(|tree| tree.try_borrow().ok().map(|tree| tree.connected && tree.parts.contains_key(self.key)))
			.unwrap_or(false)
	}

	/// Toggles the connection state of every directive in the tree.
	///
	/// Only valid for handles to the root part.
	pub fn set_connected(&self, connected: bool) -> Result<(), Error> {
		let Some(tree) = self.tree.upgrade() else {
			return Ok(());
		};
		let mut tree = tree.try_borrow_mut().map_err(|_| Error::Reentrant)?;
		if tree.root != self.key {
			return Err(Error::NotRootPart);
		}
		tree.set_connected(connected);
		Ok(())
	}
}

pub(crate) fn part_type(kind: AttributeKind) -> PartType {
	match kind {
		AttributeKind::Attribute => PartType::Attribute,
		AttributeKind::Property => PartType::Property,
		AttributeKind::Boolean => PartType::BooleanAttribute,
		AttributeKind::Event => PartType::Event,
	}
}
