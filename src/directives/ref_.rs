use crate::{
	directive::{directive, Directive, DirectiveResult, PartInfo, PartRef, PartType},
	dom::Dom,
	Error, Value,
};
use core::{
	cell::RefCell,
	fmt::{self, Debug, Formatter},
};
use std::rc::Rc;

enum Target<D: Dom> {
	Cell(RefCell<Option<D::Node>>),
	Callback(Box<dyn Fn(Option<&D::Node>)>),
}

/// Receives the element a [`ref_`] binding sits on, while that binding is connected.
pub struct Ref<D: Dom> {
	target: Rc<Target<D>>,
}

impl<D: Dom> Clone for Ref<D> {
	fn clone(&self) -> Self {
		Self { target: self.target.clone() }
	}
}

impl<D: Dom> Debug for Ref<D> {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		match &*self.target {
			Target::Cell(cell) => f.debug_tuple("Ref").field(&cell.borrow()).finish(),
			Target::Callback(_) => f.debug_tuple("Ref").field(&"<callback>").finish(),
		}
	}
}

impl<D: Dom> Default for Ref<D> {
	fn default() -> Self {
		Self::new()
	}
}

impl<D: Dom> Ref<D> {
	/// An empty reference cell.
	#[must_use]
	pub fn new() -> Self {
		Self {
			target: Rc::new(Target::Cell(RefCell::new(None))),
		}
	}

	/// A reference that calls `f` with the element, or with `None` when the binding disconnects.
	pub fn callback(f: impl Fn(Option<&D::Node>) + 'static) -> Self {
		Self {
			target: Rc::new(Target::Callback(Box::new(f))),
		}
	}

	/// The current element. Always `None` for callback references.
	#[must_use]
	pub fn value(&self) -> Option<D::Node> {
		match &*self.target {
			Target::Cell(cell) => cell.borrow().clone(),
			Target::Callback(_) => None,
		}
	}

	#[must_use]
	pub fn is_same(&self, other: &Self) -> bool {
		Rc::ptr_eq(&self.target, &other.target)
	}

	fn set(&self, element: Option<&D::Node>) {
		match &*self.target {
			Target::Cell(cell) => *cell.borrow_mut() = element.cloned(),
			Target::Callback(f) => f(element),
		}
	}

	/// Clears the reference, unless it has been pointed at another element since.
	fn release(&self, element: &D::Node) {
		match &*self.target {
			Target::Cell(cell) => {
				let mut cell = cell.borrow_mut();
				if cell.as_ref() == Some(element) {
					*cell = None;
				}
			}
			Target::Callback(f) => f(None),
		}
	}
}

/// The directive behind [`ref_`].
pub struct RefDirective<D: Dom> {
	target: Option<Ref<D>>,
	element: Option<D::Node>,
}

impl<D: Dom> Directive<D> for RefDirective<D> {
	type Args = Ref<D>;

	fn new(part: &PartInfo) -> Result<Self, Error> {
		if part.part_type != PartType::Element {
			return Err(Error::directive("ref", "can only be used in element position"));
		}
		Ok(Self { target: None, element: None })
	}

	fn render(&mut self, _: Ref<D>) -> Value<D> {
		Value::Nothing
	}

	fn update(&mut self, part: &mut PartRef<'_, D>, target: Ref<D>) -> Result<Value<D>, Error> {
		let element = part.element();
		let changed = !self.target.as_ref().is_some_and(|previous| previous.is_same(&target));
		if changed {
			if let (Some(previous), Some(element)) = (&self.target, &self.element) {
				previous.release(element);
			}
		}
		if changed || self.element != element {
			target.set(element.as_ref());
			self.target = Some(target);
			self.element = element;
		}
		Ok(Value::Nothing)
	}

	fn disconnected(&mut self) {
		if let (Some(target), Some(element)) = (&self.target, &self.element) {
			target.release(element);
		}
	}

	fn reconnected(&mut self) {
		if let Some(target) = &self.target {
			target.set(self.element.as_ref());
		}
	}
}

/// Points `target` at the element this binding sits on, as in `<input {}>`.
pub fn ref_<D: Dom>(target: &Ref<D>) -> DirectiveResult<D> {
	directive::<D, RefDirective<D>>(target.clone())
}
