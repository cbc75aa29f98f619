use crate::{
	directive::{directive, Directive, DirectiveResult, PartInfo, PartRef, PartType},
	dom::Dom,
	Error, Value,
};
use tracing::trace;

/// Compares against the live state of the element instead of the last committed value.
///
/// Useful for bindings the user can change, like `.value` of an `<input>`:
/// rendering the same value again still resets what was typed.
pub struct Live {
	part_type: PartType,
	name: String,
}

impl<D: Dom> Directive<D> for Live {
	type Args = Value<D>;

	fn new(part: &PartInfo) -> Result<Self, Error> {
		if !matches!(part.part_type, PartType::Attribute | PartType::Property | PartType::BooleanAttribute) {
			return Err(Error::directive("live", "not allowed on child or event bindings"));
		}
		if !part.is_single_expression() {
			return Err(Error::directive("live", "bindings can only contain a single expression"));
		}
		Ok(Self {
			part_type: part.part_type,
			name: part.name.clone().unwrap_or_default(),
		})
	}

	fn render(&mut self, value: Value<D>) -> Value<D> {
		value
	}

	fn update(&mut self, part: &mut PartRef<'_, D>, value: Value<D>) -> Result<Value<D>, Error> {
		if matches!(value, Value::NoChange | Value::Nothing) {
			return Ok(value);
		}
		let element = part.element().ok_or_else(|| Error::directive("live", "the bound element is gone"))?;
		let dom = part.dom();

		let unchanged = match self.part_type {
			PartType::Property => value.is_same(&dom.property(&element, &self.name)),
			PartType::BooleanAttribute => value.is_truthy() == dom.attribute(&element, &self.name).is_some(),
			_ => dom.attribute(&element, &self.name).as_deref() == Some(value.to_js_string().as_str()),
		};
		if unchanged {
			trace!(name = self.name.as_str(), "Live value unchanged.");
			return Ok(Value::NoChange);
		}

		part.reset_committed();
		Ok(value)
	}
}

/// Wraps `value` so that it's compared against the element itself before writing.
pub fn live<D: Dom>(value: impl Into<Value<D>>) -> DirectiveResult<D> {
	directive::<D, Live>(value.into())
}
