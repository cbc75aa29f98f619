use crate::{
	directive::{directive, Directive, DirectiveResult, PartInfo, PartRef},
	dom::Dom,
	Error, Value,
};
use std::rc::Rc;
use tracing::trace;

/// Skips re-rendering a subtree until its dependencies change.
///
/// Lists of dependencies are compared item by item, anything else with [`Value::is_same`].
pub struct Guard<D: Dom> {
	previous: Option<Value<D>>,
}

impl<D: Dom> Directive<D> for Guard<D> {
	type Args = (Value<D>, Rc<dyn Fn() -> Value<D>>);

	fn new(_: &PartInfo) -> Result<Self, Error> {
		Ok(Self { previous: None })
	}

	fn render(&mut self, (_, f): Self::Args) -> Value<D> {
		f()
	}

	fn update(&mut self, _: &mut PartRef<'_, D>, (dependencies, f): Self::Args) -> Result<Value<D>, Error> {
		let unchanged = match (&self.previous, &dependencies) {
			(Some(Value::List(previous)), Value::List(dependencies)) => {
				previous.len() == dependencies.len() && previous.iter().zip(dependencies.iter()).all(|(a, b)| a.is_same(b))
			}
			(Some(Value::List(_)), _) | (_, Value::List(_)) | (None, _) => false,
			(Some(previous), dependencies) => previous.is_same(dependencies),
		};
		if unchanged {
			trace!("Guard dependencies unchanged.");
			return Ok(Value::NoChange);
		}

		self.previous = Some(dependencies.clone());
		Ok(self.render((dependencies, f)))
	}
}

/// Calls `f` for the value to render, but only while `dependencies` differ from the last render.
pub fn guard<D: Dom>(dependencies: impl Into<Value<D>>, f: impl Fn() -> Value<D> + 'static) -> DirectiveResult<D> {
	directive::<D, Guard<D>>((dependencies.into(), Rc::new(f)))
}
