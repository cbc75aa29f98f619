use crate::{
	directive::{directive, Directive, DirectiveResult, PartHandle, PartInfo, PartRef},
	dom::Dom,
	Error, Value,
};
use std::{
	cell::RefCell,
	fmt::{self, Debug, Formatter},
	mem,
	rc::{Rc, Weak},
};
use tracing::{error, trace, warn};

/// A value that becomes available later, for use with [`until`].
///
/// Clones share the same slot. Whoever produces the value calls [`Pending::resolve`] once.
pub struct Pending<D: Dom>(Rc<RefCell<PendingState<D>>>);

type Waiting<D> = Box<dyn FnOnce(&Value<D>)>;

struct PendingState<D: Dom> {
	value: Option<Value<D>>,
	waiting: Vec<Waiting<D>>,
}

impl<D: Dom> Clone for Pending<D> {
	fn clone(&self) -> Self {
		Self(self.0.clone())
	}
}

impl<D: Dom> Debug for Pending<D> {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		let state = self.0.try_borrow();
		f.debug_struct("Pending")
			.field("resolved", &state.map(|state| state.value.is_some()).ok())
			.finish_non_exhaustive()
	}
}

impl<D: Dom> Default for Pending<D> {
	fn default() -> Self {
		Self::new()
	}
}

impl<D: Dom> Pending<D> {
	#[must_use]
	pub fn new() -> Self {
		Self(Rc::new(RefCell::new(PendingState {
			value: None,
			waiting: Vec::new(),
		})))
	}

	/// Stores `value` and hands it to every [`until`] waiting on it.
	///
	/// Only the first call has an effect.
	pub fn resolve(&self, value: impl Into<Value<D>>) {
		let value = value.into();
		let waiting = {
			let mut state = self.0.borrow_mut();
			if state.value.is_some() {
				warn!("Pending value resolved more than once. Ignoring the later value.");
				return;
			}
			state.value = Some(value.clone());
			mem::take(&mut state.waiting)
		};
		trace!(waiting = waiting.len(), "Resolving pending value.");
		for callback in waiting {
			callback(&value);
		}
	}

	/// The resolved value, if any.
	#[must_use]
	pub fn value(&self) -> Option<Value<D>> {
		self.0.borrow().value.clone()
	}

	#[must_use]
	pub fn is_same(&self, other: &Self) -> bool {
		Rc::ptr_eq(&self.0, &other.0)
	}

	fn on_resolve(&self, callback: impl FnOnce(&Value<D>) + 'static) {
		self.0.borrow_mut().waiting.push(Box::new(callback));
	}

	fn from_value(value: &Value<D>) -> Option<&Self> {
		match value {
			Value::Object(object) => object.downcast_ref::<Self>(),
			_ => None,
		}
	}
}

impl<D: Dom> From<Pending<D>> for Value<D> {
	fn from(pending: Pending<D>) -> Self {
		Value::Object(Rc::new(pending))
	}
}

/// Renders the first available value out of a list ordered by priority.
///
/// Plain values are available right away, [`Pending`] ones once resolved.
/// A later value never replaces one with a higher priority that is already shown.
pub struct Until<D: Dom> {
	state: Rc<RefCell<UntilState<D>>>,
}

struct UntilState<D: Dom> {
	values: Vec<Value<D>>,
	last_rendered: usize,
}

impl<D: Dom> UntilState<D> {
	fn position(&self, pending: &Pending<D>) -> Option<usize> {
		self.values
			.iter()
			.position(|value| Pending::from_value(value).map_or(false, |other| other.is_same(pending)))
	}
}

fn is_same_entry<D: Dom>(a: &Value<D>, b: &Value<D>) -> bool {
	match (Pending::from_value(a), Pending::from_value(b)) {
		(Some(a), Some(b)) => a.is_same(b),
		_ => false,
	}
}

impl<D: Dom> Directive<D> for Until<D> {
	type Args = Vec<Value<D>>;

	fn new(_: &PartInfo) -> Result<Self, Error> {
		Ok(Self {
			state: Rc::new(RefCell::new(UntilState {
				values: Vec::new(),
				last_rendered: usize::MAX,
			})),
		})
	}

	fn render(&mut self, values: Self::Args) -> Value<D> {
		values
			.into_iter()
			.find_map(|value| match Pending::from_value(&value) {
				Some(pending) => pending.value(),
				None => Some(value),
			})
			.unwrap_or(Value::NoChange)
	}

	fn update(&mut self, part: &mut PartRef<'_, D>, values: Self::Args) -> Result<Value<D>, Error> {
		let mut state = self.state.borrow_mut();
		let previous = mem::replace(&mut state.values, values.clone());
		let mut previous_len = previous.len();

		for (i, value) in values.into_iter().enumerate() {
			if i > state.last_rendered {
				break;
			}
			let Some(pending) = Pending::from_value(&value) else {
				state.last_rendered = i;
				return Ok(value);
			};
			if let Some(resolved) = pending.value() {
				state.last_rendered = i;
				return Ok(resolved);
			}
			if i < previous_len && is_same_entry(&value, &previous[i]) {
				continue;
			}

			state.last_rendered = usize::MAX;
			previous_len = 0;

			let weak_state = Rc::downgrade(&self.state);
			let handle = part.handle();
			let awaited = pending.clone();
			pending.on_resolve(move |resolved| settle(&weak_state, &handle, &awaited, resolved));
		}
		Ok(Value::NoChange)
	}
}

fn settle<D: Dom>(state: &Weak<RefCell<UntilState<D>>>, handle: &PartHandle<D>, pending: &Pending<D>, resolved: &Value<D>) {
	let Some(state) = state.upgrade() else {
		trace!("The until directive is gone.");
		return;
	};
	{
		let Ok(mut state) = state.try_borrow_mut() else {
			error!("Pending value resolved while its until directive was updating.");
			return;
		};
		match state.position(pending) {
			Some(index) if index < state.last_rendered => state.last_rendered = index,
			_ => {
				trace!("Resolved value has a lower priority than what is shown.");
				return;
			}
		}
	}
	if let Err(error) = handle.set_value(resolved.clone()) {
		error!("Failed to commit a resolved value: {}", error);
	}
}

/// Renders the first value of `values` that is available, replacing it with higher priority ones as they resolve.
///
/// ```
/// use lit_dom::{directives::{until, Pending}, dom::mem::Document, html, TemplateResult, Value};
///
/// let content: Pending<Document> = Pending::new();
/// let page: TemplateResult<Document> = html!("<main>{}</main>", until([content.clone().into(), Value::from("Loading...")]));
/// content.resolve("Loaded.");
/// ```
pub fn until<D: Dom>(values: impl IntoIterator<Item = Value<D>>) -> DirectiveResult<D> {
	directive::<D, Until<D>>(values.into_iter().collect())
}
