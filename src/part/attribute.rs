//! Attribute, property, boolean attribute and event bindings.
//!
//! All four share one record and one dirty check. They only differ in how a changed value is written.

use super::PartTree;
use crate::{
	directive,
	dom::Dom,
	sanitize::{self, Sanitizer, SinkKind},
	template::AttributeKind,
	value::Listener,
	Error, PartKey, Value,
};
use core::{any::Any, cell::RefCell};
use std::rc::Rc;
use tracing::{instrument, trace, warn};

pub(crate) struct AttributePart<D: Dom> {
	pub(crate) element: D::Node,
	/// Attribute, property or event name, without sigil.
	pub(crate) name: String,
	pub(crate) kind: AttributeKind,
	/// The static text around the values of an interpolation. `None` for a single value.
	pub(crate) strings: Option<Vec<String>>,
	/// One entry per value slot.
	pub(crate) committed: Vec<Value<D>>,
	/// The listener that events are forwarded to.
	listener: Rc<RefCell<Option<Listener<D>>>>,
	registration: Option<D::Listener>,
	sanitizer: Option<Sanitizer>,
}

impl<D: Dom> AttributePart<D> {
	pub(crate) fn new(element: D::Node, name: String, kind: AttributeKind, strings: Option<Vec<String>>) -> Self {
		// Interpolations start out with values that nothing is the same as, so that their first render always writes.
		let committed = match &strings {
			Some(strings) => (1..strings.len()).map(|_| Value::Object(Rc::new(()))).collect(),
			None => vec![Value::Nothing],
		};
		Self {
			element,
			name,
			kind,
			strings,
			committed,
			listener: Rc::default(),
			registration: None,
			sanitizer: None,
		}
	}

	fn sanitize(&mut self, dom: &D, kind: SinkKind, text: String) -> String {
		if !sanitize::is_active() {
			return text;
		}
		if self.sanitizer.is_none() {
			self.sanitizer = sanitize::sanitizer_for(&dom.local_name(&self.element), &self.name, kind);
		}
		match &self.sanitizer {
			Some(sanitizer) => sanitizer(&text),
			None => text,
		}
	}
}

/// Resolves and commits all values of an interpolation at once.
pub(crate) fn set_values<D: Dom>(tree: &mut PartTree<D>, key: PartKey, values: Vec<Value<D>>) -> Result<(), Error> {
	let mut resolved = Vec::with_capacity(values.len());
	for (index, value) in values.into_iter().enumerate() {
		resolved.push((index, directive::resolve(tree, key, index, value, 0)?));
	}
	commit_interpolation(tree, key, resolved)
}

/// Resolves and commits the value slot `index`, keeping the other slots of an interpolation as they are.
#[instrument(level = "trace", skip(tree, value), fields(value = value.kind_name()))]
pub(crate) fn set_value_at<D: Dom>(tree: &mut PartTree<D>, key: PartKey, index: usize, value: Value<D>, depth: usize) -> Result<(), Error> {
	let value = directive::resolve(tree, key, index, value, depth)?;
	let Some(attribute) = tree.attribute_mut(key) else {
		trace!("The part was removed while resolving its value.");
		return Ok(());
	};

	if attribute.strings.is_some() {
		return commit_interpolation(tree, key, vec![(index, value)]);
	}

	if attribute.kind == AttributeKind::Event {
		if matches!(value, Value::NoChange) {
			return Ok(());
		}
		return write(tree, key, value);
	}

	let changed = !value.is_primitive() || (!value.is_same(&attribute.committed[0]) && !matches!(value, Value::NoChange));
	if !changed {
		trace!(name = attribute.name.as_str(), "Unchanged.");
		return Ok(());
	}
	attribute.committed[0] = value.clone();
	write(tree, key, value)
}

/// Folds new slot values into the committed ones and writes the interpolated text if any slot changed.
///
/// [`Value::NoChange`] keeps the committed slot value. Any [`Value::Nothing`] removes the whole attribute.
fn commit_interpolation<D: Dom>(tree: &mut PartTree<D>, key: PartKey, values: Vec<(usize, Value<D>)>) -> Result<(), Error> {
	let Some(attribute) = tree.attribute_mut(key) else {
		return Ok(());
	};
	let Some(strings) = &attribute.strings else {
		return Ok(());
	};

	let mut changed = false;
	for (index, mut value) in values {
		let Some(committed) = attribute.committed.get_mut(index) else {
			warn!(index, "Value slot out of range.");
			continue;
		};
		if matches!(value, Value::NoChange) {
			value = committed.clone();
		}
		changed |= !value.is_primitive() || !value.is_same(committed);
		*committed = value;
	}
	if !changed {
		trace!(name = attribute.name.as_str(), "Unchanged interpolation.");
		return Ok(());
	}

	let value = if attribute.committed.iter().any(|value| matches!(value, Value::Nothing)) {
		Value::Nothing
	} else {
		let mut text = strings[0].clone();
		for (value, string) in attribute.committed.iter().zip(&strings[1..]) {
			if !value.is_nullish() {
				text.push_str(&value.to_js_string());
			}
			text.push_str(string);
		}
		Value::Text(text.into())
	};
	write(tree, key, value)
}

fn write<D: Dom>(tree: &mut PartTree<D>, key: PartKey, value: Value<D>) -> Result<(), Error> {
	let dom = tree.dom.clone();
	let host = tree.host.clone();
	let Some(attribute) = tree.attribute_mut(key) else {
		return Ok(());
	};

	#[cfg(feature = "dangerous-logging")]
	trace!(name = attribute.name.as_str(), kind = ?attribute.kind, ?value, "Writing.");
	#[cfg(not(feature = "dangerous-logging"))]
	trace!(name = attribute.name.as_str(), kind = ?attribute.kind, value = value.kind_name(), "Writing.");

	match attribute.kind {
		AttributeKind::Attribute => {
			if value.is_nullish() {
				dom.remove_attribute(&attribute.element, &attribute.name);
			} else {
				let text = attribute.sanitize(&dom, SinkKind::Attribute, value.to_js_string());
				dom.set_attribute(&attribute.element, &attribute.name, &text);
			}
		}
		AttributeKind::Property => {
			let value = match value {
				Value::Text(text) if sanitize::is_active() => Value::Text(attribute.sanitize(&dom, SinkKind::Property, text.to_string()).into()),
				value => value,
			};
			dom.set_property(&attribute.element, &attribute.name, value);
		}
		AttributeKind::Boolean => {
			if value.is_truthy() {
				dom.set_attribute(&attribute.element, &attribute.name, "");
			} else {
				dom.remove_attribute(&attribute.element, &attribute.name);
			}
		}
		AttributeKind::Event => commit_listener(&dom, attribute, host, value),
	}
	Ok(())
}

/// Swaps the registered listener if the handler or its options changed.
///
/// The registered closure only forwards to whatever listener is committed,
/// so it doesn't have to capture the listener itself.
fn commit_listener<D: Dom>(dom: &D, attribute: &mut AttributePart<D>, host: Option<Rc<dyn Any>>, value: Value<D>) {
	let next = match value {
		Value::Listener(listener) => Some(listener),
		value if value.is_nullish() => None,
		value => {
			warn!(name = attribute.name.as_str(), value = value.kind_name(), "Event bindings expect a listener. Treating the value as nothing.");
			None
		}
	};

	let previous = attribute.listener.borrow().clone();
	let replace = match (&previous, &next) {
		(None, None) => false,
		(Some(previous), Some(next)) => !previous.is_same(next),
		_ => true,
	};
	if !replace {
		trace!(name = attribute.name.as_str(), "Listener unchanged.");
		return;
	}

	if let Some(registration) = attribute.registration.take() {
		dom.remove_event_listener(&attribute.element, &attribute.name, registration);
	}
	if let Some(next) = &next {
		let listener = attribute.listener.clone();
		let forward: Rc<dyn Fn(&D::Event)> = Rc::new(move |event| {
			let current = listener.borrow().clone();
			if let Some(current) = current {
				current.call(event, host.as_ref());
			}
		});
		attribute.registration = Some(dom.add_event_listener(&attribute.element, &attribute.name, next.options(), forward));
	}
	*attribute.listener.borrow_mut() = next;
}
