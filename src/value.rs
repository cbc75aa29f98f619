//! What can be bound into a template.

use crate::{
	directive::DirectiveResult,
	dom::{Dom, ListenerOptions},
	template::TemplateResult,
};
use core::{
	any::Any,
	fmt::{self, Debug, Formatter},
};
use std::rc::Rc;

/// A dynamic value, as passed to a binding.
///
/// Primitive variants are compared by value, everything else by identity (see [`Value::is_same`]).
pub enum Value<D: Dom> {
	/// Renders nothing: clears child content, removes attributes.
	Nothing,
	/// Leaves whatever was committed previously in place.
	NoChange,
	/// `null`/`undefined`.
	Null,
	Bool(bool),
	Number(f64),
	Text(Rc<str>),
	/// A nested template.
	Template(TemplateResult<D>),
	/// A node to be inserted as-is.
	Node(D::Node),
	/// Rendered item by item in child position, joined with `,` elsewhere.
	List(Rc<[Value<D>]>),
	Listener(Listener<D>),
	/// An opaque value, which is only ever compared by identity.
	Object(Rc<dyn Any>),
	Directive(DirectiveResult<D>),
}

impl<D: Dom> Clone for Value<D> {
	fn clone(&self) -> Self {
		match self {
			Value::Nothing => Value::Nothing,
			Value::NoChange => Value::NoChange,
			Value::Null => Value::Null,
			Value::Bool(b) => Value::Bool(*b),
			Value::Number(n) => Value::Number(*n),
			Value::Text(text) => Value::Text(text.clone()),
			Value::Template(result) => Value::Template(result.clone()),
			Value::Node(node) => Value::Node(node.clone()),
			Value::List(items) => Value::List(items.clone()),
			Value::Listener(listener) => Value::Listener(listener.clone()),
			Value::Object(object) => Value::Object(object.clone()),
			Value::Directive(directive) => Value::Directive(directive.clone()),
		}
	}
}

impl<D: Dom> Debug for Value<D> {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		match self {
			Value::Nothing => f.write_str("Nothing"),
			Value::NoChange => f.write_str("NoChange"),
			Value::Null => f.write_str("Null"),
			Value::Bool(b) => f.debug_tuple("Bool").field(b).finish(),
			Value::Number(n) => f.debug_tuple("Number").field(n).finish(),
			Value::Text(text) => f.debug_tuple("Text").field(text).finish(),
			Value::Template(result) => result.fmt(f),
			Value::Node(node) => f.debug_tuple("Node").field(node).finish(),
			Value::List(items) => f.debug_list().entries(items.iter()).finish(),
			Value::Listener(listener) => listener.fmt(f),
			Value::Object(object) => write!(f, "Object({:p})", Rc::as_ptr(object).cast::<()>()),
			Value::Directive(directive) => directive.fmt(f),
		}
	}
}

impl<D: Dom> Default for Value<D> {
	fn default() -> Self {
		Value::Nothing
	}
}

pub(crate) fn rc_ptr_eq<T: ?Sized, U: ?Sized>(a: &Rc<T>, b: &Rc<U>) -> bool {
	Rc::as_ptr(a).cast::<()>() == Rc::as_ptr(b).cast::<()>()
}

impl<D: Dom> Value<D> {
	/// `Object.is`-style identity: `NaN` is the same as `NaN`, `0.0` is not the same as `-0.0`,
	/// text compares by content and everything reference-counted compares by pointer.
	#[must_use]
	#[allow(clippy::float_cmp)]
	pub fn is_same(&self, other: &Self) -> bool {
		match (self, other) {
			(Value::Nothing, Value::Nothing) | (Value::NoChange, Value::NoChange) | (Value::Null, Value::Null) => true,
			(Value::Bool(a), Value::Bool(b)) => a == b,
			(Value::Number(a), Value::Number(b)) => {
				if a.is_nan() && b.is_nan() {
					true
				} else if *a == 0.0 && *b == 0.0 {
					a.is_sign_negative() == b.is_sign_negative()
				} else {
					a == b
				}
			}
			(Value::Text(a), Value::Text(b)) => a == b,
			(Value::Template(a), Value::Template(b)) => a.is_same(b),
			(Value::Node(a), Value::Node(b)) => a == b,
			(Value::List(a), Value::List(b)) => Rc::ptr_eq(a, b),
			(Value::Listener(a), Value::Listener(b)) => a.is_same(b),
			(Value::Object(a), Value::Object(b)) => rc_ptr_eq(a, b),
			(Value::Directive(a), Value::Directive(b)) => a.is_same(b),
			_ => false,
		}
	}

	/// Whether this value is compared by content rather than identity.
	///
	/// The sentinels count as primitive.
	#[must_use]
	pub fn is_primitive(&self) -> bool {
		matches!(self, Value::Nothing | Value::NoChange | Value::Null | Value::Bool(_) | Value::Number(_) | Value::Text(_))
	}

	/// `null`, `undefined` or [`Value::Nothing`].
	#[must_use]
	pub fn is_nullish(&self) -> bool {
		matches!(self, Value::Null | Value::Nothing)
	}

	#[must_use]
	pub fn is_truthy(&self) -> bool {
		match self {
			Value::Nothing | Value::NoChange | Value::Null => false,
			Value::Bool(b) => *b,
			Value::Number(n) => *n != 0.0 && !n.is_nan(),
			Value::Text(text) => !text.is_empty(),
			_ => true,
		}
	}

	/// A short name of the variant, for logging without leaking content.
	#[must_use]
	pub fn kind_name(&self) -> &'static str {
		match self {
			Value::Nothing => "nothing",
			Value::NoChange => "no-change",
			Value::Null => "null",
			Value::Bool(_) => "bool",
			Value::Number(_) => "number",
			Value::Text(_) => "text",
			Value::Template(_) => "template",
			Value::Node(_) => "node",
			Value::List(_) => "list",
			Value::Listener(_) => "listener",
			Value::Object(_) => "object",
			Value::Directive(_) => "directive",
		}
	}

	/// Converts the value to text the way JavaScript's `String(value)` would.
	#[must_use]
	pub fn to_js_string(&self) -> String {
		match self {
			Value::Nothing | Value::NoChange => String::new(),
			Value::Null => "null".to_owned(),
			Value::Bool(b) => b.to_string(),
			Value::Number(n) => number_to_string(*n),
			Value::Text(text) => text.to_string(),
			Value::List(items) => {
				let mut joined = String::new();
				for (i, item) in items.iter().enumerate() {
					if i > 0 {
						joined.push(',');
					}
					if !item.is_nullish() {
						joined.push_str(&item.to_js_string());
					}
				}
				joined
			}
			Value::Node(_) => "[object Node]".to_owned(),
			Value::Listener(_) => "[object Function]".to_owned(),
			Value::Template(_) | Value::Object(_) | Value::Directive(_) => "[object Object]".to_owned(),
		}
	}
}

/// Formats a number like ECMAScript's `Number::toString`.
#[must_use]
pub fn number_to_string(n: f64) -> String {
	if n.is_nan() {
		"NaN".to_owned()
	} else if n.is_infinite() {
		(if n > 0.0 { "Infinity" } else { "-Infinity" }).to_owned()
	} else if n == 0.0 {
		"0".to_owned()
	} else if n.abs() >= 1e21 || n.abs() < 1e-6 {
		let exponential = format!("{:e}", n);
		match exponential.split_once('e') {
			Some((mantissa, exponent)) if !exponent.starts_with('-') => format!("{}e+{}", mantissa, exponent),
			_ => exponential,
		}
	} else {
		format!("{}", n)
	}
}

/// An event listener together with its registration options.
pub struct Listener<D: Dom> {
	handler: Rc<dyn Fn(&D::Event, Option<&Rc<dyn Any>>)>,
	options: ListenerOptions,
}

impl<D: Dom> Clone for Listener<D> {
	fn clone(&self) -> Self {
		Self {
			handler: self.handler.clone(),
			options: self.options,
		}
	}
}

impl<D: Dom> Debug for Listener<D> {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		f.debug_struct("Listener")
			.field("handler", &Rc::as_ptr(&self.handler).cast::<()>())
			.field("options", &self.options)
			.finish()
	}
}

impl<D: Dom> Listener<D> {
	pub fn new(handler: impl Fn(&D::Event) + 'static) -> Self {
		Self::with_host(move |event, _| handler(event))
	}

	/// Creates a listener that also receives the `host` given in [`RenderOptions`](`crate::RenderOptions`).
	pub fn with_host(handler: impl Fn(&D::Event, Option<&Rc<dyn Any>>) + 'static) -> Self {
		Self {
			handler: Rc::new(handler),
			options: ListenerOptions::default(),
		}
	}

	#[must_use]
	pub fn capture(self, capture: bool) -> Self {
		Self {
			options: self.options.with_capture(capture),
			..self
		}
	}

	#[must_use]
	pub fn once(self, once: bool) -> Self {
		Self {
			options: self.options.with_once(once),
			..self
		}
	}

	#[must_use]
	pub fn passive(self, passive: bool) -> Self {
		Self {
			options: self.options.with_passive(passive),
			..self
		}
	}

	#[must_use]
	pub fn options(&self) -> ListenerOptions {
		self.options
	}

	/// Whether both listeners share a handler, ignoring options.
	#[must_use]
	pub fn same_handler(&self, other: &Self) -> bool {
		rc_ptr_eq(&self.handler, &other.handler)
	}

	#[must_use]
	pub fn is_same(&self, other: &Self) -> bool {
		self.same_handler(other) && self.options == other.options
	}

	pub fn call(&self, event: &D::Event, host: Option<&Rc<dyn Any>>) {
		(self.handler)(event, host);
	}
}

impl<D: Dom> From<&str> for Value<D> {
	fn from(text: &str) -> Self {
		Value::Text(text.into())
	}
}

impl<D: Dom> From<String> for Value<D> {
	fn from(text: String) -> Self {
		Value::Text(text.into())
	}
}

impl<D: Dom> From<&String> for Value<D> {
	fn from(text: &String) -> Self {
		Value::Text(text.as_str().into())
	}
}

impl<D: Dom> From<Rc<str>> for Value<D> {
	fn from(text: Rc<str>) -> Self {
		Value::Text(text)
	}
}

impl<D: Dom> From<char> for Value<D> {
	fn from(c: char) -> Self {
		Value::Text(c.to_string().into())
	}
}

impl<D: Dom> From<bool> for Value<D> {
	fn from(b: bool) -> Self {
		Value::Bool(b)
	}
}

impl<D: Dom> From<f64> for Value<D> {
	fn from(n: f64) -> Self {
		Value::Number(n)
	}
}

macro_rules! from_number {
	($($t:ty),*$(,)?) => {$(
		impl<D: Dom> From<$t> for Value<D> {
			#[allow(clippy::cast_precision_loss, clippy::cast_lossless)]
			fn from(n: $t) -> Self {
				Value::Number(n as f64)
			}
		}
	)*};
}
from_number!(f32, i8, i16, i32, i64, isize, u8, u16, u32, u64, usize);

impl<D: Dom, T: Into<Value<D>>> From<Option<T>> for Value<D> {
	fn from(value: Option<T>) -> Self {
		value.map_or(Value::Null, Into::into)
	}
}

impl<D: Dom, T: Into<Value<D>>> From<Vec<T>> for Value<D> {
	fn from(items: Vec<T>) -> Self {
		Value::List(items.into_iter().map(Into::into).collect())
	}
}

impl<D: Dom, T: Into<Value<D>>> FromIterator<T> for Value<D> {
	fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
		Value::List(iter.into_iter().map(Into::into).collect())
	}
}

impl<D: Dom> From<TemplateResult<D>> for Value<D> {
	fn from(result: TemplateResult<D>) -> Self {
		Value::Template(result)
	}
}

impl<D: Dom> From<Listener<D>> for Value<D> {
	fn from(listener: Listener<D>) -> Self {
		Value::Listener(listener)
	}
}

impl<D: Dom> From<DirectiveResult<D>> for Value<D> {
	fn from(directive: DirectiveResult<D>) -> Self {
		Value::Directive(directive)
	}
}
