use crate::{dom::Dom, Value};

/// Renders [`Value::Nothing`] for `None` and [`Value::Null`], which removes an attribute instead of writing `null`.
///
/// ```
/// use lit_dom::{directives::if_defined, dom::mem::Document, Value};
///
/// assert!(matches!(if_defined::<Document>(None::<&str>), Value::Nothing));
/// assert!(matches!(if_defined::<Document>(Some("a.png")), Value::Text(_)));
/// ```
pub fn if_defined<D: Dom>(value: impl Into<Value<D>>) -> Value<D> {
	match value.into() {
		Value::Null => Value::Nothing,
		value => value,
	}
}
