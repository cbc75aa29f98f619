//! An optional hook that rewrites text before it reaches the document.
//!
//! Nothing is sanitized by default. Once a factory is installed with [`set_sanitizer_factory`],
//! every text, attribute and string property binding asks it for a [`Sanitizer`] the first time it writes,
//! and child bindings inside `<style>` or `<script>` are refused with [`Error::UnsafeBinding`].
//!
//! The factory is per thread, like everything else the renderer keeps.

use crate::Error;
use core::cell::RefCell;
use std::rc::Rc;
use tracing::{debug, instrument};

/// Where a sanitized string is going to be written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SinkKind {
	/// The data of a text node in child position.
	Text,
	Attribute,
	Property,
}

/// What a [`SanitizerFactory`] is asked about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SanitizerContext<'a> {
	/// Local name of the element that is written to (or, for text, that contains the text).
	pub tag_name: &'a str,
	/// The attribute or property name. Text is reported as `data`.
	pub name: &'a str,
	pub kind: SinkKind,
}

/// Rewrites one string value.
pub type Sanitizer = Rc<dyn Fn(&str) -> String>;

/// Produces a [`Sanitizer`] per binding, or `None` to let the binding write as-is.
pub type SanitizerFactory = Rc<dyn Fn(&SanitizerContext<'_>) -> Option<Sanitizer>>;

thread_local! {
	static FACTORY: RefCell<Option<SanitizerFactory>> = RefCell::new(None);
}

/// Installs `factory` for the current thread.
///
/// # Errors
///
/// Iff a factory is already installed. It stays in place.
#[instrument(skip(factory))]
pub fn set_sanitizer_factory(factory: impl Fn(&SanitizerContext<'_>) -> Option<Sanitizer> + 'static) -> Result<(), Error> {
	FACTORY.with(|slot| {
		let mut slot = slot.borrow_mut();
		if slot.is_some() {
			return Err(Error::SanitizerAlreadySet);
		}
		*slot = Some(Rc::new(factory));
		debug!("Installed sanitizer factory.");
		Ok(())
	})
}

/// Removes the factory of the current thread, if any.
///
/// Bindings that already asked for a sanitizer keep using it.
pub fn clear_sanitizer_factory() {
	FACTORY.with(|slot| slot.borrow_mut().take());
}

pub(crate) fn is_active() -> bool {
	FACTORY.with(|slot| slot.borrow().is_some())
}

pub(crate) fn sanitizer_for(tag_name: &str, name: &str, kind: SinkKind) -> Option<Sanitizer> {
	let factory = FACTORY.with(|slot| slot.borrow().clone())?;
	factory(&SanitizerContext { tag_name, name, kind })
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn second_factory_is_refused() {
		clear_sanitizer_factory();
		assert!(!is_active());

		set_sanitizer_factory(|context| {
			let name = context.name.to_owned();
			Some(Rc::new(move |value: &str| format!("{}:{}", name, value)) as Sanitizer)
		})
		.unwrap();
		assert!(is_active());
		assert_eq!(set_sanitizer_factory(|_| None), Err(Error::SanitizerAlreadySet));

		let sanitizer = sanitizer_for("div", "title", SinkKind::Attribute).unwrap();
		assert_eq!(sanitizer("x"), "title:x");

		clear_sanitizer_factory();
		assert!(sanitizer_for("div", "title", SinkKind::Attribute).is_none());
	}
}
