use thiserror::Error;

/// Everything that can go wrong while preparing or committing a template.
///
/// Rendering is otherwise forgiving: values of unexpected shape are stringified rather than rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum Error {
	/// The literal was not produced by [`html!`](`crate::html!`) or [`svg!`](`crate::svg!`).
	///
	/// Refusing these keeps strings assembled at runtime from ever being parsed as trusted markup.
	#[error("the template literal was not created by a template macro and will not be parsed as markup")]
	UntaggedLiteral,

	/// A binding sits where an element name is expected, as in `<{}>`.
	#[error("bindings in tag names are not supported (fragment {fragment})")]
	DynamicTagName { fragment: usize },

	/// A binding sits inside the content of a `<template>` element.
	#[error("bindings are not supported inside `<template>` elements")]
	BindingInTemplate,

	/// The HTML parser dropped a repeated bound attribute, so its binding can't be located.
	#[error("duplicate attribute bindings on one element (expected {expected} bound attributes, found {found})")]
	DuplicateAttributeBinding { expected: usize, found: usize },

	/// Preparation located fewer value slots than the literal declares.
	#[error("only {found} of {expected} bindings could be located after parsing the template")]
	UnlocatedBindings { expected: usize, found: usize },

	/// The number of values doesn't match the placeholders of the literal.
	#[error("the template expects {expected} values but was given {found}")]
	ValueCount { expected: usize, found: usize },

	/// A child part's marker nodes were moved or removed by someone else.
	#[error(
		"this child part has no parent node and therefore can't accept a value; \
		its markers were likely removed by replacing an ancestor's content outside of the renderer"
	)]
	DetachedPart,

	/// `render` was called with a node that can't hold children.
	#[error("the container to render into must be an element, document fragment or document, not a {found}")]
	InvalidContainer { found: &'static str },

	/// A child binding inside `<style>` or `<script>` while a sanitizer is installed.
	#[error("binding inside <{tag}> elements is not allowed while a sanitizer is active")]
	UnsafeBinding { tag: String },

	/// `set_connected` was called on a part that isn't the root of a render.
	#[error("set_connected may only be called on a root part returned from render")]
	NotRootPart,

	/// A directive refused the part it was bound to, or failed otherwise.
	#[error("directive {directive}: {message}")]
	Directive { directive: &'static str, message: String },

	/// [`set_sanitizer_factory`](`crate::sanitize::set_sanitizer_factory`) was called while a factory was already installed.
	#[error("a sanitizer factory is already installed and can't be replaced")]
	SanitizerAlreadySet,

	/// A value was pushed into a part while that part's tree was already being updated.
	#[error("the part tree is already being updated; values must be set from outside of render")]
	Reentrant,
}

impl Error {
	/// Convenience constructor for directive authors.
	pub fn directive(directive: &'static str, message: impl Into<String>) -> Self {
		Self::Directive {
			directive,
			message: message.into(),
		}
	}
}
