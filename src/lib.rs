//! Tagged HTML templates that render into a DOM and, on later renders, only touch the bindings whose values changed.
//!
//! A template is written once with [`html!`] or [`svg!`]. Its markup is parsed the first time it renders,
//! the positions of its bindings are recorded, and every later render of the same call site clones that
//! prepared content instead of parsing again.
//!
//! Rendering happens through any [`Dom`](`dom::Dom`) implementation:
//! [`dom::mem::Document`] is always available, and the `web` feature adds a `web-sys` backend.
//!
//! ```
//! use lit_dom::{dom::mem::Document, html, render, RenderOptions};
//!
//! let document = Document::new();
//! let body = document.root();
//!
//! let greet = |name: &str| html!("<p class=greeting>Hello, {}!</p>", name);
//! render(&document, greet("World"), &body, RenderOptions::default())?;
//! let p = document.query(body, "p").unwrap();
//! assert_eq!(document.text_content(p), "Hello, World!");
//!
//! // Only the text node is updated; the paragraph stays the same.
//! render(&document, greet("Ferris"), &body, RenderOptions::default())?;
//! assert_eq!(document.query(body, "p"), Some(p));
//! assert_eq!(document.text_content(p), "Hello, Ferris!");
//! # Ok::<(), lit_dom::Error>(())
//! ```

#![doc(html_root_url = "https://docs.rs/lit-dom/0.0.1")]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

#[cfg(doctest)]
pub mod readme {
	doc_comment::doctest!("../README.md");
}

pub mod directive;
pub mod directives;
pub mod dom;
mod error;
mod instance;
mod part;
mod render;
pub mod sanitize;
mod scan;
pub mod template;
pub mod value;

pub use directive::{directive, Directive, DirectiveResult, PartHandle, PartInfo, PartRef, PartType};
pub use error::Error;
pub use part::PartKey;
pub use render::{render, RenderOptions, RootPart};
pub use template::{Literal, ResultKind, TemplateResult};
pub use value::{Listener, Value};

/// Creates an HTML [`TemplateResult`].
///
/// Each `{}` in the literal is a binding and takes the next value. `{{` and `}}` stand for literal braces.
/// A binding may sit in text, in an attribute value, or in place of an attribute.
/// Attribute names can be prefixed with `.` to set a property, `?` to toggle a boolean attribute or `@` to add an event listener.
///
/// ```
/// use lit_dom::{dom::mem::Document, html, Listener, TemplateResult};
///
/// let row: TemplateResult<Document> = html!(
/// 	"<tr class='row {}' ?hidden={} @click={}><td>{}</td></tr>",
/// 	"selected",
/// 	false,
/// 	Listener::<Document>::new(|_| ()),
/// 	5,
/// );
/// assert_eq!(row.values().len(), 4);
/// ```
#[macro_export]
macro_rules! html {
	($source:literal $(, $value:expr)* $(,)?) => {{
		static LITERAL: $crate::Literal = $crate::Literal::__tagged($source, $crate::ResultKind::Html);
		$crate::TemplateResult::new(&LITERAL, ::std::vec![$($crate::Value::from($value)),*])
	}};
}

/// Creates an SVG [`TemplateResult`], for use inside an `<svg>` element. See [`html!`].
#[macro_export]
macro_rules! svg {
	($source:literal $(, $value:expr)* $(,)?) => {{
		static LITERAL: $crate::Literal = $crate::Literal::__tagged($source, $crate::ResultKind::Svg);
		$crate::TemplateResult::new(&LITERAL, ::std::vec![$($crate::Value::from($value)),*])
	}};
}
