//! Template literals, their preparation into binding descriptors and the per-thread template cache.

use crate::{
	dom::{
		mem::{Document, NodeId},
		Dom, Namespace, NodeType,
	},
	scan::{self, BOUND_ATTRIBUTE_SUFFIX},
	Error, Value,
};
use core::{
	cell::RefCell,
	fmt::{self, Debug, Formatter},
};
use hashbrown::HashMap;
use std::rc::Rc;
use tracing::{debug, instrument, trace, warn};

/// Whether a literal holds HTML or SVG content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResultKind {
	Html,
	Svg,
}

/// The static part of a template: the source text with `{}` at each binding.
///
/// Create these with [`html!`](`crate::html!`) or [`svg!`](`crate::svg!`), which place each literal in a `static`.
/// The address of that `static` identifies the template in the cache.
#[derive(Debug)]
pub struct Literal {
	source: &'static str,
	kind: ResultKind,
	tagged: bool,
}

impl Literal {
	#[doc(hidden)]
	#[must_use]
	pub const fn __tagged(source: &'static str, kind: ResultKind) -> Self {
		Self { source, kind, tagged: true }
	}

	/// A literal that did not come from a template macro.
	///
	/// Rendering it fails with [`Error::UntaggedLiteral`].
	#[must_use]
	pub const fn untagged(source: &'static str, kind: ResultKind) -> Self {
		Self {
			source,
			kind,
			tagged: false,
		}
	}

	#[must_use]
	pub fn source(&self) -> &'static str {
		self.source
	}

	#[must_use]
	pub fn kind(&self) -> ResultKind {
		self.kind
	}

	/// The static fragments between bindings, with `{{` and `}}` unescaped.
	#[must_use]
	pub fn strings(&self) -> Vec<String> {
		let mut strings = vec![String::new()];
		let mut chars = self.source.chars().peekable();
		while let Some(c) = chars.next() {
			match (c, chars.peek()) {
				('{', Some('}')) => {
					chars.next();
					strings.push(String::new());
				}
				('{', Some('{')) | ('}', Some('}')) => {
					chars.next();
					push_last(&mut strings, c);
				}
				_ => push_last(&mut strings, c),
			}
		}
		strings
	}

	fn key(&'static self) -> usize {
		self as *const Self as usize
	}
}

fn push_last(strings: &mut [String], c: char) {
	if let Some(last) = strings.last_mut() {
		last.push(c);
	}
}

/// A literal together with the values for its bindings, ready to be rendered.
pub struct TemplateResult<D: Dom> {
	literal: &'static Literal,
	values: Rc<[Value<D>]>,
}

impl<D: Dom> Clone for TemplateResult<D> {
	fn clone(&self) -> Self {
		Self {
			literal: self.literal,
			values: self.values.clone(),
		}
	}
}

impl<D: Dom> Debug for TemplateResult<D> {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		let mut debug = f.debug_struct("TemplateResult");
		debug.field("literal", &(self.literal as *const Literal)).field("kind", &self.literal.kind);
		if cfg!(feature = "dangerous-logging") {
			debug.field("values", &self.values);
		} else {
			debug.field("values", &self.values.len());
		}
		debug.finish()
	}
}

impl<D: Dom> TemplateResult<D> {
	pub fn new(literal: &'static Literal, values: Vec<Value<D>>) -> Self {
		Self {
			literal,
			values: values.into(),
		}
	}

	#[must_use]
	pub fn literal(&self) -> &'static Literal {
		self.literal
	}

	#[must_use]
	pub fn values(&self) -> &[Value<D>] {
		&self.values
	}

	#[must_use]
	pub fn is_same(&self, other: &Self) -> bool {
		core::ptr::eq(self.literal, other.literal) && Rc::ptr_eq(&self.values, &other.values)
	}
}

/// What an attribute binding writes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AttributeKind {
	/// `name=…`
	Attribute,
	/// `.name=…`
	Property,
	/// `?name=…`
	Boolean,
	/// `@name=…`
	Event,
}

/// Where a binding sits in a prepared template.
///
/// `index` counts elements and comments in a depth-first walk of the template content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TemplatePart {
	Child {
		index: usize,
	},
	Attribute {
		index: usize,
		name: String,
		kind: AttributeKind,
		/// The static text around the values of an interpolation, or `None` for a single value.
		strings: Option<Vec<String>>,
	},
	Element {
		index: usize,
	},
	/// A binding inside a comment or an attribute name, which consumes its value and renders nothing.
	Inert {
		index: usize,
	},
}

impl TemplatePart {
	#[must_use]
	pub fn index(&self) -> usize {
		match self {
			TemplatePart::Child { index } | TemplatePart::Attribute { index, .. } | TemplatePart::Element { index } | TemplatePart::Inert { index } => *index,
		}
	}

	/// How many values this binding consumes.
	#[must_use]
	pub fn value_count(&self) -> usize {
		match self {
			TemplatePart::Attribute { strings: Some(strings), .. } => strings.len() - 1,
			_ => 1,
		}
	}
}

/// A parsed literal: its content and where its bindings sit. Immutable once built.
pub struct Template {
	kind: ResultKind,
	content: Document,
	fragment: NodeId,
	parts: Vec<TemplatePart>,
	value_count: usize,
}

impl Debug for Template {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		f.debug_struct("Template")
			.field("kind", &self.kind)
			.field("content", &self.content.inner_html(self.fragment))
			.field("parts", &self.parts)
			.finish()
	}
}

impl Template {
	#[must_use]
	pub fn kind(&self) -> ResultKind {
		self.kind
	}

	/// The document holding the content fragment.
	#[must_use]
	pub fn content(&self) -> &Document {
		&self.content
	}

	#[must_use]
	pub fn fragment(&self) -> NodeId {
		self.fragment
	}

	#[must_use]
	pub fn parts(&self) -> &[TemplatePart] {
		&self.parts
	}

	/// The number of values a [`TemplateResult`] for this template must carry.
	#[must_use]
	pub fn value_count(&self) -> usize {
		self.value_count
	}
}

thread_local! {
	static TEMPLATE_CACHE: RefCell<HashMap<usize, Rc<Template>>> = RefCell::new(HashMap::new());
}

/// Retrieves the prepared template for `literal`, preparing it on first use.
pub fn template_for(literal: &'static Literal) -> Result<Rc<Template>, Error> {
	let key = literal.key();
	if let Some(template) = TEMPLATE_CACHE.with(|cache| cache.borrow().get(&key).cloned()) {
		return Ok(template);
	}
	let template = Rc::new(prepare(literal)?);
	TEMPLATE_CACHE.with(|cache| cache.borrow_mut().insert(key, template.clone()));
	Ok(template)
}

const RAW_TEXT_ELEMENTS: &[&str] = &["script", "style", "textarea", "title"];

/// Parses `literal` and locates its bindings.
#[instrument(skip(literal), fields(kind = ?literal.kind))]
pub fn prepare(literal: &'static Literal) -> Result<Template, Error> {
	if !literal.tagged {
		return Err(Error::UntaggedLiteral);
	}

	let strings = literal.strings();
	let string_refs: Vec<&str> = strings.iter().map(String::as_str).collect();
	let marker = scan::marker();
	let scanned = scan::scan(&string_refs, literal.kind, &marker)?;
	let value_count = strings.len() - 1;

	let content = Document::new();
	let fragment = content.create_fragment();
	content.set_inner_html(fragment, &scanned.html);
	if literal.kind == ResultKind::Svg {
		if let Some(wrapper) = content.first_child(&fragment) {
			content.remove_child(&fragment, &wrapper);
			for child in content.children(wrapper) {
				content.append_child(fragment, child);
			}
		}
	}

	let node_marker = format!("?{}", marker);
	let mut parts = Vec::new();
	let mut attr_names = scanned.attr_names.iter();
	let mut attr_names_used = 0;
	let mut node_index = 0;
	let mut walker = Walker::new(&content, fragment);
	while let Some(node) = walker.next() {
		match content.node_type(&node) {
			NodeType::Element => {
				let local_name = content.local_name(&node);
				let namespace = content.namespace(&node);
				if namespace == Namespace::Html && local_name == "template" && content.inner_html(node).contains(&*marker) {
					return Err(Error::BindingInTemplate);
				}

				for name in content.attribute_names(&node) {
					if name.ends_with(BOUND_ATTRIBUTE_SUFFIX) || name.starts_with(&*marker) {
						attr_names_used += 1;
						match attr_names.next() {
							Some(Some(real_name)) => {
								let value = content.attribute(&node, &name).unwrap_or_default();
								let strings: Vec<String> = value.split(&*marker).map(str::to_owned).collect();
								let (kind, name) = match real_name.split_at(real_name.chars().next().map_or(0, char::len_utf8)) {
									(".", name) => (AttributeKind::Property, name.to_owned()),
									("?", name) => (AttributeKind::Boolean, lowercase_html(name, namespace)),
									("@", name) => (AttributeKind::Event, name.to_owned()),
									_ => (AttributeKind::Attribute, lowercase_html(real_name, namespace)),
								};
								let strings = if strings.len() == 2 && strings.iter().all(String::is_empty) { None } else { Some(strings) };
								parts.push(TemplatePart::Attribute {
									index: node_index,
									name,
									kind,
									strings,
								});
							}
							Some(None) => parts.push(TemplatePart::Element { index: node_index }),
							None => (),
						}
						content.remove_attribute(&node, &name);
					} else if name.contains(&*marker) {
						warn!(
							element = %local_name,
							"A binding in attribute name position can't be bound and is ignored. Use a property binding or an element directive instead."
						);
						parts.push(TemplatePart::Inert { index: node_index });
						content.remove_attribute(&node, &name);
					}
				}

				if namespace == Namespace::Html && RAW_TEXT_ELEMENTS.contains(&local_name.as_str()) {
					let text = content.text_content(node);
					let split: Vec<&str> = text.split(&*marker).collect();
					if split.len() > 1 {
						if local_name == "textarea" {
							warn!("Bindings inside <textarea> only set its initial content. Bind `.value` instead.");
						}
						for child in content.children(node) {
							content.remove_child(&node, &child);
						}
						let last = split.len() - 1;
						for segment in &split[..last] {
							let text = content.create_text(segment);
							content.append_child(node, text);
							let part_marker = content.create_comment("");
							content.append_child(node, part_marker);
							node_index += 1;
							parts.push(TemplatePart::Child { index: node_index });
							walker.current = part_marker;
						}
						let text = content.create_text(split[last]);
						content.append_child(node, text);
						let end_marker = content.create_comment("");
						content.append_child(node, end_marker);
					}
				}
			}
			NodeType::Comment => {
				let data = content.node_value(&node);
				if data == node_marker {
					parts.push(TemplatePart::Child { index: node_index });
				} else {
					for _ in data.matches(&*marker) {
						parts.push(TemplatePart::Inert { index: node_index });
					}
				}
			}
			_ => (),
		}
		node_index += 1;
	}

	if attr_names_used != scanned.attr_names.len() {
		return Err(Error::DuplicateAttributeBinding {
			expected: scanned.attr_names.len(),
			found: attr_names_used,
		});
	}
	let located = parts.iter().map(TemplatePart::value_count).sum::<usize>();
	if located != value_count {
		return Err(Error::UnlocatedBindings {
			expected: value_count,
			found: located,
		});
	}

	debug!(parts = parts.len(), value_count, "Prepared template.");
	trace!(html = %content.inner_html(fragment), "Template content.");
	Ok(Template {
		kind: literal.kind,
		content,
		fragment,
		parts,
		value_count,
	})
}

fn lowercase_html(name: &str, namespace: Namespace) -> String {
	match namespace {
		Namespace::Html => name.to_ascii_lowercase(),
		Namespace::Svg | Namespace::MathMl => name.to_owned(),
	}
}

/// Visits elements and comments below `root` in document order, without entering `<template>` elements.
pub(crate) struct Walker<'a, D: Dom> {
	dom: &'a D,
	root: D::Node,
	pub(crate) current: D::Node,
}

impl<'a, D: Dom> Walker<'a, D> {
	pub(crate) fn new(dom: &'a D, root: D::Node) -> Self {
		Self {
			dom,
			current: root.clone(),
			root,
		}
	}

	fn descends(&self, node: &D::Node) -> bool {
		*node == self.root || (self.dom.node_type(node) == NodeType::Element && !(self.dom.namespace(node) == Namespace::Html && self.dom.local_name(node) == "template"))
	}

	fn following(&self, node: &D::Node) -> Option<D::Node> {
		if self.descends(node) {
			if let Some(child) = self.dom.first_child(node) {
				return Some(child);
			}
		}
		let mut node = node.clone();
		loop {
			if node == self.root {
				return None;
			}
			if let Some(sibling) = self.dom.next_sibling(&node) {
				return Some(sibling);
			}
			node = self.dom.parent_node(&node)?;
		}
	}

	#[allow(clippy::should_implement_trait)]
	pub(crate) fn next(&mut self) -> Option<D::Node> {
		loop {
			let next = self.following(&self.current)?;
			self.current = next.clone();
			if matches!(self.dom.node_type(&next), NodeType::Element | NodeType::Comment) {
				return Some(next);
			}
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn parts_of(literal: &'static Literal) -> Vec<TemplatePart> {
		prepare(literal).unwrap().parts
	}

	#[test]
	fn strings_split_at_placeholders() {
		static LITERAL: Literal = Literal::__tagged("a{}b{{c}}{}", ResultKind::Html);
		assert_eq!(LITERAL.strings(), ["a", "b{c}", ""]);
	}

	#[test]
	fn untagged_literals_are_refused() {
		static LITERAL: Literal = Literal::untagged("<p>{}</p>", ResultKind::Html);
		assert_eq!(prepare(&LITERAL).unwrap_err(), Error::UntaggedLiteral);
	}

	#[test]
	fn descriptors_in_document_order() {
		static LITERAL: Literal = Literal::__tagged(r#"<div class="a {} b" .value={}><p>{}</p><input ?disabled={} @click={} {}></div>"#, ResultKind::Html);
		let template = prepare(&LITERAL).unwrap();
		assert_eq!(template.value_count(), 6);
		assert_eq!(
			template.parts,
			[
				TemplatePart::Attribute {
					index: 0,
					name: "class".to_owned(),
					kind: AttributeKind::Attribute,
					strings: Some(vec!["a ".to_owned(), " b".to_owned()]),
				},
				TemplatePart::Attribute {
					index: 0,
					name: "value".to_owned(),
					kind: AttributeKind::Property,
					strings: None,
				},
				TemplatePart::Child { index: 2 },
				TemplatePart::Attribute {
					index: 3,
					name: "disabled".to_owned(),
					kind: AttributeKind::Boolean,
					strings: None,
				},
				TemplatePart::Attribute {
					index: 3,
					name: "click".to_owned(),
					kind: AttributeKind::Event,
					strings: None,
				},
				TemplatePart::Element { index: 3 },
			]
		);
		assert_eq!(
			template.content.inner_html(template.fragment),
			format!("<div><p><!--?{}--></p><input></div>", scan::marker())
		);
	}

	#[test]
	fn raw_text_is_split() {
		static LITERAL: Literal = Literal::__tagged("<style>a{}b{}c</style>", ResultKind::Html);
		let template = prepare(&LITERAL).unwrap();
		assert_eq!(template.parts, [TemplatePart::Child { index: 1 }, TemplatePart::Child { index: 2 }]);
		let style = template.content.children(template.fragment)[0];
		assert_eq!(template.content.inner_html(style), "a<!---->b<!---->c<!---->");
	}

	#[test]
	fn svg_wrapper_is_removed() {
		static LITERAL: Literal = Literal::__tagged(r#"<circle r={} viewBox="0 0 1 1"/>"#, ResultKind::Svg);
		let template = prepare(&LITERAL).unwrap();
		let children = template.content.children(template.fragment);
		assert_eq!(template.content.local_name(&children[0]), "circle");
		assert_eq!(template.content.namespace(&children[0]), Namespace::Svg);
		assert_eq!(template.content.attribute_names(&children[0]), ["viewBox"]);
	}

	#[test]
	fn comment_bindings_are_inert() {
		static LITERAL: Literal = Literal::__tagged("<!-- {} {} --><p>{}</p>", ResultKind::Html);
		assert_eq!(
			parts_of(&LITERAL),
			[TemplatePart::Inert { index: 0 }, TemplatePart::Inert { index: 0 }, TemplatePart::Child { index: 2 }]
		);
	}

	#[test]
	fn attribute_name_bindings_are_inert() {
		static LITERAL: Literal = Literal::__tagged("<div data-{}=x></div>", ResultKind::Html);
		assert_eq!(parts_of(&LITERAL), [TemplatePart::Inert { index: 0 }]);
	}

	#[test]
	fn attribute_name_bindings_keep_static_attributes() {
		static LITERAL: Literal = Literal::__tagged(r#"<div a="x" b{}></div>"#, ResultKind::Html);
		let template = prepare(&LITERAL).unwrap();
		assert_eq!(template.parts, [TemplatePart::Inert { index: 0 }]);
		assert_eq!(template.content.inner_html(template.fragment), r#"<div a="x"></div>"#);
	}

	#[test]
	fn textarea_bindings_are_split_with_a_warning() {
		static LITERAL: Literal = Literal::__tagged("<textarea>{}</textarea><p>{}</p>", ResultKind::Html);
		let template = prepare(&LITERAL).unwrap();
		assert_eq!(template.parts, [TemplatePart::Child { index: 1 }, TemplatePart::Child { index: 4 }]);
		let textarea = template.content.children(template.fragment)[0];
		assert_eq!(template.content.inner_html(textarea), "<!----><!---->");
	}

	#[test]
	fn unlocated_bindings_are_rejected() {
		// Unquoted values only bind after at most one static character.
		static LITERAL: Literal = Literal::__tagged("<div a=xy{}></div>", ResultKind::Html);
		assert_eq!(prepare(&LITERAL).unwrap_err(), Error::UnlocatedBindings { expected: 1, found: 0 });
	}

	#[test]
	fn bindings_in_templates_are_rejected() {
		static LITERAL: Literal = Literal::__tagged("<template><p>{}</p></template>", ResultKind::Html);
		assert_eq!(prepare(&LITERAL).unwrap_err(), Error::BindingInTemplate);
	}

	#[test]
	fn duplicate_bound_attributes_are_rejected() {
		static LITERAL: Literal = Literal::__tagged("<div a={} a={}></div>", ResultKind::Html);
		assert_eq!(prepare(&LITERAL).unwrap_err(), Error::DuplicateAttributeBinding { expected: 2, found: 1 });
	}

	#[test]
	fn cache_returns_the_same_template() {
		static LITERAL: Literal = Literal::__tagged("<p>{}</p>", ResultKind::Html);
		let a = template_for(&LITERAL).unwrap();
		let b = template_for(&LITERAL).unwrap();
		assert!(Rc::ptr_eq(&a, &b));
	}
}
