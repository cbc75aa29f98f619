use crate::{
	directive::{directive, Directive, DirectiveResult, PartInfo, PartRef, PartType},
	dom::{mem, Dom},
	Error, Value,
};
use std::rc::Rc;
use tracing::trace;

/// Renders a string as markup instead of text.
///
/// The string is parsed again only when it changes. `Nothing` and `Null` clear the part.
/// Never pass it anything user-controlled.
pub struct UnsafeHtml {
	markup: Markup,
	previous: Option<Rc<str>>,
}

/// [`UnsafeHtml`] for SVG content. The markup is parsed as children of an `<svg>` element.
pub struct UnsafeSvg(UnsafeHtml);

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
enum Markup {
	Html,
	Svg,
}

impl Markup {
	fn directive_name(self) -> &'static str {
		match self {
			Markup::Html => "unsafe_html",
			Markup::Svg => "unsafe_svg",
		}
	}
}

impl UnsafeHtml {
	fn with_markup(part: &PartInfo, markup: Markup) -> Result<Self, Error> {
		if part.part_type != PartType::Child {
			return Err(Error::directive(markup.directive_name(), "can only be used in child bindings"));
		}
		Ok(Self { markup, previous: None })
	}

	fn parse<D: Dom>(&mut self, dom: &D, value: Value<D>) -> Result<Value<D>, Error> {
		let text = match value {
			Value::Nothing | Value::Null => {
				self.previous = None;
				return Ok(Value::Nothing);
			}
			Value::NoChange => return Ok(Value::NoChange),
			Value::Text(text) => text,
			other => {
				return Err(Error::directive(
					self.markup.directive_name(),
					format!("called with a non-string value ({})", other.kind_name()),
				))
			}
		};
		if self.previous.as_deref() == Some(&*text) {
			trace!("Unchanged markup.");
			return Ok(Value::NoChange);
		}

		let content = mem::Document::new();
		let fragment = content.create_fragment();
		let parsed = match self.markup {
			Markup::Html => {
				content.set_inner_html(fragment, &text);
				fragment
			}
			Markup::Svg => {
				content.set_inner_html(fragment, &format!("<svg>{}</svg>", text));
				content.first_child(&fragment).unwrap_or(fragment)
			}
		};
		trace!(markup = ?self.markup, len = text.len(), "Parsed raw markup.");
		self.previous = Some(text);
		Ok(Value::Node(dom.import_template(&content, parsed)))
	}
}

impl<D: Dom> Directive<D> for UnsafeHtml {
	type Args = Value<D>;

	fn new(part: &PartInfo) -> Result<Self, Error> {
		Self::with_markup(part, Markup::Html)
	}

	fn render(&mut self, value: Self::Args) -> Value<D> {
		value
	}

	fn update(&mut self, part: &mut PartRef<'_, D>, value: Self::Args) -> Result<Value<D>, Error> {
		self.parse(part.dom(), value)
	}
}

impl<D: Dom> Directive<D> for UnsafeSvg {
	type Args = Value<D>;

	fn new(part: &PartInfo) -> Result<Self, Error> {
		UnsafeHtml::with_markup(part, Markup::Svg).map(Self)
	}

	fn render(&mut self, value: Self::Args) -> Value<D> {
		value
	}

	fn update(&mut self, part: &mut PartRef<'_, D>, value: Self::Args) -> Result<Value<D>, Error> {
		self.0.parse(part.dom(), value)
	}
}

/// Renders `markup` as HTML.
///
/// ```
/// use lit_dom::{directives::unsafe_html, dom::mem::Document, html, TemplateResult};
///
/// let post: TemplateResult<Document> = html!("<article>{}</article>", unsafe_html("<p>Hello <b>world</b></p>"));
/// ```
pub fn unsafe_html<D: Dom>(markup: impl Into<Value<D>>) -> DirectiveResult<D> {
	directive::<D, UnsafeHtml>(markup.into())
}

/// Renders `markup` as SVG content. Bind it inside an `<svg>` element.
pub fn unsafe_svg<D: Dom>(markup: impl Into<Value<D>>) -> DirectiveResult<D> {
	directive::<D, UnsafeSvg>(markup.into())
}
