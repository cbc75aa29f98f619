use crate::{
	directive::{directive, Directive, DirectiveResult, PartInfo, PartRef, PartType},
	dom::Dom,
	Error, Value,
};
use hashbrown::HashSet;
use tracing::trace;

/// Sets the declarations of a `style` attribute.
///
/// Names are given in camelCase (`fontSize`) or dash-case (`font-size`, `--custom`). Declarations without
/// a value are skipped on the first render and removed later on. Like [`class_map`](`super::class_map`),
/// later renders edit the attribute in place instead of writing it through the binding.
pub struct StyleMap {
	previous: Option<HashSet<String>>,
}

impl<D: Dom> Directive<D> for StyleMap {
	type Args = Vec<(String, Option<String>)>;

	fn new(part: &PartInfo) -> Result<Self, Error> {
		let is_style = part.part_type == PartType::Attribute && part.name.as_deref() == Some("style");
		if !is_style || part.strings.as_ref().map_or(false, |strings| strings.len() > 2) {
			return Err(Error::directive(
				"style_map",
				"can only be used in the `style` attribute and must be the only binding in it",
			));
		}
		Ok(Self { previous: None })
	}

	fn render(&mut self, styles: Self::Args) -> Value<D> {
		let mut text = String::new();
		for (name, value) in &styles {
			if let Some(value) = value {
				text.push_str(&dash_case(name));
				text.push(':');
				text.push_str(value);
				text.push(';');
			}
		}
		text.into()
	}

	fn update(&mut self, part: &mut PartRef<'_, D>, styles: Self::Args) -> Result<Value<D>, Error> {
		if self.previous.is_none() {
			self.previous = Some(styles.iter().filter(|(_, value)| value.is_some()).map(|(name, _)| dash_case(name)).collect());
			return Ok(<Self as Directive<D>>::render(self, styles));
		}
		let Some(previous) = self.previous.as_mut() else {
			return Ok(Value::NoChange);
		};

		let set: Vec<(String, &str)> = styles.iter().filter_map(|(name, value)| Some((dash_case(name), value.as_deref()?))).collect();
		let mut removed = Vec::new();
		previous.retain(|name| {
			let kept = set.iter().any(|(set_name, _)| set_name == name);
			if !kept {
				removed.push(name.clone());
			}
			kept
		});
		previous.extend(set.iter().map(|(name, _)| name.clone()));

		let element = part.element().ok_or_else(|| Error::directive("style_map", "the bound element is gone"))?;
		let dom = part.dom();
		let mut declarations = parse_declarations(&dom.attribute(&element, "style").unwrap_or_default());
		declarations.retain(|(name, _)| !removed.contains(name));
		for (name, value) in set {
			match declarations.iter_mut().find(|(existing, _)| *existing == name) {
				Some((_, existing)) => value.clone_into(existing),
				None => declarations.push((name, value.to_owned())),
			}
		}

		let text: Vec<String> = declarations.iter().map(|(name, value)| format!("{}: {};", name, value)).collect();
		trace!(declarations = text.len(), "Updating style declarations.");
		dom.set_attribute(&element, "style", &text.join(" "));
		Ok(Value::NoChange)
	}
}

/// `fontSize` to `font-size` and `webkitTransform` to `-webkit-transform`. Names containing `-` are kept as they are.
fn dash_case(name: &str) -> String {
	if name.contains('-') {
		return name.to_owned();
	}
	let mut dashed = String::with_capacity(name.len() + 4);
	for prefix in ["webkit", "moz", "ms", "o"] {
		if name.strip_prefix(prefix).map_or(false, |rest| rest.starts_with(|c: char| c.is_ascii_uppercase())) {
			dashed.push('-');
			break;
		}
	}
	for c in name.chars() {
		if c.is_ascii_uppercase() {
			dashed.push('-');
			dashed.push(c.to_ascii_lowercase());
		} else {
			dashed.push(c);
		}
	}
	dashed
}

fn parse_declarations(style: &str) -> Vec<(String, String)> {
	style
		.split(';')
		.filter_map(|declaration| {
			let (name, value) = declaration.split_once(':')?;
			let name = name.trim();
			let name = if name.starts_with("--") { name.to_owned() } else { name.to_ascii_lowercase() };
			Some((name, value.trim().to_owned()))
		})
		.filter(|(name, _)| !name.is_empty())
		.collect()
}

/// Renders `(name, value)` pairs into a `style` attribute. `None` values are left out.
///
/// ```
/// use lit_dom::{directives::style_map, dom::mem::Document, html, TemplateResult};
///
/// let bar: TemplateResult<Document> = html!("<div style={}></div>", style_map([("width", Some("50%")), ("backgroundColor", None)]));
/// ```
pub fn style_map<D: Dom, S: Into<String>, V: Into<String>>(styles: impl IntoIterator<Item = (S, Option<V>)>) -> DirectiveResult<D> {
	directive::<D, StyleMap>(styles.into_iter().map(|(name, value)| (name.into(), value.map(Into::into))).collect())
}
