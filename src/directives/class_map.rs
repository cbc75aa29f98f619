use crate::{
	directive::{directive, Directive, DirectiveResult, PartInfo, PartRef, PartType},
	dom::Dom,
	Error, Value,
};
use hashbrown::HashSet;
use tracing::trace;

/// Toggles the class names of a `class` attribute.
///
/// The first render writes the attribute through the binding. Later renders only add and remove the
/// tokens that changed, so classes added by anyone else stay in place. Classes written statically
/// around the binding are never removed.
pub struct ClassMap {
	static_classes: HashSet<String>,
	previous: Option<HashSet<String>>,
}

impl<D: Dom> Directive<D> for ClassMap {
	type Args = Vec<(String, bool)>;

	fn new(part: &PartInfo) -> Result<Self, Error> {
		let is_class = part.part_type == PartType::Attribute && part.name.as_deref() == Some("class");
		if !is_class || part.strings.as_ref().map_or(false, |strings| strings.len() > 2) {
			return Err(Error::directive(
				"class_map",
				"can only be used in the `class` attribute and must be the only binding in it",
			));
		}
		Ok(Self {
			static_classes: part.strings.iter().flatten().flat_map(|s| s.split_whitespace()).map(str::to_owned).collect(),
			previous: None,
		})
	}

	fn render(&mut self, classes: Self::Args) -> Value<D> {
		let names: Vec<&str> = classes.iter().filter(|(_, on)| *on).map(|(name, _)| name.as_str()).collect();
		format!(" {} ", names.join(" ")).into()
	}

	fn update(&mut self, part: &mut PartRef<'_, D>, classes: Self::Args) -> Result<Value<D>, Error> {
		if self.previous.is_none() {
			let rendered = classes.iter().filter(|(name, on)| *on && !self.static_classes.contains(name)).map(|(name, _)| name.clone()).collect();
			self.previous = Some(rendered);
			return Ok(<Self as Directive<D>>::render(self, classes));
		}
		let Some(previous) = self.previous.as_mut() else {
			return Ok(Value::NoChange);
		};

		let mut added = Vec::new();
		let mut removed = Vec::new();
		for (name, on) in &classes {
			if *on != previous.contains(name) && !self.static_classes.contains(name) {
				if *on {
					previous.insert(name.clone());
					added.push(name.clone());
				} else {
					previous.remove(name);
					removed.push(name.clone());
				}
			}
		}
		previous.retain(|name| {
			let kept = classes.iter().any(|(listed, _)| listed == name);
			if !kept {
				removed.push(name.clone());
			}
			kept
		});

		if !(added.is_empty() && removed.is_empty()) {
			let element = part.element().ok_or_else(|| Error::directive("class_map", "the bound element is gone"))?;
			let dom = part.dom();
			let mut tokens: Vec<String> = dom.attribute(&element, "class").unwrap_or_default().split_whitespace().map(str::to_owned).collect();
			tokens.retain(|token| !removed.contains(token));
			for name in added {
				if !tokens.contains(&name) {
					tokens.push(name);
				}
			}
			trace!(classes = tokens.len(), "Updating class list.");
			dom.set_attribute(&element, "class", &tokens.join(" "));
		}
		Ok(Value::NoChange)
	}
}

/// Renders the names whose flag is `true` into a `class` attribute.
///
/// ```
/// use lit_dom::{directives::class_map, dom::mem::Document, html, TemplateResult};
///
/// let button: TemplateResult<Document> = html!("<button class={}></button>", class_map([("primary", true), ("disabled", false)]));
/// ```
pub fn class_map<D: Dom, S: Into<String>>(classes: impl IntoIterator<Item = (S, bool)>) -> DirectiveResult<D> {
	directive::<D, ClassMap>(classes.into_iter().map(|(name, on)| (name.into(), on)).collect())
}
