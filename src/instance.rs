//! Instances of prepared templates: imported content plus one part per binding.
//!
//! Content is imported through the creation scope of the render root and then adopted into the rendering document,
//! so parts are always located on nodes the rendering document owns.

use crate::{
	dom::Dom,
	part::{self, attribute, child, AttributePart, ChildPart, Part, PartKey, PartKind, PartTree},
	template::{Template, TemplatePart, Walker},
	Error, Value,
};
use std::rc::Rc;
use tracing::{error, instrument};

pub(crate) struct TemplateInstance {
	pub(crate) template: Rc<Template>,
	/// One entry per binding descriptor. Inert bindings have no part.
	pub(crate) parts: Vec<Option<PartKey>>,
}

/// Imports the content of `template` and creates its parts below `owner`.
///
/// Returns the instance and the fragment to insert.
#[instrument(level = "trace", skip(tree, template))]
pub(crate) fn clone<D: Dom>(tree: &mut PartTree<D>, owner: PartKey, template: Rc<Template>) -> (TemplateInstance, D::Node) {
	let dom = tree.dom.clone();
	let imported = tree.scope.import_template(template.content(), template.fragment());
	let fragment = dom.adopt(&tree.scope, imported);

	let mut parts = Vec::with_capacity(template.parts().len());
	let mut walker = Walker::new(&dom, fragment.clone());
	let mut node = walker.next();
	let mut node_index = 0;
	for descriptor in template.parts() {
		while node_index < descriptor.index() {
			node = walker.next();
			node_index += 1;
		}
		let Some(node) = node.clone() else {
			error!(index = descriptor.index(), "Template instance is missing a node for a binding.");
			parts.push(None);
			continue;
		};

		let kind = match descriptor {
			TemplatePart::Child { .. } => {
				let end = dom.next_sibling(&node);
				Some(PartKind::Child(ChildPart::new(node, end)))
			}
			TemplatePart::Attribute { name, kind, strings, .. } => Some(PartKind::Attribute(AttributePart::new(node, name.clone(), *kind, strings.clone()))),
			TemplatePart::Element { .. } => Some(PartKind::Element(node)),
			TemplatePart::Inert { .. } => None,
		};
		parts.push(kind.map(|kind| tree.parts.insert(Part { parent: Some(owner), kind })));
	}

	(
		TemplateInstance { template, parts },
		fragment,
	)
}

/// Pushes `values` through the parts of an instance, in binding order.
pub(crate) fn update<D: Dom>(tree: &mut PartTree<D>, template: &Template, parts: &[Option<PartKey>], values: &[Value<D>]) -> Result<(), Error> {
	let mut values = values.iter();
	for (descriptor, part) in template.parts().iter().zip(parts) {
		let count = descriptor.value_count();
		let Some(part) = *part else {
			values.nth(count - 1);
			continue;
		};

		match descriptor {
			TemplatePart::Attribute { strings: Some(_), .. } => {
				let chunk: Vec<Value<D>> = values.by_ref().take(count).cloned().collect();
				attribute::set_values(tree, part, chunk)?;
			}
			_ => {
				let Some(value) = values.next() else {
					break;
				};
				match descriptor {
					TemplatePart::Child { .. } => child::set_child_value(tree, part, value.clone(), 0)?,
					_ => part::set_value_at(tree, part, 0, value.clone(), 0)?,
				}
			}
		}
	}
	Ok(())
}
