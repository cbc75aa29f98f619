//! The seam between the rendering engine and an actual document.
//!
//! [`mem::Document`] is always available. The `web` feature adds [`web::WebDom`] on top of `web-sys`.

use crate::Value;
use core::{any::Any, fmt::Debug};
use std::rc::Rc;

mod html;
pub mod mem;
#[cfg(feature = "web")]
pub mod web;

/// The kinds of node the engine distinguishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeType {
	Element,
	Text,
	Comment,
	Fragment,
	Document,
}
impl NodeType {
	#[must_use]
	pub fn name(self) -> &'static str {
		match self {
			NodeType::Element => "element",
			NodeType::Text => "text node",
			NodeType::Comment => "comment",
			NodeType::Fragment => "document fragment",
			NodeType::Document => "document",
		}
	}
}

/// Element namespaces. Anything that isn't SVG or MathML is treated as HTML.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Namespace {
	Html,
	Svg,
	MathMl,
}
impl Namespace {
	#[must_use]
	pub fn uri(self) -> &'static str {
		match self {
			Namespace::Html => "http://www.w3.org/1999/xhtml",
			Namespace::Svg => "http://www.w3.org/2000/svg",
			Namespace::MathMl => "http://www.w3.org/1998/Math/MathML",
		}
	}

	#[must_use]
	pub fn from_uri(uri: Option<&str>) -> Self {
		match uri {
			Some("http://www.w3.org/2000/svg") => Namespace::Svg,
			Some("http://www.w3.org/1998/Math/MathML") => Namespace::MathMl,
			_ => Namespace::Html,
		}
	}
}

/// The `capture`, `once` and `passive` flags of an event listener registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ListenerOptions {
	pub capture: bool,
	pub once: bool,
	pub passive: bool,
}
impl ListenerOptions {
	#[must_use]
	pub const fn new() -> Self {
		Self {
			capture: false,
			once: false,
			passive: false,
		}
	}

	#[must_use]
	pub const fn with_capture(self, capture: bool) -> Self {
		Self { capture, ..self }
	}

	#[must_use]
	pub const fn with_once(self, once: bool) -> Self {
		Self { once, ..self }
	}

	#[must_use]
	pub const fn with_passive(self, passive: bool) -> Self {
		Self { passive, ..self }
	}
}

/// A document the engine can read and mutate.
///
/// Implementors are cheap handles (think `Rc` or a JS reference). Node handles compare by identity.
///
/// Mutating operations don't return errors: backends that can fail log the failure and carry on,
/// so that a single bad node can't take down the rest of a render.
pub trait Dom: Clone + 'static {
	/// A node handle. Equality is node identity.
	type Node: Clone + PartialEq + Debug + 'static;
	/// What event listeners receive.
	type Event: 'static;
	/// Token returned when registering a listener, needed to unregister it again.
	type Listener: 'static;

	fn node_type(&self, node: &Self::Node) -> NodeType;
	fn parent_node(&self, node: &Self::Node) -> Option<Self::Node>;
	fn first_child(&self, node: &Self::Node) -> Option<Self::Node>;
	fn next_sibling(&self, node: &Self::Node) -> Option<Self::Node>;

	/// The local name of an element, as it appears in the markup. Empty for other nodes.
	fn local_name(&self, node: &Self::Node) -> String;
	fn namespace(&self, node: &Self::Node) -> Namespace;

	fn create_element(&self, local_name: &str, namespace: Namespace) -> Self::Node;
	fn create_text(&self, data: &str) -> Self::Node;
	fn create_comment(&self, data: &str) -> Self::Node;
	fn create_fragment(&self) -> Self::Node;

	/// Character data of text and comment nodes. Empty for other nodes.
	fn node_value(&self, node: &Self::Node) -> String;
	fn set_node_value(&self, node: &Self::Node, data: &str);

	/// Inserts `node` into `parent` before `reference`, or at the end if `reference` is `None`.
	///
	/// Inserting a fragment moves its children instead, leaving it empty.
	fn insert_before(&self, parent: &Self::Node, node: &Self::Node, reference: Option<&Self::Node>);
	fn remove_child(&self, parent: &Self::Node, node: &Self::Node);

	fn attribute(&self, element: &Self::Node, name: &str) -> Option<String>;
	/// Attribute names in document order.
	fn attribute_names(&self, element: &Self::Node) -> Vec<String>;
	fn set_attribute(&self, element: &Self::Node, name: &str, value: &str);
	fn remove_attribute(&self, element: &Self::Node, name: &str);

	/// Reads a property of the node object. Missing properties read as [`Value::Null`].
	fn property(&self, element: &Self::Node, name: &str) -> Value<Self>;
	/// Writes a property. [`Value::Nothing`] stands for `undefined` and [`Value::Null`] for `null`.
	fn set_property(&self, element: &Self::Node, name: &str, value: Value<Self>);

	fn add_event_listener(&self, element: &Self::Node, event: &str, options: ListenerOptions, handler: Rc<dyn Fn(&Self::Event)>) -> Self::Listener;
	fn remove_event_listener(&self, element: &Self::Node, event: &str, listener: Self::Listener);

	/// Retrieves what [`Dom::set_part_slot`] stored for `owner`.
	fn part_slot(&self, owner: &Self::Node) -> Option<Rc<dyn Any>>;
	/// Associates render state with a node, like an expando property.
	fn set_part_slot(&self, owner: &Self::Node, part: Rc<dyn Any>);

	/// Takes `node` and its descendants, created through `scope`, into this document.
	///
	/// Returns the node as this document knows it, which may be a different handle.
	/// `scope` is the [`RenderOptions::creation_scope`](`crate::RenderOptions::creation_scope`) of a render root, or this document itself.
	fn adopt(&self, scope: &Self, node: Self::Node) -> Self::Node;

	/// Deep-imports the children of a prepared template's content into a new fragment of this document.
	fn import_template(&self, content: &mem::Document, fragment: mem::NodeId) -> Self::Node {
		let target = self.create_fragment();
		import_children(self, content, fragment, &target);
		target
	}
}

fn import_children<D: Dom>(dom: &D, source: &mem::Document, parent: mem::NodeId, target: &D::Node) {
	let mut next = source.first_child(&parent);
	while let Some(child) = next {
		let imported = match source.node_type(&child) {
			NodeType::Element => {
				let element = dom.create_element(&source.local_name(&child), source.namespace(&child));
				for name in source.attribute_names(&child) {
					let value = source.attribute(&child, &name).unwrap_or_default();
					dom.set_attribute(&element, &name, &value);
				}
				import_children(dom, source, child, &element);
				Some(element)
			}
			NodeType::Text => Some(dom.create_text(&source.node_value(&child))),
			NodeType::Comment => Some(dom.create_comment(&source.node_value(&child))),
			NodeType::Fragment | NodeType::Document => None,
		};
		if let Some(imported) = imported {
			dom.insert_before(target, &imported, None);
		}
		next = source.next_sibling(&child);
	}
}
