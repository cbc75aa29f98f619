//! [`Dom`] for the browser, on top of `web-sys`.
//!
//! DOM exceptions are logged with [`error!`] and otherwise ignored, so one failing node doesn't abort a render.

use super::{Dom, ListenerOptions, Namespace, NodeType};
use crate::Value;
use core::{any::Any, cell::RefCell};
use hashbrown::HashMap;
use js_sys::{Array, Reflect};
use std::rc::Rc;
use tracing::{error, instrument, trace};
use wasm_bindgen::{closure::Closure, JsCast, JsValue, UnwrapThrowExt};

/// Name of the expando property that links a node to its render root.
const PART_SLOT_PROPERTY: &str = "__litDomPart";

thread_local! {
	/// Render roots by the id stored in their owner's expando property, together with that owner.
	static PART_SLOTS: RefCell<(u32, HashMap<u32, (web_sys::Node, Rc<dyn Any>)>)> = RefCell::new((0, HashMap::new()));
}

/// A handle to a `web_sys::Document`.
#[derive(Debug, Clone)]
pub struct WebDom {
	document: web_sys::Document,
	event_listener_options_cache: Rc<RefCell<[Option<web_sys::AddEventListenerOptions>; 8]>>,
}

impl WebDom {
	#[must_use]
	pub fn new(document: web_sys::Document) -> Self {
		Self {
			document,
			event_listener_options_cache: Rc::new(RefCell::new([None, None, None, None, None, None, None, None])),
		}
	}

	#[must_use]
	pub fn document(&self) -> &web_sys::Document {
		&self.document
	}

	/// Drops the render roots of nodes that are no longer connected to a document. Returns how many were dropped.
	///
	/// Render roots are kept alive by a registry rather than by their nodes, so they outlive removed containers
	/// until this is called. Rendering into a released container again starts from scratch.
	pub fn release_disconnected(&self) -> usize {
		let released: Vec<(web_sys::Node, Rc<dyn Any>)> = PART_SLOTS.with(|slots| {
			let mut slots = slots.borrow_mut();
			let ids: Vec<u32> = slots.1.iter().filter(|(_, (owner, _))| !owner.is_connected()).map(|(id, _)| *id).collect();
			ids.into_iter().filter_map(|id| slots.1.remove(&id)).collect()
		});
		for (owner, _) in &released {
			if let Err(error) = Reflect::delete_property(owner, &JsValue::from_str(PART_SLOT_PROPERTY)) {
				error!("Failed to detach render root from node: {:?}", error);
			}
		}
		trace!(released = released.len(), "Released render roots of disconnected nodes.");
		released.len()
	}

	fn with_add_event_listener_options<T>(&self, options: ListenerOptions, f: impl FnOnce(&web_sys::AddEventListenerOptions) -> T) -> T {
		let mut cache = self.event_listener_options_cache.borrow_mut();
		let entry = cache
			.get_mut(usize::from(options.capture) + usize::from(options.once) * 2 + usize::from(options.passive) * 4)
			.unwrap_throw();

		f(entry.get_or_insert_with(|| {
			let mut web_options = web_sys::AddEventListenerOptions::new();
			web_options.capture(options.capture).once(options.once).passive(options.passive);
			web_options
		}))
	}
}

/// Registration token of an event listener added through [`WebDom`].
///
/// Dropping it without removing the listener first makes the listener throw when called.
pub struct WebListener {
	closure: Closure<dyn Fn(web_sys::Event)>,
	capture: bool,
}

fn element(node: &web_sys::Node) -> Option<&web_sys::Element> {
	node.dyn_ref::<web_sys::Element>()
}

fn to_value(value: JsValue) -> Value<WebDom> {
	if value.is_null() || value.is_undefined() {
		Value::Null
	} else if let Some(b) = value.as_bool() {
		Value::Bool(b)
	} else if let Some(n) = value.as_f64() {
		Value::Number(n)
	} else if let Some(text) = value.as_string() {
		Value::Text(text.into())
	} else if let Some(node) = value.dyn_ref::<web_sys::Node>() {
		Value::Node(node.clone())
	} else {
		Value::Object(Rc::new(value))
	}
}

fn to_js(value: &Value<WebDom>) -> Option<JsValue> {
	Some(match value {
		Value::Nothing => JsValue::UNDEFINED,
		Value::Null => JsValue::NULL,
		Value::Bool(b) => JsValue::from_bool(*b),
		Value::Number(n) => JsValue::from_f64(*n),
		Value::Text(text) => JsValue::from_str(text),
		Value::Node(node) => node.clone().into(),
		Value::List(items) => items.iter().map(to_js).collect::<Option<Array>>()?.into(),
		Value::Object(object) => object.downcast_ref::<JsValue>()?.clone(),
		Value::NoChange | Value::Template(_) | Value::Listener(_) | Value::Directive(_) => return None,
	})
}

impl Dom for WebDom {
	type Node = web_sys::Node;
	type Event = web_sys::Event;
	type Listener = WebListener;

	fn node_type(&self, node: &web_sys::Node) -> NodeType {
		match node.node_type() {
			web_sys::Node::ELEMENT_NODE => NodeType::Element,
			web_sys::Node::COMMENT_NODE => NodeType::Comment,
			web_sys::Node::DOCUMENT_FRAGMENT_NODE => NodeType::Fragment,
			web_sys::Node::DOCUMENT_NODE => NodeType::Document,
			_ => NodeType::Text,
		}
	}

	fn parent_node(&self, node: &web_sys::Node) -> Option<web_sys::Node> {
		node.parent_node()
	}

	fn first_child(&self, node: &web_sys::Node) -> Option<web_sys::Node> {
		node.first_child()
	}

	fn next_sibling(&self, node: &web_sys::Node) -> Option<web_sys::Node> {
		node.next_sibling()
	}

	fn local_name(&self, node: &web_sys::Node) -> String {
		element(node).map(web_sys::Element::local_name).unwrap_or_default()
	}

	fn namespace(&self, node: &web_sys::Node) -> Namespace {
		Namespace::from_uri(element(node).and_then(web_sys::Element::namespace_uri).as_deref())
	}

	fn create_element(&self, local_name: &str, namespace: Namespace) -> web_sys::Node {
		let created = match namespace {
			Namespace::Html => self.document.create_element(local_name),
			namespace => self.document.create_element_ns(Some(namespace.uri()), local_name),
		};
		match created {
			Ok(element) => element.into(),
			Err(error) => {
				error!("Failed to create <{}>: {:?}. Substituting a comment.", local_name, error);
				self.document.create_comment(local_name).into()
			}
		}
	}

	fn create_text(&self, data: &str) -> web_sys::Node {
		self.document.create_text_node(data).into()
	}

	fn create_comment(&self, data: &str) -> web_sys::Node {
		self.document.create_comment(data).into()
	}

	fn create_fragment(&self) -> web_sys::Node {
		self.document.create_document_fragment().into()
	}

	fn node_value(&self, node: &web_sys::Node) -> String {
		node.node_value().unwrap_or_default()
	}

	fn set_node_value(&self, node: &web_sys::Node, data: &str) {
		node.set_node_value(Some(data));
	}

	fn insert_before(&self, parent: &web_sys::Node, node: &web_sys::Node, reference: Option<&web_sys::Node>) {
		if let Err(error) = parent.insert_before(node, reference) {
			error!("Failed to insert node: {:?}", error);
		}
	}

	fn remove_child(&self, parent: &web_sys::Node, node: &web_sys::Node) {
		if let Err(error) = parent.remove_child(node) {
			error!("Failed to remove node: {:?}", error);
		}
	}

	fn attribute(&self, element: &web_sys::Node, name: &str) -> Option<String> {
		self::element(element)?.get_attribute(name)
	}

	fn attribute_names(&self, element: &web_sys::Node) -> Vec<String> {
		self::element(element).map_or_else(Vec::new, |element| element.get_attribute_names().iter().filter_map(|name| name.as_string()).collect())
	}

	fn set_attribute(&self, element: &web_sys::Node, name: &str, value: &str) {
		match self::element(element).map(|element| element.set_attribute(name, value)) {
			Some(Ok(())) => (),
			Some(Err(error)) => error!("Failed to set attribute {:?}: {:?}", name, error),
			None => error!("Expected an element to set attribute {:?} on but found {:?}", name, element),
		}
	}

	fn remove_attribute(&self, element: &web_sys::Node, name: &str) {
		if let Some(Err(error)) = self::element(element).map(|element| element.remove_attribute(name)) {
			error!("Failed to remove attribute {:?}: {:?}", name, error);
		}
	}

	fn property(&self, element: &web_sys::Node, name: &str) -> Value<Self> {
		match Reflect::get(element, &JsValue::from_str(name)) {
			Ok(value) => to_value(value),
			Err(error) => {
				error!("Failed to read property {:?}: {:?}", name, error);
				Value::Null
			}
		}
	}

	fn set_property(&self, element: &web_sys::Node, name: &str, value: Value<Self>) {
		let Some(js) = to_js(&value) else {
			return error!("Can't convert a {} value into a property value for {:?}.", value.kind_name(), name);
		};
		if let Err(error) = Reflect::set(element, &JsValue::from_str(name), &js) {
			error!("Failed to set property {:?}: {:?}", name, error);
		}
	}

	#[instrument(level = "trace", skip(self, element, handler))]
	fn add_event_listener(&self, element: &web_sys::Node, event: &str, options: ListenerOptions, handler: Rc<dyn Fn(&web_sys::Event)>) -> WebListener {
		let closure = Closure::wrap(Box::new(move |event: web_sys::Event| handler(&event)) as Box<dyn Fn(web_sys::Event)>);
		let result = self.with_add_event_listener_options(options, |web_options| {
			element.add_event_listener_with_callback_and_add_event_listener_options(event, closure.as_ref().unchecked_ref(), web_options)
		});
		if let Err(error) = result {
			error!("Failed to add event listener: {:?}", error);
		}
		WebListener {
			closure,
			capture: options.capture,
		}
	}

	fn remove_event_listener(&self, element: &web_sys::Node, event: &str, listener: WebListener) {
		if let Err(error) = element.remove_event_listener_with_callback_and_bool(event, listener.closure.as_ref().unchecked_ref(), listener.capture) {
			error!("Failed to remove event listener: {:?}", error);
		}
		trace!("Dropping listener closure.");
	}

	fn adopt(&self, scope: &Self, node: web_sys::Node) -> web_sys::Node {
		if scope.document == self.document {
			return node;
		}
		match self.document.adopt_node(&node) {
			Ok(adopted) => adopted,
			Err(error) => {
				error!("Failed to adopt imported content: {:?}", error);
				node
			}
		}
	}

	fn part_slot(&self, owner: &web_sys::Node) -> Option<Rc<dyn Any>> {
		let id = Reflect::get(owner, &JsValue::from_str(PART_SLOT_PROPERTY)).ok()?.as_f64()?;
		#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
		let id = id as u32;
		PART_SLOTS.with(|slots| slots.borrow().1.get(&id).map(|(_, part)| part.clone()))
	}

	fn set_part_slot(&self, owner: &web_sys::Node, part: Rc<dyn Any>) {
		let id = PART_SLOTS.with(|slots| {
			let mut slots = slots.borrow_mut();
			let id = slots.0;
			slots.0 += 1;
			slots.1.insert(id, (owner.clone(), part));
			id
		});
		if let Err(error) = Reflect::set(owner, &JsValue::from_str(PART_SLOT_PROPERTY), &JsValue::from(id)) {
			error!("Failed to attach render root to node: {:?}", error);
		}
	}
}
