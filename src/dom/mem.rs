//! An in-memory document, used to hold prepared templates and for rendering outside of a browser.

use super::{html, Dom, ListenerOptions, Namespace, NodeType};
use crate::Value;
use core::{
	any::Any,
	cell::RefCell,
	fmt::{self, Debug, Formatter},
};
use hashbrown::{HashMap, HashSet};
use slotmap::{new_key_type, SlotMap};
use std::rc::Rc;
use tracing::{error, trace, trace_span};

new_key_type! {
	/// A node of a [`Document`].
	pub struct NodeId;
}

/// A reference-counted handle to an in-memory document.
///
/// Clones share the same tree. Removing a node from its parent doesn't free it, so a [`NodeId`] stays valid
/// until [`Document::release`] or [`Document::release_detached`] frees the node. Long-running documents that
/// render changing templates should call the latter now and then. Freed ids are never reused, and operations
/// on them do nothing.
#[derive(Clone)]
pub struct Document {
	tree: Rc<RefCell<Tree>>,
	root: NodeId,
}

struct Tree {
	nodes: SlotMap<NodeId, NodeData>,
	part_slots: HashMap<NodeId, Rc<dyn Any>>,
	next_listener: u64,
}

struct NodeData {
	parent: Option<NodeId>,
	children: Vec<NodeId>,
	kind: NodeKind,
}

enum NodeKind {
	Document,
	Fragment,
	Element(Element),
	Text(String),
	Comment(String),
}

struct Element {
	local_name: String,
	namespace: Namespace,
	attributes: Vec<(String, String)>,
	properties: Vec<(String, Value<Document>)>,
	listeners: Vec<Registration>,
}

struct Registration {
	id: ListenerId,
	event: String,
	options: ListenerOptions,
	handler: Rc<dyn Fn(&Event)>,
}

/// Registration token of an event listener in a [`Document`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

/// An event dispatched through [`Document::dispatch_event`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event {
	kind: String,
	target: NodeId,
}
impl Event {
	#[must_use]
	pub fn kind(&self) -> &str {
		&self.kind
	}

	#[must_use]
	pub fn target(&self) -> NodeId {
		self.target
	}
}

impl Default for Document {
	fn default() -> Self {
		Self::new()
	}
}

impl Debug for Document {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		let tree = self.tree.borrow();
		f.debug_struct("Document").field("root", &self.root).field("nodes", &tree.nodes.len()).finish()
	}
}

impl PartialEq for Document {
	fn eq(&self, other: &Self) -> bool {
		Rc::ptr_eq(&self.tree, &other.tree)
	}
}

impl Document {
	#[must_use]
	pub fn new() -> Self {
		let mut nodes = SlotMap::with_key();
		let root = nodes.insert(NodeData {
			parent: None,
			children: Vec::new(),
			kind: NodeKind::Document,
		});
		Self {
			tree: Rc::new(RefCell::new(Tree {
				nodes,
				part_slots: HashMap::new(),
				next_listener: 0,
			})),
			root,
		}
	}

	/// The document node itself.
	#[must_use]
	pub fn root(&self) -> NodeId {
		self.root
	}

	fn create(&self, kind: NodeKind) -> NodeId {
		self.tree.borrow_mut().nodes.insert(NodeData {
			parent: None,
			children: Vec::new(),
			kind,
		})
	}

	fn with_node<T>(&self, node: NodeId, default: T, f: impl FnOnce(&NodeData) -> T) -> T {
		self.tree.borrow().nodes.get(node).map_or(default, f)
	}

	fn with_element_mut(&self, node: NodeId, f: impl FnOnce(&mut Element)) {
		match self.tree.borrow_mut().nodes.get_mut(node) {
			Some(NodeData {
				kind: NodeKind::Element(element),
				..
			}) => f(element),
			_ => error!("Expected an element but found {:?}", node),
		}
	}

	/// Appends `child` to `parent`, like [`Dom::insert_before`] without a reference node.
	pub fn append_child(&self, parent: NodeId, child: NodeId) {
		self.insert_before(&parent, &child, None);
	}

	/// The child nodes of `node`, in order.
	#[must_use]
	pub fn children(&self, node: NodeId) -> Vec<NodeId> {
		self.with_node(node, Vec::new(), |data| data.children.clone())
	}

	/// Replaces the children of `node` with the parsed `html` fragment.
	pub fn set_inner_html(&self, node: NodeId, html: &str) {
		for child in self.children(node) {
			self.remove_child(&node, &child);
		}
		html::parse_fragment(self, html, node);
	}

	/// Serializes the children of `node`.
	#[must_use]
	pub fn inner_html(&self, node: NodeId) -> String {
		let mut html = String::new();
		for child in self.children(node) {
			html::serialize(self, child, &mut html);
		}
		html
	}

	/// Serializes `node` itself.
	#[must_use]
	pub fn outer_html(&self, node: NodeId) -> String {
		let mut html = String::new();
		html::serialize(self, node, &mut html);
		html
	}

	/// The concatenated text of all descendant text nodes.
	#[must_use]
	pub fn text_content(&self, node: NodeId) -> String {
		match self.node_type(&node) {
			NodeType::Text => self.node_value(&node),
			NodeType::Comment => String::new(),
			_ => self.children(node).into_iter().map(|child| self.text_content(child)).collect(),
		}
	}

	/// How many listeners for `event` are registered on `node`.
	#[must_use]
	pub fn listener_count(&self, node: NodeId, event: &str) -> usize {
		self.with_node(node, 0, |data| match &data.kind {
			NodeKind::Element(element) => element.listeners.iter().filter(|r| r.event == event).count(),
			_ => 0,
		})
	}

	/// Invokes the listeners for `event` registered on `target`, in registration order.
	///
	/// There is no propagation. Listeners registered with `once` are removed before they run.
	/// Returns the number of listeners invoked.
	pub fn dispatch_event(&self, target: NodeId, event: &str) -> usize {
		let span = trace_span!("dispatch_event", ?target, event);
		let _enter = span.enter();

		let handlers: Vec<Rc<dyn Fn(&Event)>> = {
			let mut tree = self.tree.borrow_mut();
			match tree.nodes.get_mut(target) {
				Some(NodeData {
					kind: NodeKind::Element(element),
					..
				}) => {
					let handlers = element.listeners.iter().filter(|r| r.event == event).map(|r| r.handler.clone()).collect();
					element.listeners.retain(|r| !(r.event == event && r.options.once));
					handlers
				}
				_ => Vec::new(),
			}
		};

		let dispatched = Event {
			kind: event.to_owned(),
			target,
		};
		for handler in &handlers {
			handler(&dispatched);
		}
		handlers.len()
	}

	/// Depth-first search for the first element named `local_name` below `node`.
	#[must_use]
	pub fn query(&self, node: NodeId, local_name: &str) -> Option<NodeId> {
		for child in self.children(node) {
			if self.node_type(&child) == NodeType::Element && self.local_name(&child).eq_ignore_ascii_case(local_name) {
				return Some(child);
			}
			if let Some(found) = self.query(child, local_name) {
				return Some(found);
			}
		}
		None
	}

	/// The number of live nodes, including detached ones and the document node.
	#[must_use]
	pub fn node_count(&self) -> usize {
		self.tree.borrow().nodes.len()
	}

	/// Detaches `node` and frees it with all of its descendants, along with any render roots attached to them.
	pub fn release(&self, node: NodeId) {
		if node == self.root {
			return error!("Can't release the document node");
		}
		let roots = {
			let mut tree = self.tree.borrow_mut();
			Self::detach(&mut tree, node);
			Self::free(&mut tree, vec![node])
		};
		drop(roots);
	}

	/// Frees every node that isn't connected to the document node. Returns how many nodes were freed.
	///
	/// Render roots in detached containers are dropped as well.
	pub fn release_detached(&self) -> usize {
		let span = trace_span!("release_detached");
		let _enter = span.enter();

		let (freed, roots) = {
			let mut tree = self.tree.borrow_mut();
			let mut connected = HashSet::with_capacity(tree.nodes.len());
			let mut stack = vec![self.root];
			while let Some(id) = stack.pop() {
				if let Some(data) = tree.nodes.get(id) {
					connected.insert(id);
					stack.extend_from_slice(&data.children);
				}
			}
			let detached: Vec<NodeId> = tree.nodes.keys().filter(|id| !connected.contains(id)).collect();
			(detached.len(), Self::free(&mut tree, detached))
		};
		trace!(freed, roots = roots.len(), "Released detached nodes.");
		// Render roots hold handles to this document, so they are dropped outside of the borrow.
		drop(roots);
		freed
	}

	/// Removes the nodes in `stack` and their descendants. Returns the render roots that were attached to them.
	fn free(tree: &mut Tree, mut stack: Vec<NodeId>) -> Vec<Rc<dyn Any>> {
		let mut roots = Vec::new();
		while let Some(id) = stack.pop() {
			if let Some(data) = tree.nodes.remove(id) {
				stack.extend(data.children);
			}
			roots.extend(tree.part_slots.remove(&id));
		}
		roots
	}

	/// Copies `node` and its descendants from `source`, without event listeners.
	fn copy_from(&self, source: &Document, node: NodeId) -> NodeId {
		let kind = source.with_node(node, NodeKind::Fragment, |data| match &data.kind {
			NodeKind::Document | NodeKind::Fragment => NodeKind::Fragment,
			NodeKind::Element(element) => NodeKind::Element(Element {
				local_name: element.local_name.clone(),
				namespace: element.namespace,
				attributes: element.attributes.clone(),
				properties: element.properties.clone(),
				listeners: Vec::new(),
			}),
			NodeKind::Text(data) => NodeKind::Text(data.clone()),
			NodeKind::Comment(data) => NodeKind::Comment(data.clone()),
		});
		let copy = self.create(kind);
		for child in source.children(node) {
			let child = self.copy_from(source, child);
			self.append_child(copy, child);
		}
		copy
	}

	fn contains(&self, ancestor: NodeId, node: NodeId) -> bool {
		let mut current = Some(node);
		while let Some(id) = current {
			if id == ancestor {
				return true;
			}
			current = self.with_node(id, None, |data| data.parent);
		}
		false
	}

	fn detach(tree: &mut Tree, node: NodeId) {
		if let Some(parent) = tree.nodes.get_mut(node).and_then(|data| data.parent.take()) {
			if let Some(parent) = tree.nodes.get_mut(parent) {
				parent.children.retain(|&child| child != node);
			}
		}
	}
}

impl Dom for Document {
	type Node = NodeId;
	type Event = Event;
	type Listener = ListenerId;

	fn node_type(&self, node: &NodeId) -> NodeType {
		self.with_node(*node, NodeType::Fragment, |data| match data.kind {
			NodeKind::Document => NodeType::Document,
			NodeKind::Fragment => NodeType::Fragment,
			NodeKind::Element(_) => NodeType::Element,
			NodeKind::Text(_) => NodeType::Text,
			NodeKind::Comment(_) => NodeType::Comment,
		})
	}

	fn parent_node(&self, node: &NodeId) -> Option<NodeId> {
		self.with_node(*node, None, |data| data.parent)
	}

	fn first_child(&self, node: &NodeId) -> Option<NodeId> {
		self.with_node(*node, None, |data| data.children.first().copied())
	}

	fn next_sibling(&self, node: &NodeId) -> Option<NodeId> {
		let tree = self.tree.borrow();
		let parent = tree.nodes.get(*node)?.parent?;
		let siblings = &tree.nodes.get(parent)?.children;
		let position = siblings.iter().position(|sibling| sibling == node)?;
		siblings.get(position + 1).copied()
	}

	fn local_name(&self, node: &NodeId) -> String {
		self.with_node(*node, String::new(), |data| match &data.kind {
			NodeKind::Element(element) => element.local_name.clone(),
			_ => String::new(),
		})
	}

	fn namespace(&self, node: &NodeId) -> Namespace {
		self.with_node(*node, Namespace::Html, |data| match &data.kind {
			NodeKind::Element(element) => element.namespace,
			_ => Namespace::Html,
		})
	}

	fn create_element(&self, local_name: &str, namespace: Namespace) -> NodeId {
		self.create(NodeKind::Element(Element {
			local_name: local_name.to_owned(),
			namespace,
			attributes: Vec::new(),
			properties: Vec::new(),
			listeners: Vec::new(),
		}))
	}

	fn create_text(&self, data: &str) -> NodeId {
		self.create(NodeKind::Text(data.to_owned()))
	}

	fn create_comment(&self, data: &str) -> NodeId {
		self.create(NodeKind::Comment(data.to_owned()))
	}

	fn create_fragment(&self) -> NodeId {
		self.create(NodeKind::Fragment)
	}

	fn node_value(&self, node: &NodeId) -> String {
		self.with_node(*node, String::new(), |data| match &data.kind {
			NodeKind::Text(data) | NodeKind::Comment(data) => data.clone(),
			_ => String::new(),
		})
	}

	fn set_node_value(&self, node: &NodeId, value: &str) {
		match self.tree.borrow_mut().nodes.get_mut(*node) {
			Some(NodeData {
				kind: NodeKind::Text(data) | NodeKind::Comment(data),
				..
			}) => value.clone_into(data),
			_ => error!("Can't set the data of {:?}, which is not character data", node),
		}
	}

	fn insert_before(&self, parent: &NodeId, node: &NodeId, reference: Option<&NodeId>) {
		if self.node_type(node) == NodeType::Fragment {
			for child in self.children(*node) {
				self.insert_before(parent, &child, reference);
			}
			return;
		}
		if self.contains(*node, *parent) {
			return error!("Can't insert {:?} into its own descendant {:?}", node, parent);
		}
		if reference == Some(node) {
			return;
		}

		let mut tree = self.tree.borrow_mut();
		Self::detach(&mut tree, *node);
		let Some(parent_data) = tree.nodes.get_mut(*parent) else {
			return error!("Parent {:?} doesn't exist", parent);
		};
		let index = match reference {
			None => parent_data.children.len(),
			Some(reference) => {
				if let Some(index) = parent_data.children.iter().position(|child| child == reference) {
					index
				} else {
					error!("Reference node {:?} is not a child of {:?}; Appending instead.", reference, parent);
					parent_data.children.len()
				}
			}
		};
		parent_data.children.insert(index, *node);
		if let Some(node_data) = tree.nodes.get_mut(*node) {
			node_data.parent = Some(*parent);
		}
	}

	fn remove_child(&self, parent: &NodeId, node: &NodeId) {
		let mut tree = self.tree.borrow_mut();
		if tree.nodes.get(*node).and_then(|data| data.parent) == Some(*parent) {
			Self::detach(&mut tree, *node);
		} else {
			error!("Can't remove {:?}, which is not a child of {:?}", node, parent);
		}
	}

	fn attribute(&self, element: &NodeId, name: &str) -> Option<String> {
		self.with_node(*element, None, |data| match &data.kind {
			NodeKind::Element(element) => element.attributes.iter().find(|(n, _)| n == name).map(|(_, v)| v.clone()),
			_ => None,
		})
	}

	fn attribute_names(&self, element: &NodeId) -> Vec<String> {
		self.with_node(*element, Vec::new(), |data| match &data.kind {
			NodeKind::Element(element) => element.attributes.iter().map(|(n, _)| n.clone()).collect(),
			_ => Vec::new(),
		})
	}

	fn set_attribute(&self, element: &NodeId, name: &str, value: &str) {
		self.with_element_mut(*element, |element| {
			if let Some((_, existing)) = element.attributes.iter_mut().find(|(n, _)| n == name) {
				value.clone_into(existing);
			} else {
				element.attributes.push((name.to_owned(), value.to_owned()));
			}
		});
	}

	fn remove_attribute(&self, element: &NodeId, name: &str) {
		self.with_element_mut(*element, |element| element.attributes.retain(|(n, _)| n != name));
	}

	fn property(&self, element: &NodeId, name: &str) -> Value<Self> {
		self.with_node(*element, Value::Null, |data| match &data.kind {
			NodeKind::Element(element) => element.properties.iter().find(|(n, _)| n == name).map_or(Value::Null, |(_, v)| v.clone()),
			_ => Value::Null,
		})
	}

	fn set_property(&self, element: &NodeId, name: &str, value: Value<Self>) {
		self.with_element_mut(*element, move |element| {
			if matches!(value, Value::Nothing) {
				element.properties.retain(|(n, _)| n != name);
			} else if let Some((_, existing)) = element.properties.iter_mut().find(|(n, _)| n == name) {
				*existing = value;
			} else {
				element.properties.push((name.to_owned(), value));
			}
		});
	}

	fn add_event_listener(&self, element: &NodeId, event: &str, options: ListenerOptions, handler: Rc<dyn Fn(&Event)>) -> ListenerId {
		let id = {
			let mut tree = self.tree.borrow_mut();
			tree.next_listener += 1;
			ListenerId(tree.next_listener)
		};
		self.with_element_mut(*element, |element| {
			element.listeners.push(Registration {
				id,
				event: event.to_owned(),
				options,
				handler,
			});
		});
		id
	}

	fn remove_event_listener(&self, element: &NodeId, event: &str, listener: ListenerId) {
		self.with_element_mut(*element, |element| element.listeners.retain(|r| !(r.id == listener && r.event == event)));
	}

	/// Nodes of another document are copied, and the originals are freed there.
	fn adopt(&self, scope: &Self, node: NodeId) -> NodeId {
		if self == scope {
			return node;
		}
		let span = trace_span!("adopt", ?node);
		let _enter = span.enter();
		let adopted = self.copy_from(scope, node);
		scope.release(node);
		adopted
	}

	fn part_slot(&self, owner: &NodeId) -> Option<Rc<dyn Any>> {
		self.tree.borrow().part_slots.get(owner).cloned()
	}

	fn set_part_slot(&self, owner: &NodeId, part: Rc<dyn Any>) {
		self.tree.borrow_mut().part_slots.insert(*owner, part);
	}
}
