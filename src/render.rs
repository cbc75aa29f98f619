//! The entry point: rendering a value into a container node.

use crate::{
	directive::PartHandle,
	dom::{Dom, NodeType},
	part::{child, PartKey, PartTree},
	Error, Value,
};
use core::{
	any::Any,
	cell::RefCell,
	fmt::{self, Debug, Formatter},
};
use std::rc::Rc;
use tracing::{debug, instrument};

/// Settings for a render root. Only the options of the first [`render`] into a given position are used.
pub struct RenderOptions<D: Dom> {
	/// Handed to [`Listener`](`crate::Listener`)s created with [`Listener::with_host`](`crate::Listener::with_host`).
	pub host: Option<Rc<dyn Any>>,
	/// Renders before this child of the container instead of at its end.
	///
	/// Each distinct anchor gets its own independent root.
	pub render_before: Option<D::Node>,
	/// Imports template content through this document instead of the rendering one.
	pub creation_scope: Option<D>,
	/// The initial connection state of directives. Defaults to `true`.
	pub is_connected: bool,
}

impl<D: Dom> Default for RenderOptions<D> {
	fn default() -> Self {
		Self {
			host: None,
			render_before: None,
			creation_scope: None,
			is_connected: true,
		}
	}
}

impl<D: Dom> Debug for RenderOptions<D> {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		f.debug_struct("RenderOptions")
			.field("host", &self.host.is_some())
			.field("render_before", &self.render_before)
			.field("creation_scope", &self.creation_scope.is_some())
			.field("is_connected", &self.is_connected)
			.finish()
	}
}

impl<D: Dom> RenderOptions<D> {
	#[must_use]
	pub fn new() -> Self {
		Self::default()
	}

	#[must_use]
	pub fn host(self, host: Rc<dyn Any>) -> Self {
		Self { host: Some(host), ..self }
	}

	#[must_use]
	pub fn render_before(self, render_before: D::Node) -> Self {
		Self {
			render_before: Some(render_before),
			..self
		}
	}

	#[must_use]
	pub fn creation_scope(self, creation_scope: D) -> Self {
		Self {
			creation_scope: Some(creation_scope),
			..self
		}
	}

	#[must_use]
	pub fn is_connected(self, is_connected: bool) -> Self {
		Self { is_connected, ..self }
	}
}

/// The root child part of a container, as returned by [`render`].
pub struct RootPart<D: Dom> {
	tree: Rc<RefCell<PartTree<D>>>,
	root: PartKey,
}

impl<D: Dom> Clone for RootPart<D> {
	fn clone(&self) -> Self {
		Self {
			tree: self.tree.clone(),
			root: self.root,
		}
	}
}

impl<D: Dom> Debug for RootPart<D> {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		f.debug_struct("RootPart").finish_non_exhaustive()
	}
}

impl<D: Dom> RootPart<D> {
	/// Notifies every directive below this root, parents first, if the state changes.
	///
	/// # Errors
	///
	/// [`Error::Reentrant`] if called while this root is rendering.
	pub fn set_connected(&self, connected: bool) -> Result<(), Error> {
		self.tree.try_borrow_mut().map_err(|_| Error::Reentrant)?.set_connected(connected);
		Ok(())
	}

	#[must_use]
	pub fn is_connected(&self) -> bool {
		self.tree.try_borrow().map_or(true, |tree| tree.connected)
	}

	/// A handle to the root binding, which can also toggle the connection state.
	#[must_use]
	pub fn handle(&self) -> PartHandle<D> {
		PartHandle::new(Rc::downgrade(&self.tree), self.root, 0, 0)
	}
}

/// Renders `value` into `container`.
///
/// The first call for a container (or for a [`RenderOptions::render_before`] anchor) inserts a marker comment and creates a root part.
/// Later calls update what is already there, touching only bindings whose values changed.
///
/// # Errors
///
/// - [`Error::InvalidContainer`] if `container` can't have children,
/// - [`Error::Reentrant`] if called for a root that is currently rendering,
/// - any error raised while committing `value`.
pub fn render<D: Dom>(dom: &D, value: impl Into<Value<D>>, container: &D::Node, options: RenderOptions<D>) -> Result<RootPart<D>, Error> {
	render_value(dom, value.into(), container, options)
}

#[instrument(name = "render", skip(dom, value, container, options), fields(value = value.kind_name()))]
fn render_value<D: Dom>(dom: &D, value: Value<D>, container: &D::Node, options: RenderOptions<D>) -> Result<RootPart<D>, Error> {
	match dom.node_type(container) {
		NodeType::Element | NodeType::Fragment | NodeType::Document => (),
		other => return Err(Error::InvalidContainer { found: other.name() }),
	}

	let owner = options.render_before.as_ref().unwrap_or(container);
	let tree = match dom.part_slot(owner).and_then(|slot| slot.downcast::<RefCell<PartTree<D>>>().ok()) {
		Some(tree) => tree,
		None => {
			debug!("Creating root part.");
			let start = dom.create_comment("");
			dom.insert_before(container, &start, options.render_before.as_ref());
			let tree = PartTree::new_shared(dom.clone(), options.creation_scope, options.host, options.is_connected, start, options.render_before.clone());
			dom.set_part_slot(owner, tree.clone());
			tree
		}
	};

	let root = {
		let mut borrowed = tree.try_borrow_mut().map_err(|_| Error::Reentrant)?;
		let root = borrowed.root;
		child::set_child_value(&mut borrowed, root, value, 0)?;
		root
	};
	Ok(RootPart { tree, root })
}
