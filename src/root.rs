//! Render roots: mounting, patching, removal and the commit/effect cycle.

use crate::{
	document::Document,
	element::{flatten, Element, ElementKind, Node},
	fiber::{Fiber, FiberId, FiberKind, FiberTree},
	hooks::{HookSlot, Hooks, PendingEffect},
	properties::{self, patch_properties},
	props::{Prop, Props},
	redact,
	scheduler::{Scheduler, UpdateQueue},
};
use core::fmt::{self, Debug, Formatter};
use hashbrown::HashMap;
use std::rc::Rc;
use tracing::{error, info, instrument, trace, trace_span};

/// Tuning for a [`Root`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RootOptions {
	/// How many nested sibling groups are reconciled before a subtree is left unrendered (with an error logged).
	pub depth_limit: usize,
}

impl Default for RootOptions {
	fn default() -> Self {
		Self { depth_limit: 512 }
	}
}

/// The render root of one container.
///
/// Owns the fiber tree, the hook state of every mounted component and the queue of pending updates. Independent
/// roots don't share any state.
///
/// Dropping a root runs outstanding effect cleanups and clears refs, but leaves the document as it is.
pub struct Root<D: Document> {
	pub(crate) document: D,
	pub(crate) container: D::Node,
	pub(crate) tree: FiberTree<D::Node>,
	root: Option<FiberId>,
	pub(crate) updates: Rc<UpdateQueue>,
	pub(crate) effects: Vec<PendingEffect>,
	options: RootOptions,
}

impl<D: Document> Root<D> {
	/// Creates a root that renders into `container`.
	///
	/// Nothing is written to the document until the first [`Root::render`].
	pub fn new(document: D, container: D::Node, scheduler: Rc<dyn Scheduler>) -> Self {
		Self::with_options(document, container, scheduler, RootOptions::default())
	}

	pub fn with_options(document: D, container: D::Node, scheduler: Rc<dyn Scheduler>, options: RootOptions) -> Self {
		Self {
			document,
			container,
			tree: FiberTree::default(),
			root: None,
			updates: Rc::new(UpdateQueue::new(scheduler)),
			effects: Vec::new(),
			options,
		}
	}

	pub fn document(&self) -> &D {
		&self.document
	}

	pub fn container(&self) -> &D::Node {
		&self.container
	}

	pub fn options(&self) -> RootOptions {
		self.options
	}

	/// Makes the container's content match `node`.
	///
	/// The first call mounts, later calls patch the result of the previous one. Rendering [`Node::Null`] removes
	/// everything (running cleanups) but keeps the root usable.
	///
	/// Effects scheduled by this commit run before this method returns.
	///
	/// # Panics
	///
	/// Iff a component panics or misuses hooks.
	#[instrument(skip(self, node))]
	pub fn render(&mut self, node: impl Into<Node>) -> FiberId {
		let node = node.into();
		let root = match self.root {
			Some(root) => root,
			None => {
				let root = self.tree.insert(Fiber::new(FiberKind::Fragment { source: None }, None, None));
				self.root = Some(root);
				root
			}
		};
		let container = self.container.clone();
		self.diff_children(root, &container, flatten(&node), None, self.options.depth_limit);
		self.run_effects();
		root
	}

	/// Re-renders every component whose state changed since the last flush, shallowest first, then runs the
	/// resulting effects.
	///
	/// Returns how many components were re-rendered. Components re-rendered as part of an ancestor's update aren't
	/// rendered again.
	///
	/// # Panics
	///
	/// Iff a component panics or misuses hooks.
	#[instrument(skip(self))]
	pub fn flush(&mut self) -> usize {
		let mut queued = self.updates.take_queued();
		queued.sort_by_key(|&id| self.tree.depth(id));

		let mut rendered = 0;
		for id in queued {
			if !self.updates.is_pending(id) {
				trace!("{:?} was already re-rendered.", id);
				continue;
			}
			if !self.tree.contains(id) {
				trace!("{:?} is no longer mounted.", id);
				self.updates.settle(id);
				continue;
			}
			self.rerender(id);
			rendered += 1;
		}
		self.run_effects();
		rendered
	}

	#[must_use]
	pub fn has_pending_updates(&self) -> bool {
		!self.updates.is_empty()
	}

	/// Removes everything this root rendered (running cleanups) and drops the root fiber.
	pub fn unmount(&mut self) {
		self.render(Node::Null);
		if let Some(root) = self.root.take() {
			self.tree.remove(root);
		}
	}

	/// The top-level nodes currently rendered into the container, in document order.
	#[must_use]
	pub fn live_nodes(&self) -> Vec<D::Node> {
		self.root.map(|root| self.tree.collect_live_nodes(root)).unwrap_or_default()
	}

	/// How many fibers are mounted, including the root fiber.
	#[must_use]
	pub fn fiber_count(&self) -> usize {
		self.tree.len()
	}

	/// Whether code outside this root removed any of its top-level nodes from the container, for example by
	/// replacing the container's content wholesale during navigation.
	#[must_use]
	pub fn is_orphaned(&self) -> bool {
		self.live_nodes().iter().any(|node| self.document.parent_node(node).as_ref() != Some(&self.container))
	}

	/// If this root [is orphaned](`Root::is_orphaned`), runs all effect cleanups, clears refs and forgets the fiber
	/// tree without touching the document. The next [`Root::render`] mounts from scratch.
	///
	/// Returns whether the root was pruned.
	pub fn prune_if_orphaned(&mut self) -> bool {
		if !self.is_orphaned() {
			return false;
		}
		info!("Pruning orphaned root ({} fiber(s)).", self.tree.len());
		self.release();
		true
	}

	fn release(&mut self) {
		if let Some(root) = self.root.take() {
			self.unmount_fiber(root, false);
		}
		self.effects.clear();
		self.tree.clear();
	}

	fn rerender(&mut self, id: FiberId) {
		let span = trace_span!("Re-rendering", ?id);
		let _enter = span.enter();

		let dom_parent = self.tree.dom_parent(id).unwrap_or_else(|| self.container.clone());
		let anchor = match self.tree.last_live_node(id) {
			Some(last) => self.document.next_sibling(&last),
			None => self.tree.dom_anchor_after(id),
		};
		let depth_limit = self.options.depth_limit.saturating_sub(self.tree.depth(id));
		let rendered = self.render_component(id);
		self.diff_children(id, &dom_parent, flatten(&rendered), anchor.as_ref(), depth_limit);
	}

	/// Invokes the component at `id` with a fresh hook cursor over its persistent slots.
	pub(crate) fn render_component(&mut self, id: FiberId) -> Node {
		let (component, source, mut slots, rendered) = match self.tree.get_mut(id).map(|fiber| &mut fiber.kind) {
			Some(FiberKind::Component { component, source, hooks, rendered }) => (component.clone(), Rc::clone(source), std::mem::take(hooks), *rendered),
			_ => {
				error!("{:?} is not a component", id);
				return Node::Null;
			}
		};
		self.updates.settle(id);

		let span = trace_span!("Rendering component", component = component.name(), ?id);
		let _enter = span.enter();
		let node = {
			let mut hooks = Hooks::new(id, component.name(), &mut slots, !rendered, Rc::downgrade(&self.updates), &mut self.effects);
			let node = component.call(&mut hooks, &source.props);
			hooks.finish();
			node
		};

		if let Some(FiberKind::Component { hooks, rendered, .. }) = self.tree.get_mut(id).map(|fiber| &mut fiber.kind) {
			*hooks = slots;
			*rendered = true;
		}
		node
	}

	fn run_effects(&mut self) {
		let effects = std::mem::take(&mut self.effects);
		if effects.is_empty() {
			return;
		}
		let span = trace_span!("Running effects", count = effects.len());
		let _enter = span.enter();

		for PendingEffect { fiber, index, run } in effects {
			let previous = match self.tree.hook_slot_mut(fiber, index) {
				Some(HookSlot::Effect { cleanup, .. }) => cleanup.take(),
				_ => {
					trace!("Skipping effect of unmounted {:?}.", fiber);
					continue;
				}
			};
			if let Some(cleanup) = previous {
				cleanup();
			}
			let cleanup = run();
			match self.tree.hook_slot_mut(fiber, index) {
				Some(HookSlot::Effect { cleanup: slot, .. }) => *slot = cleanup,
				_ => {
					if let Some(cleanup) = cleanup {
						cleanup();
					}
				}
			}
		}
	}

	/// Builds the fiber subtree for `node`. Nodes of fragments and components at its top are left detached, element
	/// content is appended into its element.
	pub(crate) fn mount(&mut self, node: &Node, parent: Option<FiberId>, depth_limit: usize) -> Option<FiberId> {
		if depth_limit == 0 {
			error!("Depth limit reached");
			return None;
		}

		match node {
			// Lists never get here, `flatten` splices them into their siblings.
			Node::Null | Node::Bool(_) | Node::List(_) => None,
			Node::Text(_) | Node::Number(_) => {
				let text = node.text()?;
				trace!("Mounting text {:?}.", redact(&text));
				let text_node = self.document.create_text_node(&text);
				Some(self.tree.insert(Fiber::new(FiberKind::Text { node: text_node, text }, None, parent)))
			}
			Node::Element(element) => self.mount_element(element, parent, depth_limit),
		}
	}

	fn mount_element(&mut self, element: &Rc<Element>, parent: Option<FiberId>, depth_limit: usize) -> Option<FiberId> {
		let key = element.key.clone();
		match &element.kind {
			ElementKind::Tag(tag) => {
				let span = trace_span!("Mounting element", tag = &**tag);
				let _enter = span.enter();

				let node = match self.document.create_element(tag) {
					Ok(node) => node,
					Err(error) => {
						error!("Failed to create element {:?}: {:?}", tag, error);
						return None;
					}
				};
				let mut listeners = HashMap::new();
				patch_properties(&self.document, &node, &mut listeners, &Props::default(), &element.props);
				let kind = FiberKind::Element {
					node: node.clone(),
					source: Rc::clone(element),
					listeners,
				};
				let id = self.tree.insert(Fiber::new(kind, key, parent));
				self.mount_children(id, &element.props.child_nodes(), Some(&node), depth_limit);
				Some(id)
			}
			ElementKind::Fragment => {
				let kind = FiberKind::Fragment { source: Some(Rc::clone(element)) };
				let id = self.tree.insert(Fiber::new(kind, key, parent));
				self.mount_children(id, &element.props.child_nodes(), None, depth_limit);
				Some(id)
			}
			ElementKind::Component(component) => {
				let kind = FiberKind::Component {
					component: component.clone(),
					source: Rc::clone(element),
					hooks: Vec::new(),
					rendered: false,
				};
				let id = self.tree.insert(Fiber::new(kind, key, parent));
				let rendered = self.render_component(id);
				self.mount_children(id, &flatten(&rendered), None, depth_limit);
				Some(id)
			}
		}
	}

	fn mount_children(&mut self, id: FiberId, nodes: &[Node], into: Option<&D::Node>, depth_limit: usize) {
		let mut children = Vec::with_capacity(nodes.len());
		for node in nodes {
			if let Some(child) = self.mount(node, Some(id), depth_limit - 1) {
				if let Some(into) = into {
					self.insert_live_nodes(child, into, None);
				}
				children.push(child);
			}
		}
		self.tree.set_children(id, children);
	}

	/// Inserts the top-level nodes of `id` before `anchor`, or appends them.
	pub(crate) fn insert_live_nodes(&self, id: FiberId, dom_parent: &D::Node, anchor: Option<&D::Node>) {
		for node in self.tree.collect_live_nodes(id) {
			if let Err(error) = self.document.insert_before(dom_parent, &node, anchor) {
				error!("Failed to insert node: {:?}", error);
			}
		}
	}

	/// Reconciles the fiber `id` with `node` at the same position.
	///
	/// `anchor` is where the nodes following this fiber's group start, used when the fiber has no live nodes to
	/// position against. Returns the fiber now at this position, if any.
	pub(crate) fn patch(&mut self, id: FiberId, node: &Node, dom_parent: &D::Node, anchor: Option<&D::Node>, depth_limit: usize) -> Option<FiberId> {
		if node.is_empty() {
			self.remove(id);
			return None;
		}
		if !self.tree.same_shape(id, node) {
			return self.replace(id, node, dom_parent, anchor, depth_limit);
		}

		let span = trace_span!("Patching", ?id);
		let _enter = span.enter();
		match node {
			Node::Null | Node::Bool(_) | Node::List(_) => (),
			Node::Text(_) | Node::Number(_) => self.patch_text(id, node),
			Node::Element(element) => match &element.kind {
				ElementKind::Tag(_) => self.patch_element(id, element, depth_limit),
				ElementKind::Fragment => {
					if let Some(FiberKind::Fragment { source }) = self.tree.get_mut(id).map(|fiber| &mut fiber.kind) {
						*source = Some(Rc::clone(element));
					}
					let anchor = self.trailing_anchor(id, anchor);
					self.diff_children(id, dom_parent, element.props.child_nodes(), anchor.as_ref(), depth_limit);
				}
				ElementKind::Component(new_component) => {
					if let Some(FiberKind::Component { component, source, .. }) = self.tree.get_mut(id).map(|fiber| &mut fiber.kind) {
						*component = new_component.clone();
						*source = Rc::clone(element);
					}
					let anchor = self.trailing_anchor(id, anchor);
					let rendered = self.render_component(id);
					self.diff_children(id, dom_parent, flatten(&rendered), anchor.as_ref(), depth_limit);
				}
			},
		}
		Some(id)
	}

	fn patch_text(&mut self, id: FiberId, node: &Node) {
		let new_text = match node.text() {
			Some(text) => text,
			None => return,
		};
		if let Some(FiberKind::Text { node: text_node, text }) = self.tree.get_mut(id).map(|fiber| &mut fiber.kind) {
			if *text == new_text {
				return trace!("Text unchanged.");
			}
			trace!("Setting text to {:?}.", redact(&new_text));
			self.document.set_text(text_node, &new_text);
			*text = new_text;
		}
	}

	fn patch_element(&mut self, id: FiberId, element: &Rc<Element>, depth_limit: usize) {
		let node = match self.tree.get_mut(id).map(|fiber| &mut fiber.kind) {
			Some(FiberKind::Element { node, source, listeners }) => {
				if Rc::ptr_eq(source, element) {
					trace!("Same descriptor, properties unchanged.");
				} else {
					patch_properties(&self.document, node, listeners, &source.props, &element.props);
					*source = Rc::clone(element);
				}
				node.clone()
			}
			_ => return,
		};
		self.diff_children(id, &node, element.props.child_nodes(), None, depth_limit);
	}

	fn replace(&mut self, id: FiberId, node: &Node, dom_parent: &D::Node, anchor: Option<&D::Node>, depth_limit: usize) -> Option<FiberId> {
		let span = trace_span!("Replacing", ?id);
		let _enter = span.enter();

		let anchor = self.trailing_anchor(id, anchor);
		let parent = self.tree.parent(id);
		self.remove(id);
		let replacement = self.mount(node, parent, depth_limit)?;
		self.insert_live_nodes(replacement, dom_parent, anchor.as_ref());
		Some(replacement)
	}

	/// The node right after the live nodes of `id`, or `fallback` if it has none.
	fn trailing_anchor(&self, id: FiberId, fallback: Option<&D::Node>) -> Option<D::Node> {
		match self.tree.last_live_node(id) {
			Some(last) => self.document.next_sibling(&last),
			None => fallback.cloned(),
		}
	}

	/// Unmounts `id` and its subtree, then detaches its top-level nodes if they are still attached.
	pub(crate) fn remove(&mut self, id: FiberId) {
		let span = trace_span!("Removing", ?id);
		let _enter = span.enter();

		let nodes = self.tree.collect_live_nodes(id);
		self.unmount_fiber(id, true);
		for node in nodes {
			match self.document.detach(&node) {
				Ok(true) => (),
				Ok(false) => trace!("Node was already detached."),
				Err(error) => error!("Failed to remove node: {:?}", error),
			}
		}
	}

	/// Runs effect cleanups, clears refs and forgets the subtree. Listeners are only unbound if `touch_document`.
	fn unmount_fiber(&mut self, id: FiberId, touch_document: bool) {
		let fiber = match self.tree.remove(id) {
			Some(fiber) => fiber,
			None => return,
		};
		self.updates.settle(id);

		match fiber.kind {
			FiberKind::Component { hooks, .. } => {
				for slot in hooks {
					if let HookSlot::Effect { cleanup: Some(cleanup), .. } = slot {
						cleanup();
					}
				}
			}
			FiberKind::Element { node, source, listeners } => {
				if touch_document {
					properties::release(&self.document, &node, listeners, &source.props);
				} else if let Some(Prop::Ref(node_ref)) = source.props.get("ref") {
					node_ref.detach_from(&node);
				}
			}
			FiberKind::Text { .. } | FiberKind::Fragment { .. } => (),
		}

		for child in fiber.children {
			self.unmount_fiber(child, touch_document);
		}
	}
}

impl<D: Document> Drop for Root<D> {
	fn drop(&mut self) {
		self.release();
	}
}

impl<D: Document> Debug for Root<D> {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		f.debug_struct("Root")
			.field("container", &self.container)
			.field("root", &self.root)
			.field("fibers", &self.tree.len())
			.field("options", &self.options)
			.finish()
	}
}
