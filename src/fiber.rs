//! The fiber arena: mutable runtime records pairing descriptors with the live nodes they produced.

use crate::{
	element::{Component, Element, Key, Node},
	hooks::HookSlot,
	props::EventHandler,
};
use core::fmt::{self, Debug, Formatter};
use hashbrown::HashMap;
use std::rc::Rc;

/// Identifies a fiber within one [`Root`](`crate::Root`).
///
/// Ids are never reused, so a handle to an unmounted fiber (for example inside a stale state setter) stays inert.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FiberId(u64);

impl FiberId {
	/// Owner of hook stores that aren't attached to any tree (server rendering).
	pub(crate) const DETACHED: Self = Self(0);
}

pub(crate) struct Fiber<N> {
	pub kind: FiberKind<N>,
	pub key: Option<Key>,
	pub parent: Option<FiberId>,
	pub children: Vec<FiberId>,
}

impl<N> Fiber<N> {
	pub fn new(kind: FiberKind<N>, key: Option<Key>, parent: Option<FiberId>) -> Self {
		Self {
			kind,
			key,
			parent,
			children: Vec::new(),
		}
	}
}

pub(crate) enum FiberKind<N> {
	Text {
		node: N,
		text: Rc<str>,
	},
	Element {
		node: N,
		source: Rc<Element>,
		/// Event name → currently attached handler.
		listeners: HashMap<String, EventHandler>,
	},
	Component {
		component: Component,
		source: Rc<Element>,
		hooks: Vec<HookSlot>,
		rendered: bool,
	},
	/// [`None`] only for the root fiber.
	Fragment { source: Option<Rc<Element>> },
}

impl<N: Debug> Debug for FiberKind<N> {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		match self {
			FiberKind::Text { node, .. } => f.debug_tuple("Text").field(node).finish(),
			FiberKind::Element { node, listeners, .. } => f.debug_struct("Element").field("node", node).field("listeners", &listeners.len()).finish(),
			FiberKind::Component { component, hooks, .. } => f.debug_struct("Component").field("component", component).field("hooks", &hooks.len()).finish(),
			FiberKind::Fragment { source } => f.debug_struct("Fragment").field("root", &source.is_none()).finish(),
		}
	}
}

pub(crate) struct FiberTree<N> {
	fibers: HashMap<FiberId, Fiber<N>>,
	next_id: u64,
}

impl<N> Default for FiberTree<N> {
	fn default() -> Self {
		Self {
			fibers: HashMap::new(),
			next_id: 1,
		}
	}
}

impl<N: Clone> FiberTree<N> {
	pub fn insert(&mut self, fiber: Fiber<N>) -> FiberId {
		let id = FiberId(self.next_id);
		self.next_id += 1;
		self.fibers.insert(id, fiber);
		id
	}

	pub fn get(&self, id: FiberId) -> Option<&Fiber<N>> {
		self.fibers.get(&id)
	}

	pub fn get_mut(&mut self, id: FiberId) -> Option<&mut Fiber<N>> {
		self.fibers.get_mut(&id)
	}

	/// Removes only `id` itself. Its children stay in the arena until they are removed too.
	pub fn remove(&mut self, id: FiberId) -> Option<Fiber<N>> {
		self.fibers.remove(&id)
	}

	pub fn contains(&self, id: FiberId) -> bool {
		self.fibers.contains_key(&id)
	}

	pub fn len(&self) -> usize {
		self.fibers.len()
	}

	pub fn clear(&mut self) {
		self.fibers.clear();
	}

	pub fn key(&self, id: FiberId) -> Option<&Key> {
		self.get(id)?.key.as_ref()
	}

	pub fn parent(&self, id: FiberId) -> Option<FiberId> {
		self.get(id)?.parent
	}

	pub fn take_children(&mut self, id: FiberId) -> Vec<FiberId> {
		self.get_mut(id).map(|fiber| std::mem::take(&mut fiber.children)).unwrap_or_default()
	}

	pub fn set_children(&mut self, id: FiberId, children: Vec<FiberId>) {
		if let Some(fiber) = self.get_mut(id) {
			fiber.children = children;
		}
	}

	/// The node a text or element fiber owns.
	pub fn own_node(&self, id: FiberId) -> Option<&N> {
		match &self.get(id)?.kind {
			FiberKind::Text { node, .. } | FiberKind::Element { node, .. } => Some(node),
			FiberKind::Component { .. } | FiberKind::Fragment { .. } => None,
		}
	}

	/// The top-level platform nodes `id` is responsible for, in document order.
	pub fn collect_live_nodes(&self, id: FiberId) -> Vec<N> {
		let mut nodes = Vec::new();
		self.collect_live_nodes_into(id, &mut nodes);
		nodes
	}

	fn collect_live_nodes_into(&self, id: FiberId, nodes: &mut Vec<N>) {
		if let Some(node) = self.own_node(id) {
			return nodes.push(node.clone());
		}
		if let Some(fiber) = self.get(id) {
			for &child in &fiber.children {
				self.collect_live_nodes_into(child, nodes);
			}
		}
	}

	pub fn first_live_node(&self, id: FiberId) -> Option<N> {
		if let Some(node) = self.own_node(id) {
			return Some(node.clone());
		}
		self.first_live_node_of(&self.get(id)?.children)
	}

	pub fn first_live_node_of(&self, ids: &[FiberId]) -> Option<N> {
		ids.iter().find_map(|&id| self.first_live_node(id))
	}

	pub fn last_live_node(&self, id: FiberId) -> Option<N> {
		if let Some(node) = self.own_node(id) {
			return Some(node.clone());
		}
		self.get(id)?.children.iter().rev().find_map(|&child| self.last_live_node(child))
	}

	pub fn has_live_nodes(&self, id: FiberId) -> bool {
		self.first_live_node(id).is_some()
	}

	pub fn depth(&self, id: FiberId) -> usize {
		let mut depth = 0;
		let mut current = self.parent(id);
		while let Some(parent) = current {
			depth += 1;
			current = self.parent(parent);
		}
		depth
	}

	/// The element the nodes of `id` are placed into, or [`None`] for the container.
	pub fn dom_parent(&self, id: FiberId) -> Option<N> {
		let mut current = self.parent(id);
		while let Some(parent) = current {
			if let Some(FiberKind::Element { node, .. }) = self.get(parent).map(|fiber| &fiber.kind) {
				return Some(node.clone());
			}
			current = self.parent(parent);
		}
		None
	}

	/// The first live node that follows `id` within the same platform parent.
	///
	/// Climbs through fragment and component ancestors, stopping at the nearest element or the root.
	pub fn dom_anchor_after(&self, id: FiberId) -> Option<N> {
		let mut current = id;
		loop {
			let parent = self.parent(current)?;
			let parent_fiber = self.get(parent)?;
			if let Some(index) = parent_fiber.children.iter().position(|&child| child == current) {
				if let Some(node) = self.first_live_node_of(&parent_fiber.children[index + 1..]) {
					return Some(node);
				}
			}
			if let FiberKind::Element { .. } = parent_fiber.kind {
				return None;
			}
			current = parent;
		}
	}

	/// Whether `id` can be patched in place to match `node`.
	pub fn same_shape(&self, id: FiberId, node: &Node) -> bool {
		let kind = match self.get(id) {
			Some(fiber) => &fiber.kind,
			None => return false,
		};
		match (kind, node) {
			(FiberKind::Text { .. }, Node::Text(_) | Node::Number(_)) => true,
			(FiberKind::Element { source, .. } | FiberKind::Component { source, .. } | FiberKind::Fragment { source: Some(source) }, Node::Element(element)) => {
				source.same_shape(element)
			}
			_ => false,
		}
	}

	pub fn hook_slot_mut(&mut self, id: FiberId, index: usize) -> Option<&mut HookSlot> {
		match &mut self.get_mut(id)?.kind {
			FiberKind::Component { hooks, .. } => hooks.get_mut(index),
			_ => None,
		}
	}
}
