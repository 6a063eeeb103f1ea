//! Child reconciliation: the keyed/sequential dispatcher and both differs.

use crate::{document::Document, element::Node, fiber::FiberId, lis, root::Root};
use hashbrown::{hash_map::Entry, HashMap};
use tracing::{error, instrument, trace, warn};

impl<D: Document> Root<D> {
	/// Reconciles the children of `parent` with `new`, which must already be flattened.
	///
	/// `dom_parent` is the platform node the children live in. Nodes are inserted before `anchor`, the first node after
	/// this sibling group, or appended if there is none.
	///
	/// The group is keyed iff any old child or any new node has a key.
	#[instrument(skip(self, dom_parent, new, anchor))]
	pub(crate) fn diff_children(&mut self, parent: FiberId, dom_parent: &D::Node, new: Vec<Node>, anchor: Option<&D::Node>, depth_limit: usize) {
		if depth_limit == 0 {
			return error!("Depth limit reached");
		}

		let old = self.tree.take_children(parent);
		let keyed = old.iter().any(|&id| self.tree.key(id).is_some()) || new.iter().any(|node| node.key().is_some());
		let children = if keyed {
			self.diff_keyed(parent, dom_parent, &old, &new, anchor, depth_limit - 1)
		} else {
			self.diff_sequential(parent, dom_parent, &old, &new, anchor, depth_limit - 1)
		};
		self.tree.set_children(parent, children);
	}

	/// Index-wise patching. Extra new nodes are inserted at the end of the group, extra old fibers are removed.
	fn diff_sequential(&mut self, parent: FiberId, dom_parent: &D::Node, old: &[FiberId], new: &[Node], anchor: Option<&D::Node>, depth_limit: usize) -> Vec<FiberId> {
		trace!("Diffing {} unkeyed old against {} new.", old.len(), new.len());

		let mut children = Vec::with_capacity(new.len());
		for (i, node) in new.iter().enumerate() {
			match old.get(i) {
				Some(&id) => {
					let next = self.tree.first_live_node_of(&old[i + 1..]).or_else(|| anchor.cloned());
					children.extend(self.patch(id, node, dom_parent, next.as_ref(), depth_limit));
				}
				None => {
					if let Some(id) = self.mount(node, Some(parent), depth_limit) {
						self.insert_live_nodes(id, dom_parent, anchor);
						children.push(id);
					}
				}
			}
		}
		for &id in old.iter().skip(new.len()) {
			self.remove(id);
		}
		children
	}

	/// Matches by key (unkeyed siblings by their order among each other), patches matches in place, then moves only
	/// what isn't part of the longest run of fibers that kept their relative order.
	fn diff_keyed(&mut self, parent: FiberId, dom_parent: &D::Node, old: &[FiberId], new: &[Node], anchor: Option<&D::Node>, depth_limit: usize) -> Vec<FiberId> {
		trace!("Diffing {} keyed old against {} new.", old.len(), new.len());

		let mut old_indices = HashMap::with_capacity(old.len());
		for (index, &id) in old.iter().enumerate() {
			if let Some(key) = self.tree.key(id) {
				match old_indices.entry(key.clone()) {
					Entry::Vacant(vacant) => {
						vacant.insert(index);
					}
					Entry::Occupied(_) => warn!("Duplicate key {:?} among siblings. Only the first fiber with it is reused.", key.as_str()),
				}
			}
		}

		// Unkeyed siblings are matched in order, so their position among each other acts as their key.
		let mut unkeyed = old
			.iter()
			.enumerate()
			.filter(|&(_, &id)| self.tree.key(id).is_none())
			.map(|(index, _)| index)
			.collect::<Vec<_>>()
			.into_iter();

		let mut claimed = vec![false; old.len()];
		let mut children = Vec::with_capacity(new.len());
		// Old index per new position, for fibers that stay where they were.
		let mut sources = Vec::with_capacity(new.len());
		for node in new {
			let matched = match node.key() {
				Some(key) => old_indices.get(key).copied().filter(|&index| !claimed[index]),
				None => unkeyed.next(),
			};
			if let Some(index) = matched {
				claimed[index] = true;
				let id = old[index];
				if self.tree.same_shape(id, node) {
					let had_live_nodes = self.tree.has_live_nodes(id);
					if let Some(id) = self.patch(id, node, dom_parent, anchor, depth_limit) {
						children.push(id);
						sources.push(if had_live_nodes { Some(index) } else { None });
					}
					continue;
				}
				trace!("Fiber {:?} (key {:?}) changed shape.", id, node.key().map(|key| key.as_str()));
				self.remove(id);
			} else if let Some(key) = node.key() {
				if old_indices.contains_key(key) {
					warn!("Duplicate key {:?} among new siblings. Mounting a fresh fiber.", key.as_str());
				}
			}

			if let Some(id) = self.mount(node, Some(parent), depth_limit) {
				children.push(id);
				sources.push(None);
			}
		}

		for (index, &id) in old.iter().enumerate() {
			if !claimed[index] {
				self.remove(id);
			}
		}

		let stable = lis::stable_positions(&sources);
		trace!("{} of {} fiber(s) stay in place.", stable.iter().filter(|&&stable| stable).count(), children.len());

		// Right to left, so each anchor is already in its final position.
		let mut anchor = anchor.cloned();
		for (&id, &stable) in children.iter().zip(&stable).rev() {
			if !stable {
				self.insert_live_nodes(id, dom_parent, anchor.as_ref());
			}
			if let Some(first) = self.tree.first_live_node(id) {
				anchor = Some(first);
			}
		}
		children
	}
}
