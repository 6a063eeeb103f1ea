//! Rebuilds descriptors from nodes that already exist in a [`Document`].
//!
//! A navigation layer can parse a fetched page into any [`Document`], load the relevant subtree with
//! [`load_child_nodes`] and hand the result to [`Root::render`](`crate::Root::render`).

use crate::{
	document::{Document, NodeInfo},
	element::{create_element, Node},
	props::Props,
	root::RootOptions,
};
use tracing::{error, trace};

/// Loads all children of `parent`. Comments and other nodes without a descriptor counterpart are skipped.
pub fn load_child_nodes<D: Document>(document: &D, parent: &D::Node) -> Vec<Node> {
	load_child_nodes_limited(document, parent, RootOptions::default().depth_limit)
}

/// Loads `node` and its subtree, or [`None`] if it is neither an element nor text.
pub fn load_node<D: Document>(document: &D, node: &D::Node) -> Option<Node> {
	load_node_limited(document, node, RootOptions::default().depth_limit)
}

fn load_child_nodes_limited<D: Document>(document: &D, parent: &D::Node, depth_limit: usize) -> Vec<Node> {
	if depth_limit == 0 {
		error!("Depth limit reached");
		return Vec::new();
	}
	document.child_nodes(parent).iter().filter_map(|child| load_node_limited(document, child, depth_limit - 1)).collect()
}

fn load_node_limited<D: Document>(document: &D, node: &D::Node, depth_limit: usize) -> Option<Node> {
	match document.inspect(node) {
		NodeInfo::Element { tag, attributes } => {
			let props = attributes.into_iter().fold(Props::new(), |props, (name, value)| props.with(name, value));
			Some(create_element(tag, props, load_child_nodes_limited(document, node, depth_limit)))
		}
		NodeInfo::Text(text) => Some(text.into()),
		NodeInfo::Other => {
			trace!("Skipping unrecognised child node {:?}.", node);
			None
		}
	}
}
