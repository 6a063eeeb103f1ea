//! The platform seam: everything the reconciler needs from a live document.

use crate::props::EventHandler;
use core::fmt::Debug;

/// What a live node is, as far as [`load`](`crate::load`) is concerned.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum NodeInfo {
	Element { tag: String, attributes: Vec<(String, String)> },
	Text(String),
	/// Comments, processing instructions and anything else that has no descriptor counterpart.
	Other,
}

/// A live document the reconciler can mutate.
///
/// Methods take `&self`, like the DOM they model. Cloning a [`Document::Node`] must produce another handle to the
/// same node, and equality must be node identity.
pub trait Document {
	type Node: Clone + PartialEq + Debug + 'static;
	type Error: Debug;

	/// # Errors
	///
	/// Iff the platform rejects `tag`.
	fn create_element(&self, tag: &str) -> Result<Self::Node, Self::Error>;

	fn create_text_node(&self, text: &str) -> Self::Node;

	fn set_text(&self, text_node: &Self::Node, text: &str);

	/// Inserts `child` into `parent` before `reference`, or at the end if `reference` is [`None`].
	/// An attached `child` is moved.
	///
	/// # Errors
	///
	/// Iff `reference` is not a child of `parent` or the insertion is otherwise invalid.
	fn insert_before(&self, parent: &Self::Node, child: &Self::Node, reference: Option<&Self::Node>) -> Result<(), Self::Error>;

	/// # Errors
	///
	/// Iff `child` is not a child of `parent`.
	fn remove_child(&self, parent: &Self::Node, child: &Self::Node) -> Result<(), Self::Error>;

	fn parent_node(&self, node: &Self::Node) -> Option<Self::Node>;

	fn next_sibling(&self, node: &Self::Node) -> Option<Self::Node>;

	fn child_nodes(&self, node: &Self::Node) -> Vec<Self::Node>;

	fn inspect(&self, node: &Self::Node) -> NodeInfo;

	/// # Errors
	///
	/// Iff `element` is not an element or `name` is not a valid attribute name.
	fn set_attribute(&self, element: &Self::Node, name: &str, value: &str) -> Result<(), Self::Error>;

	/// # Errors
	///
	/// Iff `element` is not an element.
	fn remove_attribute(&self, element: &Self::Node, name: &str) -> Result<(), Self::Error>;

	/// # Errors
	///
	/// Iff `element` is not an element.
	fn set_class_name(&self, element: &Self::Node, class_name: &str) -> Result<(), Self::Error>;

	/// # Errors
	///
	/// Iff `element` has no inline style.
	fn set_style_property(&self, element: &Self::Node, name: &str, value: &str) -> Result<(), Self::Error>;

	/// # Errors
	///
	/// Iff `element` has no inline style.
	fn clear_style(&self, element: &Self::Node) -> Result<(), Self::Error>;

	/// # Errors
	///
	/// Iff `element` can't receive events.
	fn add_event_listener(&self, element: &Self::Node, event: &str, handler: &EventHandler) -> Result<(), Self::Error>;

	/// Removes a listener previously added with the same `event` and `handler`.
	///
	/// # Errors
	///
	/// Iff `element` can't receive events.
	fn remove_event_listener(&self, element: &Self::Node, event: &str, handler: &EventHandler) -> Result<(), Self::Error>;

	/// Removes `node` from its parent if it still has one. Returns whether it was attached.
	///
	/// # Errors
	///
	/// Iff the platform refuses the removal.
	fn detach(&self, node: &Self::Node) -> Result<bool, Self::Error> {
		match self.parent_node(node) {
			Some(parent) => self.remove_child(&parent, node).map(|()| true),
			None => Ok(false),
		}
	}
}
