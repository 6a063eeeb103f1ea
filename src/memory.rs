//! A headless [`Document`] that keeps its tree in memory and logs every mutation.

use crate::{
	document::{Document, NodeInfo},
	props::{Event, EventHandler},
};
use core::cell::RefCell;
use std::rc::Rc;
use thiserror::Error;
use tracing::trace;

/// Handle of a node in a [`MemoryDocument`]. Equal handles are the same node.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MemoryNode(usize);

#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum MemoryDomError {
	#[error("{0:?} is not an element")]
	NotAnElement(MemoryNode),
	#[error("{child:?} is not a child of {parent:?}")]
	NotAChild { parent: MemoryNode, child: MemoryNode },
	#[error("inserting {child:?} into {parent:?} would create a cycle")]
	Cycle { parent: MemoryNode, child: MemoryNode },
	#[error("invalid tag name {0:?}")]
	InvalidTagName(String),
}

/// One logged change to a [`MemoryDocument`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Mutation {
	Insert { parent: MemoryNode, child: MemoryNode, before: Option<MemoryNode> },
	Remove { parent: MemoryNode, child: MemoryNode },
	SetText { node: MemoryNode, text: String },
	SetAttribute { element: MemoryNode, name: String, value: String },
	RemoveAttribute { element: MemoryNode, name: String },
	SetStyle { element: MemoryNode, name: String, value: String },
	ClearStyle { element: MemoryNode },
	AddListener { element: MemoryNode, event: String },
	RemoveListener { element: MemoryNode, event: String },
}

impl Mutation {
	/// Whether this is an insertion of any node directly into `parent`.
	#[must_use]
	pub fn is_insert_into(&self, parent: MemoryNode) -> bool {
		matches!(*self, Mutation::Insert { parent: p, .. } if p == parent)
	}
}

enum Content {
	Element {
		tag: String,
		attributes: Vec<(String, String)>,
		style: Vec<(String, String)>,
		listeners: Vec<(String, EventHandler)>,
	},
	Text(String),
}

struct NodeData {
	parent: Option<MemoryNode>,
	children: Vec<MemoryNode>,
	content: Content,
}

#[derive(Default)]
struct Arena {
	nodes: Vec<NodeData>,
	log: Vec<Mutation>,
}

/// The `style` attribute and the style properties are one declaration list, as in the DOM.
fn parse_style(text: &str) -> Vec<(String, String)> {
	text.split(';')
		.filter_map(|declaration| declaration.split_once(':'))
		.map(|(name, value)| (name.trim().to_owned(), value.trim().to_owned()))
		.filter(|(name, _)| !name.is_empty())
		.collect()
}

fn serialize_style(style: &[(String, String)]) -> String {
	style.iter().map(|(name, value)| format!("{}:{};", name, value)).collect()
}

impl Arena {
	fn node(&self, node: MemoryNode) -> &NodeData {
		&self.nodes[node.0]
	}

	fn node_mut(&mut self, node: MemoryNode) -> &mut NodeData {
		&mut self.nodes[node.0]
	}

	fn push(&mut self, content: Content) -> MemoryNode {
		self.nodes.push(NodeData {
			parent: None,
			children: Vec::new(),
			content,
		});
		MemoryNode(self.nodes.len() - 1)
	}

	#[allow(clippy::type_complexity)]
	fn element_mut(&mut self, node: MemoryNode) -> Result<(&mut Vec<(String, String)>, &mut Vec<(String, String)>, &mut Vec<(String, EventHandler)>), MemoryDomError> {
		match &mut self.node_mut(node).content {
			Content::Element { attributes, style, listeners, .. } => Ok((attributes, style, listeners)),
			Content::Text(_) => Err(MemoryDomError::NotAnElement(node)),
		}
	}

	fn unlink(&mut self, child: MemoryNode) {
		if let Some(parent) = self.node_mut(child).parent.take() {
			self.node_mut(parent).children.retain(|&c| c != child);
		}
	}

	fn is_ancestor_or_self(&self, ancestor: MemoryNode, mut node: MemoryNode) -> bool {
		loop {
			if node == ancestor {
				return true;
			}
			match self.node(node).parent {
				Some(parent) => node = parent,
				None => return false,
			}
		}
	}

	fn write_html(&self, node: MemoryNode, html: &mut String) {
		match &self.node(node).content {
			Content::Text(text) => html.push_str(text),
			Content::Element { tag, attributes, style, .. } => {
				html.push('<');
				html.push_str(tag);
				for (name, value) in attributes {
					html.push_str(&format!(" {}=\"{}\"", name, value));
				}
				if !style.is_empty() {
					html.push_str(&format!(" style=\"{}\"", serialize_style(style)));
				}
				html.push('>');
				for &child in &self.node(node).children {
					self.write_html(child, html);
				}
				html.push_str(&format!("</{}>", tag));
			}
		}
	}

	fn write_text(&self, node: MemoryNode, text: &mut String) {
		match &self.node(node).content {
			Content::Text(data) => text.push_str(data),
			Content::Element { .. } => {
				for &child in &self.node(node).children {
					self.write_text(child, text);
				}
			}
		}
	}
}

/// An in-memory document.
///
/// Clones share the same tree, so a test can keep a handle while a [`Root`](`crate::Root`) owns another.
#[derive(Clone, Default)]
pub struct MemoryDocument {
	arena: Rc<RefCell<Arena>>,
}

impl MemoryDocument {
	#[must_use]
	pub fn new() -> Self {
		Self::default()
	}

	/// Creates a detached element to render into.
	///
	/// # Panics
	///
	/// Iff `tag` is not a valid tag name.
	#[must_use]
	pub fn create_container(&self, tag: &str) -> MemoryNode {
		self.create_element(tag).unwrap_or_else(|error| panic!("Invalid container: {}", error))
	}

	/// All mutations since the last [`MemoryDocument::take_mutations`] or [`MemoryDocument::clear_mutations`].
	#[must_use]
	pub fn mutations(&self) -> Vec<Mutation> {
		self.arena.borrow().log.clone()
	}

	pub fn take_mutations(&self) -> Vec<Mutation> {
		std::mem::take(&mut self.arena.borrow_mut().log)
	}

	pub fn clear_mutations(&self) {
		self.arena.borrow_mut().log.clear();
	}

	#[must_use]
	pub fn children(&self, node: MemoryNode) -> Vec<MemoryNode> {
		self.arena.borrow().node(node).children.clone()
	}

	/// The concatenated text of `node` and its descendants.
	#[must_use]
	pub fn text_content(&self, node: MemoryNode) -> String {
		let mut text = String::new();
		self.arena.borrow().write_text(node, &mut text);
		text
	}

	#[must_use]
	pub fn tag_name(&self, node: MemoryNode) -> Option<String> {
		match &self.arena.borrow().node(node).content {
			Content::Element { tag, .. } => Some(tag.clone()),
			Content::Text(_) => None,
		}
	}

	#[must_use]
	pub fn attribute(&self, element: MemoryNode, name: &str) -> Option<String> {
		match &self.arena.borrow().node(element).content {
			Content::Element { style, .. } if name == "style" => (!style.is_empty()).then(|| serialize_style(style)),
			Content::Element { attributes, .. } => attributes.iter().find(|(n, _)| n == name).map(|(_, value)| value.clone()),
			Content::Text(_) => None,
		}
	}

	#[must_use]
	pub fn style_property(&self, element: MemoryNode, name: &str) -> Option<String> {
		match &self.arena.borrow().node(element).content {
			Content::Element { style, .. } => style.iter().find(|(n, _)| n == name).map(|(_, value)| value.clone()),
			Content::Text(_) => None,
		}
	}

	#[must_use]
	pub fn listener_count(&self, element: MemoryNode, event: &str) -> usize {
		match &self.arena.borrow().node(element).content {
			Content::Element { listeners, .. } => listeners.iter().filter(|(e, _)| e == event).count(),
			Content::Text(_) => 0,
		}
	}

	/// Calls every listener for `event`'s kind on `element`. Returns how many were called.
	pub fn dispatch(&self, element: MemoryNode, event: &Event) -> usize {
		let handlers: Vec<EventHandler> = match &self.arena.borrow().node(element).content {
			Content::Element { listeners, .. } => listeners.iter().filter(|(e, _)| e == event.kind()).map(|(_, handler)| handler.clone()).collect(),
			Content::Text(_) => Vec::new(),
		};
		trace!("Dispatching {:?} to {} listener(s).", event.kind(), handlers.len());
		for handler in &handlers {
			handler.call(event);
		}
		handlers.len()
	}

	#[must_use]
	pub fn inner_html(&self, node: MemoryNode) -> String {
		let arena = self.arena.borrow();
		let mut html = String::new();
		for &child in &arena.node(node).children {
			arena.write_html(child, &mut html);
		}
		html
	}

	#[must_use]
	pub fn outer_html(&self, node: MemoryNode) -> String {
		let mut html = String::new();
		self.arena.borrow().write_html(node, &mut html);
		html
	}
}

impl Document for MemoryDocument {
	type Node = MemoryNode;
	type Error = MemoryDomError;

	fn create_element(&self, tag: &str) -> Result<MemoryNode, MemoryDomError> {
		if tag.is_empty() || !tag.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b':') {
			return Err(MemoryDomError::InvalidTagName(tag.to_owned()));
		}
		Ok(self.arena.borrow_mut().push(Content::Element {
			tag: tag.to_owned(),
			attributes: Vec::new(),
			style: Vec::new(),
			listeners: Vec::new(),
		}))
	}

	fn create_text_node(&self, text: &str) -> MemoryNode {
		self.arena.borrow_mut().push(Content::Text(text.to_owned()))
	}

	fn set_text(&self, text_node: &MemoryNode, text: &str) {
		let mut arena = self.arena.borrow_mut();
		if let Content::Text(data) = &mut arena.node_mut(*text_node).content {
			*data = text.to_owned();
		}
		arena.log.push(Mutation::SetText { node: *text_node, text: text.to_owned() });
	}

	fn insert_before(&self, parent: &MemoryNode, child: &MemoryNode, reference: Option<&MemoryNode>) -> Result<(), MemoryDomError> {
		let (parent, child) = (*parent, *child);
		let mut arena = self.arena.borrow_mut();
		if let Content::Text(_) = arena.node(parent).content {
			return Err(MemoryDomError::NotAnElement(parent));
		}
		if arena.is_ancestor_or_self(child, parent) {
			return Err(MemoryDomError::Cycle { parent, child });
		}
		if let Some(&reference) = reference {
			if arena.node(reference).parent != Some(parent) {
				return Err(MemoryDomError::NotAChild { parent, child: reference });
			}
		}
		arena.unlink(child);
		let index = match reference {
			Some(reference) => arena.node(parent).children.iter().position(|c| c == reference).ok_or(MemoryDomError::NotAChild { parent, child: *reference })?,
			None => arena.node(parent).children.len(),
		};
		arena.node_mut(parent).children.insert(index, child);
		arena.node_mut(child).parent = Some(parent);
		arena.log.push(Mutation::Insert {
			parent,
			child,
			before: reference.copied(),
		});
		Ok(())
	}

	fn remove_child(&self, parent: &MemoryNode, child: &MemoryNode) -> Result<(), MemoryDomError> {
		let mut arena = self.arena.borrow_mut();
		if arena.node(*child).parent != Some(*parent) {
			return Err(MemoryDomError::NotAChild { parent: *parent, child: *child });
		}
		arena.unlink(*child);
		arena.log.push(Mutation::Remove { parent: *parent, child: *child });
		Ok(())
	}

	fn parent_node(&self, node: &MemoryNode) -> Option<MemoryNode> {
		self.arena.borrow().node(*node).parent
	}

	fn next_sibling(&self, node: &MemoryNode) -> Option<MemoryNode> {
		let arena = self.arena.borrow();
		let parent = arena.node(*node).parent?;
		let siblings = &arena.node(parent).children;
		let index = siblings.iter().position(|c| c == node)?;
		siblings.get(index + 1).copied()
	}

	fn child_nodes(&self, node: &MemoryNode) -> Vec<MemoryNode> {
		self.children(*node)
	}

	fn inspect(&self, node: &MemoryNode) -> NodeInfo {
		match &self.arena.borrow().node(*node).content {
			Content::Element { tag, attributes, style, .. } => {
				let mut attributes = attributes.clone();
				if !style.is_empty() {
					attributes.push(("style".to_owned(), serialize_style(style)));
				}
				NodeInfo::Element { tag: tag.clone(), attributes }
			}
			Content::Text(text) => NodeInfo::Text(text.clone()),
		}
	}

	fn set_attribute(&self, element: &MemoryNode, name: &str, value: &str) -> Result<(), MemoryDomError> {
		let mut arena = self.arena.borrow_mut();
		let (attributes, style, _) = arena.element_mut(*element)?;
		if name == "style" {
			*style = parse_style(value);
		} else {
			match attributes.iter_mut().find(|(n, _)| n == name) {
				Some((_, existing)) => *existing = value.to_owned(),
				None => attributes.push((name.to_owned(), value.to_owned())),
			}
		}
		arena.log.push(Mutation::SetAttribute {
			element: *element,
			name: name.to_owned(),
			value: value.to_owned(),
		});
		Ok(())
	}

	fn remove_attribute(&self, element: &MemoryNode, name: &str) -> Result<(), MemoryDomError> {
		let mut arena = self.arena.borrow_mut();
		let (attributes, style, _) = arena.element_mut(*element)?;
		if name == "style" {
			style.clear();
		} else {
			attributes.retain(|(n, _)| n != name);
		}
		arena.log.push(Mutation::RemoveAttribute { element: *element, name: name.to_owned() });
		Ok(())
	}

	fn set_class_name(&self, element: &MemoryNode, class_name: &str) -> Result<(), MemoryDomError> {
		self.set_attribute(element, "class", class_name)
	}

	fn set_style_property(&self, element: &MemoryNode, name: &str, value: &str) -> Result<(), MemoryDomError> {
		let mut arena = self.arena.borrow_mut();
		let (_, style, _) = arena.element_mut(*element)?;
		match style.iter_mut().find(|(n, _)| n == name) {
			Some((_, existing)) => *existing = value.to_owned(),
			None => style.push((name.to_owned(), value.to_owned())),
		}
		arena.log.push(Mutation::SetStyle {
			element: *element,
			name: name.to_owned(),
			value: value.to_owned(),
		});
		Ok(())
	}

	fn clear_style(&self, element: &MemoryNode) -> Result<(), MemoryDomError> {
		let mut arena = self.arena.borrow_mut();
		let (_, style, _) = arena.element_mut(*element)?;
		style.clear();
		arena.log.push(Mutation::ClearStyle { element: *element });
		Ok(())
	}

	fn add_event_listener(&self, element: &MemoryNode, event: &str, handler: &EventHandler) -> Result<(), MemoryDomError> {
		let mut arena = self.arena.borrow_mut();
		let (_, _, listeners) = arena.element_mut(*element)?;
		// Like the DOM, adding the same listener twice is a no-op.
		if !listeners.iter().any(|(e, h)| e == event && h == handler) {
			listeners.push((event.to_owned(), handler.clone()));
		}
		arena.log.push(Mutation::AddListener { element: *element, event: event.to_owned() });
		Ok(())
	}

	fn remove_event_listener(&self, element: &MemoryNode, event: &str, handler: &EventHandler) -> Result<(), MemoryDomError> {
		let mut arena = self.arena.borrow_mut();
		let (_, _, listeners) = arena.element_mut(*element)?;
		listeners.retain(|(e, h)| !(e == event && h == handler));
		arena.log.push(Mutation::RemoveListener { element: *element, event: event.to_owned() });
		Ok(())
	}
}
