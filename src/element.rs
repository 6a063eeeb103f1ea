//! Immutable descriptions of what should exist in the document.

use crate::{hooks::Hooks, props::Props};
use core::{
	any::{type_name, TypeId},
	fmt::{self, Debug, Formatter},
};
use std::rc::Rc;

/// A renderable value.
///
/// [`Node::Null`] and [`Node::Bool`] render nothing, [`Node::List`] is a nested children array that is spliced
/// into its surrounding sibling group during normalization.
#[derive(Clone, Debug)]
pub enum Node {
	Null,
	Bool(bool),
	Text(Rc<str>),
	Number(f64),
	Element(Rc<Element>),
	List(Vec<Node>),
}

impl Node {
	/// The identity key of this node, if it is an element that carries one.
	#[must_use]
	pub fn key(&self) -> Option<&Key> {
		match self {
			Node::Element(element) => element.key.as_ref(),
			_ => None,
		}
	}

	/// The text a primitive node renders as, or [`None`] for anything that isn't text or a number.
	#[must_use]
	pub fn text(&self) -> Option<Rc<str>> {
		match self {
			Node::Text(text) => Some(Rc::clone(text)),
			Node::Number(number) => Some(crate::props::format_number(*number).into()),
			_ => None,
		}
	}

	/// Whether this node renders nothing on its own.
	#[must_use]
	pub fn is_empty(&self) -> bool {
		matches!(self, Node::Null | Node::Bool(_))
	}
}

impl Default for Node {
	fn default() -> Self {
		Node::Null
	}
}

impl From<()> for Node {
	fn from((): ()) -> Self {
		Node::Null
	}
}

impl From<bool> for Node {
	fn from(value: bool) -> Self {
		Node::Bool(value)
	}
}

impl From<&str> for Node {
	fn from(text: &str) -> Self {
		Node::Text(text.into())
	}
}

impl From<String> for Node {
	fn from(text: String) -> Self {
		Node::Text(text.into())
	}
}

impl From<Rc<str>> for Node {
	fn from(text: Rc<str>) -> Self {
		Node::Text(text)
	}
}

macro_rules! node_from_number {
	($($number:ty),*$(,)?) => {$(
		impl From<$number> for Node {
			fn from(number: $number) -> Self {
				Node::Number(number.into())
			}
		}
	)*};
}
node_from_number!(f64, f32, i8, i16, i32, u8, u16, u32);

impl From<Element> for Node {
	fn from(element: Element) -> Self {
		Node::Element(Rc::new(element))
	}
}

impl From<Rc<Element>> for Node {
	fn from(element: Rc<Element>) -> Self {
		Node::Element(element)
	}
}

impl From<Vec<Node>> for Node {
	fn from(nodes: Vec<Node>) -> Self {
		Node::List(nodes)
	}
}

impl<T: Into<Node>> From<Option<T>> for Node {
	fn from(node: Option<T>) -> Self {
		node.map_or(Node::Null, Into::into)
	}
}

impl FromIterator<Node> for Node {
	fn from_iter<I: IntoIterator<Item = Node>>(iter: I) -> Self {
		Node::List(iter.into_iter().collect())
	}
}

/// Description of a tag, component or fragment together with its props and identity key.
#[derive(Clone, Debug)]
pub struct Element {
	pub kind: ElementKind,
	pub props: Props,
	pub key: Option<Key>,
}

impl Element {
	/// Whether a fiber produced by `self` can be patched in place to match `other`.
	#[must_use]
	pub fn same_shape(&self, other: &Element) -> bool {
		self.kind.same_shape(&other.kind)
	}
}

/// The closed set of element shapes.
#[derive(Clone, Debug)]
pub enum ElementKind {
	Tag(Rc<str>),
	Component(Component),
	Fragment,
}

impl ElementKind {
	/// Same tag name, same component function or both fragments.
	#[must_use]
	pub fn same_shape(&self, other: &ElementKind) -> bool {
		match (self, other) {
			(ElementKind::Tag(a), ElementKind::Tag(b)) => a == b,
			(ElementKind::Component(a), ElementKind::Component(b)) => a.id == b.id,
			(ElementKind::Fragment, ElementKind::Fragment) => true,
			_ => false,
		}
	}
}

impl From<&str> for ElementKind {
	fn from(tag: &str) -> Self {
		ElementKind::Tag(tag.into())
	}
}

impl From<String> for ElementKind {
	fn from(tag: String) -> Self {
		ElementKind::Tag(tag.into())
	}
}

impl From<Component> for ElementKind {
	fn from(component: Component) -> Self {
		ElementKind::Component(component)
	}
}

type RenderFn = dyn Fn(&mut Hooks<'_>, &Props) -> Node;

/// A function component.
///
/// Two components have the same shape iff they were created from the same function type, which means the same
/// function item or the same closure expression. Re-creating a [`Component`] from the same function on every
/// render therefore patches instead of remounting.
#[derive(Clone)]
pub struct Component {
	id: TypeId,
	name: &'static str,
	render: Rc<RenderFn>,
}

impl Component {
	pub fn new<F>(render: F) -> Self
	where
		F: Fn(&mut Hooks<'_>, &Props) -> Node + 'static,
	{
		Self {
			id: TypeId::of::<F>(),
			name: type_name::<F>(),
			render: Rc::new(render),
		}
	}

	#[must_use]
	pub fn name(&self) -> &'static str {
		self.name
	}

	pub(crate) fn call(&self, hooks: &mut Hooks<'_>, props: &Props) -> Node {
		(self.render)(hooks, props)
	}
}

impl Debug for Component {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		f.debug_tuple("Component").field(&self.name).finish()
	}
}

/// Identity token of an element among its siblings.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Key(Rc<str>);

impl Key {
	#[must_use]
	pub fn as_str(&self) -> &str {
		&self.0
	}
}

impl fmt::Display for Key {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		f.write_str(&self.0)
	}
}

impl From<&str> for Key {
	fn from(key: &str) -> Self {
		Self(key.into())
	}
}

impl From<String> for Key {
	fn from(key: String) -> Self {
		Self(key.into())
	}
}

impl From<Rc<str>> for Key {
	fn from(key: Rc<str>) -> Self {
		Self(key)
	}
}

macro_rules! key_from_integer {
	($($integer:ty),*$(,)?) => {$(
		impl From<$integer> for Key {
			fn from(key: $integer) -> Self {
				Self(key.to_string().into())
			}
		}
	)*};
}
key_from_integer!(i8, i16, i32, i64, isize, u8, u16, u32, u64, usize);

/// The children stored on [`Props`].
///
/// A single child and a list of children are kept apart, matching how they were passed to [`create_element`].
#[derive(Clone, Debug)]
pub enum Children {
	Single(Node),
	Many(Vec<Node>),
}

impl Children {
	/// The normalized sibling list: nested lists spliced, [`Node::Null`] and [`Node::Bool`] dropped.
	#[must_use]
	pub fn to_vec(&self) -> Vec<Node> {
		let mut nodes = Vec::new();
		match self {
			Children::Single(node) => flatten_into(node, &mut nodes),
			Children::Many(many) => many.iter().for_each(|node| flatten_into(node, &mut nodes)),
		}
		nodes
	}
}

/// Normalizes `node` into a sibling list.
#[must_use]
pub fn flatten(node: &Node) -> Vec<Node> {
	let mut nodes = Vec::new();
	flatten_into(node, &mut nodes);
	nodes
}

fn flatten_into(node: &Node, nodes: &mut Vec<Node>) {
	match node {
		Node::Null | Node::Bool(_) => (),
		Node::List(list) => list.iter().for_each(|node| flatten_into(node, nodes)),
		node => nodes.push(node.clone()),
	}
}

/// Builds an element from a tag or component, its props and any number of children.
///
/// No children leave `props`' children as they are, one child is stored as [`Children::Single`] and more as
/// [`Children::Many`]. A key set on `props` is moved onto the element.
#[must_use]
pub fn create_element(kind: impl Into<ElementKind>, mut props: Props, mut children: Vec<Node>) -> Node {
	match children.len() {
		0 => (),
		1 => props.set_children(Children::Single(children.remove(0))),
		_ => props.set_children(Children::Many(children)),
	}
	let key = props.take_key();
	Node::Element(Rc::new(Element { kind: kind.into(), props, key }))
}

/// Builds an element whose children (if any) are already part of `props`.
#[must_use]
pub fn jsx(kind: impl Into<ElementKind>, mut props: Props, key: Option<Key>) -> Node {
	let key = key.or_else(|| props.take_key());
	Node::Element(Rc::new(Element { kind: kind.into(), props, key }))
}

/// [`jsx`] for elements with a static list of several children.
#[must_use]
pub fn jsxs(kind: impl Into<ElementKind>, props: Props, key: Option<Key>) -> Node {
	jsx(kind, props, key)
}

/// A fragment around `children`.
#[must_use]
pub fn fragment(children: Vec<Node>) -> Node {
	create_element(ElementKind::Fragment, Props::new(), children)
}
