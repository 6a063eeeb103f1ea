//! Property values and the naming rules shared by the property patcher and [`render_to_string`](`crate::render_to_string`).

use crate::element::{Children, Key, Node};
use core::{
	any::Any,
	cell::RefCell,
	fmt::{self, Debug, Formatter},
	hash::{Hash, Hasher},
};
use std::{borrow::Cow, rc::Rc};

/// Ordered mapping of property names to values, plus children and an optional key.
#[derive(Clone, Default)]
pub struct Props {
	entries: Vec<(Rc<str>, Prop)>,
	children: Option<Children>,
	key: Option<Key>,
}

impl Props {
	#[must_use]
	pub fn new() -> Self {
		Self::default()
	}

	/// Sets `name` to `value`, replacing an earlier value in place.
	#[must_use]
	pub fn with(mut self, name: impl Into<Rc<str>>, value: impl Into<Prop>) -> Self {
		self.set(name, value);
		self
	}

	pub fn set(&mut self, name: impl Into<Rc<str>>, value: impl Into<Prop>) {
		let name = name.into();
		let value = value.into();
		match self.entries.iter_mut().find(|(existing, _)| *existing == name) {
			Some((_, existing)) => *existing = value,
			None => self.entries.push((name, value)),
		}
	}

	/// Binds `handler` to the event `event` (stored as `on{event}`).
	#[must_use]
	pub fn on(self, event: &str, handler: impl Into<EventHandler>) -> Self {
		self.with(format!("on{}", event), Prop::Handler(handler.into()))
	}

	#[must_use]
	pub fn class(self, class_name: impl Into<Rc<str>>) -> Self {
		self.with("class", Prop::Str(class_name.into()))
	}

	#[must_use]
	pub fn style<N, V>(self, entries: impl IntoIterator<Item = (N, V)>) -> Self
	where
		N: Into<Rc<str>>,
		V: Into<Rc<str>>,
	{
		self.with("style", Prop::Style(entries.into_iter().map(|(name, value)| (name.into(), value.into())).collect()))
	}

	#[must_use]
	pub fn node_ref(self, node_ref: &NodeRef) -> Self {
		self.with("ref", Prop::Ref(node_ref.clone()))
	}

	#[must_use]
	pub fn data<T: Any>(self, name: impl Into<Rc<str>>, value: T) -> Self {
		self.with(name, Prop::Data(Rc::new(value)))
	}

	#[must_use]
	pub fn children(mut self, children: impl Into<Node>) -> Self {
		self.set_children(match children.into() {
			Node::List(many) => Children::Many(many),
			single => Children::Single(single),
		});
		self
	}

	#[must_use]
	pub fn key(mut self, key: impl Into<Key>) -> Self {
		self.key = Some(key.into());
		self
	}

	pub(crate) fn set_children(&mut self, children: Children) {
		self.children = Some(children);
	}

	pub(crate) fn take_key(&mut self) -> Option<Key> {
		self.key.take()
	}

	#[must_use]
	pub fn get(&self, name: &str) -> Option<&Prop> {
		self.entries.iter().find(|(existing, _)| &**existing == name).map(|(_, value)| value)
	}

	#[must_use]
	pub fn get_str(&self, name: &str) -> Option<&str> {
		match self.get(name)? {
			Prop::Str(value) => Some(value),
			_ => None,
		}
	}

	#[must_use]
	pub fn get_number(&self, name: &str) -> Option<f64> {
		match self.get(name)? {
			Prop::Number(value) => Some(*value),
			_ => None,
		}
	}

	/// Reads back a value stored with [`Props::data`].
	#[must_use]
	pub fn get_data<T: Any>(&self, name: &str) -> Option<&T> {
		match self.get(name)? {
			Prop::Data(value) => value.downcast_ref(),
			_ => None,
		}
	}

	#[must_use]
	pub fn get_children(&self) -> Option<&Children> {
		self.children.as_ref()
	}

	/// Normalized children, empty if there are none.
	#[must_use]
	pub fn child_nodes(&self) -> Vec<Node> {
		self.children.as_ref().map(Children::to_vec).unwrap_or_default()
	}

	pub fn iter(&self) -> impl Iterator<Item = (&str, &Prop)> {
		self.entries.iter().map(|(name, value)| (&**name, value))
	}

	#[must_use]
	pub fn len(&self) -> usize {
		self.entries.len()
	}

	#[must_use]
	pub fn is_empty(&self) -> bool {
		self.entries.is_empty()
	}
}

impl Debug for Props {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		f.debug_map().entries(self.entries.iter().map(|(name, value)| (name, value))).finish()
	}
}

/// A single property value.
#[derive(Clone)]
pub enum Prop {
	Null,
	Bool(bool),
	Str(Rc<str>),
	Number(f64),
	Style(Vec<(Rc<str>, Rc<str>)>),
	Handler(EventHandler),
	Ref(NodeRef),
	/// Opaque component data, compared by pointer and never written to the document.
	Data(Rc<dyn Any>),
}

impl Prop {
	/// The attribute value this property stringifies to, or [`None`] if it isn't written as an attribute.
	#[must_use]
	pub fn to_attribute_value(&self) -> Option<Cow<'_, str>> {
		match self {
			Prop::Null | Prop::Bool(false) | Prop::Handler(_) | Prop::Ref(_) | Prop::Data(_) => None,
			Prop::Bool(true) => Some(Cow::Borrowed("")),
			Prop::Str(value) => Some(Cow::Borrowed(value)),
			Prop::Number(number) => Some(Cow::Owned(format_number(*number))),
			Prop::Style(entries) => Some(Cow::Owned(style_text(entries))),
		}
	}
}

impl PartialEq for Prop {
	fn eq(&self, other: &Self) -> bool {
		match (self, other) {
			(Prop::Null, Prop::Null) => true,
			(Prop::Bool(a), Prop::Bool(b)) => a == b,
			(Prop::Str(a), Prop::Str(b)) => a == b,
			#[allow(clippy::float_cmp)]
			(Prop::Number(a), Prop::Number(b)) => a == b,
			(Prop::Style(a), Prop::Style(b)) => a == b,
			(Prop::Handler(a), Prop::Handler(b)) => a == b,
			(Prop::Ref(a), Prop::Ref(b)) => a == b,
			(Prop::Data(a), Prop::Data(b)) => Rc::ptr_eq(a, b),
			_ => false,
		}
	}
}

impl Debug for Prop {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		match self {
			Prop::Null => f.write_str("Null"),
			Prop::Bool(value) => f.debug_tuple("Bool").field(value).finish(),
			Prop::Str(value) => f.debug_tuple("Str").field(value).finish(),
			Prop::Number(value) => f.debug_tuple("Number").field(value).finish(),
			Prop::Style(entries) => f.debug_tuple("Style").field(entries).finish(),
			Prop::Handler(handler) => handler.fmt(f),
			Prop::Ref(node_ref) => node_ref.fmt(f),
			Prop::Data(_) => f.write_str("Data(..)"),
		}
	}
}

impl From<&str> for Prop {
	fn from(value: &str) -> Self {
		Prop::Str(value.into())
	}
}

impl From<String> for Prop {
	fn from(value: String) -> Self {
		Prop::Str(value.into())
	}
}

impl From<Rc<str>> for Prop {
	fn from(value: Rc<str>) -> Self {
		Prop::Str(value)
	}
}

impl From<bool> for Prop {
	fn from(value: bool) -> Self {
		Prop::Bool(value)
	}
}

macro_rules! prop_from_number {
	($($number:ty),*$(,)?) => {$(
		impl From<$number> for Prop {
			fn from(number: $number) -> Self {
				Prop::Number(number.into())
			}
		}
	)*};
}
prop_from_number!(f64, f32, i8, i16, i32, u8, u16, u32);

impl From<EventHandler> for Prop {
	fn from(handler: EventHandler) -> Self {
		Prop::Handler(handler)
	}
}

impl From<NodeRef> for Prop {
	fn from(node_ref: NodeRef) -> Self {
		Prop::Ref(node_ref)
	}
}

impl<T: Into<Prop>> From<Option<T>> for Prop {
	fn from(value: Option<T>) -> Self {
		value.map_or(Prop::Null, Into::into)
	}
}

/// An event as seen by an [`EventHandler`].
#[derive(Clone)]
pub struct Event {
	kind: Rc<str>,
	raw: Option<Rc<dyn Any>>,
}

impl Event {
	#[must_use]
	pub fn new(kind: impl Into<Rc<str>>) -> Self {
		Self { kind: kind.into(), raw: None }
	}

	/// An event that carries the platform's own event object.
	#[must_use]
	pub fn with_raw<T: Any>(kind: impl Into<Rc<str>>, raw: T) -> Self {
		Self {
			kind: kind.into(),
			raw: Some(Rc::new(raw)),
		}
	}

	/// The event type, for example `"click"`.
	#[must_use]
	pub fn kind(&self) -> &str {
		&self.kind
	}

	#[must_use]
	pub fn raw<T: Any>(&self) -> Option<&T> {
		self.raw.as_deref()?.downcast_ref()
	}
}

impl Debug for Event {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		f.debug_struct("Event").field("kind", &self.kind).field("raw", &self.raw.is_some()).finish()
	}
}

/// A shared event listener.
///
/// Closures can't be compared, so two handlers are equal only if they are clones of each other.
#[derive(Clone)]
pub struct EventHandler(Rc<dyn Fn(&Event)>);

impl EventHandler {
	pub fn new(handler: impl Fn(&Event) + 'static) -> Self {
		Self(Rc::new(handler))
	}

	pub fn call(&self, event: &Event) {
		(self.0)(event)
	}

	fn address(&self) -> *const () {
		Rc::as_ptr(&self.0).cast()
	}
}

impl<F: Fn(&Event) + 'static> From<F> for EventHandler {
	fn from(handler: F) -> Self {
		Self::new(handler)
	}
}

impl PartialEq for EventHandler {
	fn eq(&self, other: &Self) -> bool {
		self.address() == other.address()
	}
}

impl Eq for EventHandler {}

impl Hash for EventHandler {
	fn hash<H: Hasher>(&self, state: &mut H) {
		self.address().hash(state)
	}
}

impl Debug for EventHandler {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		f.debug_tuple("EventHandler").field(&self.address()).finish()
	}
}

/// A mutable `current` slot that receives the platform node of the element it is attached to as `ref`.
#[derive(Clone, Default)]
pub struct NodeRef(Rc<RefCell<Option<Box<dyn Any>>>>);

impl NodeRef {
	#[must_use]
	pub fn new() -> Self {
		Self::default()
	}

	/// The current node, if one of type `N` is attached.
	#[must_use]
	pub fn get<N: Any + Clone>(&self) -> Option<N> {
		self.0.borrow().as_ref()?.downcast_ref::<N>().cloned()
	}

	#[must_use]
	pub fn is_attached(&self) -> bool {
		self.0.borrow().is_some()
	}

	pub(crate) fn attach<N: Any>(&self, node: N) {
		*self.0.borrow_mut() = Some(Box::new(node));
	}

	/// Detaches only if `node` is the current node, so a ref that already moved on to another element is kept.
	pub(crate) fn detach_from<N: Any + PartialEq>(&self, node: &N) {
		let mut current = self.0.borrow_mut();
		if current.as_ref().and_then(|current| current.downcast_ref::<N>()) == Some(node) {
			*current = None;
		}
	}
}

impl PartialEq for NodeRef {
	fn eq(&self, other: &Self) -> bool {
		Rc::ptr_eq(&self.0, &other.0)
	}
}

impl Debug for NodeRef {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		f.debug_tuple("NodeRef").field(&self.is_attached()).finish()
	}
}

/// Maps a property name to the attribute it is written as.
#[must_use]
pub fn attribute_name(name: &str) -> &str {
	match name {
		"className" => "class",
		"htmlFor" => "for",
		"httpEquiv" => "http-equiv",
		"acceptCharset" => "accept-charset",
		other => other,
	}
}

/// `onClick` → `click`. [`None`] if `name` doesn't name an event.
#[must_use]
pub fn event_name(name: &str) -> Option<String> {
	match name.strip_prefix("on") {
		Some(event) if !event.is_empty() => Some(event.to_ascii_lowercase()),
		_ => None,
	}
}

/// `backgroundColor` → `background-color`. Custom properties and names that are already kebab-case are kept.
#[must_use]
pub fn css_property_name(name: &str) -> Cow<'_, str> {
	if name.starts_with("--") || !name.bytes().any(|b| b.is_ascii_uppercase()) {
		return Cow::Borrowed(name);
	}
	let mut kebab = String::with_capacity(name.len() + 4);
	for c in name.chars() {
		if c.is_ascii_uppercase() {
			kebab.push('-');
			kebab.push(c.to_ascii_lowercase());
		} else {
			kebab.push(c);
		}
	}
	Cow::Owned(kebab)
}

pub(crate) fn style_text(entries: &[(Rc<str>, Rc<str>)]) -> String {
	entries.iter().map(|(name, value)| format!("{}:{};", css_property_name(name), value)).collect()
}

/// Formats a number the way it would appear in a document.
#[must_use]
pub fn format_number(number: f64) -> String {
	if number.is_nan() {
		"NaN".to_owned()
	} else if number.is_infinite() {
		let infinity = if number > 0. { "Infinity" } else { "-Infinity" };
		infinity.to_owned()
	} else {
		number.to_string()
	}
}
