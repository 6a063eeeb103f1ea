//! The browser backend: a [`Document`] over [`web_sys`] and a scheduler that flushes on `queueMicrotask`.

use crate::{
	document::{Document, NodeInfo},
	props::{Event, EventHandler},
	root::Root,
	scheduler::Scheduler,
};
use core::{
	cell::{Cell, RefCell},
	fmt::{self, Debug, Formatter},
};
use hashbrown::HashMap;
use js_sys::Function;
use std::rc::{Rc, Weak};
use tracing::{error, instrument, trace, trace_span, warn};
use wasm_bindgen::{closure::Closure, JsCast, JsValue};
use web_sys::{window, Element, HtmlElement, Node, Text};

type ListenerClosure = Closure<dyn Fn(web_sys::Event)>;

/// One shared JavaScript closure per [`EventHandler`], counted by the element/event pairs it is bound to.
///
/// Unused closures stay alive until [`ListenerTable::free_unused`]. A listener may still be running when its last
/// binding goes away.
#[derive(Default)]
struct ListenerTable(HashMap<EventHandler, (u16, ListenerClosure)>);

impl ListenerTable {
	fn acquire(&mut self, handler: &EventHandler) -> Result<&ListenerClosure, JsValue> {
		let (count, closure) = self.0.entry(handler.clone()).or_insert_with(|| (0, listener_closure(handler)));
		*count = count
			.checked_add(1)
			.ok_or_else(|| JsValue::from_str("fiber-dom: Too many (more than 65k) active references to the same handler."))?;
		Ok(closure)
	}

	fn get(&self, handler: &EventHandler) -> Option<&ListenerClosure> {
		self.0.get(handler).map(|(_, closure)| closure)
	}

	fn release(&mut self, handler: &EventHandler) {
		match self.0.get_mut(handler) {
			Some((count, _)) if *count > 0 => *count -= 1,
			Some(_) => error!("Listener reference count underflow."),
			None => warn!("Released a listener that was never acquired."),
		}
	}

	/// Returns how many closures were dropped.
	fn free_unused(&mut self) -> usize {
		self.0.drain_filter(|_, (count, _)| *count == 0).count()
	}

	fn len(&self) -> usize {
		self.0.len()
	}
}

fn listener_closure(handler: &EventHandler) -> ListenerClosure {
	let handler = handler.clone();
	Closure::wrap(Box::new(move |event: web_sys::Event| {
		let span = trace_span!("Handling event", kind = &*event.type_());
		let _enter = span.enter();
		handler.call(&Event::with_raw(event.type_(), event));
	}) as Box<dyn Fn(web_sys::Event)>)
}

/// A [`Document`] backed by a live [`web_sys::Document`].
///
/// Each distinct [`EventHandler`] is bound through one shared JavaScript closure, reference-counted across all
/// elements it is attached to. Closures whose count dropped to zero are freed by
/// [`WebDocument::free_unused_listeners`], which the [`MicrotaskScheduler`] calls after each flush.
pub struct WebDocument {
	document: web_sys::Document,
	listeners: RefCell<ListenerTable>,
}

impl WebDocument {
	#[must_use]
	pub fn new(document: web_sys::Document) -> Self {
		Self {
			document,
			listeners: RefCell::default(),
		}
	}

	#[must_use]
	pub fn document(&self) -> &web_sys::Document {
		&self.document
	}

	/// Drops the closures of handlers that aren't attached anywhere anymore. Returns how many were dropped.
	///
	/// Don't call this from inside an event listener.
	pub fn free_unused_listeners(&self) -> usize {
		let mut listeners = self.listeners.borrow_mut();
		let freed = listeners.free_unused();
		trace!("Freed {} event listener(s), {} remain.", freed, listeners.len());
		freed
	}

	/// How many distinct handlers currently have a JavaScript closure, including unused ones not freed yet.
	#[must_use]
	pub fn listener_closure_count(&self) -> usize {
		self.listeners.borrow().len()
	}
}

impl Debug for WebDocument {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		f.debug_struct("WebDocument").field("listeners", &self.listeners.borrow().len()).finish()
	}
}

fn as_element(node: &Node) -> Result<&Element, JsValue> {
	node.dyn_ref::<Element>().ok_or_else(|| JsValue::from_str("fiber-dom: Expected an element."))
}

fn as_html_element(node: &Node) -> Result<&HtmlElement, JsValue> {
	node.dyn_ref::<HtmlElement>().ok_or_else(|| JsValue::from_str("fiber-dom: Expected an HTML element (for inline style)."))
}

impl Document for WebDocument {
	type Node = Node;
	type Error = JsValue;

	fn create_element(&self, tag: &str) -> Result<Node, JsValue> {
		self.document.create_element(tag).map(Into::into)
	}

	fn create_text_node(&self, text: &str) -> Node {
		self.document.create_text_node(text).into()
	}

	fn set_text(&self, text_node: &Node, text: &str) {
		text_node.set_text_content(Some(text));
	}

	fn insert_before(&self, parent: &Node, child: &Node, reference: Option<&Node>) -> Result<(), JsValue> {
		parent.insert_before(child, reference).map(drop)
	}

	fn remove_child(&self, parent: &Node, child: &Node) -> Result<(), JsValue> {
		parent.remove_child(child).map(drop)
	}

	fn parent_node(&self, node: &Node) -> Option<Node> {
		node.parent_node()
	}

	fn next_sibling(&self, node: &Node) -> Option<Node> {
		node.next_sibling()
	}

	fn child_nodes(&self, node: &Node) -> Vec<Node> {
		let child_nodes = node.child_nodes();
		(0..child_nodes.length()).filter_map(|i| child_nodes.item(i)).collect()
	}

	fn inspect(&self, node: &Node) -> NodeInfo {
		if let Some(element) = node.dyn_ref::<Element>() {
			let attributes = element.attributes();
			NodeInfo::Element {
				tag: element.local_name(),
				attributes: (0..attributes.length())
					.filter_map(|i| attributes.item(i))
					.map(|attribute| (attribute.name(), attribute.value()))
					.collect(),
			}
		} else if let Some(text) = node.dyn_ref::<Text>() {
			NodeInfo::Text(text.data())
		} else {
			NodeInfo::Other
		}
	}

	fn set_attribute(&self, element: &Node, name: &str, value: &str) -> Result<(), JsValue> {
		as_element(element)?.set_attribute(name, value)
	}

	fn remove_attribute(&self, element: &Node, name: &str) -> Result<(), JsValue> {
		as_element(element)?.remove_attribute(name)
	}

	fn set_class_name(&self, element: &Node, class_name: &str) -> Result<(), JsValue> {
		as_element(element)?.set_class_name(class_name);
		Ok(())
	}

	fn set_style_property(&self, element: &Node, name: &str, value: &str) -> Result<(), JsValue> {
		as_html_element(element)?.style().set_property(name, value)
	}

	fn clear_style(&self, element: &Node) -> Result<(), JsValue> {
		as_html_element(element)?.style().set_css_text("");
		Ok(())
	}

	#[instrument(skip(handler))]
	fn add_event_listener(&self, element: &Node, event: &str, handler: &EventHandler) -> Result<(), JsValue> {
		let mut listeners = self.listeners.borrow_mut();
		let closure = listeners.acquire(handler)?;
		let result = element.add_event_listener_with_callback(event, closure.as_ref().unchecked_ref::<Function>());
		if result.is_err() {
			listeners.release(handler);
		}
		result
	}

	#[instrument(skip(handler))]
	fn remove_event_listener(&self, element: &Node, event: &str, handler: &EventHandler) -> Result<(), JsValue> {
		let mut listeners = self.listeners.borrow_mut();
		let result = match listeners.get(handler) {
			Some(closure) => element.remove_event_listener_with_callback(event, closure.as_ref().unchecked_ref::<Function>()),
			None => {
				warn!("Tried to remove a listener that was never added.");
				return Ok(());
			}
		};
		listeners.release(handler);
		result
	}
}

/// Flushes a [`Root`] in a microtask whenever an update is scheduled.
///
/// Requests made while a flush is already queued share it.
#[derive(Default)]
pub struct MicrotaskScheduler {
	root: RefCell<Weak<RefCell<Root<WebDocument>>>>,
	queued: Rc<Cell<bool>>,
}

impl Scheduler for MicrotaskScheduler {
	fn schedule(&self) {
		if self.queued.replace(true) {
			return trace!("Flush already queued.");
		}

		queue_flush(self.root.borrow().clone(), Rc::clone(&self.queued));
	}
}

type WeakRoot = Weak<RefCell<Root<WebDocument>>>;

fn queue_flush(root: WeakRoot, queued: Rc<Cell<bool>>) {
	match window() {
		Some(window) => window.queue_microtask(Closure::once_into_js(move || flush(root, queued)).unchecked_ref::<Function>()),
		None => {
			queued.set(false);
			error!("No window to queue a microtask on.");
		}
	}
}

/// Flushes `root` unless it's borrowed. Then the flush stays queued and is retried in a timer task, which also
/// covers a borrow held across an `await`.
fn flush(root: WeakRoot, queued: Rc<Cell<bool>>) {
	let strong = match root.upgrade() {
		Some(strong) => strong,
		None => {
			queued.set(false);
			return trace!("Root was dropped before the flush.");
		}
	};
	let mut borrowed = match strong.try_borrow_mut() {
		Ok(borrowed) => borrowed,
		Err(_) => {
			warn!("Root is borrowed during its flush. Retrying in a new task.");
			return retry_flush(root, queued);
		}
	};
	queued.set(false);
	let rendered = borrowed.flush();
	trace!("Re-rendered {} component(s).", rendered);
	borrowed.document().free_unused_listeners();
}

fn retry_flush(root: WeakRoot, queued: Rc<Cell<bool>>) {
	let result = match window() {
		Some(window) => {
			let queued = Rc::clone(&queued);
			window.set_timeout_with_callback(Closure::once_into_js(move || flush(root, queued)).unchecked_ref::<Function>())
		}
		None => Err(JsValue::from_str("fiber-dom: No window.")),
	};
	if let Err(error) = result {
		queued.set(false);
		error!("Failed to queue the flush retry: {:?}", error);
	}
}

/// Creates a [`Root`] for `container` whose updates flush automatically in a microtask.
#[must_use]
pub fn mount(document: web_sys::Document, container: &Element) -> Rc<RefCell<Root<WebDocument>>> {
	let scheduler = Rc::new(MicrotaskScheduler::default());
	let root = Rc::new(RefCell::new(Root::new(WebDocument::new(document), container.clone().into(), scheduler.clone())));
	*scheduler.root.borrow_mut() = Rc::downgrade(&root);
	root
}
