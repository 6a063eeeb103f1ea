//! Server-side rendering to an HTML string.

use crate::{
	element::{flatten, Element, ElementKind, Node},
	fiber::FiberId,
	hooks::Hooks,
	props::{attribute_name, style_text, Prop, Props},
	root::RootOptions,
};
use std::rc::Weak;
use tracing::{error, trace_span};

const VOID_ELEMENTS: &[&str] = &[
	"area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param", "source", "track", "wbr",
];

/// Renders `node` to HTML.
///
/// Components render once with a detached hook store: their effects never run and their state setters do nothing.
/// Event handlers, refs and opaque data are skipped, `false` and null properties are omitted and `true` renders as a
/// bare attribute.
///
/// # Panics
///
/// Iff a component panics or misuses hooks.
#[must_use]
pub fn render_to_string(node: &Node) -> String {
	let mut html = String::new();
	write_node(node, &mut html, RootOptions::default().depth_limit);
	html
}

fn write_node(node: &Node, html: &mut String, depth_limit: usize) {
	if depth_limit == 0 {
		return error!("Depth limit reached");
	}
	match node {
		Node::Null | Node::Bool(_) => (),
		Node::Text(_) | Node::Number(_) => {
			if let Some(text) = node.text() {
				escape_into(&text, false, html);
			}
		}
		Node::List(_) => {
			for child in flatten(node) {
				write_node(&child, html, depth_limit - 1);
			}
		}
		Node::Element(element) => write_element(element, html, depth_limit),
	}
}

fn write_element(element: &Element, html: &mut String, depth_limit: usize) {
	match &element.kind {
		ElementKind::Fragment => {
			for child in element.props.child_nodes() {
				write_node(&child, html, depth_limit - 1);
			}
		}
		ElementKind::Component(component) => {
			let span = trace_span!("Rendering component to string", component = component.name());
			let _enter = span.enter();

			let (mut slots, mut effects) = (Vec::new(), Vec::new());
			let mut hooks = Hooks::new(FiberId::DETACHED, component.name(), &mut slots, true, Weak::new(), &mut effects);
			let rendered = component.call(&mut hooks, &element.props);
			hooks.finish();
			write_node(&rendered, html, depth_limit - 1);
		}
		ElementKind::Tag(tag) => {
			html.push('<');
			html.push_str(tag);
			write_attributes(&element.props, html);
			if VOID_ELEMENTS.contains(&&**tag) {
				html.push_str("/>");
				return;
			}
			html.push('>');
			for child in element.props.child_nodes() {
				write_node(&child, html, depth_limit - 1);
			}
			html.push_str("</");
			html.push_str(tag);
			html.push('>');
		}
	}
}

fn write_attributes(props: &Props, html: &mut String) {
	for (name, value) in props.iter() {
		let value = match value {
			Prop::Null | Prop::Bool(false) | Prop::Handler(_) | Prop::Ref(_) | Prop::Data(_) => continue,
			Prop::Bool(true) => None,
			Prop::Str(text) => Some(text.to_string()),
			Prop::Style(entries) => Some(style_text(entries)),
			Prop::Number(_) => value.to_attribute_value().map(|text| text.into_owned()),
		};
		html.push(' ');
		html.push_str(attribute_name(name));
		if let Some(value) = value {
			html.push_str("=\"");
			escape_into(&value, true, html);
			html.push('"');
		}
	}
}

fn escape_into(text: &str, attribute: bool, html: &mut String) {
	for c in text.chars() {
		match c {
			'&' => html.push_str("&amp;"),
			'<' => html.push_str("&lt;"),
			'>' => html.push_str("&gt;"),
			'"' if attribute => html.push_str("&quot;"),
			c => html.push(c),
		}
	}
}
