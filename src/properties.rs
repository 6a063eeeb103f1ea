//! Applies the delta between two [`Props`] to one live element.

use crate::{
	document::Document,
	props::{attribute_name, css_property_name, event_name, EventHandler, Prop, Props},
	redact,
};
use hashbrown::HashMap;
use std::rc::Rc;
use tracing::{error, instrument, trace};

/// `listeners` tracks what is currently bound on `element`, by event name.
#[instrument(skip(document, listeners, old, new))]
pub(crate) fn patch_properties<D: Document>(document: &D, element: &D::Node, listeners: &mut HashMap<String, EventHandler>, old: &Props, new: &Props) {
	for (name, value) in old.iter() {
		if new.get(name).is_none() {
			revert(document, element, listeners, name, value);
		}
	}

	for (name, value) in new.iter() {
		let previous = old.get(name);
		if previous == Some(value) {
			trace!("{} unchanged.", name);
			continue;
		}
		apply(document, element, listeners, name, previous, value);
	}
}

/// Detaches everything tracked for an element that is being removed. Attributes are left as they are.
pub(crate) fn release<D: Document>(document: &D, element: &D::Node, listeners: HashMap<String, EventHandler>, props: &Props) {
	for (event, handler) in listeners {
		if let Err(error) = document.remove_event_listener(element, &event, &handler) {
			error!("Failed to remove {:?} listener: {:?}", event, error);
		}
	}
	if let Some(Prop::Ref(node_ref)) = props.get("ref") {
		node_ref.detach_from(element);
	}
}

fn revert<D: Document>(document: &D, element: &D::Node, listeners: &mut HashMap<String, EventHandler>, name: &str, value: &Prop) {
	let result = match (name, value) {
		("class" | "className", _) => document.set_class_name(element, ""),
		("style", Prop::Style(_)) => document.clear_style(element),
		("ref", Prop::Ref(node_ref)) => {
			node_ref.detach_from(element);
			Ok(())
		}
		(_, Prop::Data(_)) => Ok(()),
		(_, Prop::Handler(_)) => match event_name(name).and_then(|event| Some((listeners.remove(&event)?, event))) {
			Some((handler, event)) => document.remove_event_listener(element, &event, &handler),
			None => Ok(()),
		},
		_ => document.remove_attribute(element, attribute_name(name)),
	};
	if let Err(error) = result {
		error!("Failed to remove property {:?}: {:?}", name, error);
	}
}

fn apply<D: Document>(document: &D, element: &D::Node, listeners: &mut HashMap<String, EventHandler>, name: &str, previous: Option<&Prop>, value: &Prop) {
	let result = match (name, value) {
		("class" | "className", value) => document.set_class_name(element, &value.to_attribute_value().unwrap_or_default()),
		("style", Prop::Style(entries)) => set_style(document, element, entries),
		("ref", value) => {
			if let Some(Prop::Ref(previous)) = previous {
				previous.detach_from(element);
			}
			match value {
				Prop::Ref(node_ref) => node_ref.attach(element.clone()),
				_ => trace!("Ignoring non-ref `ref` value."),
			}
			Ok(())
		}
		(_, Prop::Data(_)) => {
			trace!("Skipping opaque data {:?}.", name);
			Ok(())
		}
		_ => match event_name(name) {
			Some(event) if matches!(value, Prop::Handler(_)) || listeners.contains_key(&event) => bind(document, element, listeners, name, event, value),
			_ => set_attribute(document, element, name, previous, value),
		},
	};
	if let Err(error) = result {
		error!("Failed to set property {:?} to {:?}: {:?}", name, redact(&format!("{:?}", value)), error);
	}
}

fn set_style<D: Document>(document: &D, element: &D::Node, entries: &[(Rc<str>, Rc<str>)]) -> Result<(), D::Error> {
	document.clear_style(element)?;
	for (property, value) in entries {
		document.set_style_property(element, &css_property_name(property), value)?;
	}
	Ok(())
}

/// Replaces the listener tracked for `event`. A value that isn't a handler falls back to an attribute.
fn bind<D: Document>(document: &D, element: &D::Node, listeners: &mut HashMap<String, EventHandler>, name: &str, event: String, value: &Prop) -> Result<(), D::Error> {
	if let Some(handler) = listeners.remove(&event) {
		document.remove_event_listener(element, &event, &handler)?;
	}
	match value {
		Prop::Handler(handler) => {
			document.add_event_listener(element, &event, handler)?;
			listeners.insert(event, handler.clone());
			Ok(())
		}
		value => set_attribute(document, element, name, None, value),
	}
}

fn set_attribute<D: Document>(document: &D, element: &D::Node, name: &str, previous: Option<&Prop>, value: &Prop) -> Result<(), D::Error> {
	if name == "style" {
		if let Some(Prop::Style(_)) = previous {
			document.clear_style(element)?;
		}
	}
	let name = attribute_name(name);
	match value.to_attribute_value() {
		Some(text) => document.set_attribute(element, name, &text),
		None => document.remove_attribute(element, name),
	}
}
