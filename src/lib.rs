#![doc(html_root_url = "https://docs.rs/fiber-dom/0.1.0")]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

//! An incremental DOM reconciler.
//!
//! Describe what should exist with [`Node`]s, then let a [`Root`] patch a live [`Document`] to match.
//! Keyed sibling groups keep node identity across reorders and move as few nodes as possible.
//! Function [`Component`]s keep state across renders through [`Hooks`].
//!
//! The reconciler doesn't know about any particular platform. [`MemoryDocument`] is a headless implementation
//! that logs every mutation; the `web` feature adds one over `web-sys`.

#[cfg(doctest)]
pub mod readme {
	doc_comment::doctest!("../README.md");
}

mod diff;
mod document;
mod element;
mod fiber;
mod hooks;
mod lis;
pub mod load;
pub mod memory;
mod properties;
mod props;
mod root;
mod scheduler;
mod ssr;

#[cfg(feature = "web")]
pub mod web;

pub use document::{Document, NodeInfo};
pub use element::{create_element, flatten, fragment, jsx, jsxs, Children, Component, Element, ElementKind, Key, Node};
pub use fiber::FiberId;
pub use hooks::{Cleanup, Dispatch, Hooks, StateSetter, Teardown};
pub use memory::{MemoryDocument, MemoryDomError, MemoryNode, Mutation};
pub use props::{attribute_name, css_property_name, event_name, format_number, Event, EventHandler, NodeRef, Prop, Props};
pub use root::{Root, RootOptions};
pub use scheduler::{ManualScheduler, Scheduler};
pub use ssr::render_to_string;

/// Text content and attribute values only show up in logs with the `dangerous-logging` feature.
#[cfg(feature = "dangerous-logging")]
pub(crate) fn redact(text: &str) -> &str {
	text
}

#[cfg(not(feature = "dangerous-logging"))]
pub(crate) fn redact(_: &str) -> &str {
	"<redacted>"
}
