//! Renderer-agnostic document tree for the Structive engine.
//!
//! The engine mutates this tree the way it would mutate a live DOM:
//! nodes keep their identity across reorders, attributes and properties
//! are separate namespaces, and synthetic events bubble to the root.

pub mod document;
pub mod event;

pub use document::{Document, NodeId, NodeKind, PropertyValue};
pub use event::{dispatch_event, Event, EventListener};
