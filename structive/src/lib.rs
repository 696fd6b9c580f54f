//! Structive core reactive engine.
//!
//! A declarative template plus a plain state tree become a live view over
//! the `structive-dom` document: writes to state paths propagate through
//! a dependency graph to the bindings that depend on them, list mutations
//! reconcile per-row identity, and nested loops expose their indices to
//! inner bindings.

pub mod binding;
pub mod binding_text;
pub mod component;
pub mod config;
pub mod diagnostics;
pub mod error;
pub mod filter;
pub mod harness;
pub mod list_index;
pub mod path;
pub mod registry;
pub mod renderer;
pub mod stamp;
pub mod state;
pub mod state_ref;
pub mod template;
pub mod updater;
pub mod value;

pub use structive_dom;

pub use component::ComponentEngine;
pub use config::{ComponentConfig, ShadowRootMode};
pub use error::{ErrorCode, Severity, StructiveError};
pub use harness::{ComponentHandle, TestHost};
pub use list_index::ListIndex;
pub use path::{get_resolved_path_info, get_structured_path_info, StructuredPathInfo};
pub use state::{StateAccess, StateClass};
pub use state_ref::{get_state_property_ref, StatePropertyRef};
pub use template::{Template, TemplateNode};
pub use value::Value;
