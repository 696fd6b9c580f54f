//! Binding graph: contents, bindings, their state and node sides, and
//! loop contexts.

pub mod binding;
pub mod content;
pub mod loop_context;
pub mod node_kind;
pub mod state_binding;

pub use binding::{Binding, BindingSource};
pub use content::BindContent;
pub use loop_context::LoopContext;
pub use node_kind::{BindingNodeKind, ForContents, IfContents};
pub use state_binding::{BindingState, BindingStateIndex};
