//! Path model: canonical dotted/wildcard patterns, concrete access
//! strings, the per-component path tree and registries.

pub mod info;
pub mod manager;
pub mod node;
pub mod resolved;

pub use info::{get_structured_path_info, StructuredPathInfo, MAX_WILDCARDS};
pub use manager::PathManager;
pub use node::PathNode;
pub use resolved::{get_resolved_path_info, ResolvedPathInfo, WildcardType};
