//! State schema and access layer.
//!
//! User state lives behind a [`StateClass`] schema: initial data,
//! computed accessors, actions and lifecycle hooks. All reads and writes
//! flow through a [`StateAccess`] handle, the engine's stand-in for a
//! property-intercepting proxy.

pub mod access;
pub mod class;

pub use access::{AccessMode, StateAccess};
pub use class::{Accessor, ActionFn, GetterFn, LifecycleFn, SetterFn, StateClass, UpdatedFn};
