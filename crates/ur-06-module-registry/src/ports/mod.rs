//! # Ports
//!
//! - **Driven**: `ModuleLoader` resolves code references.
//! - **Plug-in**: `Module` is implemented by application code.
//! - **Callback**: `CallForwarder` lets a module call back into dispatch.

pub mod loader;
pub mod module;

pub use loader::ModuleLoader;
pub use module::{CallForwarder, Module, ModuleCall};
