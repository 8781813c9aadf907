//! Domain types for the module registry.

pub mod descriptor;
pub mod schema;

pub use descriptor::{CodeReference, ModuleDescriptor, ModuleId};
pub use schema::{SchemaIncompatibility, StorageSchema};
