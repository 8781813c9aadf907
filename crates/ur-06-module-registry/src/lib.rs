//! # Module Registry (Component 6)
//!
//! Tracks which implementation module serves dispatched calls and swaps it
//! without losing or corrupting application state.
//!
//! ## Architecture
//!
//! ```text
//! ModuleRegistry ──► ModuleLoader (port) ──► Arc<dyn Module>
//!       │
//!       └─► __registry namespace: count, descriptor/<i>, active
//!
//! Module::call(ctx, call)
//!       └─► ModuleContext: app namespace, schema-checked keys only
//! ```
//!
//! ## Upgrade Invariants
//!
//! | Invariant | Enforcement |
//! |-----------|-------------|
//! | Authorized swaps only | `module.upgrade` authorization or a consumed time-lock |
//! | Schema commitment | declared hash must equal the recomputed hash |
//! | Additive evolution | new schema keeps every key at the same type |
//! | No partial upgrade | validation first, then one atomic write |
//! | Unique module ids | ids are never reused, retired ones included |

pub mod adapters;
pub mod context;
pub mod domain;
pub mod errors;
pub mod ports;
pub mod registry;

pub use adapters::StaticModuleLoader;
pub use context::ModuleContext;
pub use domain::{CodeReference, ModuleDescriptor, ModuleId, SchemaIncompatibility, StorageSchema};
pub use errors::{LoadError, ModuleError, RegistryError};
pub use ports::{CallForwarder, Module, ModuleCall, ModuleLoader};
pub use registry::{ModuleRegistry, ResolvedModule};

/// Component identifier.
pub const COMPONENT_ID: u8 = 6;

/// Component name.
pub const COMPONENT_NAME: &str = "Module Registry";
