//! # Upgradeable Runtime
//!
//! Composes the storage facade, dispatch guard, access controller, phase
//! machine, commit-reveal oracles and module registry into one dispatch
//! pipeline.
//!
//! ## Architectural Patterns
//!
//! - **Hexagonal Architecture**: clock, entropy, change sink, slot store and
//!   module loader are ports; adapters are injected through the builder.
//! - **Single owner of state**: the storage facade holds everything; the
//!   other components are stateless logic layers over it.
//!
//! ## Usage
//!
//! ```rust,ignore
//! let runtime = RuntimeBuilder::new(RuntimeConfig::from_env()?)
//!     .loader(Arc::new(loader))
//!     .genesis_module(ModuleDescriptor::new("vault-v1", "code://vault-v1", schema))
//!     .build(owner)?;
//! runtime.invoke(user, OperationId::new("vault.deposit"), amount)?;
//! ```

#![warn(missing_docs)]

pub mod adapters;
pub mod builder;
pub mod config;
pub mod errors;
pub mod runtime;

pub use adapters::{BroadcastSink, MemorySink, TracingSink};
pub use builder::RuntimeBuilder;
pub use config::{ConfigError, RuntimeConfig};
pub use errors::RuntimeError;
pub use runtime::Runtime;
