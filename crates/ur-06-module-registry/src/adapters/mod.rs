//! Adapters for the registry ports.

pub mod static_loader;

pub use static_loader::StaticModuleLoader;
