//! Module loader port.

use crate::domain::CodeReference;
use crate::errors::LoadError;
use crate::ports::module::Module;
use std::sync::Arc;

/// Resolves an opaque code reference to executable module code.
pub trait ModuleLoader: Send + Sync {
    /// Loads the module behind `reference`.
    ///
    /// # Errors
    ///
    /// `LoadError` if the reference cannot be resolved.
    fn load(&self, reference: &CodeReference) -> Result<Arc<dyn Module>, LoadError>;
}
