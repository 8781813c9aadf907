//! # Static Module Loader
//!
//! Serves modules compiled into the host binary, keyed by code reference.

use crate::domain::CodeReference;
use crate::errors::LoadError;
use crate::ports::{Module, ModuleLoader};
use std::collections::HashMap;
use std::sync::Arc;

/// In-process loader backed by a fixed table.
#[derive(Default, Clone)]
pub struct StaticModuleLoader {
    modules: HashMap<CodeReference, Arc<dyn Module>>,
}

impl std::fmt::Debug for StaticModuleLoader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut refs: Vec<_> = self.modules.keys().collect();
        refs.sort();
        f.debug_struct("StaticModuleLoader")
            .field("modules", &refs)
            .finish()
    }
}

impl StaticModuleLoader {
    /// Empty loader.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `module` under `reference`.
    #[must_use]
    pub fn with_module(mut self, reference: impl Into<CodeReference>, module: Arc<dyn Module>) -> Self {
        self.insert(reference, module);
        self
    }

    /// Adds or replaces `module` under `reference`.
    pub fn insert(&mut self, reference: impl Into<CodeReference>, module: Arc<dyn Module>) {
        self.modules.insert(reference.into(), module);
    }

    /// Number of registered modules.
    #[must_use]
    pub fn len(&self) -> usize {
        self.modules.len()
    }

    /// Returns true if empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }
}

impl ModuleLoader for StaticModuleLoader {
    fn load(&self, reference: &CodeReference) -> Result<Arc<dyn Module>, LoadError> {
        self.modules
            .get(reference)
            .cloned()
            .ok_or_else(|| LoadError(format!("unknown code reference {reference}")))
    }
}
