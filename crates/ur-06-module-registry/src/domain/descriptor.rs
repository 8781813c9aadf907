//! # Module Descriptors

use crate::domain::schema::StorageSchema;
use serde::{Deserialize, Serialize};
use shared_types::{keccak256_parts, Hash, Tick};
use std::fmt;

/// Name of an implementation module (`vault-v2`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ModuleId(pub String);

impl fmt::Display for ModuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ModuleId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

/// Opaque handle resolved by the module loader.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CodeReference(pub String);

impl fmt::Display for CodeReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for CodeReference {
    fn from(reference: &str) -> Self {
        Self(reference.to_string())
    }
}

/// An implementation module, proposed or activated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleDescriptor {
    /// Unique module name.
    pub module_id: ModuleId,
    /// Code handle for the loader.
    pub code_reference: CodeReference,
    /// Commitment to `schema`.
    pub storage_schema_hash: Hash,
    /// Declared application keys.
    pub schema: StorageSchema,
    /// Set when activated.
    pub activated_at: Option<Tick>,
    /// Set when replaced.
    pub retired_at: Option<Tick>,
}

impl ModuleDescriptor {
    /// Proposal whose schema hash is computed from `schema`.
    #[must_use]
    pub fn new(
        module_id: impl Into<ModuleId>,
        code_reference: impl Into<CodeReference>,
        schema: StorageSchema,
    ) -> Self {
        let storage_schema_hash = schema.hash();
        Self::declared(module_id, code_reference, schema, storage_schema_hash)
    }

    /// Proposal with an explicitly declared schema hash.
    #[must_use]
    pub fn declared(
        module_id: impl Into<ModuleId>,
        code_reference: impl Into<CodeReference>,
        schema: StorageSchema,
        storage_schema_hash: Hash,
    ) -> Self {
        Self {
            module_id: module_id.into(),
            code_reference: code_reference.into(),
            storage_schema_hash,
            schema,
            activated_at: None,
            retired_at: None,
        }
    }

    /// Binds a time-locked upgrade to this exact module: id, code, and
    /// schema hash.
    #[must_use]
    pub fn fingerprint(&self) -> Hash {
        keccak256_parts(&[
            self.module_id.0.as_bytes(),
            self.code_reference.0.as_bytes(),
            self.storage_schema_hash.as_bytes(),
        ])
    }

    /// Returns true if active (activated and not retired).
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.activated_at.is_some() && self.retired_at.is_none()
    }
}
