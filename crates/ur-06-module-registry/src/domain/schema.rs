//! # Storage Schemas
//!
//! A module declares every application key it touches together with its
//! type. A new module is compatible with the active one when it keeps every
//! declared key at the same type; it may add keys but never drop or retype
//! one.

use serde::{Deserialize, Serialize};
use shared_types::{keccak256_parts, Hash};
use std::collections::BTreeMap;
use std::fmt;
use ur_01_storage_facade::TypeTag;

/// Declared application storage layout: key -> type.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageSchema(BTreeMap<String, TypeTag>);

/// Why a schema cannot replace another.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchemaIncompatibility {
    /// The declared schema does not hash to the descriptor's schema hash.
    HashMismatch {
        /// Hash carried by the descriptor.
        declared: Hash,
        /// Hash of the schema itself.
        computed: Hash,
    },
    /// A key of the active schema is missing.
    Removed {
        /// Missing key.
        key: String,
        /// Its type in the active schema.
        tag: TypeTag,
    },
    /// A key of the active schema changed type.
    Retyped {
        /// Key.
        key: String,
        /// Type in the active schema.
        from: TypeTag,
        /// Type in the new schema.
        to: TypeTag,
    },
}

impl fmt::Display for SchemaIncompatibility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::HashMismatch { declared, computed } => {
                write!(f, "schema hash {declared} does not match schema ({computed})")
            }
            Self::Removed { key, tag } => write!(f, "key {key} ({tag}) removed"),
            Self::Retyped { key, from, to } => write!(f, "key {key} retyped {from} -> {to}"),
        }
    }
}

impl StorageSchema {
    /// Empty schema.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `key` with `tag`.
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, tag: TypeTag) -> Self {
        self.0.insert(key.into(), tag);
        self
    }

    /// Declared type of `key`.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<TypeTag> {
        self.0.get(key).copied()
    }

    /// Declared keys, ordered.
    pub fn iter(&self) -> impl Iterator<Item = (&str, TypeTag)> {
        self.0.iter().map(|(k, t)| (k.as_str(), *t))
    }

    /// Number of declared keys.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true if no keys are declared.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Canonical hash over the ordered `(key, type)` pairs.
    #[must_use]
    pub fn hash(&self) -> Hash {
        let tags: Vec<String> = self.0.values().map(ToString::to_string).collect();
        let mut parts: Vec<&[u8]> = Vec::with_capacity(self.0.len() * 2);
        for (key, tag) in self.0.keys().zip(&tags) {
            parts.push(key.as_bytes());
            parts.push(tag.as_bytes());
        }
        keccak256_parts(&parts)
    }

    /// Checks that `self` can replace `active`.
    ///
    /// # Errors
    ///
    /// The first removed or retyped key, in key order.
    pub fn check_replaces(&self, active: &StorageSchema) -> Result<(), SchemaIncompatibility> {
        for (key, tag) in active.iter() {
            match self.get(key) {
                None => {
                    return Err(SchemaIncompatibility::Removed {
                        key: key.to_string(),
                        tag,
                    })
                }
                Some(new_tag) if new_tag != tag => {
                    return Err(SchemaIncompatibility::Retyped {
                        key: key.to_string(),
                        from: tag,
                        to: new_tag,
                    })
                }
                Some(_) => {}
            }
        }
        Ok(())
    }
}
