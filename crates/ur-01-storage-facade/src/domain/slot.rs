//! # Slot Identity and Layout
//!
//! A slot is addressed by `(namespace, key)`. The first write fixes its
//! `TypeTag` forever; deletion leaves a tombstone that keeps the tag.

use serde::{Deserialize, Serialize};
use std::fmt;

// =============================================================================
// NAMESPACE
// =============================================================================

/// Byte-string namespace isolating one owner's keys from another's.
///
/// Namespaces starting with `__` are reserved for the runtime itself
/// (guard markers, roles, phase state, registry).
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Namespace(Vec<u8>);

impl Namespace {
    /// Prefix of every runtime-owned namespace.
    pub const RESERVED_PREFIX: &'static [u8] = b"__";

    /// Creates a namespace from raw bytes.
    #[must_use]
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self(bytes.into())
    }

    /// Creates a reserved runtime namespace `__<name>`.
    #[must_use]
    pub fn reserved(name: &str) -> Self {
        let mut bytes = Self::RESERVED_PREFIX.to_vec();
        bytes.extend_from_slice(name.as_bytes());
        Self(bytes)
    }

    /// Derives `<self>.<suffix>`.
    #[must_use]
    pub fn child(&self, suffix: &str) -> Self {
        let mut bytes = self.0.clone();
        bytes.push(b'.');
        bytes.extend_from_slice(suffix.as_bytes());
        Self(bytes)
    }

    /// Returns true for runtime-owned namespaces.
    #[must_use]
    pub fn is_reserved(&self) -> bool {
        self.0.starts_with(Self::RESERVED_PREFIX)
    }

    /// Raw bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_printable(f, &self.0)
    }
}

impl fmt::Debug for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Namespace(")?;
        write_printable(f, &self.0)?;
        write!(f, ")")
    }
}

// =============================================================================
// SLOT ID
// =============================================================================

/// Unique address of a slot.
///
/// Ordering is namespace-major so a namespace is a contiguous key range.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SlotId {
    /// Owning namespace.
    pub namespace: Namespace,
    /// Key within the namespace.
    pub key: Vec<u8>,
}

impl SlotId {
    /// Creates a slot id.
    #[must_use]
    pub fn new(namespace: Namespace, key: impl Into<Vec<u8>>) -> Self {
        Self {
            namespace,
            key: key.into(),
        }
    }

    /// Lowest id inside `namespace`.
    #[must_use]
    pub fn namespace_start(namespace: &Namespace) -> Self {
        Self::new(namespace.clone(), Vec::new())
    }
}

impl fmt::Display for SlotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/", self.namespace)?;
        write_printable(f, &self.key)
    }
}

impl fmt::Debug for SlotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SlotId({self})")
    }
}

fn write_printable(f: &mut fmt::Formatter<'_>, bytes: &[u8]) -> fmt::Result {
    match std::str::from_utf8(bytes) {
        Ok(text) if text.chars().all(|c| !c.is_control()) => f.write_str(text),
        _ => write!(f, "0x{}", hex::encode(bytes)),
    }
}

// =============================================================================
// TYPE TAG & SLOT
// =============================================================================

/// Encoded type of a slot's value.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum TypeTag {
    /// 256-bit unsigned integer, big-endian.
    UInt,
    /// 128-bit signed integer, big-endian.
    Int,
    /// Opaque bytes (also used for encoded records).
    Bytes,
    /// 20-byte principal.
    Address,
    /// Single byte, 0 or 1.
    Bool,
    /// UTF-8 text.
    String,
}

impl fmt::Display for TypeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::UInt => "uint",
            Self::Int => "int",
            Self::Bytes => "bytes",
            Self::Address => "address",
            Self::Bool => "bool",
            Self::String => "string",
        };
        f.write_str(name)
    }
}

/// Stored state of one slot.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageSlot {
    /// Type fixed on first write.
    pub type_tag: TypeTag,
    /// Encoded value (empty for tombstones).
    pub value: Vec<u8>,
    /// Tombstone flag. Deleted slots keep their type tag.
    pub deleted: bool,
}

impl StorageSlot {
    /// A live slot.
    #[must_use]
    pub fn live(type_tag: TypeTag, value: Vec<u8>) -> Self {
        Self {
            type_tag,
            value,
            deleted: false,
        }
    }

    /// A tombstone that remembers `type_tag`.
    #[must_use]
    pub fn tombstone(type_tag: TypeTag) -> Self {
        Self {
            type_tag,
            value: Vec::new(),
            deleted: true,
        }
    }

    /// Returns true unless tombstoned.
    #[must_use]
    pub fn is_live(&self) -> bool {
        !self.deleted
    }
}
