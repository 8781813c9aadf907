//! # Core Domain Entities
//!
//! Identity, time, and naming primitives shared by every runtime component.
//!
//! ## Clusters
//!
//! - **Identity**: `Principal`
//! - **Time**: `Tick`
//! - **Digests**: `Hash`
//! - **Naming**: `OperationId`, `RoleId`

use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::fmt;

// Re-export U256 from primitive-types for use across all components
pub use primitive_types::U256;

// =============================================================================
// CLUSTER A: IDENTITY
// =============================================================================

/// An authenticated caller identity (20 bytes).
///
/// Supplied by the embedding environment's authentication boundary and
/// trusted as-is by the access layer.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub struct Principal(pub [u8; 20]);

impl Principal {
    /// The zero principal. Never granted anything implicitly.
    pub const ZERO: Self = Self([0u8; 20]);

    /// Creates a principal from raw bytes.
    #[must_use]
    pub const fn new(bytes: [u8; 20]) -> Self {
        Self(bytes)
    }

    /// Creates a principal from a slice. Returns None if wrong length.
    #[must_use]
    pub fn from_slice(slice: &[u8]) -> Option<Self> {
        <[u8; 20]>::try_from(slice).ok().map(Self)
    }

    /// Derives a principal from a human-readable label.
    ///
    /// Takes the low 20 bytes of `keccak256(label)`. Handy for fixtures and
    /// for environments that identify callers by name.
    #[must_use]
    pub fn from_label(label: &str) -> Self {
        let digest = crate::crypto::keccak256(label.as_bytes());
        let mut bytes = [0u8; 20];
        bytes.copy_from_slice(&digest.0[12..]);
        Self(bytes)
    }

    /// Returns the underlying bytes.
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }
}

impl fmt::Debug for Principal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl fmt::Display for Principal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}..{}", hex::encode(&self.0[..4]), hex::encode(&self.0[18..]))
    }
}

impl From<[u8; 20]> for Principal {
    fn from(bytes: [u8; 20]) -> Self {
        Self(bytes)
    }
}

// =============================================================================
// CLUSTER B: TIME
// =============================================================================

/// A coarse, monotonically non-decreasing instant supplied by the
/// execution environment (block height, slot, or seconds).
///
/// Compare with inequalities only; the source may be nudged by a small
/// adversarial amount.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
pub struct Tick(pub u64);

impl Tick {
    /// The origin tick.
    pub const ZERO: Self = Self(0);

    /// Returns this tick advanced by `delta`, saturating at `u64::MAX`.
    #[must_use]
    pub const fn plus(self, delta: u64) -> Self {
        Self(self.0.saturating_add(delta))
    }

    /// Ticks elapsed since `earlier` (zero if `earlier` is in the future).
    #[must_use]
    pub const fn since(self, earlier: Tick) -> u64 {
        self.0.saturating_sub(earlier.0)
    }

    /// Raw value.
    #[must_use]
    pub const fn value(self) -> u64 {
        self.0
    }
}

impl fmt::Display for Tick {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "t{}", self.0)
    }
}

impl From<u64> for Tick {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

// =============================================================================
// CLUSTER C: DIGESTS
// =============================================================================

/// A 32-byte Keccak-256 digest.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub struct Hash(pub [u8; 32]);

impl Hash {
    /// The zero hash.
    pub const ZERO: Self = Self([0u8; 32]);

    /// Creates a hash from a 32-byte array.
    #[must_use]
    pub const fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Creates a hash from a slice. Returns None if wrong length.
    #[must_use]
    pub fn from_slice(slice: &[u8]) -> Option<Self> {
        <[u8; 32]>::try_from(slice).ok().map(Self)
    }

    /// Returns the underlying bytes.
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Returns true if this is the zero hash.
    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 32]
    }
}

impl fmt::Debug for Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl fmt::Display for Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}...{}", hex::encode(&self.0[..4]), hex::encode(&self.0[28..]))
    }
}

impl From<[u8; 32]> for Hash {
    fn from(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }
}

// =============================================================================
// CLUSTER D: NAMING
// =============================================================================

/// Name of a logical operation (`module.upgrade`, `vault.withdraw`, ...).
///
/// Operations are the unit of authorization, phase gating, and reentrancy
/// tracking.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct OperationId(Cow<'static, str>);

impl OperationId {
    /// Swap the active implementation module.
    pub const UPGRADE: Self = Self::from_static("module.upgrade");
    /// Trip the emergency stop.
    pub const EMERGENCY_HALT: Self = Self::from_static("emergency.halt");
    /// Clear the emergency stop.
    pub const EMERGENCY_RESUME: Self = Self::from_static("emergency.resume");

    /// Creates an operation id from a static string.
    #[must_use]
    pub const fn from_static(name: &'static str) -> Self {
        Self(Cow::Borrowed(name))
    }

    /// Creates an operation id from an owned string.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self(Cow::Owned(name.into()))
    }

    /// The operation name.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for OperationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "OperationId({})", self.0)
    }
}

impl fmt::Display for OperationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&'static str> for OperationId {
    fn from(name: &'static str) -> Self {
        Self::from_static(name)
    }
}

/// Name of a role.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RoleId(Cow<'static, str>);

impl RoleId {
    /// Default admin role for every role that has no explicit admin.
    pub const ADMIN: Self = Self::from_static("admin");
    /// Members may activate new modules.
    pub const UPGRADER: Self = Self::from_static("upgrader");
    /// Members may trip and clear the emergency stop.
    pub const PAUSER: Self = Self::from_static("pauser");
    /// Members may approve time-locked proposals.
    pub const TIMELOCK_APPROVER: Self = Self::from_static("timelock.approver");

    /// Creates a role id from a static string.
    #[must_use]
    pub const fn from_static(name: &'static str) -> Self {
        Self(Cow::Borrowed(name))
    }

    /// Creates a role id from an owned string.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self(Cow::Owned(name.into()))
    }

    /// The role name.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for RoleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RoleId({})", self.0)
    }
}

impl fmt::Display for RoleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&'static str> for RoleId {
    fn from(name: &'static str) -> Self {
        Self::from_static(name)
    }
}
