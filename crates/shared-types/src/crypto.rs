//! # Hash Primitives
//!
//! Keccak-256 is the single trusted hash of the runtime. It is consumed as
//! an external primitive; nothing here implements cryptography.

use crate::entities::Hash;
use sha3::{Digest, Keccak256};

/// Computes keccak256 of `data`.
#[must_use]
pub fn keccak256(data: &[u8]) -> Hash {
    let hash = Keccak256::digest(data);
    Hash::new(hash.into())
}

/// Computes keccak256 over several parts, each prefixed with its length.
///
/// Length prefixes keep `("ab", "c")` and `("a", "bc")` distinct.
#[must_use]
pub fn keccak256_parts(parts: &[&[u8]]) -> Hash {
    let mut hasher = Keccak256::new();
    for part in parts {
        hasher.update((part.len() as u64).to_be_bytes());
        hasher.update(part);
    }
    Hash::new(hasher.finalize().into())
}
