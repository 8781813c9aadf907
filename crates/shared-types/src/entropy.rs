//! # External Entropy
//!
//! Port for a value that was unknown when a commitment was made (e.g. a
//! later block hash). Treated as untrusted: consumers check freshness.

use crate::crypto::keccak256_parts;
use crate::entities::{Hash, Tick};
use serde::{Deserialize, Serialize};

/// An entropy sample and the tick at which it became observable.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entropy {
    /// Tick the value was published at.
    pub observed_at: Tick,
    /// The entropy itself.
    pub value: Hash,
}

/// Supplies entropy on demand.
pub trait EntropySource: Send + Sync {
    /// Entropy published at `tick`, or None if the source has none yet.
    fn entropy_at(&self, tick: Tick) -> Option<Entropy>;
}

/// Deterministic entropy `keccak(seed, tick)`.
///
/// Reference adapter for tests and local runs; a real deployment supplies
/// block hashes or a beacon instead.
#[derive(Clone, Debug)]
pub struct SeededEntropy {
    seed: Vec<u8>,
}

impl SeededEntropy {
    /// Creates a source from a seed.
    #[must_use]
    pub fn new(seed: impl Into<Vec<u8>>) -> Self {
        Self { seed: seed.into() }
    }
}

impl EntropySource for SeededEntropy {
    fn entropy_at(&self, tick: Tick) -> Option<Entropy> {
        Some(Entropy {
            observed_at: tick,
            value: keccak256_parts(&[&self.seed, &tick.0.to_be_bytes()]),
        })
    }
}
