//! # Commit Records

use serde::{Deserialize, Serialize};
use shared_types::{keccak256_parts, Hash, Principal, Tick};

/// Seal binding a preimage to a salt: `keccak(preimage ‖ salt)` with
/// length-prefixed parts.
#[must_use]
pub fn seal(preimage: &[u8], salt: &[u8]) -> Hash {
    keccak256_parts(&[preimage, salt])
}

/// Randomness derived from a revealed preimage and fresh entropy.
#[must_use]
pub fn derive_output(preimage: &[u8], entropy: &Hash) -> Hash {
    keccak256_parts(&[preimage, entropy.as_bytes()])
}

/// One committer's commitment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitRecord {
    /// Who committed.
    pub committer: Principal,
    /// `seal(preimage, salt)`.
    pub sealed_value: Hash,
    /// Tick of the commit.
    pub commit_tick: Tick,
    /// Set once on a successful reveal.
    pub revealed: bool,
    /// Set by `forfeit` after the window closed without a reveal.
    pub forfeited: bool,
    /// Derived randomness, once revealed.
    pub output: Option<Hash>,
}

/// Where a record stands at a given tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitStatus {
    /// Waiting for the minimum delay.
    Sealed,
    /// Inside the reveal window.
    Revealable,
    /// Revealed.
    Revealed,
    /// Window closed without a reveal (forfeited or not yet marked).
    Expired,
}

impl CommitRecord {
    /// First tick a reveal is accepted.
    #[must_use]
    pub fn reveal_opens(&self, min_delay: u64) -> Tick {
        self.commit_tick.plus(min_delay)
    }

    /// First tick outside the reveal window.
    #[must_use]
    pub fn reveal_closes(&self, window: u64) -> Tick {
        self.commit_tick.plus(window)
    }

    /// Status at `now`.
    #[must_use]
    pub fn status(&self, now: Tick, min_delay: u64, window: u64) -> CommitStatus {
        if self.revealed {
            CommitStatus::Revealed
        } else if self.forfeited || now >= self.reveal_closes(window) {
            CommitStatus::Expired
        } else if now < self.reveal_opens(min_delay) {
            CommitStatus::Sealed
        } else {
            CommitStatus::Revealable
        }
    }
}
