//! # Error Types

use crate::config::ConfigError;
use shared_types::{Principal, Tick};
use thiserror::Error;
use ur_01_storage_facade::StorageError;
use ur_03_access_control::AccessError;
use ur_04_phase_machine::PhaseError;

/// Errors raised by the commit-reveal oracle.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum OracleError {
    /// The committer already has a record (records are never reused).
    #[error("{0} has already committed")]
    AlreadyCommitted(Principal),

    /// No record for the committer.
    #[error("{0} has not committed")]
    NotCommitted(Principal),

    /// The record was already revealed.
    #[error("{0} has already revealed")]
    AlreadyRevealed(Principal),

    /// The minimum reveal delay has not elapsed.
    #[error("too early: now {now}, reveal allowed from {earliest}")]
    TooEarly {
        /// Current tick.
        now: Tick,
        /// First acceptable tick.
        earliest: Tick,
    },

    /// The reveal window has closed.
    #[error("expired: now {now}, window closed at {deadline}")]
    Expired {
        /// Current tick.
        now: Tick,
        /// First tick outside the window.
        deadline: Tick,
    },

    /// Forfeit requested while the reveal window is still open.
    #[error("reveal window still open until {deadline} (now {now})")]
    NotExpired {
        /// Current tick.
        now: Tick,
        /// First tick outside the window.
        deadline: Tick,
    },

    /// `seal(preimage, salt)` does not match the committed value.
    #[error("preimage does not match the sealed value")]
    InvalidPreimage,

    /// The entropy source has nothing for this tick.
    #[error("no entropy available at {0}")]
    EntropyUnavailable(Tick),

    /// Entropy was observable at or before the commit, or lies in the future.
    #[error("stale entropy: observed at {observed_at}, commit at {commit_tick}, now {now}")]
    StaleEntropy {
        /// Tick the entropy was published at.
        observed_at: Tick,
        /// Tick of the commit.
        commit_tick: Tick,
        /// Current tick.
        now: Tick,
    },

    /// Invalid oracle configuration.
    #[error("invalid oracle configuration: {0}")]
    InvalidConfig(#[from] ConfigError),

    /// Authorization failure.
    #[error(transparent)]
    Access(AccessError),

    /// Phase gate failure.
    #[error(transparent)]
    Phase(PhaseError),

    /// Storage failure.
    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl From<AccessError> for OracleError {
    fn from(err: AccessError) -> Self {
        match err {
            AccessError::Storage(storage) => Self::Storage(storage),
            other => Self::Access(other),
        }
    }
}

impl From<PhaseError> for OracleError {
    fn from(err: PhaseError) -> Self {
        match err {
            PhaseError::Storage(storage) => Self::Storage(storage),
            PhaseError::Access(access) => Self::Access(access),
            other => Self::Phase(other),
        }
    }
}
