//! # Error Types
//!
//! All error types for slot storage.

use crate::domain::slot::{SlotId, TypeTag};
use thiserror::Error;

/// Errors raised by the storage facade and its backends.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StorageError {
    /// No live slot at this id.
    #[error("slot not found: {0}")]
    NotFound(SlotId),

    /// A write used a different type than the one recorded for the slot.
    #[error("type mismatch at {slot}: slot holds {existing}, write used {attempted}")]
    TypeMismatch {
        /// Slot being written.
        slot: SlotId,
        /// Type recorded on first write.
        existing: TypeTag,
        /// Type of the rejected write.
        attempted: TypeTag,
    },

    /// Stored bytes could not be decoded as the requested shape.
    #[error("codec error: {0}")]
    Codec(String),

    /// The persistence backend failed. Propagated unchanged by every caller.
    #[error("storage backend failure: {0}")]
    Backend(String),

    /// A backend lock was poisoned by a panicking writer.
    #[error("storage lock poisoned")]
    LockPoisoned,

    /// Commit was requested for a checkpoint that is not the innermost one.
    #[error("checkpoint {requested} is not the innermost open transaction (depth {depth})")]
    CheckpointMismatch {
        /// Checkpoint passed to `commit`.
        requested: usize,
        /// Number of open frames at the time.
        depth: usize,
    },
}

impl StorageError {
    /// Returns true for `NotFound`.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    /// Returns true for failures of the underlying persistence layer.
    #[must_use]
    pub fn is_backend_failure(&self) -> bool {
        matches!(self, Self::Backend(_) | Self::LockPoisoned)
    }
}

impl From<bincode::Error> for StorageError {
    fn from(err: bincode::Error) -> Self {
        Self::Codec(err.to_string())
    }
}
