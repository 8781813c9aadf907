//! # Slot Store Port
//!
//! Persistence backend behind the facade. Implementations must apply a
//! batch all-or-nothing; the facade relies on that for atomic commits.

use crate::domain::slot::{Namespace, SlotId, StorageSlot};
use crate::errors::StorageError;

/// Backend holding committed slots, tombstones included.
pub trait SlotStore: Send + Sync {
    /// Loads one slot (live or tombstoned).
    ///
    /// # Errors
    ///
    /// Backend failures only; an absent slot is `Ok(None)`.
    fn load(&self, id: &SlotId) -> Result<Option<StorageSlot>, StorageError>;

    /// Every slot in `namespace`, ordered by key.
    ///
    /// # Errors
    ///
    /// Backend failures.
    fn scan(&self, namespace: &Namespace) -> Result<Vec<(Vec<u8>, StorageSlot)>, StorageError>;

    /// Applies every write in `batch` or none of them.
    ///
    /// # Errors
    ///
    /// Backend failures; the store is unchanged when this returns `Err`.
    fn apply_batch(&self, batch: Vec<(SlotId, StorageSlot)>) -> Result<(), StorageError>;
}
