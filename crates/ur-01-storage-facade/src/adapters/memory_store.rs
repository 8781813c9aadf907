//! In-memory `SlotStore` for tests and single-process runs.

use crate::domain::slot::{Namespace, SlotId, StorageSlot};
use crate::errors::StorageError;
use crate::ports::SlotStore;
use std::collections::BTreeMap;
use std::sync::RwLock;

/// In-memory implementation of `SlotStore`.
///
/// A single `BTreeMap` keyed namespace-major, so scans are range reads.
pub struct InMemorySlotStore {
    slots: RwLock<BTreeMap<SlotId, StorageSlot>>,
}

impl InMemorySlotStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self {
            slots: RwLock::new(BTreeMap::new()),
        }
    }

    /// Number of slots held, tombstones included. Zero if the lock is
    /// poisoned.
    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.read().map(|s| s.len()).unwrap_or(0)
    }

    /// Returns true if no slot was ever written.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for InMemorySlotStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SlotStore for InMemorySlotStore {
    fn load(&self, id: &SlotId) -> Result<Option<StorageSlot>, StorageError> {
        let slots = self.slots.read().map_err(|_| StorageError::LockPoisoned)?;
        Ok(slots.get(id).cloned())
    }

    fn scan(&self, namespace: &Namespace) -> Result<Vec<(Vec<u8>, StorageSlot)>, StorageError> {
        let slots = self.slots.read().map_err(|_| StorageError::LockPoisoned)?;
        Ok(slots
            .range(SlotId::namespace_start(namespace)..)
            .take_while(|(id, _)| &id.namespace == namespace)
            .map(|(id, slot)| (id.key.clone(), slot.clone()))
            .collect())
    }

    fn apply_batch(&self, batch: Vec<(SlotId, StorageSlot)>) -> Result<(), StorageError> {
        let mut slots = self.slots.write().map_err(|_| StorageError::LockPoisoned)?;
        for (id, slot) in batch {
            slots.insert(id, slot);
        }
        Ok(())
    }
}
