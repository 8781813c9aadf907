//! # Storage Facade
//!
//! The only path to persistent state. Wraps a `SlotStore` backend with:
//!
//! - **Type stability**: a slot's first `TypeTag` is binding forever.
//! - **Tombstones**: `delete` never erases a slot's type.
//! - **Journaled transactions**: writes inside `checkpoint()`/`commit()` sit
//!   in overlay frames; the outermost commit flushes them as one batch.
//! - **Change notifications**: buffered per frame, emitted after the flush
//!   succeeds. Rolled-back work never notifies.
//!
//! ## Usage
//!
//! ```ignore
//! let mut storage = StorageFacade::in_memory();
//! storage.atomically(|s| {
//!     s.set_typed(&ns, b"balance", &SlotValue::from(10u64))?;
//!     s.set_typed(&ns, b"owner", &SlotValue::from(alice))
//! })?;
//! ```

use crate::adapters::InMemorySlotStore;
use crate::domain::slot::{Namespace, SlotId, StorageSlot, TypeTag};
use crate::domain::value::SlotValue;
use crate::errors::StorageError;
use crate::ports::SlotStore;
use serde::de::DeserializeOwned;
use serde::Serialize;
use shared_types::{ChangeNotification, ChangeSink, Component, NotificationPayload, NullSink};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, trace, warn};

/// Handle to an open transaction frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[must_use = "an open checkpoint must be committed or rolled back"]
pub struct Checkpoint(usize);

impl Checkpoint {
    /// Frame index (0 = outermost).
    #[must_use]
    pub fn depth(self) -> usize {
        self.0
    }
}

/// One level of uncommitted writes.
#[derive(Default)]
struct Frame {
    writes: BTreeMap<SlotId, StorageSlot>,
    pending: Vec<ChangeNotification>,
}

/// Namespaced, type-stable slot store with nested transactions.
pub struct StorageFacade {
    store: Arc<dyn SlotStore>,
    sink: Arc<dyn ChangeSink>,
    frames: Vec<Frame>,
}

impl std::fmt::Debug for StorageFacade {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StorageFacade")
            .field("open_frames", &self.frames.len())
            .finish_non_exhaustive()
    }
}

impl StorageFacade {
    /// Creates a facade over `store`, reporting changes to `sink`.
    pub fn new(store: Arc<dyn SlotStore>, sink: Arc<dyn ChangeSink>) -> Self {
        Self {
            store,
            sink,
            frames: Vec::new(),
        }
    }

    /// Facade over a fresh in-memory store that discards notifications.
    #[must_use]
    pub fn in_memory() -> Self {
        Self::new(Arc::new(InMemorySlotStore::new()), Arc::new(NullSink))
    }

    /// Facade over a fresh in-memory store reporting to `sink`.
    #[must_use]
    pub fn in_memory_with_sink(sink: Arc<dyn ChangeSink>) -> Self {
        Self::new(Arc::new(InMemorySlotStore::new()), sink)
    }

    /// Number of open transaction frames.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    /// Returns true while a transaction is open.
    #[must_use]
    pub fn in_transaction(&self) -> bool {
        !self.frames.is_empty()
    }

    // =========================================================================
    // READS
    // =========================================================================

    /// Reads through open frames (innermost first) and then the backend.
    fn lookup(&self, id: &SlotId) -> Result<Option<StorageSlot>, StorageError> {
        for frame in self.frames.iter().rev() {
            if let Some(slot) = frame.writes.get(id) {
                return Ok(Some(slot.clone()));
            }
        }
        self.store.load(id)
    }

    fn live(&self, namespace: &Namespace, key: &[u8]) -> Result<StorageSlot, StorageError> {
        let id = SlotId::new(namespace.clone(), key);
        match self.lookup(&id)? {
            Some(slot) if slot.is_live() => Ok(slot),
            _ => Err(StorageError::NotFound(id)),
        }
    }

    /// Raw value of a live slot.
    ///
    /// # Errors
    ///
    /// `NotFound` for absent or tombstoned slots; backend failures.
    pub fn get(&self, namespace: &Namespace, key: &[u8]) -> Result<Vec<u8>, StorageError> {
        Ok(self.live(namespace, key)?.value)
    }

    /// Full slot state, tombstones included.
    ///
    /// # Errors
    ///
    /// Backend failures.
    pub fn slot(&self, namespace: &Namespace, key: &[u8]) -> Result<Option<StorageSlot>, StorageError> {
        self.lookup(&SlotId::new(namespace.clone(), key))
    }

    /// Type recorded for a key, even if the slot has been deleted.
    ///
    /// # Errors
    ///
    /// Backend failures.
    pub fn type_of(&self, namespace: &Namespace, key: &[u8]) -> Result<Option<TypeTag>, StorageError> {
        Ok(self.slot(namespace, key)?.map(|s| s.type_tag))
    }

    /// Returns true if a live slot exists.
    ///
    /// # Errors
    ///
    /// Backend failures.
    pub fn contains(&self, namespace: &Namespace, key: &[u8]) -> Result<bool, StorageError> {
        Ok(self.slot(namespace, key)?.is_some_and(|s| s.is_live()))
    }

    /// Decoded value of a live slot.
    ///
    /// # Errors
    ///
    /// `NotFound`, `Codec`, backend failures.
    pub fn get_typed(&self, namespace: &Namespace, key: &[u8]) -> Result<SlotValue, StorageError> {
        let slot = self.live(namespace, key)?;
        SlotValue::decode(slot.type_tag, &slot.value)
    }

    /// Decoded value, or None if there is no live slot.
    ///
    /// # Errors
    ///
    /// `Codec`, backend failures.
    pub fn try_get_typed(
        &self,
        namespace: &Namespace,
        key: &[u8],
    ) -> Result<Option<SlotValue>, StorageError> {
        match self.get_typed(namespace, key) {
            Ok(value) => Ok(Some(value)),
            Err(StorageError::NotFound(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Decodes a bincode record stored as `Bytes`.
    ///
    /// # Errors
    ///
    /// `TypeMismatch` if the slot is not `Bytes`, `Codec`, backend failures.
    pub fn get_record<T: DeserializeOwned>(
        &self,
        namespace: &Namespace,
        key: &[u8],
    ) -> Result<Option<T>, StorageError> {
        let Some(slot) = self.slot(namespace, key)? else {
            return Ok(None);
        };
        if !slot.is_live() {
            return Ok(None);
        }
        if slot.type_tag != TypeTag::Bytes {
            return Err(StorageError::TypeMismatch {
                slot: SlotId::new(namespace.clone(), key),
                existing: slot.type_tag,
                attempted: TypeTag::Bytes,
            });
        }
        Ok(Some(bincode::deserialize(&slot.value)?))
    }

    /// Live keys in `namespace`, ordered.
    ///
    /// # Errors
    ///
    /// Backend failures.
    pub fn keys(&self, namespace: &Namespace) -> Result<Vec<Vec<u8>>, StorageError> {
        let mut merged: BTreeMap<Vec<u8>, bool> = self
            .store
            .scan(namespace)?
            .into_iter()
            .map(|(key, slot)| (key, slot.is_live()))
            .collect();
        for frame in &self.frames {
            for (id, slot) in frame
                .writes
                .range(SlotId::namespace_start(namespace)..)
                .take_while(|(id, _)| &id.namespace == namespace)
            {
                merged.insert(id.key.clone(), slot.is_live());
            }
        }
        Ok(merged
            .into_iter()
            .filter_map(|(key, live)| live.then_some(key))
            .collect())
    }

    // =========================================================================
    // WRITES
    // =========================================================================

    /// Writes `value` under `type_tag`.
    ///
    /// # Errors
    ///
    /// `TypeMismatch` if the key was ever written with another tag (the slot
    /// is left unchanged); backend failures.
    pub fn set(
        &mut self,
        namespace: &Namespace,
        key: &[u8],
        value: Vec<u8>,
        type_tag: TypeTag,
    ) -> Result<(), StorageError> {
        let id = SlotId::new(namespace.clone(), key);
        let existing = self.lookup(&id)?;
        if let Some(slot) = &existing {
            if slot.type_tag != type_tag {
                return Err(StorageError::TypeMismatch {
                    slot: id,
                    existing: slot.type_tag,
                    attempted: type_tag,
                });
            }
        }
        let old_value = existing.filter(StorageSlot::is_live).map(|s| s.value);
        trace!(slot = %id, %type_tag, "slot write");
        let notification = ChangeNotification {
            component: Component::Storage,
            event_kind: "slot_written",
            payload: NotificationPayload::SlotChange {
                namespace: namespace.as_bytes().to_vec(),
                key: key.to_vec(),
                old_value,
                new_value: Some(value.clone()),
            },
        };
        self.write(id, StorageSlot::live(type_tag, value), notification)
    }

    /// Writes a typed value.
    ///
    /// # Errors
    ///
    /// See [`StorageFacade::set`].
    pub fn set_typed(
        &mut self,
        namespace: &Namespace,
        key: &[u8],
        value: &SlotValue,
    ) -> Result<(), StorageError> {
        self.set(namespace, key, value.encode(), value.type_tag())
    }

    /// Stores a bincode-encoded record as `Bytes`.
    ///
    /// # Errors
    ///
    /// `Codec`, `TypeMismatch`, backend failures.
    pub fn put_record<T: Serialize>(
        &mut self,
        namespace: &Namespace,
        key: &[u8],
        record: &T,
    ) -> Result<(), StorageError> {
        let encoded = bincode::serialize(record)?;
        self.set(namespace, key, encoded, TypeTag::Bytes)
    }

    /// Tombstones a live slot. Its type tag stays binding.
    ///
    /// # Errors
    ///
    /// `NotFound` if there is no live slot; backend failures.
    pub fn delete(&mut self, namespace: &Namespace, key: &[u8]) -> Result<(), StorageError> {
        let existing = self.live(namespace, key)?;
        let id = SlotId::new(namespace.clone(), key);
        trace!(slot = %id, "slot delete");
        let notification = ChangeNotification {
            component: Component::Storage,
            event_kind: "slot_deleted",
            payload: NotificationPayload::SlotChange {
                namespace: namespace.as_bytes().to_vec(),
                key: key.to_vec(),
                old_value: Some(existing.value),
                new_value: None,
            },
        };
        self.write(id, StorageSlot::tombstone(existing.type_tag), notification)
    }

    /// Queues a component notification on the same channel as slot changes.
    ///
    /// Inside a transaction it is held until the outermost commit.
    pub fn publish(&mut self, notification: ChangeNotification) {
        match self.frames.last_mut() {
            Some(frame) => frame.pending.push(notification),
            None => self.sink.publish(notification),
        }
    }

    fn write(
        &mut self,
        id: SlotId,
        slot: StorageSlot,
        notification: ChangeNotification,
    ) -> Result<(), StorageError> {
        if let Some(frame) = self.frames.last_mut() {
            frame.writes.insert(id, slot);
            frame.pending.push(notification);
            return Ok(());
        }
        self.store.apply_batch(vec![(id, slot)])?;
        self.sink.publish(notification);
        Ok(())
    }

    // =========================================================================
    // TRANSACTIONS
    // =========================================================================

    /// Opens a transaction frame.
    pub fn checkpoint(&mut self) -> Checkpoint {
        self.frames.push(Frame::default());
        Checkpoint(self.frames.len() - 1)
    }

    /// Commits the innermost frame.
    ///
    /// Nested frames merge into their parent. The outermost frame is flushed
    /// to the backend as one batch and its notifications are then emitted.
    ///
    /// # Errors
    ///
    /// `CheckpointMismatch` if `checkpoint` is not the innermost frame (every
    /// frame from `checkpoint` inward is discarded); backend failures (the
    /// frame is discarded and the backend is unchanged).
    pub fn commit(&mut self, checkpoint: Checkpoint) -> Result<(), StorageError> {
        if checkpoint.0 + 1 != self.frames.len() {
            let depth = self.frames.len();
            self.frames.truncate(checkpoint.0);
            return Err(StorageError::CheckpointMismatch {
                requested: checkpoint.0,
                depth,
            });
        }
        let Some(frame) = self.frames.pop() else {
            return Err(StorageError::CheckpointMismatch {
                requested: checkpoint.0,
                depth: 0,
            });
        };

        if let Some(parent) = self.frames.last_mut() {
            parent.writes.extend(frame.writes);
            parent.pending.extend(frame.pending);
            return Ok(());
        }

        let writes = frame.writes.len();
        if let Err(e) = self.store.apply_batch(frame.writes.into_iter().collect()) {
            warn!(error = %e, writes, "Storage flush failed; transaction discarded");
            return Err(e);
        }
        debug!(writes, notifications = frame.pending.len(), "Transaction committed");
        for notification in frame.pending {
            self.sink.publish(notification);
        }
        Ok(())
    }

    /// Discards `checkpoint` and every frame opened after it.
    pub fn rollback(&mut self, checkpoint: Checkpoint) {
        if checkpoint.0 < self.frames.len() {
            let discarded: usize = self.frames[checkpoint.0..]
                .iter()
                .map(|f| f.writes.len())
                .sum();
            debug!(depth = checkpoint.0, discarded, "Transaction rolled back");
            self.frames.truncate(checkpoint.0);
        }
    }

    /// Runs `f` in a transaction: commit on `Ok`, roll back on `Err`.
    ///
    /// # Errors
    ///
    /// Whatever `f` returns, or the storage error raised by the commit.
    pub fn atomically<T, E, F>(&mut self, f: F) -> Result<T, E>
    where
        F: FnOnce(&mut Self) -> Result<T, E>,
        E: From<StorageError>,
    {
        let checkpoint = self.checkpoint();
        match f(self) {
            Ok(value) => {
                self.commit(checkpoint)?;
                Ok(value)
            }
            Err(err) => {
                self.rollback(checkpoint);
                Err(err)
            }
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
