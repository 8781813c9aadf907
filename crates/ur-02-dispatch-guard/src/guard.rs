//! # Dispatch Guard
//!
//! Per-operation in-progress markers kept in the reserved `__guard`
//! namespace of the storage facade, plus a storage checkpoint around the
//! forwarded call.

use crate::errors::GuardError;
use shared_types::OperationId;
use std::panic::{self, AssertUnwindSafe};
use tracing::{debug, error, instrument, warn};
use ur_01_storage_facade::{Namespace, SlotValue, StorageError, StorageFacade};

/// Reentrancy and rollback guard for forwarded calls.
#[derive(Debug, Clone)]
pub struct DispatchGuard {
    namespace: Namespace,
}

impl Default for DispatchGuard {
    fn default() -> Self {
        Self::new()
    }
}

impl DispatchGuard {
    /// Guard using the `__guard` namespace.
    #[must_use]
    pub fn new() -> Self {
        Self {
            namespace: Namespace::reserved("guard"),
        }
    }

    /// Namespace holding the in-progress markers.
    #[must_use]
    pub fn namespace(&self) -> &Namespace {
        &self.namespace
    }

    /// Returns true while a guarded call for `operation` is in flight.
    ///
    /// # Errors
    ///
    /// Storage failures.
    pub fn is_in_progress(
        &self,
        storage: &StorageFacade,
        operation: &OperationId,
    ) -> Result<bool, StorageError> {
        storage.contains(&self.namespace, operation.as_str().as_bytes())
    }

    /// Runs `invoke` as the forwarded call for `operation`.
    ///
    /// The marker is set before `invoke` runs and cleared on every exit
    /// path. `invoke` runs inside a storage checkpoint: its writes are kept
    /// on `Ok` and discarded on `Err` or panic. A panic is re-raised after
    /// cleanup.
    ///
    /// If the marker cannot be cleared, the storage failure is returned in
    /// place of `invoke`'s result so the caller never mistakes a stuck
    /// marker for a clean exit.
    ///
    /// # Errors
    ///
    /// `GuardError::Reentrant` (converted into `E`) if a call for the same
    /// operation is already in flight, storage failures (including a failed
    /// marker clear), or the error returned by `invoke`.
    #[instrument(skip(self, storage, invoke), fields(operation = %operation))]
    pub fn guarded_call<T, E, F>(
        &self,
        storage: &mut StorageFacade,
        operation: &OperationId,
        invoke: F,
    ) -> Result<T, E>
    where
        F: FnOnce(&mut StorageFacade) -> Result<T, E>,
        E: From<GuardError>,
    {
        let key = operation.as_str().as_bytes();
        if self
            .is_in_progress(storage, operation)
            .map_err(GuardError::from)?
        {
            warn!("Reentrant forward rejected");
            return Err(GuardError::Reentrant(operation.clone()).into());
        }
        storage
            .set_typed(&self.namespace, key, &SlotValue::Bool(true))
            .map_err(GuardError::from)?;

        let checkpoint = storage.checkpoint();
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| invoke(&mut *storage)));

        match outcome {
            Ok(Ok(value)) => {
                let committed = storage.commit(checkpoint);
                let cleared = self.clear(storage, key);
                committed.map_err(GuardError::from)?;
                cleared.map_err(GuardError::from)?;
                debug!("Guarded call completed");
                Ok(value)
            }
            Ok(Err(err)) => {
                storage.rollback(checkpoint);
                if let Err(clear_err) = self.clear(storage, key) {
                    error!(error = %clear_err, "Failed to clear in-progress marker");
                    return Err(GuardError::Storage(clear_err).into());
                }
                debug!("Guarded call failed; forwarded writes discarded");
                Err(err)
            }
            Err(payload) => {
                storage.rollback(checkpoint);
                if let Err(clear_err) = self.clear(storage, key) {
                    error!(error = %clear_err, "Failed to clear in-progress marker after panic");
                }
                error!("Guarded call panicked; state rolled back");
                panic::resume_unwind(payload)
            }
        }
    }

    fn clear(&self, storage: &mut StorageFacade, key: &[u8]) -> Result<(), StorageError> {
        storage.delete(&self.namespace, key)
    }
}

// =============================================================================
// TESTS
// =============================================================================
