//! # Emergency Stop
//!
//! Circuit breaker over the whole runtime. While halted, only operations
//! whose policy is `allowed_when_halted` may run. Tripping and clearing it
//! are themselves operations (`emergency.halt`, `emergency.resume`) and go
//! through normal authorization.

use crate::controller::AccessController;
use crate::domain::layout;
use crate::errors::AccessError;
use shared_types::{ChangeNotification, Component, OperationId, Principal};
use std::sync::Arc;
use tracing::{info, warn};
use ur_01_storage_facade::{SlotValue, StorageFacade};

/// Halt flag stored next to the access state.
#[derive(Debug, Clone)]
pub struct EmergencyStop {
    access: Arc<AccessController>,
}

impl EmergencyStop {
    /// Creates a stop backed by `access`.
    #[must_use]
    pub fn new(access: Arc<AccessController>) -> Self {
        Self { access }
    }

    /// Returns true while halted.
    ///
    /// # Errors
    ///
    /// Storage failures.
    pub fn is_halted(&self, storage: &StorageFacade) -> Result<bool, AccessError> {
        Ok(storage
            .try_get_typed(self.access.namespace(), layout::HALTED)?
            .and_then(|value| value.as_bool())
            .unwrap_or(false))
    }

    /// Engages the stop. Halting twice is a no-op.
    ///
    /// # Errors
    ///
    /// `Unauthorized` for `emergency.halt`, storage failures.
    pub fn halt(&self, storage: &mut StorageFacade, caller: Principal) -> Result<(), AccessError> {
        self.access
            .authorize(storage, caller, &OperationId::EMERGENCY_HALT)?;
        self.set(storage, caller, true)
    }

    /// Clears the stop. Resuming while running is a no-op.
    ///
    /// # Errors
    ///
    /// `Unauthorized` for `emergency.resume`, storage failures.
    pub fn resume(&self, storage: &mut StorageFacade, caller: Principal) -> Result<(), AccessError> {
        self.access
            .authorize(storage, caller, &OperationId::EMERGENCY_RESUME)?;
        self.set(storage, caller, false)
    }

    /// Rejects `operation` if halted and its policy does not allow it.
    ///
    /// # Errors
    ///
    /// `Halted`, storage failures.
    pub fn check(&self, storage: &StorageFacade, operation: &OperationId) -> Result<(), AccessError> {
        if !self.is_halted(storage)? {
            return Ok(());
        }
        let allowed = self
            .access
            .operation_policy(storage, operation)?
            .is_some_and(|policy| policy.allowed_when_halted);
        if allowed {
            return Ok(());
        }
        warn!(%operation, "Rejected while halted");
        Err(AccessError::Halted(operation.clone()))
    }

    fn set(&self, storage: &mut StorageFacade, caller: Principal, halted: bool) -> Result<(), AccessError> {
        if self.is_halted(storage)? == halted {
            return Ok(());
        }
        storage.set_typed(self.access.namespace(), layout::HALTED, &SlotValue::Bool(halted))?;
        let event_kind = if halted { "emergency_halted" } else { "emergency_resumed" };
        storage.publish(ChangeNotification::fields(
            Component::AccessControl,
            event_kind,
            [("by", format!("{caller:?}"))],
        ));
        if halted {
            warn!(by = %caller, "Emergency stop engaged");
        } else {
            info!(by = %caller, "Emergency stop cleared");
        }
        Ok(())
    }
}
