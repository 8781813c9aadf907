//! Module port: what application code implements and what it may call.

use crate::context::ModuleContext;
use crate::errors::ModuleError;
use shared_types::{OperationId, Principal};
use ur_01_storage_facade::StorageFacade;

/// A call routed to the active module.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleCall {
    /// Logical operation (authorization, phase, and reentrancy unit).
    pub operation: OperationId,
    /// Authenticated caller.
    pub caller: Principal,
    /// Opaque input.
    pub payload: Vec<u8>,
}

impl ModuleCall {
    /// Creates a call.
    #[must_use]
    pub fn new(operation: OperationId, caller: Principal, payload: impl Into<Vec<u8>>) -> Self {
        Self {
            operation,
            caller,
            payload: payload.into(),
        }
    }
}

/// Implementation module.
pub trait Module: Send + Sync {
    /// Handles `call` against the application namespace exposed by `ctx`.
    ///
    /// # Errors
    ///
    /// Any `ModuleError`; the dispatch pipeline discards the call's writes.
    fn call(&self, ctx: &mut ModuleContext<'_>, call: &ModuleCall) -> Result<Vec<u8>, ModuleError>;
}

/// Path from a running module back into the dispatch pipeline.
pub trait CallForwarder {
    /// Dispatches `call` as a nested invocation over `storage`.
    ///
    /// # Errors
    ///
    /// `Reentrant` if the operation is already in flight, or
    /// `ForwardRejected` for any other pipeline failure.
    fn forward(&self, storage: &mut StorageFacade, call: ModuleCall) -> Result<Vec<u8>, ModuleError>;
}
