//! # Error Types

use shared_types::OperationId;
use thiserror::Error;
use ur_01_storage_facade::StorageError;

/// Errors raised by the dispatch guard itself.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum GuardError {
    /// A forwarded call for this operation is already in flight.
    #[error("reentrant call rejected: operation {0} is already in progress")]
    Reentrant(OperationId),

    /// Marker read or write failed.
    #[error(transparent)]
    Storage(#[from] StorageError),
}
