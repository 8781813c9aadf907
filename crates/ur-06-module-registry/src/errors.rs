//! # Error Types

use crate::domain::{CodeReference, ModuleId, SchemaIncompatibility};
use shared_types::OperationId;
use thiserror::Error;
use ur_01_storage_facade::{StorageError, TypeTag};
use ur_03_access_control::AccessError;

/// Errors raised by the module registry.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RegistryError {
    /// The new schema cannot replace the active one.
    #[error("module {module} has an incompatible schema: {reason}")]
    IncompatibleSchema {
        /// Rejected module.
        module: ModuleId,
        /// First incompatibility found.
        reason: SchemaIncompatibility,
    },

    /// A module with this id was activated before.
    #[error("module {0} already registered")]
    DuplicateModule(ModuleId),

    /// No module has been activated yet.
    #[error("no active module")]
    NoActiveModule,

    /// The loader could not resolve the code reference.
    #[error("failed to load {reference}: {reason}")]
    LoadFailed {
        /// Reference passed to the loader.
        reference: CodeReference,
        /// Loader message.
        reason: String,
    },

    /// Registry bookkeeping is inconsistent.
    #[error("registry state corrupt: {0}")]
    Corrupt(String),

    /// The application namespace is reserved for the runtime.
    #[error("application namespace {0} is reserved")]
    ReservedNamespace(String),

    /// Authorization or time-lock failure.
    #[error(transparent)]
    Access(AccessError),

    /// Storage failure.
    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl From<AccessError> for RegistryError {
    fn from(err: AccessError) -> Self {
        match err {
            AccessError::Storage(storage) => Self::Storage(storage),
            other => Self::Access(other),
        }
    }
}

/// Failure reported by a module loader.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{0}")]
pub struct LoadError(pub String);

/// Errors raised inside a module call.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ModuleError {
    /// Key not declared in the active schema.
    #[error("key {0} is not declared in the module schema")]
    UndeclaredKey(String),

    /// Value type differs from the declared type.
    #[error("key {key} is declared {declared}, got {actual}")]
    TypeMismatch {
        /// Key.
        key: String,
        /// Declared type.
        declared: TypeTag,
        /// Type of the value supplied.
        actual: TypeTag,
    },

    /// The call's payload could not be interpreted.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Business rule failure reported by the module.
    #[error("module call failed: {0}")]
    Failed(String),

    /// The module does not implement the operation.
    #[error("operation {0} not supported by module")]
    UnsupportedOperation(OperationId),

    /// No forwarding path is available in this context.
    #[error("forwarding unavailable")]
    ForwardingUnavailable,

    /// A forwarded call hit an operation already in flight.
    #[error("forwarded call to {0} is reentrant")]
    Reentrant(OperationId),

    /// A forwarded call was rejected by the dispatch pipeline.
    #[error("forwarded call to {operation} rejected: {reason}")]
    ForwardRejected {
        /// Operation forwarded to.
        operation: OperationId,
        /// Pipeline error message.
        reason: String,
    },

    /// Storage failure.
    #[error(transparent)]
    Storage(#[from] StorageError),
}
