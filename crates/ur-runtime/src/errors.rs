//! # Runtime Errors
//!
//! One taxonomy for everything a runtime entry point can return. Storage
//! failures from any layer surface as `Storage`, unchanged.

use crate::config::ConfigError;
use shared_types::OperationId;
use thiserror::Error;
use ur_01_storage_facade::StorageError;
use ur_02_dispatch_guard::GuardError;
use ur_03_access_control::AccessError;
use ur_04_phase_machine::{DefinitionError, PhaseError};
use ur_05_commit_reveal::OracleError;
use ur_06_module_registry::{ModuleError, RegistryError};
use ur_telemetry::TelemetryError;

/// Errors returned by [`crate::Runtime`].
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RuntimeError {
    /// A call for this operation is already in flight.
    #[error("reentrant call rejected: operation {0} is already in progress")]
    Reentrant(OperationId),

    /// Authorization, time-lock, or emergency stop failure.
    #[error(transparent)]
    Access(AccessError),

    /// The operation is not permitted in the current phase, or a
    /// transition was rejected.
    #[error(transparent)]
    Phase(PhaseError),

    /// Phase definition rejected at build time.
    #[error(transparent)]
    Definition(#[from] DefinitionError),

    /// Commit-reveal failure.
    #[error(transparent)]
    Oracle(OracleError),

    /// Module resolution or activation failure.
    #[error(transparent)]
    Registry(RegistryError),

    /// Error raised by the module itself.
    #[error(transparent)]
    Module(ModuleError),

    /// No oracle registered under this name.
    #[error("unknown oracle {0}")]
    UnknownOracle(String),

    /// No phase machine configured.
    #[error("no phase machine configured")]
    NoPhaseMachine,

    /// Bad configuration.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Metrics registration failed.
    #[error(transparent)]
    Telemetry(#[from] TelemetryError),

    /// Storage failure.
    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl RuntimeError {
    /// Returns true for authorization denials at any layer.
    #[must_use]
    pub fn is_unauthorized(&self) -> bool {
        match self {
            Self::Access(err) => err.is_unauthorized(),
            Self::Phase(err) => err.is_unauthorized(),
            Self::Oracle(OracleError::Access(err)) | Self::Registry(RegistryError::Access(err)) => {
                err.is_unauthorized()
            }
            _ => false,
        }
    }

    /// Short label for metrics.
    #[must_use]
    pub fn outcome_label(&self) -> &'static str {
        match self {
            Self::Reentrant(_) => "reentrant",
            Self::Access(AccessError::Halted(_)) => "halted",
            err if err.is_unauthorized() => "unauthorized",
            Self::Phase(_) => "phase_rejected",
            Self::Module(_) => "module_error",
            Self::Storage(_) => "storage_error",
            _ => "error",
        }
    }
}

impl From<GuardError> for RuntimeError {
    fn from(err: GuardError) -> Self {
        match err {
            GuardError::Reentrant(operation) => Self::Reentrant(operation),
            GuardError::Storage(storage) => Self::Storage(storage),
        }
    }
}

impl From<AccessError> for RuntimeError {
    fn from(err: AccessError) -> Self {
        match err {
            AccessError::Storage(storage) => Self::Storage(storage),
            other => Self::Access(other),
        }
    }
}

impl From<PhaseError> for RuntimeError {
    fn from(err: PhaseError) -> Self {
        match err {
            PhaseError::Storage(storage) => Self::Storage(storage),
            PhaseError::Access(access) => Self::Access(access),
            other => Self::Phase(other),
        }
    }
}

impl From<OracleError> for RuntimeError {
    fn from(err: OracleError) -> Self {
        match err {
            OracleError::Storage(storage) => Self::Storage(storage),
            other => Self::Oracle(other),
        }
    }
}

impl From<RegistryError> for RuntimeError {
    fn from(err: RegistryError) -> Self {
        match err {
            RegistryError::Storage(storage) => Self::Storage(storage),
            other => Self::Registry(other),
        }
    }
}

impl From<ModuleError> for RuntimeError {
    fn from(err: ModuleError) -> Self {
        match err {
            ModuleError::Storage(storage) => Self::Storage(storage),
            ModuleError::Reentrant(operation) => Self::Reentrant(operation),
            other => Self::Module(other),
        }
    }
}

/// Maps a pipeline failure back into the module's error space for a
/// forwarded call.
pub(crate) fn into_module_error(operation: &OperationId, err: RuntimeError) -> ModuleError {
    match err {
        RuntimeError::Reentrant(op) => ModuleError::Reentrant(op),
        RuntimeError::Module(inner) => inner,
        RuntimeError::Storage(storage) => ModuleError::Storage(storage),
        other => ModuleError::ForwardRejected {
            operation: operation.clone(),
            reason: other.to_string(),
        },
    }
}
