//! # Error Types

use crate::definition::PhaseId;
use shared_types::{OperationId, Tick};
use std::fmt;
use thiserror::Error;
use ur_01_storage_facade::StorageError;
use ur_03_access_control::AccessError;

/// Why a requested transition is invalid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionFailure {
    /// No rule connects the two phases.
    NoSuchEdge,
    /// The current phase is terminal.
    Terminal,
    /// The rule's storage predicate returned false.
    PredicateFailed,
}

impl fmt::Display for TransitionFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoSuchEdge => f.write_str("no transition rule"),
            Self::Terminal => f.write_str("current phase is terminal"),
            Self::PredicateFailed => f.write_str("predicate not satisfied"),
        }
    }
}

/// Errors in a phase definition, reported by `PhaseDefinitionBuilder::build`.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DefinitionError {
    /// No initial phase was set.
    #[error("phase definition has no initial phase")]
    NoInitialPhase,

    /// A phase was declared twice.
    #[error("phase {0} declared twice")]
    DuplicatePhase(PhaseId),

    /// A rule or permit names an undeclared phase.
    #[error("unknown phase {0}")]
    UnknownPhase(PhaseId),

    /// Two rules share the same `(from, to)`.
    #[error("duplicate transition {from} -> {to}")]
    DuplicateTransition {
        /// Source phase.
        from: PhaseId,
        /// Target phase.
        to: PhaseId,
    },

    /// A terminal phase has an outgoing rule or an operation permit.
    #[error("terminal phase {0} cannot have transitions or permits")]
    TerminalNotFinal(PhaseId),

    /// Automatic rules fire without a caller, so they cannot require authorization.
    #[error("automatic transition {from} -> {to} cannot require authorization")]
    AutomaticWithAuthorization {
        /// Source phase.
        from: PhaseId,
        /// Target phase.
        to: PhaseId,
    },
}

/// Errors raised by the phase machine.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PhaseError {
    /// Transition rejected by the definition or by its predicate.
    #[error("invalid transition {from} -> {to}: {reason}")]
    InvalidTransition {
        /// Current phase.
        from: PhaseId,
        /// Requested phase.
        to: PhaseId,
        /// Failed check.
        reason: TransitionFailure,
    },

    /// Minimum dwell time not yet elapsed.
    #[error("too early: now {now}, allowed from {earliest}")]
    TooEarly {
        /// Current tick.
        now: Tick,
        /// First tick the transition is allowed.
        earliest: Tick,
    },

    /// The operation has no permit in the current phase.
    #[error("operation {operation} not permitted in phase {phase}")]
    OperationNotPermitted {
        /// Operation attempted.
        operation: OperationId,
        /// Current phase.
        phase: PhaseId,
    },

    /// State has not been initialized.
    #[error("phase machine {0} not initialized")]
    NotInitialized(String),

    /// `initialize` was already called.
    #[error("phase machine {0} already initialized")]
    AlreadyInitialized(String),

    /// Stored phase is not part of the definition.
    #[error("stored phase {0} is not part of the definition")]
    UnknownStoredPhase(PhaseId),

    /// Authorization failure from the access controller.
    #[error(transparent)]
    Access(AccessError),

    /// Storage failure.
    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl From<AccessError> for PhaseError {
    fn from(err: AccessError) -> Self {
        match err {
            AccessError::Storage(storage) => Self::Storage(storage),
            other => Self::Access(other),
        }
    }
}

impl PhaseError {
    /// Returns true if the access controller denied the transition.
    #[must_use]
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Access(err) if err.is_unauthorized())
    }
}
