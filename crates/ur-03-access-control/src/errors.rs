//! # Error Types
//!
//! All error types for authorization, role management, and time-locks.

use crate::domain::timelock::TimelockHandle;
use shared_types::{OperationId, Principal, RoleId, Tick};
use std::fmt;
use thiserror::Error;
use ur_01_storage_facade::StorageError;

/// Why an authorization check failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DenialReason {
    /// The operation's policy requires a role the principal lacks.
    MissingRole(RoleId),
    /// No policy is registered for the operation (default deny).
    UnregisteredOperation,
    /// The operation may only run through `execute_timelocked`.
    RequiresTimelock,
    /// Only the owner may do this.
    NotOwner,
    /// Caller is not a member of the role's admin role.
    NotRoleAdmin(RoleId),
    /// Caller may not approve time-locked proposals.
    NotApprover,
    /// Caller may not cancel this proposal.
    NotProposer,
}

impl fmt::Display for DenialReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingRole(role) => write!(f, "missing role {role}"),
            Self::UnregisteredOperation => f.write_str("operation has no policy"),
            Self::RequiresTimelock => f.write_str("operation is time-locked"),
            Self::NotOwner => f.write_str("owner only"),
            Self::NotRoleAdmin(admin) => write!(f, "requires admin role {admin}"),
            Self::NotApprover => f.write_str("not a time-lock approver"),
            Self::NotProposer => f.write_str("not the proposer"),
        }
    }
}

/// Errors raised by the access controller.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AccessError {
    /// Authorization failed.
    #[error("unauthorized: {principal} may not perform {operation} ({reason})")]
    Unauthorized {
        /// Caller.
        principal: Principal,
        /// Operation attempted.
        operation: OperationId,
        /// Failed rule.
        reason: DenialReason,
    },

    /// `initialize` was already called.
    #[error("access controller already initialized")]
    AlreadyInitialized,

    /// No owner has been set yet.
    #[error("access controller not initialized")]
    NotInitialized,

    /// No pending proposal with this handle (never created or consumed).
    #[error("time-lock {0} not found")]
    TimelockNotFound(TimelockHandle),

    /// The proposal does not target the expected operation or payload.
    #[error("time-lock {0} does not match the requested operation or payload")]
    TimelockMismatch(TimelockHandle),

    /// Execution attempted before `earliest_execute_at`.
    #[error("too early: now {now}, executable from {earliest}")]
    TooEarly {
        /// Current tick.
        now: Tick,
        /// Earliest allowed tick.
        earliest: Tick,
    },

    /// The grace period after `earliest_execute_at` has passed.
    #[error("expired: now {now}, deadline was {deadline}")]
    Expired {
        /// Current tick.
        now: Tick,
        /// Last allowed tick.
        deadline: Tick,
    },

    /// Not enough approvals yet.
    #[error("approval threshold not met: {approvals}/{threshold}")]
    ThresholdNotMet {
        /// Approvals collected.
        approvals: usize,
        /// Approvals required.
        threshold: usize,
    },

    /// Proposal for an operation that is not registered as time-locked.
    #[error("operation {0} is not time-locked")]
    NotTimelocked(OperationId),

    /// `earliest_execute_at` is closer than the configured minimum delay.
    #[error("time-lock delay too short: requested {requested}, minimum {minimum}")]
    DelayTooShort {
        /// Requested earliest tick.
        requested: Tick,
        /// Minimum acceptable earliest tick.
        minimum: Tick,
    },

    /// The emergency stop is engaged and the operation is not allowed while halted.
    #[error("emergency stop engaged: {0} is suspended")]
    Halted(OperationId),

    /// Storage failure, propagated unchanged.
    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl AccessError {
    /// Returns true for `Unauthorized`.
    #[must_use]
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Unauthorized { .. })
    }
}
