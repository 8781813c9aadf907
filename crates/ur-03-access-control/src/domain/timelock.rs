//! # Time-locked Proposals

use serde::{Deserialize, Serialize};
use shared_types::{Hash, OperationId, Principal, Tick};
use std::collections::BTreeSet;
use std::fmt;

/// Identifies a pending proposal.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TimelockHandle(pub u64);

impl fmt::Display for TimelockHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A pending time-locked proposal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeLock {
    /// Handle returned by `propose_timelocked`.
    pub handle: TimelockHandle,
    /// Operation the proposal unlocks.
    pub target_operation: OperationId,
    /// Binds the proposal to a specific payload (e.g. a module fingerprint).
    pub payload_hash: Option<Hash>,
    /// First tick at which the proposal may execute.
    pub earliest_execute_at: Tick,
    /// Who proposed it.
    pub proposer: Principal,
    /// Distinct approvers so far.
    pub approvals: BTreeSet<Principal>,
    /// Tick of the proposal.
    pub proposed_at: Tick,
}

impl TimeLock {
    /// Last tick at which the proposal may execute.
    #[must_use]
    pub fn deadline(&self, grace_period: u64) -> Tick {
        self.earliest_execute_at.plus(grace_period)
    }

    /// Returns true once `now` is past the grace period.
    #[must_use]
    pub fn is_expired(&self, now: Tick, grace_period: u64) -> bool {
        now > self.deadline(grace_period)
    }
}

/// Approval progress of a proposal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ApprovalStatus {
    /// Distinct approvals collected.
    pub approvals: usize,
    /// Approvals required.
    pub threshold: usize,
}

impl ApprovalStatus {
    /// Returns true when the threshold is reached.
    #[must_use]
    pub fn is_met(&self) -> bool {
        self.approvals >= self.threshold
    }
}
