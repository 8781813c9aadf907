//! # Access Configuration

use serde::{Deserialize, Serialize};
use shared_types::RoleId;

/// Tunables for time-locked operations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AccessConfig {
    /// Approvals required before a time-locked proposal can execute.
    pub approval_threshold: usize,
    /// Minimum distance between proposal and `earliest_execute_at`, in ticks.
    pub min_timelock_delay: u64,
    /// Ticks after `earliest_execute_at` during which execution is allowed.
    pub timelock_grace_period: u64,
    /// Role whose members may approve proposals (the owner always may).
    pub approver_role: RoleId,
}

impl Default for AccessConfig {
    fn default() -> Self {
        Self {
            approval_threshold: 2,
            min_timelock_delay: 10,
            timelock_grace_period: 100,
            approver_role: RoleId::TIMELOCK_APPROVER,
        }
    }
}
