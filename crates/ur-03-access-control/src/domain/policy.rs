//! # Operation Policies
//!
//! Registered per operation. Unregistered operations are denied to
//! everyone but the owner.

use serde::{Deserialize, Serialize};
use shared_types::RoleId;

/// Names of the controller's own administrative actions, reported in
/// `Unauthorized` errors.
pub mod operations {
    use shared_types::OperationId;

    /// `grant_role`.
    pub const GRANT_ROLE: OperationId = OperationId::from_static("access.grant_role");
    /// `revoke_role`.
    pub const REVOKE_ROLE: OperationId = OperationId::from_static("access.revoke_role");
    /// `set_role_admin`.
    pub const SET_ROLE_ADMIN: OperationId = OperationId::from_static("access.set_role_admin");
    /// `transfer_ownership`.
    pub const TRANSFER_OWNERSHIP: OperationId =
        OperationId::from_static("access.transfer_ownership");
    /// `register_operation`.
    pub const REGISTER_OPERATION: OperationId =
        OperationId::from_static("access.register_operation");
    /// `cancel_timelocked`.
    pub const CANCEL_TIMELOCK: OperationId = OperationId::from_static("access.cancel_timelock");
}

/// Authorization rule for one operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationPolicy {
    /// Role a caller must hold. `None` opens the operation to any principal.
    pub required_role: Option<RoleId>,
    /// Non-owners may only perform the operation through an approved
    /// time-lock proposal.
    pub timelocked: bool,
    /// Still permitted while the emergency stop is engaged.
    pub allowed_when_halted: bool,
}

impl OperationPolicy {
    /// Policy requiring `role`.
    #[must_use]
    pub fn role(role: RoleId) -> Self {
        Self {
            required_role: Some(role),
            timelocked: false,
            allowed_when_halted: false,
        }
    }

    /// Policy open to any principal.
    #[must_use]
    pub fn public() -> Self {
        Self {
            required_role: None,
            timelocked: false,
            allowed_when_halted: false,
        }
    }

    /// Marks the operation as time-locked.
    #[must_use]
    pub fn timelocked(mut self) -> Self {
        self.timelocked = true;
        self
    }

    /// Keeps the operation available during an emergency stop.
    #[must_use]
    pub fn allowed_when_halted(mut self) -> Self {
        self.allowed_when_halted = true;
        self
    }
}
