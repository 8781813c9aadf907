//! # Access Controller (Component 3)
//!
//! Decides whether a principal may perform an operation.
//!
//! ## Responsibilities
//!
//! - Single owner, set once through `initialize`
//! - Roles with per-role admin roles (default `admin`)
//! - Per-operation policies: required role, time-lock, halt exemption
//! - Time-locked proposals with an approval threshold and grace period
//! - Emergency stop
//!
//! ## Security Invariants
//!
//! | Invariant | Enforcement |
//! |-----------|-------------|
//! | Default deny | Unregistered operations only pass for the owner |
//! | No self-escalation | Role changes need the owner or the role's admin role |
//! | Time-lock soundness | Execution needs `earliest <= now <= earliest + grace` and enough approvals |
//! | Single use | Executed proposals are deleted |
//! | No partial state | Every check runs before the first write |

pub mod config;
pub mod controller;
pub mod domain;
pub mod emergency;
pub mod errors;

pub use config::AccessConfig;
pub use controller::AccessController;
pub use domain::policy::operations;
pub use domain::{ApprovalStatus, OperationPolicy, TimeLock, TimelockHandle};
pub use emergency::EmergencyStop;
pub use errors::{AccessError, DenialReason};

/// Component identifier.
pub const COMPONENT_ID: u8 = 3;

/// Component name.
pub const COMPONENT_NAME: &str = "Access Controller";
