//! Domain types for the access controller.

pub mod layout;
pub mod policy;
pub mod timelock;

pub use policy::OperationPolicy;
pub use timelock::{ApprovalStatus, TimeLock, TimelockHandle};
