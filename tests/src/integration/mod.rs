//! # Integration Scenarios
//!
//! Each module drives a bootstrapped [`ur_runtime::Runtime`] through one
//! end-to-end story and checks both the returned results and the state left
//! behind.

pub mod governance;
pub mod lifecycle;
pub mod reentrancy;
pub mod upgrades;
