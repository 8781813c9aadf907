//! # Upgradeable Runtime Test Suite
//!
//! Unified test crate containing:
//!
//! ## Structure
//!
//! ```text
//! tests/src/
//! ├── fixtures.rs       # Vault modules (v1, v2, v3) and runtime harness
//! │
//! ├── integration/      # End-to-end scenarios through the runtime
//! │   ├── reentrancy.rs
//! │   ├── upgrades.rs
//! │   ├── governance.rs # Time-locks and emergency stop
//! │   └── lifecycle.rs  # Phases and commit-reveal
//! │
//! └── properties/       # proptest invariants per component
//! ```
//!
//! ## Running Tests
//!
//! ```bash
//! # All tests
//! cargo test -p ur-tests
//!
//! # By category
//! cargo test -p ur-tests integration::
//! cargo test -p ur-tests properties::
//!
//! # Benchmarks
//! cargo bench -p ur-tests
//! ```

#![allow(dead_code)]

pub mod fixtures;
pub mod integration;
pub mod properties;
