//! # Commit-Reveal Oracle (Component 5)
//!
//! Manipulation-resistant randomness from a two-phase protocol built on
//! the storage facade, the access controller, and the phase machine.
//!
//! ## Protocol Invariants
//!
//! | Invariant | Enforcement |
//! |-----------|-------------|
//! | No same-tick precomputation | `min_reveal_delay >= 1`, reveal needs `now >= commit + delay` |
//! | Bounded window | reveal needs `now < commit + reveal_window` |
//! | Binding | `seal(preimage, salt)` must equal the committed value |
//! | Fresh entropy | entropy observed in `(commit_tick, now]` |
//! | Single use | revealed and forfeited records are never reused |

pub mod config;
pub mod errors;
pub mod oracle;
pub mod record;

pub use config::{ConfigError, OracleConfig};
pub use errors::OracleError;
pub use oracle::CommitRevealOracle;
pub use record::{derive_output, seal, CommitRecord, CommitStatus};

/// Component identifier.
pub const COMPONENT_ID: u8 = 5;

/// Component name.
pub const COMPONENT_NAME: &str = "Commit-Reveal Oracle";
