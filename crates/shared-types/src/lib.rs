//! # Shared Types Crate
//!
//! Vocabulary shared by every runtime component: identities, ticks,
//! digests, operation and role names, and the ports through which the
//! runtime talks to its environment (clock, entropy, change sink).
//!
//! ## Design Principles
//!
//! - **Single Source of Truth**: cross-component types are defined here.
//! - **Ports, not globals**: time, entropy, and audit delivery are traits
//!   injected into the components that need them.
//! - **Caller identity is an argument**: a `Principal` is supplied by the
//!   embedding environment on every mutating call.

pub mod crypto;
pub mod entities;
pub mod entropy;
pub mod notifications;
pub mod time;

pub use crypto::{keccak256, keccak256_parts};
pub use entities::*;
pub use entropy::{Entropy, EntropySource, SeededEntropy};
pub use notifications::{ChangeNotification, ChangeSink, Component, NotificationPayload, NullSink};
pub use time::{Clock, ManualClock, SystemClock};
