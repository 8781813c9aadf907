//! # UR-02 Dispatch Guard - Forwarded Call Safety
//!
//! **Component ID:** 2
//!
//! Wraps every call that forwards control into module code.
//!
//! ## Domain Invariants
//!
//! | ID | Invariant | Enforcement Location |
//! |----|-----------|---------------------|
//! | INVARIANT-1 | At most one in-flight forward per operation id | `guard.rs` - `guarded_call()` marker check |
//! | INVARIANT-2 | Failed forwards leave no writes behind | `guard.rs` - checkpoint + rollback |
//! | INVARIANT-3 | Marker cleared on success, error, and panic | `guard.rs` - `finish()` |
//!
//! Callers commit their own effects before forwarding
//! (checks-effects-interactions); the guard makes sure no overlapping
//! forward observes a half-committed state for the same operation.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod errors;
pub mod guard;

pub use errors::GuardError;
pub use guard::DispatchGuard;

/// Component ID.
pub const COMPONENT_ID: u8 = 2;
