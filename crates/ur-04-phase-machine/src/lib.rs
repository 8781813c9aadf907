//! # Phase Machine (Component 4)
//!
//! Application-defined lifecycle: phases, the operations each phase
//! permits, and guarded transitions between them.
//!
//! ## Transition guards
//!
//! | Guard | Applies to |
//! |-------|------------|
//! | Minimum dwell in the source phase | manual and automatic |
//! | Authorization through the access controller | manual only |
//! | Predicate over storage | manual and automatic |
//!
//! Terminal phases have no outgoing rules and permit no operations.

pub mod definition;
pub mod errors;
pub mod machine;

pub use definition::{PhaseDefinition, PhaseDefinitionBuilder, PhaseId, Predicate, TransitionRule};
pub use errors::{DefinitionError, PhaseError, TransitionFailure};
pub use machine::{PhaseMachine, PhaseState, PhaseTransition};

/// Component identifier.
pub const COMPONENT_ID: u8 = 4;

/// Component name.
pub const COMPONENT_NAME: &str = "Phase Machine";
