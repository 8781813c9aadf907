//! # UR-01 Storage Facade - Persistent State Component
//!
//! **Component ID:** 1
//! **Role:** sole owner of every persistent slot in the runtime.
//!
//! ## Purpose
//!
//! A namespaced key-value store whose slots keep the type they were first
//! written with. That single rule is what makes module swaps safe: new
//! code may append keys but can never reinterpret an existing one.
//!
//! ## Domain Invariants
//!
//! | ID | Invariant | Enforcement Location |
//! |----|-----------|---------------------|
//! | INVARIANT-1 | Type tag is sticky (survives deletion) | `facade.rs` - `StorageFacade::set()` |
//! | INVARIANT-2 | Slots are tombstoned, never erased | `facade.rs` - `StorageFacade::delete()` |
//! | INVARIANT-3 | Outermost commit is all-or-nothing | `facade.rs` - `StorageFacade::commit()` |
//! | INVARIANT-4 | Rolled-back work never notifies | `facade.rs` - `Frame::pending` |
//!
//! ## Outbound Dependencies
//!
//! | Port | Trait | Purpose |
//! |------|-------|---------|
//! | Backend | `SlotStore` | committed slots |
//! | Audit | `shared_types::ChangeSink` | change notifications |

#![warn(missing_docs)]
#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]

// =============================================================================
// MODULES
// =============================================================================

pub mod adapters;
pub mod domain;
pub mod errors;
pub mod facade;
pub mod ports;

// =============================================================================
// RE-EXPORTS
// =============================================================================

pub use adapters::InMemorySlotStore;
pub use domain::{Namespace, SlotId, SlotValue, StorageSlot, TypeTag};
pub use errors::StorageError;
pub use facade::{Checkpoint, StorageFacade};
pub use ports::SlotStore;

/// Component ID.
pub const COMPONENT_ID: u8 = 1;

/// Component name.
pub const COMPONENT_NAME: &str = "Storage Facade";
