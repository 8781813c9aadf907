//! # Ports Layer (Middle Hexagon)
//!
//! - **Driven Port (Outbound)**: `SlotStore`, the persistence backend.
//! - The facade itself is the driving surface; see `facade.rs`.

pub mod store;

pub use store::*;
