//! # Adapters Layer (Outer Hexagon)
//!
//! Concrete `SlotStore` backends.

pub mod memory_store;

pub use memory_store::*;
