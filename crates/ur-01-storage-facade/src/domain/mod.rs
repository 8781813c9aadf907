//! # Domain Layer (Inner Hexagon)
//!
//! Slot identity, type tags, and value encodings.
//! NO I/O: backends live behind the `SlotStore` port.

pub mod slot;
pub mod value;

pub use slot::*;
pub use value::*;
