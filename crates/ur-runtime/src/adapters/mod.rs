//! Adapters for the shared ports.

pub mod sinks;

pub use sinks::{BroadcastSink, MemorySink, TracingSink};
