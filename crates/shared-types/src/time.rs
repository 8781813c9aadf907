//! # Time Source
//!
//! Port for the execution environment's coarse, monotonic clock.
//! Consumed by the phase machine, time-locks, and commit/reveal windows.

use crate::entities::Tick;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

/// Source of the current tick.
pub trait Clock: Send + Sync {
    /// The current tick.
    fn now(&self) -> Tick;
}

/// Clock driven explicitly by the caller.
///
/// Used by tests and by embedders whose tick is a block height. `set` may
/// move backwards to simulate adversarial jitter; production sources are
/// expected to be non-decreasing.
#[derive(Debug, Default)]
pub struct ManualClock {
    tick: AtomicU64,
}

impl ManualClock {
    /// Creates a clock at `start`.
    #[must_use]
    pub fn new(start: Tick) -> Self {
        Self {
            tick: AtomicU64::new(start.0),
        }
    }

    /// Sets the current tick.
    pub fn set(&self, tick: Tick) {
        self.tick.store(tick.0, Ordering::SeqCst);
    }

    /// Advances the clock by `delta` ticks and returns the new tick.
    pub fn advance(&self, delta: u64) -> Tick {
        let previous = self
            .tick
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |t| {
                Some(t.saturating_add(delta))
            })
            .unwrap_or_else(|t| t);
        Tick(previous.saturating_add(delta))
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Tick {
        Tick(self.tick.load(Ordering::SeqCst))
    }
}

/// Wall-clock seconds since the Unix epoch, clamped to never go backwards.
#[derive(Debug, Default)]
pub struct SystemClock {
    high_water: AtomicU64,
}

impl SystemClock {
    /// Creates a system clock.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl Clock for SystemClock {
    fn now(&self) -> Tick {
        let secs = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);
        let previous = self.high_water.fetch_max(secs, Ordering::SeqCst);
        Tick(previous.max(secs))
    }
}
