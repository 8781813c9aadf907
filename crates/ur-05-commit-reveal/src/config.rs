//! # Oracle Configuration

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Inconsistent oracle timing.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// A reveal could share the commit's tick.
    #[error("min_reveal_delay must be at least 1")]
    ZeroRevealDelay,

    /// The window closes before reveals open.
    #[error("reveal_window ({reveal_window}) must exceed min_reveal_delay ({min_reveal_delay})")]
    WindowTooShort {
        /// Configured delay.
        min_reveal_delay: u64,
        /// Configured window.
        reveal_window: u64,
    },
}

/// Reveal timing and access settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OracleConfig {
    /// Ticks after the commit before a reveal is accepted. At least 1, so a
    /// reveal can never share the commit's tick.
    pub min_reveal_delay: u64,
    /// Ticks after the commit at which the reveal window closes
    /// (exclusive).
    pub reveal_window: u64,
    /// Committers must be authorized for `<name>.commit`.
    pub restricted: bool,
}

impl Default for OracleConfig {
    fn default() -> Self {
        Self {
            min_reveal_delay: 1,
            reveal_window: 100,
            restricted: false,
        }
    }
}

impl OracleConfig {
    /// Checks the timing bounds.
    ///
    /// # Errors
    ///
    /// The first violated bound.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.min_reveal_delay == 0 {
            return Err(ConfigError::ZeroRevealDelay);
        }
        if self.reveal_window <= self.min_reveal_delay {
            return Err(ConfigError::WindowTooShort {
                min_reveal_delay: self.min_reveal_delay,
                reveal_window: self.reveal_window,
            });
        }
        Ok(())
    }
}
