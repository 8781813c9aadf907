//! # Runtime Configuration
//!
//! Unified configuration for every component and the telemetry layer.
//!
//! Sources, in increasing precedence: `Default`, a JSON document
//! (`from_json_str`), `UR_*` environment variables (`from_env`).

use serde::{Deserialize, Serialize};
use shared_types::RoleId;
use std::env;
use thiserror::Error;
use ur_03_access_control::AccessConfig;
use ur_05_commit_reveal::{ConfigError as OracleConfigError, OracleConfig};
use ur_telemetry::TelemetryConfig;

/// Complete runtime configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Namespace the implementation modules read and write.
    pub app_namespace: String,
    /// Roles and time-lock tunables.
    pub access: AccessConfig,
    /// Defaults for oracles registered without their own configuration.
    pub oracle: OracleConfig,
    /// Logging and metrics.
    pub telemetry: TelemetryConfig,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            app_namespace: "app".to_string(),
            access: AccessConfig::default(),
            oracle: OracleConfig::default(),
            telemetry: TelemetryConfig::default(),
        }
    }
}

/// Configuration errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// The JSON document did not parse.
    #[error("invalid configuration document: {0}")]
    Parse(String),

    /// An environment variable held an unusable value.
    #[error("invalid value {value:?} for {var}")]
    InvalidEnv {
        /// Variable name.
        var: &'static str,
        /// Raw value.
        value: String,
    },

    /// The application namespace is empty or reserved.
    #[error("application namespace {0:?} is empty or reserved")]
    InvalidNamespace(String),

    /// Access settings out of range.
    #[error("invalid access configuration: {0}")]
    InvalidAccess(String),

    /// Oracle timing out of range.
    #[error("invalid oracle configuration: {0}")]
    InvalidOracle(#[from] OracleConfigError),

    /// Oracles were registered without an entropy source.
    #[error("oracles require an entropy source")]
    MissingEntropy,
}

fn parse_env<T: std::str::FromStr>(var: &'static str) -> Result<Option<T>, ConfigError> {
    match env::var(var) {
        Ok(value) => value
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::InvalidEnv { var, value }),
        Err(_) => Ok(None),
    }
}

impl RuntimeConfig {
    /// Parses a JSON document; missing fields take their defaults.
    ///
    /// # Errors
    ///
    /// `Parse` if the document is malformed.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(json).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Defaults overridden by environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `UR_APP_NAMESPACE`: module namespace (default: app)
    /// - `UR_APPROVAL_THRESHOLD`: time-lock approvals required (default: 2)
    /// - `UR_MIN_TIMELOCK_DELAY`: minimum proposal delay in ticks (default: 10)
    /// - `UR_TIMELOCK_GRACE`: execution grace period in ticks (default: 100)
    /// - `UR_APPROVER_ROLE`: role allowed to approve (default: timelock.approver)
    /// - `UR_MIN_REVEAL_DELAY`, `UR_REVEAL_WINDOW`: oracle timing
    /// - telemetry variables, see [`TelemetryConfig::from_env`]
    ///
    /// # Errors
    ///
    /// `InvalidEnv` if a numeric variable does not parse.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self {
            telemetry: TelemetryConfig::from_env(),
            ..Self::default()
        }
        .with_env_overrides()
    }

    /// Applies the component `UR_*` overrides on top of `self`. Telemetry
    /// settings are left as they are.
    ///
    /// # Errors
    ///
    /// `InvalidEnv` if a numeric variable does not parse.
    pub fn with_env_overrides(mut self) -> Result<Self, ConfigError> {
        if let Ok(namespace) = env::var("UR_APP_NAMESPACE") {
            self.app_namespace = namespace;
        }
        if let Some(threshold) = parse_env("UR_APPROVAL_THRESHOLD")? {
            self.access.approval_threshold = threshold;
        }
        if let Some(delay) = parse_env("UR_MIN_TIMELOCK_DELAY")? {
            self.access.min_timelock_delay = delay;
        }
        if let Some(grace) = parse_env("UR_TIMELOCK_GRACE")? {
            self.access.timelock_grace_period = grace;
        }
        if let Ok(role) = env::var("UR_APPROVER_ROLE") {
            self.access.approver_role = RoleId::new(role);
        }
        if let Some(delay) = parse_env("UR_MIN_REVEAL_DELAY")? {
            self.oracle.min_reveal_delay = delay;
        }
        if let Some(window) = parse_env("UR_REVEAL_WINDOW")? {
            self.oracle.reveal_window = window;
        }
        Ok(self)
    }

    /// Checks every section.
    ///
    /// # Errors
    ///
    /// The first violated bound.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.app_namespace.is_empty() || self.app_namespace.starts_with("__") {
            return Err(ConfigError::InvalidNamespace(self.app_namespace.clone()));
        }
        if self.access.approval_threshold == 0 {
            return Err(ConfigError::InvalidAccess(
                "approval_threshold must be at least 1".to_string(),
            ));
        }
        if self.access.timelock_grace_period == 0 {
            return Err(ConfigError::InvalidAccess(
                "timelock_grace_period must be at least 1".to_string(),
            ));
        }
        Ok(self.oracle.validate()?)
    }
}
