//! # Runtime Telemetry
//!
//! Logging and metrics for the upgradeable runtime.
//!
//! - **Logs**: `tracing-subscriber` fmt layer, human or JSON, `EnvFilter`
//! - **Metrics**: Prometheus counters and histograms in a private registry
//!
//! ## Usage
//!
//! ```rust,ignore
//! use ur_telemetry::{init_telemetry, TelemetryConfig};
//!
//! fn main() {
//!     init_telemetry(&TelemetryConfig::from_env()).expect("telemetry");
//!     // Runtime code here; tracing macros and metrics are now live.
//! }
//! ```
//!
//! ## Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `UR_SERVICE_NAME` | `upgradeable-runtime` | Service name in logs |
//! | `UR_LOG_LEVEL` | `info` | Log filter (falls back to `RUST_LOG`) |
//! | `UR_CONSOLE_OUTPUT` | `true` | Write logs to stdout |
//! | `UR_JSON_LOGS` | `false` | JSON log lines |

#![warn(missing_docs)]

mod config;
pub mod logging;
pub mod metrics;

pub use config::TelemetryConfig;
pub use logging::init_logging;
pub use metrics::{
    gather_metrics, register_metrics, HistogramTimer, AUTHORIZATION_DENIALS, GUARDED_CALLS,
    INVOCATION_DURATION, MODULE_ACTIVATIONS, PHASE_TRANSITIONS,
};

use thiserror::Error;

/// Telemetry initialization errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TelemetryError {
    /// A global subscriber is already installed.
    #[error("Failed to initialize logging: {0}")]
    LoggingInit(String),

    /// Metric registration or encoding failed.
    #[error("Failed to initialize Prometheus metrics: {0}")]
    MetricsInit(String),

    /// Bad configuration value.
    #[error("Invalid configuration: {0}")]
    Config(String),
}

/// Registers metrics and installs the log subscriber.
///
/// # Errors
///
/// See [`register_metrics`] and [`init_logging`].
pub fn init_telemetry(config: &TelemetryConfig) -> Result<(), TelemetryError> {
    register_metrics()?;
    init_logging(config)
}

/// Convenience macro for recording a metric increment.
#[macro_export]
macro_rules! metric_inc {
    ($metric:expr) => {
        $metric.inc()
    };
    ($metric:expr, $labels:expr) => {
        $metric.with_label_values($labels).inc()
    };
}
