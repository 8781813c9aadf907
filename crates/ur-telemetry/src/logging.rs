//! Structured logging.
//!
//! A single `tracing-subscriber` fmt layer filtered by `EnvFilter`. With
//! `json_logs` every line is a JSON object carrying the span context, which
//! log shippers can parse without extra configuration.

use crate::{TelemetryConfig, TelemetryError};
use tracing_subscriber::{fmt, EnvFilter};

/// Builds the filter from the configured level.
///
/// # Errors
///
/// `Config` if the directive does not parse.
pub fn build_filter(config: &TelemetryConfig) -> Result<EnvFilter, TelemetryError> {
    EnvFilter::try_new(&config.log_level)
        .map_err(|e| TelemetryError::Config(format!("log level {:?}: {e}", config.log_level)))
}

/// Installs the global subscriber.
///
/// # Errors
///
/// `Config` for a bad filter, `LoggingInit` if a global subscriber is
/// already installed.
pub fn init_logging(config: &TelemetryConfig) -> Result<(), TelemetryError> {
    if !config.console_output {
        return Ok(());
    }
    let filter = build_filter(config)?;
    let builder = fmt().with_env_filter(filter).with_target(true);

    let result = if config.json_logs {
        builder.json().with_current_span(true).try_init()
    } else {
        builder.try_init()
    };
    result.map_err(|e| TelemetryError::LoggingInit(e.to_string()))?;

    tracing::info!(
        service = %config.service_name,
        json = config.json_logs,
        "Logging initialized"
    );
    Ok(())
}

/// Log a runtime event tagged with the emitting component (any `Display`).
#[macro_export]
macro_rules! log_event {
    (info, $component:expr, $msg:expr $(, $($field:tt)*)?) => {
        tracing::info!(component = %$component, $($($field)*,)? $msg)
    };
    (warn, $component:expr, $msg:expr $(, $($field:tt)*)?) => {
        tracing::warn!(component = %$component, $($($field)*,)? $msg)
    };
    (debug, $component:expr, $msg:expr $(, $($field:tt)*)?) => {
        tracing::debug!(component = %$component, $($($field)*,)? $msg)
    };
}
