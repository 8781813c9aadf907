//! Prometheus metrics for the runtime.
//!
//! All metrics follow the naming convention: `ur_<area>_<metric>_<unit>`
//!
//! ## Metric Types
//!
//! - **Counter**: monotonically increasing (e.g. guarded_calls_total)
//! - **Histogram**: distribution of values (e.g. invocation_duration_seconds)

use lazy_static::lazy_static;
use prometheus::{
    exponential_buckets, Counter, CounterVec, Encoder, Histogram, HistogramOpts, Opts, Registry,
    TextEncoder,
};

use crate::TelemetryError;

lazy_static! {
    /// Global metrics registry
    pub static ref REGISTRY: Registry = Registry::new();

    // =========================================================================
    // DISPATCH METRICS
    // =========================================================================

    /// Guarded calls by outcome (ok, error, reentrant, panic)
    pub static ref GUARDED_CALLS: CounterVec = CounterVec::new(
        Opts::new("ur_guarded_calls_total", "Dispatched calls by outcome"),
        &["outcome"]
    ).expect("metric creation failed");

    /// Invocation duration, wall clock
    pub static ref INVOCATION_DURATION: Histogram = Histogram::with_opts(
        HistogramOpts::new(
            "ur_runtime_invocation_duration_seconds",
            "Time spent in one runtime invocation"
        ).buckets(exponential_buckets(0.00001, 2.0, 16).expect("valid buckets"))
    ).expect("metric creation failed");

    // =========================================================================
    // ACCESS CONTROL METRICS
    // =========================================================================

    /// Authorization denials by operation (for alerting)
    pub static ref AUTHORIZATION_DENIALS: CounterVec = CounterVec::new(
        Opts::new("ur_authorization_denials_total", "Authorization denials by operation"),
        &["operation"]
    ).expect("metric creation failed");

    // =========================================================================
    // LIFECYCLE METRICS
    // =========================================================================

    /// Module activations
    pub static ref MODULE_ACTIVATIONS: Counter = Counter::new(
        "ur_module_activations_total",
        "Total number of implementation modules activated"
    ).expect("metric creation failed");

    /// Phase transitions by target phase
    pub static ref PHASE_TRANSITIONS: CounterVec = CounterVec::new(
        Opts::new("ur_phase_transitions_total", "Phase transitions by target phase"),
        &["to"]
    ).expect("metric creation failed");
}

/// Register all metrics with the global registry. Calling it again is a
/// no-op.
///
/// # Errors
///
/// `MetricsInit` for any registry failure other than a repeat registration.
pub fn register_metrics() -> Result<(), TelemetryError> {
    let metrics: Vec<Box<dyn prometheus::core::Collector>> = vec![
        Box::new(GUARDED_CALLS.clone()),
        Box::new(INVOCATION_DURATION.clone()),
        Box::new(AUTHORIZATION_DENIALS.clone()),
        Box::new(MODULE_ACTIVATIONS.clone()),
        Box::new(PHASE_TRANSITIONS.clone()),
    ];

    for metric in metrics {
        match REGISTRY.register(metric) {
            Ok(()) | Err(prometheus::Error::AlreadyReg) => {}
            Err(e) => return Err(TelemetryError::MetricsInit(e.to_string())),
        }
    }
    Ok(())
}

/// Encode all metrics as Prometheus text format.
///
/// # Errors
///
/// `MetricsInit` if encoding fails.
pub fn gather_metrics() -> Result<String, TelemetryError> {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    encoder
        .encode(&metric_families, &mut buffer)
        .map_err(|e| TelemetryError::MetricsInit(e.to_string()))?;
    String::from_utf8(buffer).map_err(|e| TelemetryError::MetricsInit(e.to_string()))
}

/// Timer guard for automatic histogram observation.
pub struct HistogramTimer {
    histogram: Histogram,
    start: std::time::Instant,
}

impl HistogramTimer {
    /// Start a new timer for the given histogram.
    #[must_use]
    pub fn new(histogram: &Histogram) -> Self {
        Self {
            histogram: histogram.clone(),
            start: std::time::Instant::now(),
        }
    }
}

impl Drop for HistogramTimer {
    fn drop(&mut self) {
        self.histogram.observe(self.start.elapsed().as_secs_f64());
    }
}

/// Start timing for a histogram. Observation happens on drop.
#[macro_export]
macro_rules! time_histogram {
    ($histogram:expr) => {
        $crate::metrics::HistogramTimer::new(&$histogram)
    };
}
