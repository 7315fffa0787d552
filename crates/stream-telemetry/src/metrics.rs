//! Prometheus metrics for channel bindings.
//!
//! All metrics follow the naming convention: `stream_<area>_<metric>_<unit>`

use lazy_static::lazy_static;
use prometheus::{
    exponential_buckets, Counter, CounterVec, Encoder, Gauge, HistogramOpts, HistogramVec, Opts,
    Registry, TextEncoder,
};
use std::sync::Arc;

use crate::TelemetryError;

lazy_static! {
    /// Global metrics registry
    pub static ref REGISTRY: Registry = Registry::new();

    // =========================================================================
    // BINDING METRICS
    // =========================================================================

    /// Bindings currently active
    pub static ref BINDINGS_ACTIVE: Gauge = Gauge::new(
        "stream_bindings_active",
        "Number of external bindings currently active"
    ).expect("metric creation failed");

    /// Bindings created
    pub static ref BINDINGS_CREATED: CounterVec = CounterVec::new(
        Opts::new("stream_bindings_created_total", "External bindings created"),
        &["binder", "direction"]
    ).expect("metric creation failed");

    /// Failed bind attempts
    pub static ref BIND_FAILURES: CounterVec = CounterVec::new(
        Opts::new("stream_bind_failures_total", "Failed bind attempts"),
        &["binder", "error_kind"]
    ).expect("metric creation failed");

    /// Time spent in a binder's bind call
    pub static ref BIND_DURATION: HistogramVec = HistogramVec::new(
        HistogramOpts::new(
            "stream_bind_duration_seconds",
            "Time spent binding a channel"
        ).buckets(exponential_buckets(0.0001, 2.0, 14).expect("valid buckets")),
        &["binder"]
    ).expect("metric creation failed");

    /// Unbind calls that hit the shutdown timeout
    pub static ref UNBIND_TIMEOUTS: Counter = Counter::new(
        "stream_unbind_timeouts_total",
        "Unbind calls abandoned after the shutdown timeout"
    ).expect("metric creation failed");

    // =========================================================================
    // AGGREGATION METRICS
    // =========================================================================

    /// Shared in-process channels in the current aggregate
    pub static ref SHARED_CHANNELS: Gauge = Gauge::new(
        "stream_shared_channels",
        "Channels wired in-process between aggregated modules"
    ).expect("metric creation failed");

    /// Messages sent per channel, sampled at shutdown
    pub static ref CHANNEL_MESSAGES_SENT: CounterVec = CounterVec::new(
        Opts::new("stream_channel_messages_sent_total", "Messages sent through a channel"),
        &["channel"]
    ).expect("metric creation failed");
}

/// Handle for the registered metrics
pub struct MetricsHandle {
    _registry: Arc<Registry>,
}

/// Register all metrics with the global registry.
///
/// Calling this more than once is harmless.
pub fn register_metrics() -> Result<MetricsHandle, TelemetryError> {
    let metrics: Vec<Box<dyn prometheus::core::Collector>> = vec![
        Box::new(BINDINGS_ACTIVE.clone()),
        Box::new(BINDINGS_CREATED.clone()),
        Box::new(BIND_FAILURES.clone()),
        Box::new(BIND_DURATION.clone()),
        Box::new(UNBIND_TIMEOUTS.clone()),
        Box::new(SHARED_CHANNELS.clone()),
        Box::new(CHANNEL_MESSAGES_SENT.clone()),
    ];

    for metric in metrics {
        match REGISTRY.register(metric) {
            Ok(()) | Err(prometheus::Error::AlreadyReg) => {}
            Err(e) => return Err(TelemetryError::MetricsInit(e.to_string())),
        }
    }

    Ok(MetricsHandle {
        _registry: Arc::new(REGISTRY.clone()),
    })
}

/// Encode all metrics as Prometheus text format.
pub fn encode_metrics() -> Result<String, TelemetryError> {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    encoder
        .encode(&metric_families, &mut buffer)
        .map_err(|e| TelemetryError::MetricsInit(e.to_string()))?;
    String::from_utf8(buffer).map_err(|e| TelemetryError::MetricsInit(e.to_string()))
}
