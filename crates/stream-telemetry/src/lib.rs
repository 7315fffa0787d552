//! # Stream Telemetry
//!
//! Logging and metrics for the binding runtime.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use stream_telemetry::{init_telemetry, TelemetryConfig};
//!
//! fn main() {
//!     let config = TelemetryConfig::from_env();
//!     let _guard = init_telemetry(&config).expect("Failed to init telemetry");
//!     // bindings now log through `tracing` and record Prometheus metrics
//! }
//! ```
//!
//! ## Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `STREAM_SERVICE_NAME` | `stream-runtime` | Service name attached to the startup log |
//! | `STREAM_LOG_LEVEL` / `RUST_LOG` | `info` | Log level filter |
//! | `STREAM_JSON_LOGS` | `false` (`true` in containers) | JSON formatted logs |
//! | `STREAM_CONSOLE_OUTPUT` | `true` | Emit logs to stdout |

mod config;
pub mod metrics;
mod tracing_setup;

pub use config::TelemetryConfig;
pub use metrics::{
    encode_metrics, register_metrics, MetricsHandle, BINDINGS_ACTIVE, BINDINGS_CREATED,
    BIND_DURATION, BIND_FAILURES, CHANNEL_MESSAGES_SENT, SHARED_CHANNELS, UNBIND_TIMEOUTS,
};
pub use tracing_setup::init_tracing;

use thiserror::Error;

/// Telemetry initialization errors
#[derive(Error, Debug)]
pub enum TelemetryError {
    #[error("Failed to initialize tracing subscriber: {0}")]
    TracingInit(String),

    #[error("Failed to initialize Prometheus metrics: {0}")]
    MetricsInit(String),
}

/// Initialize logging and metrics.
///
/// Returns a guard that should be held for the lifetime of the process.
pub fn init_telemetry(config: &TelemetryConfig) -> Result<TelemetryGuard, TelemetryError> {
    let metrics = register_metrics()?;
    init_tracing(config)?;

    Ok(TelemetryGuard { _metrics: metrics })
}

/// Guard that keeps telemetry active.
pub struct TelemetryGuard {
    _metrics: MetricsHandle,
}

impl Drop for TelemetryGuard {
    fn drop(&mut self) {
        tracing::info!("Shutting down telemetry");
    }
}
