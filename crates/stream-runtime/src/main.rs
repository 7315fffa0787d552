//! # Stream Runtime
//!
//! Demo binary: a number source aggregated with a doubling processor in one
//! process. The source feeds the processor over a shared in-process channel;
//! the processor output is bound to the in-memory broker, where this binary
//! reads the results back.
//!
//! ```text
//! source ──(source.output, in-process)──► doubler ──(output, binder)──► broker
//! ```
//!
//! ## Startup Sequence
//!
//! 1. Initialize telemetry (`STREAM_LOG_LEVEL`, `STREAM_JSON_LOGS`)
//! 2. Load configuration (`STREAM_CONFIG`, `STREAM_BINDINGS_*`)
//! 3. Build binders and the binding service
//! 4. Start the aggregate, collect results, shut down

use std::time::Duration;

use anyhow::{Context, Result};
use tracing::{info, warn};

use stream_runtime::{AggregateBuilder, ModuleSpec, StreamConfig, StreamContainer};
use stream_telemetry::{encode_metrics, init_telemetry, TelemetryConfig};
use stream_types::{BindingError, Message, CONTENT_TYPE};

const COUNT: u64 = 5;

#[tokio::main]
async fn main() -> Result<()> {
    let telemetry = TelemetryConfig::from_env();
    let _telemetry = init_telemetry(&telemetry).context("failed to initialize telemetry")?;

    let config = StreamConfig::from_env().context("failed to load stream configuration")?;
    let container = StreamContainer::new(config).context("failed to build binders")?;

    let source = ModuleSpec::source()
        .content_type("output", "text/plain")
        .on_ready(|channels| {
            let output = channels
                .output("output")
                .cloned()
                .ok_or_else(|| BindingError::config("source output missing"))?;
            tokio::spawn(async move {
                for n in 1..=COUNT {
                    tokio::time::sleep(Duration::from_millis(50)).await;
                    output.send(Message::new(n.to_string()));
                }
            });
            Ok(())
        });

    let doubler = ModuleSpec::processor().named("doubler").on_ready(|channels| {
        let mut input = channels
            .input("input")
            .ok_or_else(|| BindingError::config("doubler input missing"))?
            .subscribe();
        let output = channels
            .output("output")
            .cloned()
            .ok_or_else(|| BindingError::config("doubler output missing"))?;
        tokio::spawn(async move {
            while let Some(message) = input.recv().await {
                match message.payload_str().trim().parse::<u64>() {
                    Ok(n) => {
                        output.send(Message::new((n * 2).to_string()).with_header(CONTENT_TYPE, "text/plain"));
                    }
                    Err(_) => warn!(id = %message.id, "Dropping non-numeric payload"),
                }
            }
        });
        Ok(())
    });

    let composition = AggregateBuilder::from(source.build())
        .as_role("source")
        .to(doubler.build())
        .as_role("doubler")
        .build()
        .context("invalid composition")?;

    let destination = container
        .service()
        .resolve(Some("doubler"), "output")
        .context("failed to resolve doubler output")?
        .destination()
        .to_string();
    let mut results = container.broker().subscribe(&destination);

    let runtime = container.aggregate(composition);
    runtime.start().await.context("failed to start aggregate")?;
    info!("Aggregate running, reading {} result(s) from '{}'", COUNT, destination);

    for _ in 0..COUNT {
        match tokio::time::timeout(Duration::from_secs(2), results.recv()).await {
            Ok(Ok(message)) => info!(
                payload = %message.payload_str(),
                content_type = ?message.content_type(),
                "Result received"
            ),
            Ok(Err(e)) => {
                warn!(error = %e, "Result stream ended");
                break;
            }
            Err(_) => {
                warn!("Timed out waiting for results");
                break;
            }
        }
    }

    let health = runtime.health();
    info!("Health: {}", health.to_json().context("failed to encode health report")?);

    runtime.shutdown().await;

    match encode_metrics() {
        Ok(text) => info!("Metrics:\n{}", text),
        Err(e) => warn!(error = %e, "Failed to encode metrics"),
    }

    Ok(())
}
