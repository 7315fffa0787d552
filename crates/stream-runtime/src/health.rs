//! Binding health reporting.
//!
//! The runtime only reports; exposing the report over an endpoint is left to
//! the hosting application. Status is `UP` iff every registered binding is
//! active and its binder still delivers.

use std::sync::Arc;

use serde::Serialize;

use stream_types::Direction;

use crate::binding::service::{Binding, BindingState};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HealthStatus {
    Up,
    Down,
}

/// Per-binding detail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BindingHealth {
    pub channel: String,
    pub direction: Direction,
    pub binder: String,
    pub destination: String,
    pub state: BindingState,
    pub delivering: bool,
}

/// Status plus details, serializable to JSON.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HealthReport {
    pub status: HealthStatus,
    pub bindings: Vec<BindingHealth>,
    pub shared_channels: Vec<String>,
}

impl HealthReport {
    pub fn from_bindings(bindings: &[Arc<Binding>], shared_channels: Vec<String>) -> Self {
        let bindings: Vec<BindingHealth> = bindings
            .iter()
            .map(|b| BindingHealth {
                channel: b.channel_name().to_string(),
                direction: b.direction(),
                binder: b.binder_name().to_string(),
                destination: b.destination().to_string(),
                state: b.state(),
                delivering: b.is_healthy(),
            })
            .collect();

        let status = if bindings.iter().all(|b| b.delivering) {
            HealthStatus::Up
        } else {
            HealthStatus::Down
        };

        Self {
            status,
            bindings,
            shared_channels,
        }
    }

    #[must_use]
    pub fn is_up(&self) -> bool {
        self.status == HealthStatus::Up
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}
