//! # Error Types
//!
//! Errors raised while resolving and binding channels at startup. Every
//! variant names the offending channel (once known) and binder.

use thiserror::Error;

/// Errors from descriptor extraction, property resolution, binder selection,
/// binding and aggregation wiring.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BindingError {
    /// Malformed descriptors, duplicate names, bad property values or a
    /// missing required binder.
    #[error("Configuration error{}: {message}", on_channel(.channel))]
    Configuration {
        channel: Option<String>,
        message: String,
    },

    /// No binder name was given and more than one binder is registered.
    #[error(
        "Ambiguous binder{}: {} binders registered [{}] and none selected",
        on_channel(.channel),
        .candidates.len(),
        .candidates.join(", ")
    )]
    AmbiguousBinder {
        channel: Option<String>,
        candidates: Vec<String>,
    },

    /// A binder name was given but nothing is registered under it.
    #[error("Unknown binder '{binder}'{}", on_channel(.channel))]
    UnknownBinder {
        channel: Option<String>,
        binder: String,
    },

    /// Transport-level failure reported by the binder during bind.
    #[error("Binder '{binder}' failed to bind channel '{channel}': {message}")]
    BinderConnection {
        channel: String,
        binder: String,
        message: String,
    },

    /// More than one producer or consumer claims a shared channel name, or a
    /// shared name carries external binding settings in strict mode.
    #[error("Shared channel '{channel}' wiring conflict: {reason}")]
    SharedWiringConflict { channel: String, reason: String },
}

fn on_channel(channel: &Option<String>) -> String {
    match channel {
        Some(name) => format!(" for channel '{name}'"),
        None => String::new(),
    }
}

impl BindingError {
    /// Configuration error not tied to a specific channel.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Configuration {
            channel: None,
            message: message.into(),
        }
    }

    /// Configuration error for a channel.
    pub fn config_for(channel: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Configuration {
            channel: Some(channel.into()),
            message: message.into(),
        }
    }

    /// Fill in the channel name on variants raised before it was known.
    /// Variants that already name a channel are returned untouched.
    #[must_use]
    pub fn with_channel(self, name: &str) -> Self {
        match self {
            Self::Configuration {
                channel: None,
                message,
            } => Self::Configuration {
                channel: Some(name.to_string()),
                message,
            },
            Self::AmbiguousBinder {
                channel: None,
                candidates,
            } => Self::AmbiguousBinder {
                channel: Some(name.to_string()),
                candidates,
            },
            Self::UnknownBinder {
                channel: None,
                binder,
            } => Self::UnknownBinder {
                channel: Some(name.to_string()),
                binder,
            },
            other => other,
        }
    }

    /// Short label for metrics and log fields.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Configuration { .. } => "configuration",
            Self::AmbiguousBinder { .. } => "ambiguous_binder",
            Self::UnknownBinder { .. } => "unknown_binder",
            Self::BinderConnection { .. } => "binder_connection",
            Self::SharedWiringConflict { .. } => "shared_wiring_conflict",
        }
    }
}

/// Result alias used across the binding crates.
pub type BindingResult<T> = Result<T, BindingError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_names_channel_and_binder() {
        let err = BindingError::BinderConnection {
            channel: "output".into(),
            binder: "kafka".into(),
            message: "connection refused".into(),
        };
        let display = err.to_string();
        assert!(display.contains("output"));
        assert!(display.contains("kafka"));
        assert!(display.contains("connection refused"));
    }

    #[test]
    fn test_with_channel_fills_missing_name() {
        let err = BindingError::UnknownBinder {
            channel: None,
            binder: "c".into(),
        }
        .with_channel("input");

        assert_eq!(
            err,
            BindingError::UnknownBinder {
                channel: Some("input".into()),
                binder: "c".into(),
            }
        );
        assert_eq!(err.to_string(), "Unknown binder 'c' for channel 'input'");
    }

    #[test]
    fn test_with_channel_keeps_existing_name() {
        let err = BindingError::config_for("output", "bad").with_channel("input");
        assert!(err.to_string().contains("'output'"));
    }

    #[test]
    fn test_ambiguous_display() {
        let err = BindingError::AmbiguousBinder {
            channel: None,
            candidates: vec!["a".into(), "b".into()],
        };
        assert_eq!(
            err.to_string(),
            "Ambiguous binder: 2 binders registered [a, b] and none selected"
        );
        assert_eq!(err.kind(), "ambiguous_binder");
    }
}
