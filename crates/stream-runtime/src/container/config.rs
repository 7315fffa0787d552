//! # Stream Configuration
//!
//! TOML configuration for binders, bindings and runtime limits.
//!
//! ```toml
//! default-binder = "local"
//!
//! [runtime]
//! unbind-timeout-ms = 5000
//! strict-shared-bindings = false
//! channel-capacity = 1024
//!
//! [defaults]
//! content-type = "text/plain"
//!
//! [bindings.output]
//! destination = "numbers"
//! producer.required-groups = ["audit"]
//!
//! [bindings."doubler.input"]
//! group = "doublers"
//!
//! [binders.local]
//! type = "in-memory"
//! ```
//!
//! Binding tables may nest (`[bindings.source.output]` is the same as
//! `[bindings."source.output"]`); the property key is matched from the end of
//! the dotted path. Unknown keys are rejected in every section.
//!
//! The file path is taken from `STREAM_CONFIG` when loading from the
//! environment.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::Deserialize;
use thiserror::Error;

use stream_channel::DEFAULT_CHANNEL_CAPACITY;
use stream_types::keys;

use crate::binding::properties::BindingPropertiesResolver;
use crate::binding::sources::{DefaultsPropertySource, EnvPropertySource, MapPropertySource};

/// Variable naming the configuration file.
pub const CONFIG_PATH_ENV: &str = "STREAM_CONFIG";

/// Configuration loading errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {error}")]
    Io { path: String, error: String },

    #[error("Failed to parse config: {0}")]
    Parse(String),

    #[error("Unknown binding property '{key}' in [{section}]")]
    UnknownProperty { section: String, key: String },
}

/// Runtime limits.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case", default, deny_unknown_fields)]
pub struct RuntimeConfig {
    /// Bound on each unbind call at shutdown.
    pub unbind_timeout_ms: u64,
    /// Reject binder/destination/group settings on in-process channels.
    pub strict_shared_bindings: bool,
    /// Buffer of every channel created by the runtime.
    pub channel_capacity: usize,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            unbind_timeout_ms: 5000,
            strict_shared_bindings: false,
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
        }
    }
}

/// One `[binders.<name>]` entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BinderConfig {
    pub binder_type: String,
    pub environment: BTreeMap<String, String>,
}

/// Complete configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StreamConfig {
    pub default_binder: Option<String>,
    pub runtime: RuntimeConfig,
    /// `[defaults]`, property key → value.
    pub defaults: BTreeMap<String, String>,
    /// `[bindings.*]`, channel → property key → value.
    pub bindings: BTreeMap<String, BTreeMap<String, String>>,
    pub binders: BTreeMap<String, BinderConfig>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
struct ConfigFile {
    default_binder: Option<String>,
    #[serde(default)]
    runtime: RuntimeConfig,
    #[serde(default)]
    defaults: toml::Table,
    #[serde(default)]
    bindings: toml::Table,
    #[serde(default)]
    binders: BTreeMap<String, BinderFile>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct BinderFile {
    #[serde(rename = "type")]
    binder_type: String,
    #[serde(default)]
    environment: toml::Table,
}

impl StreamConfig {
    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be read or parsed.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path.as_ref()).map_err(|e| ConfigError::Io {
            path: path.as_ref().display().to_string(),
            error: e.to_string(),
        })?;

        Self::parse(&content)
    }

    /// Load from the file named by `STREAM_CONFIG`, or defaults when unset.
    pub fn from_env() -> Result<Self, ConfigError> {
        match std::env::var(CONFIG_PATH_ENV) {
            Ok(path) if !path.trim().is_empty() => Self::load(path.trim()),
            _ => Ok(Self::default()),
        }
    }

    /// Parse configuration from a TOML string.
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        let file: ConfigFile = toml::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))?;

        let mut defaults = BTreeMap::new();
        for (path, value) in flatten(&file.defaults) {
            if !keys::ALL.contains(&path.as_str()) {
                return Err(ConfigError::UnknownProperty {
                    section: "defaults".into(),
                    key: path,
                });
            }
            defaults.insert(path, value);
        }

        let mut bindings: BTreeMap<String, BTreeMap<String, String>> = BTreeMap::new();
        for (path, value) in flatten(&file.bindings) {
            let (channel, key) = split_binding_path(&path).ok_or_else(|| ConfigError::UnknownProperty {
                section: "bindings".into(),
                key: path.clone(),
            })?;
            bindings.entry(channel).or_default().insert(key, value);
        }

        let binders = file
            .binders
            .into_iter()
            .map(|(name, binder)| {
                let config = BinderConfig {
                    binder_type: binder.binder_type,
                    environment: flatten(&binder.environment),
                };
                (name, config)
            })
            .collect();

        Ok(Self {
            default_binder: file.default_binder.filter(|b| !b.trim().is_empty()),
            runtime: file.runtime,
            defaults,
            bindings,
            binders,
        })
    }

    /// Property layers, most specific first: `env`, file bindings, file
    /// defaults, global default binder.
    #[must_use]
    pub fn property_layers(&self, env: EnvPropertySource) -> BindingPropertiesResolver {
        let mut file_bindings = MapPropertySource::new("bindings");
        for (channel, values) in &self.bindings {
            for (key, value) in values {
                file_bindings.insert(channel, key, value.clone());
            }
        }

        let file_defaults = self
            .defaults
            .iter()
            .fold(DefaultsPropertySource::new("defaults"), |source, (key, value)| {
                source.with(key, value.clone())
            });

        let mut global = DefaultsPropertySource::new("global");
        if let Some(binder) = &self.default_binder {
            global = global.with(keys::BINDER, binder.clone());
        }

        BindingPropertiesResolver::new()
            .with_layer(env)
            .with_layer(file_bindings)
            .with_layer(file_defaults)
            .with_layer(global)
    }
}

/// Split `<channel>.<key>` using the longest known key suffix.
fn split_binding_path(path: &str) -> Option<(String, String)> {
    keys::ALL
        .iter()
        .filter_map(|key| {
            let channel = path.strip_suffix(key)?.strip_suffix('.')?;
            (!channel.is_empty()).then(|| (channel.to_string(), (*key).to_string()))
        })
        .max_by_key(|(_, key)| key.len())
}

/// Flatten nested tables into dotted keys with string values.
fn flatten(table: &toml::Table) -> BTreeMap<String, String> {
    let mut out = BTreeMap::new();
    flatten_into("", table, &mut out);
    out
}

fn flatten_into(prefix: &str, table: &toml::Table, out: &mut BTreeMap<String, String>) {
    for (key, value) in table {
        let path = if prefix.is_empty() {
            key.clone()
        } else {
            format!("{}.{}", prefix, key)
        };
        match value {
            toml::Value::Table(nested) => flatten_into(&path, nested, out),
            other => {
                out.insert(path, scalar(other));
            }
        }
    }
}

fn scalar(value: &toml::Value) -> String {
    match value {
        toml::Value::String(s) => s.clone(),
        toml::Value::Array(items) => items.iter().map(scalar).collect::<Vec<_>>().join(","),
        other => other.to_string(),
    }
}
