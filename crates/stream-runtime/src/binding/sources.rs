//! Property sources consulted by the resolver.
//!
//! A source answers "what is `key` for channel `channel`?" and nothing else.
//! Precedence between sources is the resolver's business.

use std::collections::BTreeMap;

/// One layer of binding configuration.
pub trait PropertySource: Send + Sync {
    /// Label used in diagnostics.
    fn name(&self) -> &str;

    /// Raw value of `key` for `channel`, if this layer sets it.
    fn get(&self, channel: &str, key: &str) -> Option<String>;

    /// False for layers that answer the same for every channel.
    fn is_channel_specific(&self) -> bool {
        true
    }
}

/// Per-channel values held in memory, typically the `[bindings.*]` tables of
/// the configuration file.
#[derive(Debug, Clone, Default)]
pub struct MapPropertySource {
    name: String,
    channels: BTreeMap<String, BTreeMap<String, String>>,
}

impl MapPropertySource {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            channels: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn with(mut self, channel: &str, key: &str, value: impl Into<String>) -> Self {
        self.insert(channel, key, value);
        self
    }

    pub fn insert(&mut self, channel: &str, key: &str, value: impl Into<String>) {
        self.channels
            .entry(channel.to_string())
            .or_default()
            .insert(key.to_string(), value.into());
    }

    /// Channels with at least one value.
    pub fn channels(&self) -> impl Iterator<Item = &str> {
        self.channels.keys().map(String::as_str)
    }
}

impl PropertySource for MapPropertySource {
    fn name(&self) -> &str {
        &self.name
    }

    fn get(&self, channel: &str, key: &str) -> Option<String> {
        self.channels.get(channel)?.get(key).cloned()
    }
}

/// The same values for every channel.
#[derive(Debug, Clone, Default)]
pub struct DefaultsPropertySource {
    name: String,
    values: BTreeMap<String, String>,
}

impl DefaultsPropertySource {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            values: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn with(mut self, key: &str, value: impl Into<String>) -> Self {
        self.values.insert(key.to_string(), value.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl PropertySource for DefaultsPropertySource {
    fn name(&self) -> &str {
        &self.name
    }

    fn get(&self, _channel: &str, key: &str) -> Option<String> {
        self.values.get(key).cloned()
    }

    fn is_channel_specific(&self) -> bool {
        false
    }
}

/// Prefix of binding override variables.
pub const ENV_PREFIX: &str = "STREAM_BINDINGS_";

/// Overrides from environment variables.
///
/// `consumer.max-attempts` for channel `source.output` is read from
/// `STREAM_BINDINGS_SOURCE_OUTPUT_CONSUMER_MAX_ATTEMPTS`.
#[derive(Debug, Clone, Default)]
pub struct EnvPropertySource {
    vars: BTreeMap<String, String>,
}

impl EnvPropertySource {
    /// Snapshot the current process environment.
    pub fn from_env() -> Self {
        Self::from_vars(std::env::vars())
    }

    /// Build from explicit variables. Names without the prefix are ignored.
    pub fn from_vars<I, K, V>(vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let vars = vars
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .filter(|(k, _)| k.starts_with(ENV_PREFIX))
            .collect();
        Self { vars }
    }

    /// Variable name carrying `key` for `channel`.
    #[must_use]
    pub fn variable_name(channel: &str, key: &str) -> String {
        format!("{}{}_{}", ENV_PREFIX, normalize(channel), normalize(key))
    }

    pub fn len(&self) -> usize {
        self.vars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }
}

fn normalize(raw: &str) -> String {
    raw.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_uppercase()
            } else {
                '_'
            }
        })
        .collect()
}

impl PropertySource for EnvPropertySource {
    fn name(&self) -> &str {
        "environment"
    }

    fn get(&self, channel: &str, key: &str) -> Option<String> {
        self.vars.get(&Self::variable_name(channel, key)).cloned()
    }
}
