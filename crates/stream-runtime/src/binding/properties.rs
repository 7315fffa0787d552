//! # Binding Properties Resolver
//!
//! Merges per-channel configuration from an ordered list of property
//! sources. The first layer is the most specific; for every key the first
//! layer carrying a non-empty value wins.
//!
//! Typical layering built by the container:
//!
//! ```text
//! 1. environment     STREAM_BINDINGS_<CHANNEL>_<KEY>
//! 2. file bindings   [bindings.<channel>]
//! 3. file defaults   [defaults]
//! 4. global          default-binder
//! ```
//!
//! With a scope (the role of a module inside an aggregate) each layer is asked
//! for `<role>.<channel>` before `<channel>`.

use std::sync::Arc;

use tracing::debug;

use stream_types::{keys, BindingError, BindingProperties, BindingResult};

use crate::binding::sources::PropertySource;
use crate::registry::BinderRegistry;

/// Layered resolver for `BindingProperties`.
#[derive(Clone, Default)]
pub struct BindingPropertiesResolver {
    layers: Vec<Arc<dyn PropertySource>>,
}

impl BindingPropertiesResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a layer below the ones already added.
    #[must_use]
    pub fn with_layer(mut self, source: impl PropertySource + 'static) -> Self {
        self.layers.push(Arc::new(source));
        self
    }

    /// Layer names, most specific first.
    #[must_use]
    pub fn layer_names(&self) -> Vec<String> {
        self.layers.iter().map(|l| l.name().to_string()).collect()
    }

    /// Resolve the properties of `channel`.
    pub fn resolve(&self, channel: &str, registry: &BinderRegistry) -> BindingResult<BindingProperties> {
        self.resolve_scoped(None, channel, registry)
    }

    /// Resolve the properties of `channel`, trying `<scope>.<channel>` first.
    ///
    /// # Errors
    ///
    /// `Configuration` naming the channel when a value does not parse, the
    /// options are inconsistent, or a named binder is not registered.
    pub fn resolve_scoped(
        &self,
        scope: Option<&str>,
        channel: &str,
        registry: &BinderRegistry,
    ) -> BindingResult<BindingProperties> {
        let candidates = candidates(scope, channel);
        let lookup = Lookup {
            layers: &self.layers,
            candidates: &candidates,
            channel,
        };

        let mut props = BindingProperties::new(channel);
        props.binder = lookup.string(keys::BINDER);
        props.content_type = lookup.string(keys::CONTENT_TYPE);
        props.group = lookup.string(keys::GROUP);
        props.destination = lookup.string(keys::DESTINATION);

        props.producer.partition_key_expression = lookup.string(keys::PRODUCER_PARTITION_KEY_EXPRESSION);
        if let Some(count) = lookup.number(keys::PRODUCER_PARTITION_COUNT)? {
            props.producer.partition_count = count;
        }
        if let Some(groups) = lookup.string(keys::PRODUCER_REQUIRED_GROUPS) {
            props.producer.required_groups = groups
                .split(',')
                .map(str::trim)
                .filter(|g| !g.is_empty())
                .map(str::to_string)
                .collect();
        }

        if let Some(concurrency) = lookup.number(keys::CONSUMER_CONCURRENCY)? {
            props.consumer.concurrency = concurrency;
        }
        if let Some(partitioned) = lookup.flag(keys::CONSUMER_PARTITIONED)? {
            props.consumer.partitioned = partitioned;
        }
        if let Some(index) = lookup.number(keys::CONSUMER_INSTANCE_INDEX)? {
            props.consumer.instance_index = index;
        }
        if let Some(count) = lookup.number(keys::CONSUMER_INSTANCE_COUNT)? {
            props.consumer.instance_count = count;
        }
        if let Some(attempts) = lookup.number(keys::CONSUMER_MAX_ATTEMPTS)? {
            props.consumer.max_attempts = attempts;
        }

        props.validate()?;

        if let Some(binder) = &props.binder {
            if !registry.contains(binder) {
                return Err(BindingError::config_for(
                    channel,
                    format!(
                        "binder '{}' is not registered (registered: [{}])",
                        binder,
                        registry.names().join(", ")
                    ),
                ));
            }
        }

        debug!(channel, scope = ?scope, binder = ?props.binder, destination = props.destination(), "Binding properties resolved");
        Ok(props)
    }

    /// External-only keys (`binder`, `destination`, `group`) that a
    /// channel-specific layer sets for `channel`. Layers applying to every
    /// channel are not consulted.
    #[must_use]
    pub fn explicit_external_keys(&self, scope: Option<&str>, channel: &str) -> Vec<&'static str> {
        let candidates = candidates(scope, channel);
        [keys::BINDER, keys::DESTINATION, keys::GROUP]
            .into_iter()
            .filter(|key| {
                self.layers
                    .iter()
                    .filter(|layer| layer.is_channel_specific())
                    .any(|layer| {
                        candidates.iter().any(|candidate| {
                            layer
                                .get(candidate, key)
                                .is_some_and(|v| !v.trim().is_empty())
                        })
                    })
            })
            .collect()
    }
}

fn candidates(scope: Option<&str>, channel: &str) -> Vec<String> {
    match scope {
        Some(scope) if !scope.is_empty() => vec![format!("{}.{}", scope, channel), channel.to_string()],
        _ => vec![channel.to_string()],
    }
}

struct Lookup<'a> {
    layers: &'a [Arc<dyn PropertySource>],
    candidates: &'a [String],
    channel: &'a str,
}

impl Lookup<'_> {
    fn string(&self, key: &str) -> Option<String> {
        self.layers.iter().find_map(|layer| {
            self.candidates.iter().find_map(|candidate| {
                layer
                    .get(candidate, key)
                    .map(|v| v.trim().to_string())
                    .filter(|v| !v.is_empty())
            })
        })
    }

    fn number(&self, key: &str) -> BindingResult<Option<u32>> {
        self.string(key)
            .map(|raw| {
                raw.parse::<u32>().map_err(|_| {
                    BindingError::config_for(
                        self.channel,
                        format!("{} must be a non-negative integer, got '{}'", key, raw),
                    )
                })
            })
            .transpose()
    }

    fn flag(&self, key: &str) -> BindingResult<Option<bool>> {
        self.string(key)
            .map(|raw| match raw.to_ascii_lowercase().as_str() {
                "true" => Ok(true),
                "false" => Ok(false),
                _ => Err(BindingError::config_for(
                    self.channel,
                    format!("{} must be true or false, got '{}'", key, raw),
                )),
            })
            .transpose()
    }
}
