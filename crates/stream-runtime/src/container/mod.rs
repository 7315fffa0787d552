//! # Stream Container
//!
//! Builds the binding stack from a `StreamConfig`: binder instances from
//! `[binders.*]`, the layered property resolver, the binding service, and
//! aggregate runtimes on top of them.
//!
//! With no `[binders.*]` section a single in-memory binder named `in-memory`
//! is registered so the sole-binder default applies.

pub mod config;

pub use config::{BinderConfig, ConfigError, RuntimeConfig, StreamConfig, CONFIG_PATH_ENV};

use std::sync::Arc;
use std::time::Duration;

use tracing::info;

use stream_types::BindingResult;

use crate::adapters::ports::Binder;
use crate::adapters::{InMemoryBroker, IN_MEMORY_BINDER_TYPE};
use crate::binding::configurer::ConfigurerChain;
use crate::binding::service::BindingService;
use crate::binding::sources::EnvPropertySource;
use crate::registry::{BinderEnvironment, BinderRegistry, BinderTypeRegistry};
use crate::wiring::{AggregateRuntime, ModuleComposition};

/// Owns the registries and the binding service of one process.
pub struct StreamContainer {
    config: StreamConfig,
    broker: Arc<InMemoryBroker>,
    registry: Arc<BinderRegistry>,
    service: Arc<BindingService>,
}

impl StreamContainer {
    /// Container reading binding overrides from the process environment.
    pub fn new(config: StreamConfig) -> BindingResult<Self> {
        Self::with_environment(config, EnvPropertySource::from_env())
    }

    /// Container with explicit binding overrides.
    pub fn with_environment(config: StreamConfig, env: EnvPropertySource) -> BindingResult<Self> {
        let broker = Arc::new(InMemoryBroker::with_capacity(config.runtime.channel_capacity));
        let types = BinderTypeRegistry::with_in_memory(Arc::clone(&broker));
        Self::build(config, env, &types, broker)
    }

    /// Container with a caller-supplied binder type table.
    ///
    /// `broker` is only reachable through `broker()`; it backs in-memory
    /// binders only if `types` was built from it.
    pub fn build(
        config: StreamConfig,
        env: EnvPropertySource,
        types: &BinderTypeRegistry,
        broker: Arc<InMemoryBroker>,
    ) -> BindingResult<Self> {
        let registry = Arc::new(BinderRegistry::new());

        for (name, binder) in &config.binders {
            let environment = BinderEnvironment {
                name: name.clone(),
                properties: binder.environment.clone(),
            };
            let instance = types.create(&binder.binder_type, &environment)?;
            registry.register(name.clone(), instance)?;
        }

        if registry.is_empty() {
            let environment = BinderEnvironment::new(IN_MEMORY_BINDER_TYPE);
            let instance = types.create(IN_MEMORY_BINDER_TYPE, &environment)?;
            registry.register(IN_MEMORY_BINDER_TYPE, instance)?;
        }

        let resolver = config.property_layers(env);
        let service = BindingService::new(Arc::clone(&registry), resolver, ConfigurerChain::standard())
            .with_unbind_timeout(Duration::from_millis(config.runtime.unbind_timeout_ms));

        info!(
            "[Container] Ready: binders [{}], default binder {:?}",
            registry.names().join(", "),
            config.default_binder
        );

        Ok(Self {
            config,
            broker,
            registry,
            service: Arc::new(service),
        })
    }

    /// Register an additional binder instance.
    pub fn register_binder(&self, name: impl Into<String>, binder: Arc<dyn Binder>) -> BindingResult<()> {
        self.registry.register(name, binder)
    }

    /// Aggregate runtime over `composition` sharing this container's service.
    #[must_use]
    pub fn aggregate(&self, composition: ModuleComposition) -> AggregateRuntime {
        AggregateRuntime::new(composition, Arc::clone(&self.service))
            .with_strict_shared_bindings(self.config.runtime.strict_shared_bindings)
            .with_channel_capacity(self.config.runtime.channel_capacity)
    }

    #[must_use]
    pub fn config(&self) -> &StreamConfig {
        &self.config
    }

    #[must_use]
    pub fn broker(&self) -> &Arc<InMemoryBroker> {
        &self.broker
    }

    #[must_use]
    pub fn registry(&self) -> &Arc<BinderRegistry> {
        &self.registry
    }

    #[must_use]
    pub fn service(&self) -> &Arc<BindingService> {
        &self.service
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::InMemoryBinder;
    use crate::modules::ModuleSpec;

    #[test]
    fn test_implicit_in_memory_binder() {
        let container =
            StreamContainer::with_environment(StreamConfig::default(), EnvPropertySource::default()).unwrap();
        assert_eq!(container.registry().names(), vec![IN_MEMORY_BINDER_TYPE]);
        assert_eq!(container.service().unbind_timeout(), Duration::from_millis(5000));
    }

    #[test]
    fn test_configured_binders_registered() {
        let config = StreamConfig::parse(
            "[binders.a]\ntype = \"in-memory\"\n[binders.b]\ntype = \"in-memory\"\n",
        )
        .unwrap();
        let container = StreamContainer::with_environment(config, EnvPropertySource::default()).unwrap();
        assert_eq!(container.registry().names(), vec!["a", "b"]);
    }

    #[test]
    fn test_unknown_binder_type_fails() {
        let config = StreamConfig::parse("[binders.remote]\ntype = \"kafka\"\n").unwrap();
        let err = StreamContainer::with_environment(config, EnvPropertySource::default())
            .err()
            .unwrap();
        assert_eq!(err.kind(), "configuration");
    }

    #[tokio::test]
    async fn test_registered_binder_joins_selection() {
        let container =
            StreamContainer::with_environment(StreamConfig::default(), EnvPropertySource::default()).unwrap();
        container
            .register_binder("audit", Arc::new(InMemoryBinder::new()))
            .unwrap();
        assert_eq!(container.registry().names(), vec!["audit", IN_MEMORY_BINDER_TYPE]);
        assert!(container
            .register_binder("audit", Arc::new(InMemoryBinder::new()))
            .is_err());

        let runtime = container.aggregate(ModuleComposition::single(ModuleSpec::source().build()));
        let err = runtime.start().await.unwrap_err();
        assert_eq!(err.kind(), "ambiguous_binder");
    }

    #[tokio::test]
    async fn test_aggregate_uses_runtime_settings() {
        let config = StreamConfig::parse("[runtime]\nchannel-capacity = 16\n").unwrap();
        let container = StreamContainer::with_environment(config, EnvPropertySource::default()).unwrap();

        let runtime = container.aggregate(ModuleComposition::single(ModuleSpec::source().build()));
        runtime.start().await.unwrap();

        let channels = runtime.module_channels("source").unwrap();
        assert_eq!(channels.output("output").unwrap().capacity(), 16);
        runtime.shutdown().await;
    }
}
