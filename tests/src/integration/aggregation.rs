//! # Aggregation Wiring
//!
//! Modules composed into one process meet on shared in-process channels;
//! names that do not connect two modules are bound externally.
//!
//! ## Scenarios
//!
//! 1. Source + Processor(input, output2): one shared channel, `output2` bound
//! 2. Two sources with `output`: both bound, nothing shared
//! 3. Second producer or second consumer on a shared name: wiring conflict
//! 4. Binder settings on a shared name: warning, or conflict in strict mode
//! 5. Two aggregates on one container keep separate bindings

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use stream_runtime::adapters::InMemoryBinder;
    use stream_runtime::binding::{ConfigurerChain, EnvPropertySource, MapPropertySource};
    use stream_runtime::wiring::CompositionEntry;
    use stream_runtime::{
        AggregateBuilder, AggregatePhase, AggregateRuntime, BinderRegistry, BindingPropertiesResolver, BindingService,
        BindingState, ModuleComposition, ModuleSpec, StreamConfig, StreamContainer,
    };
    use stream_types::{keys, BindingError, Direction, Message};
    use tokio::time::timeout;

    // =============================================================================
    // TEST FIXTURES
    // =============================================================================

    fn service_with(binder: Arc<InMemoryBinder>, resolver: BindingPropertiesResolver) -> Arc<BindingService> {
        let registry = Arc::new(BinderRegistry::new());
        registry.register("test", binder).unwrap();
        Arc::new(BindingService::new(registry, resolver, ConfigurerChain::standard()))
    }

    fn source_and_processor() -> ModuleComposition {
        AggregateBuilder::from(ModuleSpec::source().build())
            .as_role("source")
            .to(ModuleSpec::new("processor").input("input").output("output2").build())
            .as_role("processor")
            .build()
            .unwrap()
    }

    // =============================================================================
    // SCENARIOS
    // =============================================================================

    #[tokio::test]
    async fn test_source_and_processor_share_one_channel() {
        let binder = Arc::new(InMemoryBinder::new());
        let runtime = AggregateRuntime::new(
            source_and_processor(),
            service_with(binder.clone(), BindingPropertiesResolver::new()),
        );

        runtime.start().await.unwrap();

        assert_eq!(runtime.shared_channels().len(), 1);
        assert_eq!(runtime.bindings().len(), 1);
        assert_eq!(binder.bound_names(Direction::Outbound), vec!["output2"]);
        assert!(binder.bound_names(Direction::Inbound).is_empty());

        let source = runtime.module_channels("source").unwrap();
        let processor = runtime.module_channels("processor").unwrap();
        let shared = source.output("output").unwrap();
        assert!(Arc::ptr_eq(shared, processor.input("input").unwrap()));

        let mut sub = processor.input("input").unwrap().subscribe();
        shared.send(Message::new("in-process"));
        let received = timeout(Duration::from_millis(100), sub.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(received.payload_str(), "in-process");
    }

    #[tokio::test]
    async fn test_two_sources_bind_externally() {
        let binder = Arc::new(InMemoryBinder::new());
        let composition = ModuleComposition::new()
            .with_entry(CompositionEntry::new(ModuleSpec::source().build()).with_role("first"))
            .with_entry(CompositionEntry::new(ModuleSpec::source().build()).with_role("second"));
        let runtime = AggregateRuntime::new(composition, service_with(binder.clone(), BindingPropertiesResolver::new()));

        runtime.start().await.unwrap();

        assert!(runtime.shared_channels().is_empty());
        assert_eq!(binder.bound_names(Direction::Outbound), vec!["output", "output"]);
        assert_eq!(runtime.phase(), AggregatePhase::Running);
    }

    #[tokio::test]
    async fn test_second_producer_on_shared_name_conflicts() {
        let binder = Arc::new(InMemoryBinder::new());
        let composition = ModuleComposition::new()
            .with_entry(CompositionEntry::new(ModuleSpec::source().build()).with_role("first"))
            .with_entry(CompositionEntry::new(ModuleSpec::source().build()).with_role("second"))
            .with_entry(CompositionEntry::new(ModuleSpec::sink().build()).with_alias(
                Direction::Inbound,
                "input",
                "output",
            ));
        let runtime = AggregateRuntime::new(composition, service_with(binder.clone(), BindingPropertiesResolver::new()));

        let err = runtime.start().await.unwrap_err();
        match err {
            BindingError::SharedWiringConflict { channel, reason } => {
                assert_eq!(channel, "output");
                assert!(reason.contains("first, second"));
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_ne!(runtime.phase(), AggregatePhase::Running);
        assert!(binder.records().is_empty());
    }

    #[tokio::test]
    async fn test_second_consumer_on_shared_name_conflicts() {
        let binder = Arc::new(InMemoryBinder::new());
        let composition = ModuleComposition::new()
            .with_entry(CompositionEntry::new(ModuleSpec::source().build()).with_role("producer"))
            .with_entry(
                CompositionEntry::new(ModuleSpec::sink().build())
                    .with_role("left")
                    .with_alias(Direction::Inbound, "input", "output"),
            )
            .with_entry(
                CompositionEntry::new(ModuleSpec::sink().build())
                    .with_role("right")
                    .with_alias(Direction::Inbound, "input", "output"),
            );
        let runtime = AggregateRuntime::new(composition, service_with(binder.clone(), BindingPropertiesResolver::new()));

        let err = runtime.start().await.unwrap_err();
        match err {
            BindingError::SharedWiringConflict { channel, reason } => {
                assert_eq!(channel, "output");
                assert!(reason.contains("left, right"));
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(binder.records().is_empty());
        assert!(runtime.shared_channels().is_empty());
    }

    #[tokio::test]
    async fn test_aggregates_on_one_container_shut_down_independently() {
        let container =
            StreamContainer::with_environment(StreamConfig::default(), EnvPropertySource::default()).unwrap();
        let first = container.aggregate(ModuleComposition::single(ModuleSpec::source().build()));
        let second = container.aggregate(ModuleComposition::single(ModuleSpec::sink().build()));
        first.start().await.unwrap();
        second.start().await.unwrap();

        assert_eq!(first.bindings().len(), 1);
        assert_eq!(first.bindings()[0].channel_name(), "output");
        assert_eq!(second.bindings().len(), 1);

        first.shutdown().await;

        let remaining: Vec<_> = second
            .bindings()
            .iter()
            .map(|b| (b.channel_name().to_string(), b.state()))
            .collect();
        assert_eq!(remaining, vec![("input".to_string(), BindingState::Active)]);
        assert!(second.health().is_up());
        assert!(!first.health().is_up());

        second.shutdown().await;
        assert_eq!(container.service().active_count(), 0);
    }

    #[tokio::test]
    async fn test_strict_mode_rejects_binder_settings_on_shared_name() {
        let config = StreamConfig::parse(
            r#"
[runtime]
strict-shared-bindings = true

[bindings."source.output"]
group = "ignored"
"#,
        )
        .unwrap();
        let container = StreamContainer::with_environment(config, EnvPropertySource::default()).unwrap();

        let err = container
            .aggregate(source_and_processor())
            .start()
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "shared_wiring_conflict");
        assert!(err.to_string().contains("group"));
    }

    #[tokio::test]
    async fn test_lenient_mode_ignores_binder_settings_on_shared_name() {
        let binder = Arc::new(InMemoryBinder::new());
        let resolver = BindingPropertiesResolver::new().with_layer(
            MapPropertySource::new("bindings")
                .with("source.output", keys::DESTINATION, "ignored")
                .with("source.output", keys::CONTENT_TYPE, "application/json"),
        );
        let runtime = AggregateRuntime::new(source_and_processor(), service_with(binder.clone(), resolver));

        runtime.start().await.unwrap();

        assert!(!binder.bound_names(Direction::Outbound).contains(&"ignored".to_string()));
        let shared = runtime.shared_channels().get("source.output").unwrap();
        assert_eq!(shared.interceptor_names(), vec!["content-type"]);
    }

    #[tokio::test]
    async fn test_bind_failure_stops_before_running() {
        let binder = Arc::new(InMemoryBinder::new());
        binder.fail_binds_for("output2");
        let runtime = AggregateRuntime::new(
            source_and_processor(),
            service_with(binder.clone(), BindingPropertiesResolver::new()),
        );

        let err = runtime.start().await.unwrap_err();
        assert_eq!(err.kind(), "binder_connection");
        assert_eq!(runtime.phase(), AggregatePhase::BindRemaining);

        runtime.shutdown().await;
        assert_eq!(runtime.phase(), AggregatePhase::Shutdown);
        assert!(runtime.shared_channels().is_empty());
    }
}
