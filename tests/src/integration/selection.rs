//! # Binder Selection
//!
//! Default binder when exactly one is registered, explicit selection
//! otherwise.

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use stream_channel::DirectChannel;
    use stream_runtime::binding::{ConfigurerChain, MapPropertySource};
    use stream_runtime::{BinderRegistry, BindingPropertiesResolver, BindingService, InMemoryBinder};
    use stream_types::{keys, BindingError, ChannelDescriptor, Direction};

    fn registry(names: &[&str]) -> Arc<BinderRegistry> {
        let registry = Arc::new(BinderRegistry::new());
        for name in names {
            registry.register(*name, Arc::new(InMemoryBinder::new())).unwrap();
        }
        registry
    }

    #[test]
    fn test_single_binder_is_default() {
        let (name, _) = registry(&["test"]).get(None).unwrap();
        assert_eq!(name, "test");
    }

    #[test]
    fn test_two_binders_without_selection_are_ambiguous() {
        let err = registry(&["a", "b"]).get(None).err().unwrap();
        assert!(matches!(err, BindingError::AmbiguousBinder { .. }));
        assert!(err.to_string().contains("[a, b]"));
    }

    #[test]
    fn test_unregistered_selection_is_unknown() {
        let err = registry(&["a", "b"]).get(Some("c")).err().unwrap();
        assert_eq!(
            err,
            BindingError::UnknownBinder {
                channel: None,
                binder: "c".into()
            }
        );
    }

    #[tokio::test]
    async fn test_per_channel_binder_selection() {
        let first = Arc::new(InMemoryBinder::new());
        let second = Arc::new(InMemoryBinder::new());
        let registry = Arc::new(BinderRegistry::new());
        registry.register("a", first.clone()).unwrap();
        registry.register("b", second.clone()).unwrap();

        let resolver = BindingPropertiesResolver::new().with_layer(
            MapPropertySource::new("bindings")
                .with("input", keys::BINDER, "a")
                .with("output", keys::BINDER, "b"),
        );
        let service = BindingService::new(registry, resolver, ConfigurerChain::standard());

        let input = ChannelDescriptor::new("input", Direction::Inbound, None);
        let output = ChannelDescriptor::new("output", Direction::Outbound, None);
        service
            .bind_descriptor(None, &input, Arc::new(DirectChannel::new("input")))
            .await
            .unwrap();
        service
            .bind_descriptor(None, &output, Arc::new(DirectChannel::new("output")))
            .await
            .unwrap();

        assert_eq!(first.bound_names(Direction::Inbound), vec!["input"]);
        assert!(first.bound_names(Direction::Outbound).is_empty());
        assert_eq!(second.bound_names(Direction::Outbound), vec!["output"]);
    }

    #[tokio::test]
    async fn test_ambiguity_reported_for_channel() {
        let service = BindingService::new(
            registry(&["a", "b"]),
            BindingPropertiesResolver::new(),
            ConfigurerChain::standard(),
        );
        let output = ChannelDescriptor::new("output", Direction::Outbound, None);

        let err = service
            .bind_descriptor(None, &output, Arc::new(DirectChannel::new("output")))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("for channel 'output'"));
        assert!(service.bindings().is_empty());
    }
}
