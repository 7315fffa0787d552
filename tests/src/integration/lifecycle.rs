//! # Binding Lifecycle
//!
//! Failed binds, unbinding, content-type stamping and health reporting.

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use stream_channel::{ChannelInterceptor, DirectChannel};
    use stream_runtime::binding::{ConfigurerChain, ContentTypeInterceptor, MapPropertySource};
    use stream_runtime::{
        BinderRegistry, BindingPropertiesResolver, BindingService, BindingState, HealthStatus, InMemoryBinder,
    };
    use stream_types::{keys, ChannelDescriptor, Direction, Message, CONTENT_TYPE};

    fn service(binder: Arc<InMemoryBinder>) -> BindingService {
        let registry = Arc::new(BinderRegistry::new());
        registry.register("test", binder).unwrap();
        let resolver = BindingPropertiesResolver::new()
            .with_layer(MapPropertySource::new("bindings").with("output", keys::CONTENT_TYPE, "application/json"));
        BindingService::new(registry, resolver, ConfigurerChain::standard())
    }

    fn output() -> ChannelDescriptor {
        ChannelDescriptor::new("output", Direction::Outbound, None)
    }

    #[tokio::test]
    async fn test_failed_bind_is_retryable() {
        let binder = Arc::new(InMemoryBinder::new());
        binder.fail_binds_for("output");
        let service = service(binder.clone());

        let first = service
            .bind_descriptor(None, &output(), Arc::new(DirectChannel::new("output")))
            .await;
        assert!(first.is_err());
        assert!(service.bindings().is_empty());

        binder.restore("output");
        let second = service
            .bind_descriptor(None, &output(), Arc::new(DirectChannel::new("output")))
            .await
            .unwrap();
        assert_eq!(second.state(), BindingState::Active);
        assert_eq!(service.bindings().len(), 1);
    }

    #[tokio::test]
    async fn test_unbind_twice_is_noop() {
        let service = service(Arc::new(InMemoryBinder::new()));
        let binding = service
            .bind_descriptor(None, &output(), Arc::new(DirectChannel::new("output")))
            .await
            .unwrap();

        service.unbind(&binding).await;
        service.unbind(&binding).await;
        service.unbind_all().await;

        assert_eq!(binding.state(), BindingState::Unbound);
        assert_eq!(service.active_count(), 0);
    }

    #[test]
    fn test_interceptor_stamps_only_missing_header() {
        let interceptor = ContentTypeInterceptor::new("application/json");

        let stamped = interceptor.pre_send(Message::new("{}"), "output").unwrap();
        assert_eq!(stamped.headers.get(CONTENT_TYPE), Some("application/json"));

        let preset = Message::new("plain").with_header(CONTENT_TYPE, "text/plain");
        let untouched = interceptor.pre_send(preset, "output").unwrap();
        assert_eq!(untouched.headers.get(CONTENT_TYPE), Some("text/plain"));
    }

    #[tokio::test]
    async fn test_bound_channel_stamps_content_type() {
        let binder = Arc::new(InMemoryBinder::new());
        let service = service(binder.clone());
        let channel = Arc::new(DirectChannel::new("output"));
        let mut at_broker = binder.broker().subscribe("output");

        service
            .bind_descriptor(None, &output(), channel.clone())
            .await
            .unwrap();
        channel.send(Message::new("{\"n\":1}"));

        let received = tokio::time::timeout(std::time::Duration::from_millis(500), at_broker.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(received.content_type(), Some("application/json"));
    }

    #[tokio::test]
    async fn test_health_report() {
        let service = service(Arc::new(InMemoryBinder::new()));
        let binding = service
            .bind_descriptor(None, &output(), Arc::new(DirectChannel::new("output")))
            .await
            .unwrap();

        let report = service.health();
        assert_eq!(report.status, HealthStatus::Up);
        let json: serde_json::Value = serde_json::from_str(&report.to_json().unwrap()).unwrap();
        assert_eq!(json["status"], "UP");
        assert_eq!(json["bindings"][0]["channel"], "output");
        assert_eq!(json["bindings"][0]["state"], "active");

        service.unbind(&binding).await;
        assert_eq!(service.health().status, HealthStatus::Down);
    }
}
