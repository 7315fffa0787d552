//! # Property Resolution
//!
//! Layered binding properties as loaded from a TOML file plus environment
//! overrides.

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use stream_runtime::binding::{DefaultsPropertySource, EnvPropertySource, MapPropertySource};
    use stream_runtime::{BinderRegistry, BindingPropertiesResolver, InMemoryBinder, StreamConfig, StreamContainer};
    use stream_types::keys;

    const CONFIG: &str = r#"
default-binder = "primary"

[defaults]
content-type = "text/plain"
group = "everyone"

[bindings.output]
content-type = "application/json"
producer.partition-count = 4
producer.partition-key-expression = "headers.customer"

[bindings.input]
consumer.concurrency = 2

[binders.primary]
type = "in-memory"

[binders.secondary]
type = "in-memory"
"#;

    fn registry() -> BinderRegistry {
        let registry = BinderRegistry::new();
        registry.register("test", Arc::new(InMemoryBinder::new())).unwrap();
        registry
    }

    #[test]
    fn test_explicit_content_type_beats_default() {
        let resolver = BindingPropertiesResolver::new()
            .with_layer(MapPropertySource::new("bindings").with("output", keys::CONTENT_TYPE, "application/json"))
            .with_layer(DefaultsPropertySource::new("defaults").with(keys::CONTENT_TYPE, "text/plain"));

        let props = resolver.resolve("output", &registry()).unwrap();
        assert_eq!(props.content_type.as_deref(), Some("application/json"));
    }

    #[test]
    fn test_file_layers() {
        let config = StreamConfig::parse(CONFIG).unwrap();
        let container = StreamContainer::with_environment(config, EnvPropertySource::default()).unwrap();
        let service = container.service();

        let output = service.resolve(None, "output").unwrap();
        assert_eq!(output.content_type.as_deref(), Some("application/json"));
        assert_eq!(output.binder.as_deref(), Some("primary"));
        assert_eq!(output.producer.partition_count, 4);
        assert!(output.producer.is_partitioned());
        assert_eq!(output.producer.partition_key_expression.as_deref(), Some("headers.customer"));

        let input = service.resolve(None, "input").unwrap();
        assert_eq!(input.content_type.as_deref(), Some("text/plain"));
        assert_eq!(input.group.as_deref(), Some("everyone"));
        assert_eq!(input.consumer.concurrency, 2);
    }

    #[test]
    fn test_env_layer_overrides_file() {
        let config = StreamConfig::parse(CONFIG).unwrap();
        let env = EnvPropertySource::from_vars([
            ("STREAM_BINDINGS_OUTPUT_BINDER", "secondary"),
            ("STREAM_BINDINGS_INPUT_CONSUMER_CONCURRENCY", "8"),
        ]);
        let container = StreamContainer::with_environment(config, env).unwrap();

        let output = container.service().resolve(None, "output").unwrap();
        assert_eq!(output.binder.as_deref(), Some("secondary"));

        let input = container.service().resolve(None, "input").unwrap();
        assert_eq!(input.consumer.concurrency, 8);
    }

    #[test]
    fn test_invalid_override_is_configuration_error() {
        let config = StreamConfig::parse(CONFIG).unwrap();
        let env = EnvPropertySource::from_vars([("STREAM_BINDINGS_INPUT_CONSUMER_INSTANCE_INDEX", "3")]);
        let container = StreamContainer::with_environment(config, env).unwrap();

        let err = container.service().resolve(None, "input").unwrap_err();
        assert_eq!(err.kind(), "configuration");
        assert!(err.to_string().contains(keys::CONSUMER_INSTANCE_INDEX));
    }

    #[test]
    fn test_default_binder_must_be_registered() {
        let config = StreamConfig::parse("default-binder = \"missing\"\n").unwrap();
        let container = StreamContainer::with_environment(config, EnvPropertySource::default()).unwrap();

        let err = container.service().resolve(None, "output").unwrap_err();
        assert!(err.to_string().contains("binder 'missing' is not registered"));
    }
}
