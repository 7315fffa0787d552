//! # Binding Core
//!
//! Per-module binding path: extract descriptors, resolve their properties,
//! configure channels and bind them through the selected binder.

pub mod configurer;
pub mod extractor;
pub mod properties;
pub mod service;
pub mod sources;

pub use configurer::{ChannelConfigurer, ConfigurerChain, ContentTypeConfigurer, ContentTypeInterceptor};
pub use extractor::extract;
pub use properties::BindingPropertiesResolver;
pub use service::{Binding, BindingService, BindingState, DEFAULT_UNBIND_TIMEOUT};
pub use sources::{DefaultsPropertySource, EnvPropertySource, MapPropertySource, PropertySource, ENV_PREFIX};
