//! # Channel Configurer Chain
//!
//! Ordered hooks that decorate a freshly constructed channel before it is
//! bound or shared. Configurers act through interceptors, and channels keep
//! one interceptor per name, so running the chain twice on one channel leaves
//! it as configured the first time.

use std::sync::Arc;

use tracing::debug;

use stream_channel::{ChannelInterceptor, ChannelRef};
use stream_types::{BindingProperties, Message, CONTENT_TYPE};

/// Mutates a channel according to its binding properties.
pub trait ChannelConfigurer: Send + Sync {
    fn name(&self) -> &str;

    fn configure(&self, channel: &ChannelRef, channel_name: &str, properties: &BindingProperties);
}

/// Configurers applied in registration order.
#[derive(Clone, Default)]
pub struct ConfigurerChain {
    configurers: Vec<Arc<dyn ChannelConfigurer>>,
}

impl ConfigurerChain {
    /// Empty chain.
    pub fn new() -> Self {
        Self::default()
    }

    /// Chain holding the built-in configurers.
    pub fn standard() -> Self {
        Self::new().with(ContentTypeConfigurer)
    }

    #[must_use]
    pub fn with(mut self, configurer: impl ChannelConfigurer + 'static) -> Self {
        self.configurers.push(Arc::new(configurer));
        self
    }

    /// Run every configurer on `channel` and hand it back.
    pub fn configure(
        &self,
        channel: ChannelRef,
        channel_name: &str,
        properties: &BindingProperties,
    ) -> ChannelRef {
        for configurer in &self.configurers {
            debug!(channel = channel_name, configurer = configurer.name(), "Applying channel configurer");
            configurer.configure(&channel, channel_name, properties);
        }
        channel
    }

    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        self.configurers.iter().map(|c| c.name()).collect()
    }
}

/// Installs a `ContentTypeInterceptor` when the properties carry a content
/// type.
#[derive(Debug, Clone, Copy, Default)]
pub struct ContentTypeConfigurer;

impl ChannelConfigurer for ContentTypeConfigurer {
    fn name(&self) -> &str {
        "content-type"
    }

    fn configure(&self, channel: &ChannelRef, channel_name: &str, properties: &BindingProperties) {
        let Some(content_type) = properties
            .content_type
            .as_deref()
            .map(str::trim)
            .filter(|ct| !ct.is_empty())
        else {
            return;
        };

        let installed = channel.add_interceptor(Arc::new(ContentTypeInterceptor::new(content_type)));
        if installed {
            debug!(channel = channel_name, content_type, "Content type interceptor installed");
        }
    }
}

/// Stamps the `contentType` header on messages that lack one.
#[derive(Debug, Clone)]
pub struct ContentTypeInterceptor {
    content_type: String,
}

impl ContentTypeInterceptor {
    pub const NAME: &'static str = "content-type";

    pub fn new(content_type: impl Into<String>) -> Self {
        Self {
            content_type: content_type.into(),
        }
    }

    #[must_use]
    pub fn content_type(&self) -> &str {
        &self.content_type
    }
}

impl ChannelInterceptor for ContentTypeInterceptor {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn pre_send(&self, mut message: Message, _channel: &str) -> Option<Message> {
        if !message.headers.contains(CONTENT_TYPE) {
            message.headers.insert(CONTENT_TYPE, self.content_type.clone());
        }
        Some(message)
    }
}
