//! # Binder Port
//!
//! The contract every messaging transport adapter implements. The runtime
//! never talks to a broker directly; it hands a channel to a binder and keeps
//! the returned handle until shutdown.

use async_trait::async_trait;
use stream_channel::ChannelRef;
use stream_types::{ConsumerOptions, ProducerOptions};
use thiserror::Error;

/// Transport-level failure reported by a binder.
///
/// The binding service turns this into `BindingError::BinderConnection`
/// carrying the channel and registered binder names.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct TransportError {
    pub message: String,
}

impl TransportError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Pluggable adapter to a concrete messaging transport.
#[async_trait]
pub trait Binder: Send + Sync {
    /// Type tag of the implementation, e.g. `in-memory`.
    fn binder_type(&self) -> &str;

    /// Deliver messages arriving on `name` into `channel`.
    ///
    /// Consumers sharing a `group` split the traffic between them; `None`
    /// is an anonymous consumer that sees everything.
    async fn bind_consumer(
        &self,
        name: &str,
        group: Option<&str>,
        channel: ChannelRef,
        options: &ConsumerOptions,
    ) -> Result<Box<dyn BindingHandle>, TransportError>;

    /// Forward messages sent on `channel` to `name`.
    async fn bind_producer(
        &self,
        name: &str,
        channel: ChannelRef,
        options: &ProducerOptions,
    ) -> Result<Box<dyn BindingHandle>, TransportError>;
}

/// Live subscription or producer returned by a binder.
#[async_trait]
pub trait BindingHandle: Send + Sync {
    /// Stop delivery and release transport resources.
    ///
    /// Called at most once by the runtime.
    async fn unbind(&self) -> Result<(), TransportError>;

    /// False once the transport has stopped delivering for this handle.
    fn is_active(&self) -> bool;
}
