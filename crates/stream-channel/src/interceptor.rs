//! # Channel Interceptors
//!
//! A single `pre_send` capability. Returning `None` drops the message.

use std::fmt;
use stream_types::Message;

/// Decorates messages before a channel dispatches them.
pub trait ChannelInterceptor: Send + Sync {
    /// Stable name. A channel holds at most one interceptor per name.
    fn name(&self) -> &str;

    /// Inspect or rewrite `message` on its way through `channel`.
    fn pre_send(&self, message: Message, channel: &str) -> Option<Message>;
}

/// Interceptor backed by a closure.
pub struct FnInterceptor<F> {
    name: String,
    f: F,
}

impl<F> FnInterceptor<F>
where
    F: Fn(Message, &str) -> Option<Message> + Send + Sync,
{
    pub fn new(name: impl Into<String>, f: F) -> Self {
        Self {
            name: name.into(),
            f,
        }
    }
}

impl<F> ChannelInterceptor for FnInterceptor<F>
where
    F: Fn(Message, &str) -> Option<Message> + Send + Sync,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn pre_send(&self, message: Message, channel: &str) -> Option<Message> {
        (self.f)(message, channel)
    }
}

impl<F> fmt::Debug for FnInterceptor<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnInterceptor").field("name", &self.name).finish()
    }
}
