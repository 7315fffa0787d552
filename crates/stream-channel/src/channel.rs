//! # Direct Channel
//!
//! Multi-producer, multi-subscriber in-process channel built on
//! `tokio::sync::broadcast`, with an ordered interceptor list.

use crate::interceptor::ChannelInterceptor;
use crate::subscriber::ChannelSubscription;
use crate::DEFAULT_CHANNEL_CAPACITY;
use parking_lot::RwLock;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use stream_types::Message;
use tokio::sync::broadcast;
use tracing::{debug, warn};

/// Shared handle to a channel. Modules, binders and the shared registry all
/// hold the same `Arc`.
pub type ChannelRef = Arc<DirectChannel>;

/// In-process message channel.
pub struct DirectChannel {
    /// Name the channel was created under.
    name: String,

    /// Broadcast sender; every subscriber receives every message.
    sender: broadcast::Sender<Message>,

    /// Interceptors in installation order.
    interceptors: RwLock<Vec<Arc<dyn ChannelInterceptor>>>,

    /// Messages dispatched to at least zero subscribers.
    messages_sent: AtomicU64,

    /// Messages dropped by an interceptor.
    messages_filtered: AtomicU64,

    capacity: usize,
}

impl DirectChannel {
    /// Create a channel with the default capacity.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_capacity(name, DEFAULT_CHANNEL_CAPACITY)
    }

    /// Create a channel buffering `capacity` messages per subscriber.
    #[must_use]
    pub fn with_capacity(name: impl Into<String>, capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self {
            name: name.into(),
            sender,
            interceptors: RwLock::new(Vec::new()),
            messages_sent: AtomicU64::new(0),
            messages_filtered: AtomicU64::new(0),
            capacity: capacity.max(1),
        }
    }

    /// Create a channel already wrapped in a `ChannelRef`.
    #[must_use]
    pub fn shared(name: impl Into<String>, capacity: usize) -> ChannelRef {
        Arc::new(Self::with_capacity(name, capacity))
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Install an interceptor at the end of the chain.
    ///
    /// Returns `false` and leaves the chain untouched if an interceptor with
    /// the same name is already installed.
    pub fn add_interceptor(&self, interceptor: Arc<dyn ChannelInterceptor>) -> bool {
        let mut interceptors = self.interceptors.write();
        if interceptors.iter().any(|i| i.name() == interceptor.name()) {
            debug!(
                channel = %self.name,
                interceptor = interceptor.name(),
                "Interceptor already installed"
            );
            return false;
        }
        debug!(channel = %self.name, interceptor = interceptor.name(), "Interceptor installed");
        interceptors.push(interceptor);
        true
    }

    /// Names of the installed interceptors, in order.
    #[must_use]
    pub fn interceptor_names(&self) -> Vec<String> {
        self.interceptors
            .read()
            .iter()
            .map(|i| i.name().to_string())
            .collect()
    }

    /// Run the interceptor chain and dispatch the message.
    ///
    /// # Returns
    ///
    /// The number of subscribers that received the message. Zero when there
    /// are no subscribers or an interceptor dropped the message.
    pub fn send(&self, message: Message) -> usize {
        let Some(message) = self.intercept(message) else {
            self.messages_filtered.fetch_add(1, Ordering::Relaxed);
            return 0;
        };

        self.messages_sent.fetch_add(1, Ordering::Relaxed);

        match self.sender.send(message) {
            Ok(receivers) => receivers,
            Err(broadcast::error::SendError(message)) => {
                warn!(
                    channel = %self.name,
                    message_id = %message.id,
                    "Message dropped (no subscribers)"
                );
                0
            }
        }
    }

    fn intercept(&self, mut message: Message) -> Option<Message> {
        // Snapshot so an interceptor can never deadlock against add_interceptor.
        let interceptors: Vec<_> = self.interceptors.read().iter().cloned().collect();
        for interceptor in interceptors {
            message = match interceptor.pre_send(message, &self.name) {
                Some(m) => m,
                None => {
                    debug!(
                        channel = %self.name,
                        interceptor = interceptor.name(),
                        "Message dropped by interceptor"
                    );
                    return None;
                }
            };
        }
        Some(message)
    }

    /// Subscribe to messages sent after this call.
    #[must_use]
    pub fn subscribe(&self) -> ChannelSubscription {
        ChannelSubscription::new(self.name.clone(), self.sender.subscribe())
    }

    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }

    #[must_use]
    pub fn messages_sent(&self) -> u64 {
        self.messages_sent.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn messages_filtered(&self) -> u64 {
        self.messages_filtered.load(Ordering::Relaxed)
    }
}

impl fmt::Debug for DirectChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DirectChannel")
            .field("name", &self.name)
            .field("interceptors", &self.interceptor_names())
            .field("subscribers", &self.subscriber_count())
            .field("capacity", &self.capacity)
            .finish()
    }
}
