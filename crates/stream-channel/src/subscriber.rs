//! # Channel Subscriptions
//!
//! Receiving side of a `DirectChannel`.

use std::pin::Pin;
use std::task::{Context, Poll};
use stream_types::Message;
use thiserror::Error;
use tokio::sync::broadcast;
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::Stream;
use tracing::warn;

/// Errors from subscription operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SubscriptionError {
    /// Every sender of the channel was dropped.
    #[error("Channel closed")]
    Closed,
}

/// Handle for receiving messages from one channel.
pub struct ChannelSubscription {
    channel: String,
    receiver: broadcast::Receiver<Message>,
}

impl ChannelSubscription {
    pub(crate) fn new(channel: String, receiver: broadcast::Receiver<Message>) -> Self {
        Self { channel, receiver }
    }

    /// Name of the channel this subscription reads from.
    #[must_use]
    pub fn channel(&self) -> &str {
        &self.channel
    }

    /// Receive the next message.
    ///
    /// # Returns
    ///
    /// - `Some(message)` - The next message
    /// - `None` - The channel was dropped
    pub async fn recv(&mut self) -> Option<Message> {
        loop {
            match self.receiver.recv().await {
                Ok(message) => return Some(message),
                Err(broadcast::error::RecvError::Closed) => return None,
                Err(broadcast::error::RecvError::Lagged(count)) => {
                    warn!(channel = %self.channel, lagged = count, "Subscriber lagged, messages dropped");
                }
            }
        }
    }

    /// Receive without waiting.
    ///
    /// # Returns
    ///
    /// - `Ok(Some(message))` - A message was available
    /// - `Ok(None)` - Nothing buffered
    /// - `Err(SubscriptionError::Closed)` - The channel was dropped
    pub fn try_recv(&mut self) -> Result<Option<Message>, SubscriptionError> {
        loop {
            match self.receiver.try_recv() {
                Ok(message) => return Ok(Some(message)),
                Err(broadcast::error::TryRecvError::Empty) => return Ok(None),
                Err(broadcast::error::TryRecvError::Closed) => {
                    return Err(SubscriptionError::Closed)
                }
                Err(broadcast::error::TryRecvError::Lagged(_)) => continue,
            }
        }
    }

    /// Convert into a `Stream` of messages.
    #[must_use]
    pub fn into_stream(self) -> ChannelStream {
        ChannelStream {
            channel: self.channel,
            inner: BroadcastStream::new(self.receiver),
        }
    }
}

/// `Stream` adapter over a subscription. Lagged gaps are logged and skipped.
pub struct ChannelStream {
    channel: String,
    inner: BroadcastStream<Message>,
}

impl Stream for ChannelStream {
    type Item = Message;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        loop {
            match Pin::new(&mut self.inner).poll_next(cx) {
                Poll::Ready(Some(Ok(message))) => return Poll::Ready(Some(message)),
                Poll::Ready(Some(Err(BroadcastStreamRecvError::Lagged(count)))) => {
                    warn!(channel = %self.channel, lagged = count, "Stream lagged, messages dropped");
                }
                Poll::Ready(None) => return Poll::Ready(None),
                Poll::Pending => return Poll::Pending,
            }
        }
    }
}
