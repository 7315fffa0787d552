//! # Stream Channel - In-Process Message Channels
//!
//! The conduit between application code and a binder, or between two modules
//! when an aggregated run shares a channel.
//!
//! ```text
//! ┌──────────────┐  send()   ┌───────────────────────────┐  subscribe()  ┌──────────────┐
//! │ Module code  │ ────────► │ DirectChannel             │ ────────────► │ Binder or    │
//! │ or binder    │           │  interceptors (pre_send)  │               │ other module │
//! └──────────────┘           └───────────────────────────┘               └──────────────┘
//! ```
//!
//! Interceptors run in installation order before a message is dispatched and
//! are de-duplicated by name, so configuring a channel twice is harmless.

#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod channel;
pub mod interceptor;
pub mod subscriber;

pub use channel::{ChannelRef, DirectChannel};
pub use interceptor::{ChannelInterceptor, FnInterceptor};
pub use subscriber::{ChannelStream, ChannelSubscription, SubscriptionError};

/// Messages buffered per subscriber before the slowest one starts lagging.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 1024;
