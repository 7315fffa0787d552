//! Shared channel registry for one aggregated run.
//!
//! Two modules meeting on a name get the same channel instance. The first
//! caller for a name creates it; later callers receive that instance.

use std::collections::BTreeMap;

use parking_lot::RwLock;
use tracing::debug;

use stream_channel::{ChannelRef, DirectChannel, DEFAULT_CHANNEL_CAPACITY};
use stream_telemetry::SHARED_CHANNELS;

/// Name → in-process channel.
#[derive(Debug)]
pub struct SharedChannelRegistry {
    channels: RwLock<BTreeMap<String, ChannelRef>>,
    capacity: usize,
}

impl SharedChannelRegistry {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CHANNEL_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            channels: RwLock::new(BTreeMap::new()),
            capacity,
        }
    }

    /// The channel registered under `name`, creating it if absent.
    ///
    /// Check and insert happen under one write lock.
    pub fn get_or_create(&self, name: &str) -> ChannelRef {
        let mut channels = self.channels.write();
        if let Some(existing) = channels.get(name) {
            return existing.clone();
        }

        let channel = DirectChannel::shared(name, self.capacity);
        channels.insert(name.to_string(), channel.clone());
        SHARED_CHANNELS.inc();
        debug!(channel = name, "Shared channel created");
        channel
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<ChannelRef> {
        self.channels.read().get(name).cloned()
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.channels.read().contains_key(name)
    }

    #[must_use]
    pub fn names(&self) -> Vec<String> {
        self.channels.read().keys().cloned().collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.channels.read().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.channels.read().is_empty()
    }

    /// Drop every entry. Returns the channels that were registered.
    pub fn clear(&self) -> BTreeMap<String, ChannelRef> {
        let drained = std::mem::take(&mut *self.channels.write());
        SHARED_CHANNELS.sub(drained.len() as f64);
        drained
    }
}

impl Default for SharedChannelRegistry {
    fn default() -> Self {
        Self::new()
    }
}
