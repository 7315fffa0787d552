//! # Module Port
//!
//! A module states its channel slots up front through `channels()`; nothing
//! is discovered by scanning. Once the runtime has wired and bound every slot
//! it hands the live channels back through `on_channels_ready`.

use std::collections::BTreeMap;
use stream_channel::ChannelRef;
use stream_types::{BindingResult, ChannelSlot, Direction};

/// An application module taking part in a binding run.
pub trait ModuleDefinition: Send + Sync {
    /// Human-readable module name, used for diagnostics and as the default
    /// role in a composition.
    fn name(&self) -> &str;

    /// Declared channel slots.
    fn channels(&self) -> Vec<ChannelSlot>;

    /// Called once every channel of the module is wired.
    ///
    /// Typical implementations subscribe to their inputs and spawn the
    /// producing side of their outputs here.
    fn on_channels_ready(&self, _channels: &ModuleChannels) -> BindingResult<()> {
        Ok(())
    }
}

/// Live channels of one module, keyed by the module's local channel names.
#[derive(Debug, Clone, Default)]
pub struct ModuleChannels {
    inputs: BTreeMap<String, ChannelRef>,
    outputs: BTreeMap<String, ChannelRef>,
}

impl ModuleChannels {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, direction: Direction, channel: ChannelRef) {
        match direction {
            Direction::Inbound => self.inputs.insert(name.into(), channel),
            Direction::Outbound => self.outputs.insert(name.into(), channel),
        };
    }

    #[must_use]
    pub fn input(&self, name: &str) -> Option<&ChannelRef> {
        self.inputs.get(name)
    }

    #[must_use]
    pub fn output(&self, name: &str) -> Option<&ChannelRef> {
        self.outputs.get(name)
    }

    pub fn inputs(&self) -> impl Iterator<Item = (&str, &ChannelRef)> {
        self.inputs.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn outputs(&self) -> impl Iterator<Item = (&str, &ChannelRef)> {
        self.outputs.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.inputs.len() + self.outputs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
