//! # Module Shapes
//!
//! Canonical channel layouts and a builder for modules declared in code.
//!
//! | Shape       | Inputs  | Outputs  |
//! |-------------|---------|----------|
//! | `Source`    | -       | `output` |
//! | `Sink`      | `input` | -        |
//! | `Processor` | `input` | `output` |

use std::fmt;
use std::sync::Arc;

use stream_types::{BindingResult, ChannelSlot};

use crate::adapters::ports::{ModuleChannels, ModuleDefinition};

/// Conventional input channel name.
pub const INPUT: &str = "input";
/// Conventional output channel name.
pub const OUTPUT: &str = "output";

/// Standard module layouts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModuleShape {
    Source,
    Sink,
    Processor,
}

impl ModuleShape {
    #[must_use]
    pub fn slots(&self) -> Vec<ChannelSlot> {
        match self {
            Self::Source => vec![ChannelSlot::output(OUTPUT)],
            Self::Sink => vec![ChannelSlot::input(INPUT)],
            Self::Processor => vec![ChannelSlot::input(INPUT), ChannelSlot::output(OUTPUT)],
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Source => "source",
            Self::Sink => "sink",
            Self::Processor => "processor",
        }
    }
}

type ReadyCallback = Arc<dyn Fn(&ModuleChannels) -> BindingResult<()> + Send + Sync>;

/// A module assembled from slots and an optional ready callback.
///
/// ```rust,ignore
/// let doubler = ModuleSpec::new("doubler")
///     .input("numbers")
///     .output("doubled")
///     .content_type("doubled", "text/plain")
///     .on_ready(|channels| { /* subscribe and spawn */ Ok(()) });
/// ```
#[derive(Clone)]
pub struct ModuleSpec {
    name: String,
    slots: Vec<ChannelSlot>,
    on_ready: Option<ReadyCallback>,
}

impl ModuleSpec {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            slots: Vec::new(),
            on_ready: None,
        }
    }

    /// Module with the slots of `shape`, named after the shape.
    pub fn shaped(shape: ModuleShape) -> Self {
        Self::new(shape.as_str()).with_slots(shape.slots())
    }

    pub fn source() -> Self {
        Self::shaped(ModuleShape::Source)
    }

    pub fn sink() -> Self {
        Self::shaped(ModuleShape::Sink)
    }

    pub fn processor() -> Self {
        Self::shaped(ModuleShape::Processor)
    }

    #[must_use]
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    #[must_use]
    pub fn with_slots(mut self, slots: Vec<ChannelSlot>) -> Self {
        self.slots.extend(slots);
        self
    }

    #[must_use]
    pub fn input(mut self, name: impl Into<String>) -> Self {
        self.slots.push(ChannelSlot::input(name));
        self
    }

    #[must_use]
    pub fn output(mut self, name: impl Into<String>) -> Self {
        self.slots.push(ChannelSlot::output(name));
        self
    }

    /// Declare the content type of every slot called `name`.
    #[must_use]
    pub fn content_type(mut self, name: &str, content_type: impl Into<String>) -> Self {
        let content_type = content_type.into();
        for slot in self.slots.iter_mut().filter(|s| s.name == name) {
            slot.content_type = Some(content_type.clone());
        }
        self
    }

    #[must_use]
    pub fn on_ready<F>(mut self, callback: F) -> Self
    where
        F: Fn(&ModuleChannels) -> BindingResult<()> + Send + Sync + 'static,
    {
        self.on_ready = Some(Arc::new(callback));
        self
    }

    /// Finish into a shareable module definition.
    pub fn build(self) -> Arc<dyn ModuleDefinition> {
        Arc::new(self)
    }
}

impl ModuleDefinition for ModuleSpec {
    fn name(&self) -> &str {
        &self.name
    }

    fn channels(&self) -> Vec<ChannelSlot> {
        self.slots.clone()
    }

    fn on_channels_ready(&self, channels: &ModuleChannels) -> BindingResult<()> {
        match &self.on_ready {
            Some(callback) => callback(channels),
            None => Ok(()),
        }
    }
}

impl fmt::Debug for ModuleSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModuleSpec")
            .field("name", &self.name)
            .field("slots", &self.slots)
            .field("on_ready", &self.on_ready.is_some())
            .finish()
    }
}
