//! # Channel Descriptors
//!
//! A module declares a set of named, directional channel slots. Extraction
//! validates those slots into immutable `ChannelDescriptor`s.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Direction of a declared channel, seen from the module.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Direction {
    /// Messages flow from the binder into the module.
    Inbound,
    /// Messages flow from the module out to the binder.
    Outbound,
}

impl Direction {
    /// Lowercase label used in logs and metric labels.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Inbound => "inbound",
            Self::Outbound => "outbound",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A channel slot as declared by a module, before validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelSlot {
    pub name: String,
    pub direction: Direction,
    pub content_type: Option<String>,
}

impl ChannelSlot {
    /// Declare an inbound slot.
    pub fn input(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            direction: Direction::Inbound,
            content_type: None,
        }
    }

    /// Declare an outbound slot.
    pub fn output(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            direction: Direction::Outbound,
            content_type: None,
        }
    }

    /// Attach a declared content type.
    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }
}

/// Validated metadata for one declared channel.
///
/// Ordering is by `(name, direction)` and only exists so that diagnostics
/// print in a stable order.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ChannelDescriptor {
    name: String,
    direction: Direction,
    content_type: Option<String>,
}

impl ChannelDescriptor {
    pub fn new(name: impl Into<String>, direction: Direction, content_type: Option<String>) -> Self {
        Self {
            name: name.into(),
            direction,
            content_type,
        }
    }

    /// Channel name, unique per direction within its module.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn direction(&self) -> Direction {
        self.direction
    }

    /// Content type declared by the module itself, if any.
    #[must_use]
    pub fn content_type(&self) -> Option<&str> {
        self.content_type.as_deref()
    }

    /// Same descriptor under another name. Used when a composition aliases
    /// a module's local channel name.
    #[must_use]
    pub fn renamed(&self, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            direction: self.direction,
            content_type: self.content_type.clone(),
        }
    }
}

impl From<ChannelSlot> for ChannelDescriptor {
    fn from(slot: ChannelSlot) -> Self {
        Self::new(slot.name, slot.direction, slot.content_type)
    }
}

impl fmt::Display for ChannelDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.direction)
    }
}
