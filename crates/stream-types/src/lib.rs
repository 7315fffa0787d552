//! # Stream Types Crate
//!
//! Data model shared by the binding runtime, the in-process channels and every
//! binder implementation.
//!
//! ## Contents
//!
//! - **Descriptors**: `Direction`, `ChannelSlot`, `ChannelDescriptor`
//! - **Properties**: `BindingProperties` with producer/consumer options
//! - **Messages**: `Message` and `MessageHeaders`
//! - **Errors**: the `BindingError` taxonomy used during startup binding

pub mod descriptor;
pub mod errors;
pub mod message;
pub mod properties;

pub use descriptor::*;
pub use errors::*;
pub use message::{Message, MessageHeaders, CONTENT_TYPE};
pub use properties::*;
