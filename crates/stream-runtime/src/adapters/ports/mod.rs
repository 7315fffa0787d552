//! # Ports
//!
//! Contracts at the edges of the runtime: binders on the transport side and
//! module definitions on the application side.

pub mod binder;
pub mod module;

pub use binder::{Binder, BindingHandle, TransportError};
pub use module::{ModuleChannels, ModuleDefinition};
