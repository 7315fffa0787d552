//! # Stream Runtime Library
//!
//! Binds the channels that application modules declare to messaging
//! middleware chosen by configuration, and wires modules composed into one
//! process through shared in-process channels.
//!
//! ## Layout
//!
//! - `adapters/` - Binder and module ports, in-memory binder
//! - `registry/` - Binder registry and binder type factories
//! - `binding/` - Extractor, property resolver, configurers, binding service
//! - `wiring/` - Shared channels, composition, aggregation orchestrator
//! - `container/` - TOML configuration and assembly of the stack
//! - `modules/` - Standard module shapes
//!
//! ## Startup flow
//!
//! ```text
//! ModuleDefinition ──► extract ──► resolve properties ──► select binder ──► bind
//!                                  (env > file > defaults)   (registry)
//! ```

#![allow(clippy::type_complexity)]

pub mod adapters;
pub mod binding;
pub mod container;
pub mod health;
pub mod modules;
pub mod registry;
pub mod wiring;

pub use adapters::{Binder, BindingHandle, InMemoryBinder, InMemoryBroker, ModuleChannels, ModuleDefinition, TransportError};
pub use binding::{
    extract, Binding, BindingPropertiesResolver, BindingService, BindingState, ConfigurerChain, PropertySource,
};
pub use container::{StreamConfig, StreamContainer};
pub use health::{HealthReport, HealthStatus};
pub use modules::{ModuleShape, ModuleSpec};
pub use registry::{BinderRegistry, BinderTypeRegistry};
pub use wiring::{AggregateBuilder, AggregatePhase, AggregateRuntime, ModuleComposition};
