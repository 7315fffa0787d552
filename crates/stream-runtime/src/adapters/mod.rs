//! # Adapters
//!
//! Ports define what the runtime needs from the outside world; adapters
//! implement them.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                     OUTER LAYER (Adapters)                          │
//! │  ┌───────────────────────────────────────────────────────────────┐  │
//! │  │  InMemoryBinder (process-local broker), broker binders        │  │
//! │  └───────────────────────────────────────────────────────────────┘  │
//! │                              ↑ implements ↑                         │
//! │  ┌───────────────────────────────────────────────────────────────┐  │
//! │  │                    PORTS                                       │  │
//! │  │  trait Binder, trait BindingHandle, trait ModuleDefinition    │  │
//! │  └───────────────────────────────────────────────────────────────┘  │
//! │                              ↑ uses ↑                               │
//! │  ┌───────────────────────────────────────────────────────────────┐  │
//! │  │                    BINDING CORE                                │  │
//! │  │  extractor, resolver, registry, binding service, aggregation  │  │
//! │  └───────────────────────────────────────────────────────────────┘  │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```

pub mod in_memory_binder;
pub mod ports;

pub use in_memory_binder::{BindingRecord, InMemoryBinder, InMemoryBroker, IN_MEMORY_BINDER_TYPE};
pub use ports::*;
