//! # Aggregation Wiring
//!
//! Composes several modules into one process. Channels that connect two
//! modules become shared in-process channels; everything else is bound
//! through a binder.
//!
//! ```text
//! ┌──────────────┐   shared channel    ┌──────────────┐   binder    ┌────────┐
//! │ source       │ ──────────────────► │ processor    │ ──────────► │ broker │
//! │   output     │  "source.output"    │   input      │  "output"   │        │
//! └──────────────┘                     │   output     │             └────────┘
//!                                      └──────────────┘
//! ```

pub mod composition;
pub mod orchestrator;
pub mod shared_channels;

pub use composition::{AggregateBuilder, CompositionEntry, ModuleComposition};
pub use orchestrator::{AggregatePhase, AggregateRuntime};
pub use shared_channels::SharedChannelRegistry;
