//! # Aggregation Orchestrator
//!
//! Runs the binding path for a whole composition. Names that connect two
//! modules are wired in-process through the shared channel registry; the
//! rest go through the binding service to a binder.
//!
//! ## Phases
//!
//! ```text
//! Init ──► ExtractChannels ──► MatchAndWire ──► BindRemaining ──► Running ──► Shutdown
//! ```
//!
//! An error stops the run in the phase where it happened; it never reaches
//! `Running`. Bindings already made stay registered so `shutdown` can
//! release them.
//!
//! Several runs may share one `BindingService`. Each run tracks the bindings
//! it made itself; `bindings`, `health` and `shutdown` only touch those.
//!
//! ## Matching rule
//!
//! A composition name is shared when it is declared outbound by one module
//! and inbound by a different module. A shared name accepts exactly one
//! producer and one consumer. A name declared only outbound (two sources
//! with `output`) is bound externally from every declaring module.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{info, warn};

use stream_channel::{ChannelRef, DirectChannel, DEFAULT_CHANNEL_CAPACITY};
use stream_telemetry::CHANNEL_MESSAGES_SENT;
use stream_types::{BindingError, BindingResult, ChannelDescriptor, Direction};

use crate::adapters::ports::ModuleChannels;
use crate::binding::extractor::extract;
use crate::binding::service::{Binding, BindingService};
use crate::health::{HealthReport, HealthStatus};
use crate::wiring::composition::ModuleComposition;
use crate::wiring::shared_channels::SharedChannelRegistry;

/// Lifecycle phase of an aggregated run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum AggregatePhase {
    Init,
    ExtractChannels,
    MatchAndWire,
    BindRemaining,
    Running,
    Shutdown,
}

impl fmt::Display for AggregatePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Init => "init",
            Self::ExtractChannels => "extract-channels",
            Self::MatchAndWire => "match-and-wire",
            Self::BindRemaining => "bind-remaining",
            Self::Running => "running",
            Self::Shutdown => "shutdown",
        };
        f.write_str(label)
    }
}

/// A descriptor of one module with its composition name.
struct Declared {
    module: usize,
    local: ChannelDescriptor,
    name: String,
}

#[derive(Default)]
struct Endpoints {
    producers: Vec<usize>,
    consumers: Vec<usize>,
}

impl Endpoints {
    fn crosses_modules(&self) -> bool {
        self.producers
            .iter()
            .any(|p| self.consumers.iter().any(|c| c != p))
    }
}

/// Orchestrates binding and wiring of a `ModuleComposition`.
pub struct AggregateRuntime {
    composition: ModuleComposition,
    service: Arc<BindingService>,
    shared: SharedChannelRegistry,
    strict_shared_bindings: bool,
    channel_capacity: usize,
    phase: RwLock<AggregatePhase>,
    module_channels: RwLock<Vec<ModuleChannels>>,
    bindings: RwLock<Vec<Arc<Binding>>>,
}

impl AggregateRuntime {
    pub fn new(composition: ModuleComposition, service: Arc<BindingService>) -> Self {
        let module_channels = vec![ModuleChannels::new(); composition.len()];
        Self {
            composition,
            service,
            shared: SharedChannelRegistry::new(),
            strict_shared_bindings: false,
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
            phase: RwLock::new(AggregatePhase::Init),
            module_channels: RwLock::new(module_channels),
            bindings: RwLock::new(Vec::new()),
        }
    }

    /// Fail instead of warning when a shared name carries binder,
    /// destination or group settings.
    #[must_use]
    pub fn with_strict_shared_bindings(mut self, strict: bool) -> Self {
        self.strict_shared_bindings = strict;
        self
    }

    #[must_use]
    pub fn with_channel_capacity(mut self, capacity: usize) -> Self {
        self.channel_capacity = capacity.max(1);
        self.shared = SharedChannelRegistry::with_capacity(self.channel_capacity);
        self
    }

    #[must_use]
    pub fn phase(&self) -> AggregatePhase {
        *self.phase.read()
    }

    #[must_use]
    pub fn composition(&self) -> &ModuleComposition {
        &self.composition
    }

    #[must_use]
    pub fn service(&self) -> &Arc<BindingService> {
        &self.service
    }

    #[must_use]
    pub fn shared_channels(&self) -> &SharedChannelRegistry {
        &self.shared
    }

    /// External bindings made by this run.
    #[must_use]
    pub fn bindings(&self) -> Vec<Arc<Binding>> {
        self.bindings.read().clone()
    }

    /// Live channels of the module playing `role`.
    #[must_use]
    pub fn module_channels(&self, role: &str) -> Option<ModuleChannels> {
        let index = self
            .composition
            .entries()
            .iter()
            .position(|e| e.role() == role)?;
        self.module_channels.read().get(index).cloned()
    }

    /// Health of this run's bindings. Always `Down` once shut down.
    #[must_use]
    pub fn health(&self) -> HealthReport {
        let mut report = HealthReport::from_bindings(&self.bindings(), self.shared.names());
        if self.phase() == AggregatePhase::Shutdown {
            report.status = HealthStatus::Down;
        }
        report
    }

    fn transition(&self, next: AggregatePhase) {
        let mut phase = self.phase.write();
        info!("[Aggregate] Phase {} -> {}", *phase, next);
        *phase = next;
    }

    /// Wire and bind every module, then hand each its channels.
    pub async fn start(&self) -> BindingResult<()> {
        if self.phase() != AggregatePhase::Init {
            return Err(BindingError::config(format!(
                "aggregate cannot start from phase '{}'",
                self.phase()
            )));
        }
        if self.composition.is_empty() {
            return Err(BindingError::config("composition contains no modules"));
        }

        self.transition(AggregatePhase::ExtractChannels);
        let declared = self.extract_all()?;

        self.transition(AggregatePhase::MatchAndWire);
        let shared_names = self.match_and_wire(&declared)?;

        self.transition(AggregatePhase::BindRemaining);
        for item in declared.iter().filter(|d| !shared_names.contains(&d.name)) {
            self.bind_external(item).await?;
        }

        let channels = self.module_channels.read().clone();
        for (entry, channels) in self.composition.entries().iter().zip(channels.iter()) {
            entry.module().on_channels_ready(channels)?;
        }

        self.transition(AggregatePhase::Running);
        info!(
            "[Aggregate] Running: {} module(s), {} shared channel(s), {} external binding(s)",
            self.composition.len(),
            self.shared.len(),
            self.bindings.read().len()
        );
        Ok(())
    }

    fn extract_all(&self) -> BindingResult<Vec<Declared>> {
        let mut declared = Vec::new();
        for (index, entry) in self.composition.entries().iter().enumerate() {
            for local in extract(entry.module().as_ref())? {
                let name = entry.composite_name(local.direction(), local.name());
                declared.push(Declared {
                    module: index,
                    local,
                    name,
                });
            }
        }
        Ok(declared)
    }

    fn match_and_wire(&self, declared: &[Declared]) -> BindingResult<BTreeSet<String>> {
        let mut endpoints: BTreeMap<&str, Endpoints> = BTreeMap::new();
        for item in declared {
            let entry = endpoints.entry(item.name.as_str()).or_default();
            match item.local.direction() {
                Direction::Outbound => entry.producers.push(item.module),
                Direction::Inbound => entry.consumers.push(item.module),
            }
        }

        let mut shared_names = BTreeSet::new();
        for (name, ends) in &endpoints {
            if !ends.crosses_modules() {
                continue;
            }
            if ends.producers.len() > 1 || ends.consumers.len() > 1 {
                return Err(BindingError::SharedWiringConflict {
                    channel: (*name).to_string(),
                    reason: format!(
                        "{} producer(s) [{}] and {} consumer(s) [{}]; a shared channel takes exactly one of each",
                        ends.producers.len(),
                        self.roles(&ends.producers),
                        ends.consumers.len(),
                        self.roles(&ends.consumers)
                    ),
                });
            }
            shared_names.insert((*name).to_string());
        }

        for item in declared.iter().filter(|d| shared_names.contains(&d.name)) {
            self.wire_shared(item)?;
        }

        Ok(shared_names)
    }

    fn wire_shared(&self, item: &Declared) -> BindingResult<()> {
        let role = self.composition.entries()[item.module].role();

        let ignored = self.service.explicit_external_keys(Some(role), &item.name);
        if !ignored.is_empty() {
            if self.strict_shared_bindings {
                return Err(BindingError::SharedWiringConflict {
                    channel: item.name.clone(),
                    reason: format!(
                        "[{}] configured for module '{}' but the channel is wired in-process",
                        ignored.join(", "),
                        role
                    ),
                });
            }
            warn!(
                channel = %item.name,
                role,
                ignored = ?ignored,
                "External binding settings ignored on shared channel"
            );
        }

        let mut properties = self.service.resolve(Some(role), &item.name)?;
        if properties.content_type.is_none() {
            properties.content_type = item.local.content_type().map(str::to_string);
        }

        let channel = self.shared.get_or_create(&item.name);
        let channel = self.service.configure_channel(channel, &item.name, &properties);
        self.module_channels.write()[item.module].insert(item.local.name(), item.local.direction(), channel);

        info!(
            "[Aggregate] '{}' ({} of '{}') wired to shared channel '{}'",
            item.local.name(),
            item.local.direction(),
            role,
            item.name
        );
        Ok(())
    }

    async fn bind_external(&self, item: &Declared) -> BindingResult<()> {
        let role = self.composition.entries()[item.module].role().to_string();
        let channel = DirectChannel::shared(item.name.as_str(), self.channel_capacity);
        let descriptor = item.local.renamed(item.name.as_str());

        let binding = self
            .service
            .bind_descriptor(Some(&role), &descriptor, channel.clone())
            .await?;
        self.bindings.write().push(binding);
        self.module_channels.write()[item.module].insert(item.local.name(), item.local.direction(), channel);
        Ok(())
    }

    fn roles(&self, modules: &[usize]) -> String {
        modules
            .iter()
            .map(|&i| self.composition.entries()[i].role())
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// Release the external bindings of this run, newest first, and discard
    /// the shared channels.
    ///
    /// Safe to call from any phase and more than once.
    pub async fn shutdown(&self) {
        if self.phase() == AggregatePhase::Shutdown {
            return;
        }
        self.transition(AggregatePhase::Shutdown);

        // A shared channel sits in both the producer's and the consumer's map.
        let mut counted: Vec<ChannelRef> = Vec::new();
        for channels in self.module_channels.read().iter() {
            for (_, channel) in channels.inputs().chain(channels.outputs()) {
                if !counted.iter().any(|c| Arc::ptr_eq(c, channel)) {
                    counted.push(channel.clone());
                }
            }
        }
        for channel in &counted {
            CHANNEL_MESSAGES_SENT
                .with_label_values(&[channel.name()])
                .inc_by(channel.messages_sent() as f64);
        }

        let bindings = self.bindings();
        info!("[Aggregate] Unbinding {} binding(s)", bindings.len());
        for binding in bindings.iter().rev() {
            self.service.unbind(binding).await;
        }
        let discarded = self.shared.clear();
        info!("[Aggregate] Shutdown complete, {} shared channel(s) discarded", discarded.len());
    }
}
