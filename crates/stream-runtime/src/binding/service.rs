//! # Binding Service
//!
//! Connects a channel to a binder and keeps the resulting `Binding` until
//! shutdown.
//!
//! ```text
//! descriptor ──► resolve properties ──► select binder ──► configure channel ──► bind
//!                (layered sources)      (registry)        (configurer chain)    │
//!                                                                              ▼
//!                                                              Binding { Active, handle }
//! ```
//!
//! Inbound descriptors become consumer bindings, outbound ones producer
//! bindings. A failed bind registers nothing, so the same descriptor can be
//! bound again. Bindings are released in reverse order at shutdown, each
//! unbind bounded by a timeout.

use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::{Mutex, RwLock};
use serde::Serialize;
use tokio::time::timeout;
use tracing::{error, info, instrument, warn};

use stream_channel::ChannelRef;
use stream_telemetry::{BINDINGS_ACTIVE, BINDINGS_CREATED, BIND_DURATION, BIND_FAILURES, UNBIND_TIMEOUTS};
use stream_types::{BindingError, BindingProperties, BindingResult, ChannelDescriptor, Direction};

use crate::adapters::ports::{Binder, BindingHandle, TransportError};
use crate::binding::configurer::ConfigurerChain;
use crate::binding::properties::BindingPropertiesResolver;
use crate::health::HealthReport;
use crate::registry::BinderRegistry;

/// Default bound on a single unbind call at shutdown.
pub const DEFAULT_UNBIND_TIMEOUT: Duration = Duration::from_millis(5000);

/// Lifecycle state of a binding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BindingState {
    Active,
    Unbound,
}

/// A channel bound to a binder.
pub struct Binding {
    channel_name: String,
    direction: Direction,
    binder_name: String,
    destination: String,
    handle: Box<dyn BindingHandle>,
    state: Mutex<BindingState>,
}

impl Binding {
    #[must_use]
    pub fn channel_name(&self) -> &str {
        &self.channel_name
    }

    #[must_use]
    pub fn direction(&self) -> Direction {
        self.direction
    }

    #[must_use]
    pub fn binder_name(&self) -> &str {
        &self.binder_name
    }

    #[must_use]
    pub fn destination(&self) -> &str {
        &self.destination
    }

    #[must_use]
    pub fn state(&self) -> BindingState {
        *self.state.lock()
    }

    /// Active and still delivering according to the binder.
    #[must_use]
    pub fn is_healthy(&self) -> bool {
        self.state() == BindingState::Active && self.handle.is_active()
    }

    /// Release the binder handle.
    ///
    /// Returns `Ok(false)` without touching the binder when already unbound.
    /// The binding is marked `Unbound` before the binder is called, so a
    /// failing or abandoned unbind still leaves it released.
    pub async fn unbind(&self) -> Result<bool, TransportError> {
        {
            let mut state = self.state.lock();
            if *state == BindingState::Unbound {
                return Ok(false);
            }
            *state = BindingState::Unbound;
        }
        BINDINGS_ACTIVE.dec();
        self.handle.unbind().await?;
        Ok(true)
    }
}

impl std::fmt::Debug for Binding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Binding")
            .field("channel", &self.channel_name)
            .field("direction", &self.direction)
            .field("binder", &self.binder_name)
            .field("destination", &self.destination)
            .field("state", &self.state())
            .finish()
    }
}

/// Binds descriptors and owns the resulting bindings.
pub struct BindingService {
    registry: Arc<BinderRegistry>,
    resolver: BindingPropertiesResolver,
    configurers: ConfigurerChain,
    bindings: RwLock<Vec<Arc<Binding>>>,
    unbind_timeout: Duration,
}

impl BindingService {
    pub fn new(
        registry: Arc<BinderRegistry>,
        resolver: BindingPropertiesResolver,
        configurers: ConfigurerChain,
    ) -> Self {
        Self {
            registry,
            resolver,
            configurers,
            bindings: RwLock::new(Vec::new()),
            unbind_timeout: DEFAULT_UNBIND_TIMEOUT,
        }
    }

    #[must_use]
    pub fn with_unbind_timeout(mut self, unbind_timeout: Duration) -> Self {
        self.unbind_timeout = unbind_timeout;
        self
    }

    #[must_use]
    pub fn registry(&self) -> &Arc<BinderRegistry> {
        &self.registry
    }

    #[must_use]
    pub fn unbind_timeout(&self) -> Duration {
        self.unbind_timeout
    }

    /// Resolve properties for `channel`, optionally under a module role.
    pub fn resolve(&self, scope: Option<&str>, channel: &str) -> BindingResult<BindingProperties> {
        self.resolver
            .resolve_scoped(scope, channel, &self.registry)
            .map_err(|e| e.with_channel(channel))
    }

    /// Keys only meaningful for an external binding that are explicitly set
    /// for `channel`.
    #[must_use]
    pub fn explicit_external_keys(&self, scope: Option<&str>, channel: &str) -> Vec<&'static str> {
        self.resolver.explicit_external_keys(scope, channel)
    }

    /// Apply the configurer chain to `channel`.
    pub fn configure_channel(
        &self,
        channel: ChannelRef,
        channel_name: &str,
        properties: &BindingProperties,
    ) -> ChannelRef {
        self.configurers.configure(channel, channel_name, properties)
    }

    /// Bind `channel` with already resolved properties and binder.
    ///
    /// # Errors
    ///
    /// `BinderConnection` when the binder rejects the bind. Nothing is
    /// registered in that case.
    #[instrument(skip_all, fields(channel = descriptor.name(), direction = %descriptor.direction(), binder = binder_name))]
    pub async fn bind(
        &self,
        descriptor: &ChannelDescriptor,
        properties: &BindingProperties,
        binder_name: &str,
        binder: Arc<dyn Binder>,
        channel: ChannelRef,
    ) -> BindingResult<Arc<Binding>> {
        let destination = properties.destination();
        let started = Instant::now();

        let outcome = match descriptor.direction() {
            Direction::Inbound => {
                binder
                    .bind_consumer(destination, properties.group.as_deref(), channel, &properties.consumer)
                    .await
            }
            Direction::Outbound => {
                if properties.group.is_some() {
                    warn!(channel = descriptor.name(), "group is ignored on an outbound channel");
                }
                binder
                    .bind_producer(destination, channel, &properties.producer)
                    .await
            }
        };

        BIND_DURATION
            .with_label_values(&[binder_name])
            .observe(started.elapsed().as_secs_f64());

        let handle = match outcome {
            Ok(handle) => handle,
            Err(e) => {
                let err = BindingError::BinderConnection {
                    channel: descriptor.name().to_string(),
                    binder: binder_name.to_string(),
                    message: e.message,
                };
                BIND_FAILURES
                    .with_label_values(&[binder_name, err.kind()])
                    .inc();
                error!("[Binding] {}", err);
                return Err(err);
            }
        };

        let binding = Arc::new(Binding {
            channel_name: descriptor.name().to_string(),
            direction: descriptor.direction(),
            binder_name: binder_name.to_string(),
            destination: destination.to_string(),
            handle,
            state: Mutex::new(BindingState::Active),
        });
        self.bindings.write().push(Arc::clone(&binding));

        BINDINGS_ACTIVE.inc();
        BINDINGS_CREATED
            .with_label_values(&[binder_name, descriptor.direction().as_str()])
            .inc();
        info!(
            "[Binding] {} bound to '{}' via binder '{}'",
            descriptor, destination, binder_name
        );

        Ok(binding)
    }

    /// Resolve, select a binder, configure and bind in one step.
    ///
    /// The descriptor's declared content type applies when no layer sets one.
    pub async fn bind_descriptor(
        &self,
        scope: Option<&str>,
        descriptor: &ChannelDescriptor,
        channel: ChannelRef,
    ) -> BindingResult<Arc<Binding>> {
        let mut properties = self.resolve(scope, descriptor.name())?;
        if properties.content_type.is_none() {
            properties.content_type = descriptor.content_type().map(str::to_string);
        }
        self.bind_with_properties(descriptor, &properties, channel).await
    }

    /// Select the binder named by `properties`, configure and bind.
    pub async fn bind_with_properties(
        &self,
        descriptor: &ChannelDescriptor,
        properties: &BindingProperties,
        channel: ChannelRef,
    ) -> BindingResult<Arc<Binding>> {
        let (binder_name, binder) = self
            .registry
            .get(properties.binder.as_deref())
            .map_err(|e| {
                BIND_FAILURES
                    .with_label_values(&["none", e.kind()])
                    .inc();
                e.with_channel(descriptor.name())
            })?;

        let channel = self.configure_channel(channel, descriptor.name(), properties);
        self.bind(descriptor, properties, &binder_name, binder, channel).await
    }

    /// Release one binding. A second call is a no-op.
    pub async fn unbind(&self, binding: &Binding) {
        match timeout(self.unbind_timeout, binding.unbind()).await {
            Ok(Ok(true)) => info!("[Binding] '{}' unbound", binding.channel_name()),
            Ok(Ok(false)) => {}
            Ok(Err(e)) => warn!(
                channel = binding.channel_name(),
                binder = binding.binder_name(),
                error = %e,
                "Unbind failed, binding released anyway"
            ),
            Err(_) => {
                UNBIND_TIMEOUTS.inc();
                warn!(
                    channel = binding.channel_name(),
                    binder = binding.binder_name(),
                    timeout_ms = self.unbind_timeout.as_millis() as u64,
                    "Unbind timed out, binding released anyway"
                );
            }
        }
    }

    /// Release every binding, most recent first.
    pub async fn unbind_all(&self) {
        let bindings = self.bindings();
        info!("[Binding] Unbinding {} binding(s)", bindings.len());
        for binding in bindings.iter().rev() {
            self.unbind(binding).await;
        }
    }

    /// Snapshot of every binding made so far, in bind order.
    #[must_use]
    pub fn bindings(&self) -> Vec<Arc<Binding>> {
        self.bindings.read().clone()
    }

    #[must_use]
    pub fn active_count(&self) -> usize {
        self.bindings
            .read()
            .iter()
            .filter(|b| b.state() == BindingState::Active)
            .count()
    }

    /// Health of the registered bindings.
    #[must_use]
    pub fn health(&self) -> HealthReport {
        HealthReport::from_bindings(&self.bindings(), Vec::new())
    }
}
