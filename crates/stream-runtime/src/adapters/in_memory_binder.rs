//! # In-Memory Binder
//!
//! A process-local broker plus the `Binder` adapter in front of it. Used by
//! tests and by single-process deployments that want the binding path
//! exercised without an external broker.
//!
//! ## Semantics
//!
//! - Destinations are created on first use and live as long as the broker.
//! - Anonymous consumers see every message published after they bind.
//! - Consumers in the same group share one cursor, so each message reaches
//!   exactly one member of the group.
//! - `producer.required-groups` provisions group cursors at producer bind
//!   time so nothing is lost before the first group member binds.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use stream_channel::{ChannelRef, DEFAULT_CHANNEL_CAPACITY};
use stream_types::{ConsumerOptions, Direction, Message, ProducerOptions};

use crate::adapters::ports::{Binder, BindingHandle, TransportError};

/// Type tag under which the in-memory binder is registered.
pub const IN_MEMORY_BINDER_TYPE: &str = "in-memory";

type GroupCursor = Arc<tokio::sync::Mutex<broadcast::Receiver<Message>>>;

/// Named destinations backed by broadcast channels.
pub struct InMemoryBroker {
    destinations: RwLock<HashMap<String, broadcast::Sender<Message>>>,
    groups: Mutex<HashMap<(String, String), GroupCursor>>,
    capacity: usize,
}

impl InMemoryBroker {
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CHANNEL_CAPACITY)
    }

    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            destinations: RwLock::new(HashMap::new()),
            groups: Mutex::new(HashMap::new()),
            capacity: capacity.max(1),
        }
    }

    fn sender(&self, destination: &str) -> broadcast::Sender<Message> {
        if let Some(sender) = self.destinations.read().get(destination) {
            return sender.clone();
        }
        self.destinations
            .write()
            .entry(destination.to_string())
            .or_insert_with(|| {
                debug!(destination, "Destination created");
                broadcast::channel(self.capacity).0
            })
            .clone()
    }

    fn group_cursor(&self, destination: &str, group: &str) -> GroupCursor {
        self.groups
            .lock()
            .entry((destination.to_string(), group.to_string()))
            .or_insert_with(|| {
                debug!(destination, group, "Consumer group provisioned");
                Arc::new(tokio::sync::Mutex::new(self.sender(destination).subscribe()))
            })
            .clone()
    }

    /// Publish directly to a destination, bypassing any binding.
    ///
    /// Returns the number of cursors that will see the message.
    pub fn publish(&self, destination: &str, message: Message) -> usize {
        self.sender(destination).send(message).unwrap_or(0)
    }

    /// Raw anonymous subscription to a destination.
    #[must_use]
    pub fn subscribe(&self, destination: &str) -> broadcast::Receiver<Message> {
        self.sender(destination).subscribe()
    }

    /// Known destination names, sorted.
    #[must_use]
    pub fn destinations(&self) -> Vec<String> {
        let mut names: Vec<_> = self.destinations.read().keys().cloned().collect();
        names.sort();
        names
    }

    /// Whether `group` has been provisioned on `destination`.
    #[must_use]
    pub fn has_group(&self, destination: &str, group: &str) -> bool {
        self.groups
            .lock()
            .contains_key(&(destination.to_string(), group.to_string()))
    }
}

impl Default for InMemoryBroker {
    fn default() -> Self {
        Self::new()
    }
}

/// One bind call seen by the binder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BindingRecord {
    pub name: String,
    pub direction: Direction,
    pub group: Option<String>,
}

/// `Binder` over an `InMemoryBroker`.
pub struct InMemoryBinder {
    broker: Arc<InMemoryBroker>,
    records: Mutex<Vec<BindingRecord>>,
    failing: Mutex<HashSet<String>>,
}

impl InMemoryBinder {
    /// Binder with a private broker.
    #[must_use]
    pub fn new() -> Self {
        Self::with_broker(Arc::new(InMemoryBroker::new()))
    }

    /// Binder over a broker shared with other binders.
    #[must_use]
    pub fn with_broker(broker: Arc<InMemoryBroker>) -> Self {
        Self {
            broker,
            records: Mutex::new(Vec::new()),
            failing: Mutex::new(HashSet::new()),
        }
    }

    #[must_use]
    pub fn broker(&self) -> &Arc<InMemoryBroker> {
        &self.broker
    }

    /// Make every bind against `name` fail until `restore` is called.
    pub fn fail_binds_for(&self, name: &str) {
        self.failing.lock().insert(name.to_string());
    }

    pub fn restore(&self, name: &str) {
        self.failing.lock().remove(name);
    }

    /// Successful bind calls, in order.
    #[must_use]
    pub fn records(&self) -> Vec<BindingRecord> {
        self.records.lock().clone()
    }

    /// Names bound in `direction`, in bind order.
    #[must_use]
    pub fn bound_names(&self, direction: Direction) -> Vec<String> {
        self.records
            .lock()
            .iter()
            .filter(|r| r.direction == direction)
            .map(|r| r.name.clone())
            .collect()
    }

    fn check_available(&self, name: &str) -> Result<(), TransportError> {
        if self.failing.lock().contains(name) {
            return Err(TransportError::new(format!(
                "destination '{}' is unavailable",
                name
            )));
        }
        Ok(())
    }

    fn record(&self, name: &str, direction: Direction, group: Option<&str>) {
        self.records.lock().push(BindingRecord {
            name: name.to_string(),
            direction,
            group: group.map(str::to_string),
        });
    }
}

impl Default for InMemoryBinder {
    fn default() -> Self {
        Self::new()
    }
}

enum Cursor {
    Anonymous(broadcast::Receiver<Message>),
    Group(GroupCursor),
}

impl Cursor {
    async fn next(&mut self) -> Result<Message, broadcast::error::RecvError> {
        match self {
            Self::Anonymous(receiver) => receiver.recv().await,
            Self::Group(shared) => shared.lock().await.recv().await,
        }
    }
}

#[async_trait]
impl Binder for InMemoryBinder {
    fn binder_type(&self) -> &str {
        IN_MEMORY_BINDER_TYPE
    }

    async fn bind_consumer(
        &self,
        name: &str,
        group: Option<&str>,
        channel: ChannelRef,
        options: &ConsumerOptions,
    ) -> Result<Box<dyn BindingHandle>, TransportError> {
        self.check_available(name)?;

        let mut cursor = match group {
            Some(group) => Cursor::Group(self.broker.group_cursor(name, group)),
            None => Cursor::Anonymous(self.broker.subscribe(name)),
        };

        let destination = name.to_string();
        let task = tokio::spawn(async move {
            loop {
                match cursor.next().await {
                    Ok(message) => {
                        channel.send(message);
                    }
                    Err(broadcast::error::RecvError::Lagged(count)) => {
                        warn!(destination = %destination, lagged = count, "Consumer lagged, messages dropped");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        });

        self.record(name, Direction::Inbound, group);
        info!(
            destination = name,
            group = ?group,
            concurrency = options.concurrency,
            "In-memory consumer bound"
        );

        Ok(Box::new(InMemoryHandle::new(task)))
    }

    async fn bind_producer(
        &self,
        name: &str,
        channel: ChannelRef,
        options: &ProducerOptions,
    ) -> Result<Box<dyn BindingHandle>, TransportError> {
        self.check_available(name)?;

        for group in &options.required_groups {
            self.broker.group_cursor(name, group);
        }

        let sender = self.broker.sender(name);
        let mut subscription = channel.subscribe();
        let task = tokio::spawn(async move {
            while let Some(message) = subscription.recv().await {
                // No cursor on the destination yet; the message is dropped.
                let _ = sender.send(message);
            }
        });

        self.record(name, Direction::Outbound, None);
        info!(
            destination = name,
            partitions = options.partition_count,
            required_groups = ?options.required_groups,
            "In-memory producer bound"
        );

        Ok(Box::new(InMemoryHandle::new(task)))
    }
}

/// Handle wrapping the forwarding task of one binding.
struct InMemoryHandle {
    task: Mutex<Option<JoinHandle<()>>>,
    released: AtomicBool,
}

impl InMemoryHandle {
    fn new(task: JoinHandle<()>) -> Self {
        Self {
            task: Mutex::new(Some(task)),
            released: AtomicBool::new(false),
        }
    }
}

#[async_trait]
impl BindingHandle for InMemoryHandle {
    async fn unbind(&self) -> Result<(), TransportError> {
        if let Some(task) = self.task.lock().take() {
            task.abort();
        }
        self.released.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn is_active(&self) -> bool {
        !self.released.load(Ordering::SeqCst)
            && self
                .task
                .lock()
                .as_ref()
                .is_some_and(|task| !task.is_finished())
    }
}
