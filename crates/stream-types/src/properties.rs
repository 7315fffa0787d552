//! # Binding Properties
//!
//! Per-channel settings merged from the configuration layers. One instance
//! exists per channel name; it is only mutated by the resolver's merge step.

use crate::errors::{BindingError, BindingResult};
use serde::{Deserialize, Serialize};

/// Property keys understood by the resolver.
pub mod keys {
    pub const BINDER: &str = "binder";
    pub const CONTENT_TYPE: &str = "content-type";
    pub const GROUP: &str = "group";
    pub const DESTINATION: &str = "destination";

    pub const PRODUCER_PARTITION_KEY_EXPRESSION: &str = "producer.partition-key-expression";
    pub const PRODUCER_PARTITION_COUNT: &str = "producer.partition-count";
    pub const PRODUCER_REQUIRED_GROUPS: &str = "producer.required-groups";

    pub const CONSUMER_CONCURRENCY: &str = "consumer.concurrency";
    pub const CONSUMER_PARTITIONED: &str = "consumer.partitioned";
    pub const CONSUMER_INSTANCE_INDEX: &str = "consumer.instance-index";
    pub const CONSUMER_INSTANCE_COUNT: &str = "consumer.instance-count";
    pub const CONSUMER_MAX_ATTEMPTS: &str = "consumer.max-attempts";

    /// Every key, in resolution order.
    pub const ALL: &[&str] = &[
        BINDER,
        CONTENT_TYPE,
        GROUP,
        DESTINATION,
        PRODUCER_PARTITION_KEY_EXPRESSION,
        PRODUCER_PARTITION_COUNT,
        PRODUCER_REQUIRED_GROUPS,
        CONSUMER_CONCURRENCY,
        CONSUMER_PARTITIONED,
        CONSUMER_INSTANCE_INDEX,
        CONSUMER_INSTANCE_COUNT,
        CONSUMER_MAX_ATTEMPTS,
    ];
}

/// Options passed to a producer bind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProducerOptions {
    /// Expression evaluated by the binder to pick a partition key.
    pub partition_key_expression: Option<String>,
    /// Number of target partitions.
    pub partition_count: u32,
    /// Consumer groups the binder must provision ahead of the first send.
    pub required_groups: Vec<String>,
}

impl Default for ProducerOptions {
    fn default() -> Self {
        Self {
            partition_key_expression: None,
            partition_count: 1,
            required_groups: Vec::new(),
        }
    }
}

impl ProducerOptions {
    #[must_use]
    pub fn is_partitioned(&self) -> bool {
        self.partition_key_expression.is_some() || self.partition_count > 1
    }
}

/// Options passed to a consumer bind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsumerOptions {
    pub concurrency: u32,
    pub partitioned: bool,
    pub instance_index: u32,
    pub instance_count: u32,
    /// Delivery attempts the binder makes before giving up on a message.
    pub max_attempts: u32,
}

impl Default for ConsumerOptions {
    fn default() -> Self {
        Self {
            concurrency: 1,
            partitioned: false,
            instance_index: 0,
            instance_count: 1,
            max_attempts: 3,
        }
    }
}

/// Fully merged settings for one channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BindingProperties {
    pub channel_name: String,
    /// Binder to use; `None` means the sole registered binder.
    pub binder: Option<String>,
    pub content_type: Option<String>,
    pub group: Option<String>,
    /// Broker-side name; defaults to the channel name.
    pub destination: Option<String>,
    pub producer: ProducerOptions,
    pub consumer: ConsumerOptions,
}

impl BindingProperties {
    /// Properties with every setting at its default.
    pub fn new(channel_name: impl Into<String>) -> Self {
        Self {
            channel_name: channel_name.into(),
            binder: None,
            content_type: None,
            group: None,
            destination: None,
            producer: ProducerOptions::default(),
            consumer: ConsumerOptions::default(),
        }
    }

    /// The name the binder binds against.
    #[must_use]
    pub fn destination(&self) -> &str {
        self.destination.as_deref().unwrap_or(&self.channel_name)
    }

    /// Check option invariants.
    ///
    /// # Errors
    ///
    /// Returns `BindingError::Configuration` naming the channel for the first
    /// violated constraint.
    pub fn validate(&self) -> BindingResult<()> {
        let fail = |message: String| Err(BindingError::config_for(&self.channel_name, message));

        if self.producer.partition_count == 0 {
            return fail(format!("{} must be at least 1", keys::PRODUCER_PARTITION_COUNT));
        }
        if self.consumer.concurrency == 0 {
            return fail(format!("{} must be at least 1", keys::CONSUMER_CONCURRENCY));
        }
        if self.consumer.max_attempts == 0 {
            return fail(format!("{} must be at least 1", keys::CONSUMER_MAX_ATTEMPTS));
        }
        if self.consumer.instance_count == 0 {
            return fail(format!("{} must be at least 1", keys::CONSUMER_INSTANCE_COUNT));
        }
        if self.consumer.instance_index >= self.consumer.instance_count {
            return fail(format!(
                "{} ({}) must be lower than {} ({})",
                keys::CONSUMER_INSTANCE_INDEX,
                self.consumer.instance_index,
                keys::CONSUMER_INSTANCE_COUNT,
                self.consumer.instance_count
            ));
        }
        Ok(())
    }
}
