//! # Binder Registry
//!
//! Named binder instances available to the binding service, plus the factory
//! table used to build them from configuration.
//!
//! ```text
//! [binders.local]            BinderTypeRegistry            BinderRegistry
//! type = "in-memory"   ──►   "in-memory" => factory   ──►  "local" => Arc<dyn Binder>
//! ```
//!
//! ## Selection rules
//!
//! | Requested | Registered | Outcome |
//! |-----------|------------|---------|
//! | none      | 0          | `Configuration` ("no binder registered") |
//! | none      | 1          | the sole binder |
//! | none      | >1         | `AmbiguousBinder` |
//! | `name`    | missing    | `UnknownBinder` |
//!
//! Registrations are append-only. Lookups take a read lock and may run
//! concurrently.

use std::collections::BTreeMap;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::info;

use stream_types::{BindingError, BindingResult};

use crate::adapters::ports::Binder;
use crate::adapters::{InMemoryBinder, InMemoryBroker, IN_MEMORY_BINDER_TYPE};

/// Name → binder table.
#[derive(Default)]
pub struct BinderRegistry {
    binders: RwLock<BTreeMap<String, Arc<dyn Binder>>>,
}

impl BinderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a binder under `name`.
    ///
    /// # Errors
    ///
    /// `Configuration` if the name is empty or already taken.
    pub fn register(&self, name: impl Into<String>, binder: Arc<dyn Binder>) -> BindingResult<()> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(BindingError::config("binder name must not be empty"));
        }

        let mut binders = self.binders.write();
        if binders.contains_key(&name) {
            return Err(BindingError::config(format!(
                "binder '{}' is already registered",
                name
            )));
        }

        info!(
            "[Registry] Binder '{}' registered (type: {})",
            name,
            binder.binder_type()
        );
        binders.insert(name, binder);
        Ok(())
    }

    /// Select a binder, returning the registered name alongside it.
    pub fn get(&self, name: Option<&str>) -> BindingResult<(String, Arc<dyn Binder>)> {
        let binders = self.binders.read();

        match name {
            Some(name) => binders
                .get(name)
                .map(|binder| (name.to_string(), Arc::clone(binder)))
                .ok_or_else(|| BindingError::UnknownBinder {
                    channel: None,
                    binder: name.to_string(),
                }),
            None => {
                let mut iter = binders.iter();
                match (iter.next(), iter.next()) {
                    (None, _) => Err(BindingError::config("no binder registered")),
                    (Some((name, binder)), None) => Ok((name.clone(), Arc::clone(binder))),
                    (Some(_), Some(_)) => Err(BindingError::AmbiguousBinder {
                        channel: None,
                        candidates: binders.keys().cloned().collect(),
                    }),
                }
            }
        }
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.binders.read().contains_key(name)
    }

    /// Registered names, sorted.
    #[must_use]
    pub fn names(&self) -> Vec<String> {
        self.binders.read().keys().cloned().collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.binders.read().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.binders.read().is_empty()
    }
}

impl std::fmt::Debug for BinderRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BinderRegistry")
            .field("binders", &self.names())
            .finish()
    }
}

// =============================================================================
// BINDER TYPES
// =============================================================================

/// Settings handed to a binder factory: the `[binders.<name>.environment]`
/// table of one configured binder.
#[derive(Debug, Clone, Default)]
pub struct BinderEnvironment {
    pub name: String,
    pub properties: BTreeMap<String, String>,
}

impl BinderEnvironment {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            properties: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.properties.get(key).map(String::as_str)
    }
}

/// Builds a binder instance from its environment.
pub type BinderFactory =
    Box<dyn Fn(&BinderEnvironment) -> BindingResult<Arc<dyn Binder>> + Send + Sync>;

/// Type tag → factory table.
#[derive(Default)]
pub struct BinderTypeRegistry {
    factories: RwLock<BTreeMap<String, BinderFactory>>,
}

impl BinderTypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the `in-memory` type wired to `broker`.
    ///
    /// Every in-memory binder created from it shares the broker, so two
    /// configured in-memory binders can exchange messages.
    pub fn with_in_memory(broker: Arc<InMemoryBroker>) -> Self {
        let registry = Self::new();
        registry.register(IN_MEMORY_BINDER_TYPE, move |_env| {
            let binder: Arc<dyn Binder> = Arc::new(InMemoryBinder::with_broker(Arc::clone(&broker)));
            Ok(binder)
        });
        registry
    }

    /// Register (or replace) the factory for `binder_type`.
    pub fn register<F>(&self, binder_type: impl Into<String>, factory: F)
    where
        F: Fn(&BinderEnvironment) -> BindingResult<Arc<dyn Binder>> + Send + Sync + 'static,
    {
        self.factories
            .write()
            .insert(binder_type.into(), Box::new(factory));
    }

    /// Instantiate a binder of `binder_type`.
    ///
    /// # Errors
    ///
    /// `Configuration` for an unknown type, or whatever the factory returns.
    pub fn create(
        &self,
        binder_type: &str,
        environment: &BinderEnvironment,
    ) -> BindingResult<Arc<dyn Binder>> {
        let factories = self.factories.read();
        let factory = factories.get(binder_type).ok_or_else(|| {
            BindingError::config(format!(
                "binder '{}' has unknown type '{}' (known: [{}])",
                environment.name,
                binder_type,
                factories.keys().cloned().collect::<Vec<_>>().join(", ")
            ))
        })?;
        factory(environment)
    }

    #[must_use]
    pub fn types(&self) -> Vec<String> {
        self.factories.read().keys().cloned().collect()
    }
}
