//! # Module Composition
//!
//! The ordered list of modules taking part in one aggregated run, each with a
//! role and optional channel aliases.
//!
//! Aliases map a module-local channel name to the name used across the
//! composition. Two modules meet on a channel when one declares it outbound
//! and the other inbound under the same composition name.
//!
//! `AggregateBuilder` links modules in a chain:
//!
//! ```text
//! from(source).as_role("source").to(processor).as_role("doubler")
//!
//!   source            processor
//!   output ──────────► input          both renamed to "source.output"
//!                      output         stays "output", bound externally
//! ```

use std::collections::BTreeMap;
use std::sync::Arc;

use stream_types::{BindingError, BindingResult, Direction};

use crate::adapters::ports::ModuleDefinition;

/// One module inside a composition.
#[derive(Clone)]
pub struct CompositionEntry {
    module: Arc<dyn ModuleDefinition>,
    role: String,
    aliases: BTreeMap<(Direction, String), String>,
}

impl CompositionEntry {
    /// Entry whose role is the module name.
    pub fn new(module: Arc<dyn ModuleDefinition>) -> Self {
        let role = module.name().to_string();
        Self {
            module,
            role,
            aliases: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn with_role(mut self, role: impl Into<String>) -> Self {
        self.role = role.into();
        self
    }

    /// Expose the module's `local` channel as `name` within the composition.
    #[must_use]
    pub fn with_alias(mut self, direction: Direction, local: impl Into<String>, name: impl Into<String>) -> Self {
        self.aliases.insert((direction, local.into()), name.into());
        self
    }

    #[must_use]
    pub fn module(&self) -> &Arc<dyn ModuleDefinition> {
        &self.module
    }

    #[must_use]
    pub fn role(&self) -> &str {
        &self.role
    }

    /// Composition name of a module-local channel.
    #[must_use]
    pub fn composite_name(&self, direction: Direction, local: &str) -> String {
        self.aliases
            .get(&(direction, local.to_string()))
            .cloned()
            .unwrap_or_else(|| local.to_string())
    }
}

impl std::fmt::Debug for CompositionEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompositionEntry")
            .field("module", &self.module.name())
            .field("role", &self.role)
            .field("aliases", &self.aliases)
            .finish()
    }
}

/// Ordered modules of one run.
#[derive(Debug, Clone, Default)]
pub struct ModuleComposition {
    entries: Vec<CompositionEntry>,
}

impl ModuleComposition {
    pub fn new() -> Self {
        Self::default()
    }

    /// One-module composition.
    pub fn single(module: Arc<dyn ModuleDefinition>) -> Self {
        Self::new().with_entry(CompositionEntry::new(module))
    }

    #[must_use]
    pub fn with_entry(mut self, entry: CompositionEntry) -> Self {
        self.entries.push(entry);
        self
    }

    #[must_use]
    pub fn with_module(self, module: Arc<dyn ModuleDefinition>) -> Self {
        self.with_entry(CompositionEntry::new(module))
    }

    pub fn push(&mut self, entry: CompositionEntry) {
        self.entries.push(entry);
    }

    #[must_use]
    pub fn entries(&self) -> &[CompositionEntry] {
        &self.entries
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Chain builder with convention renames between adjacent modules.
pub struct AggregateBuilder {
    entries: Vec<CompositionEntry>,
}

impl AggregateBuilder {
    /// Start a chain with `module`.
    #[allow(clippy::should_implement_trait)]
    pub fn from(module: Arc<dyn ModuleDefinition>) -> Self {
        Self {
            entries: vec![CompositionEntry::new(module)],
        }
    }

    /// Role of the module added last.
    #[must_use]
    pub fn as_role(mut self, role: impl Into<String>) -> Self {
        if let Some(last) = self.entries.pop() {
            self.entries.push(last.with_role(role));
        }
        self
    }

    /// Append `module`, fed by the module added before it.
    #[must_use]
    pub fn to(mut self, module: Arc<dyn ModuleDefinition>) -> Self {
        self.entries.push(CompositionEntry::new(module));
        self
    }

    /// Apply the convention renames and produce the composition.
    ///
    /// Each link renames the upstream sole output and the downstream sole
    /// input to `<upstream role>.<upstream output>`.
    ///
    /// # Errors
    ///
    /// `Configuration` when a linked module does not declare exactly one
    /// channel on the linked side.
    pub fn build(self) -> BindingResult<ModuleComposition> {
        let mut entries = self.entries;

        for i in 1..entries.len() {
            let upstream_output = sole_slot(&entries[i - 1], Direction::Outbound)?;
            let downstream_input = sole_slot(&entries[i], Direction::Inbound)?;
            let link = format!("{}.{}", entries[i - 1].role(), upstream_output);

            let upstream = entries[i - 1].clone();
            entries[i - 1] = upstream.with_alias(Direction::Outbound, upstream_output, link.clone());
            let downstream = entries[i].clone();
            entries[i] = downstream.with_alias(Direction::Inbound, downstream_input, link);
        }

        Ok(ModuleComposition { entries })
    }
}

fn sole_slot(entry: &CompositionEntry, direction: Direction) -> BindingResult<String> {
    let names: Vec<String> = entry
        .module()
        .channels()
        .into_iter()
        .filter(|slot| slot.direction == direction)
        .map(|slot| slot.name)
        .collect();

    match names.as_slice() {
        [name] => Ok(name.clone()),
        _ => Err(BindingError::config(format!(
            "module '{}' (role '{}') must declare exactly one {} channel to be linked, found {}",
            entry.module().name(),
            entry.role(),
            direction,
            names.len()
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modules::ModuleSpec;

    #[test]
    fn test_entry_defaults_role_to_module_name() {
        let entry = CompositionEntry::new(ModuleSpec::source().build());
        assert_eq!(entry.role(), "source");
        assert_eq!(entry.composite_name(Direction::Outbound, "output"), "output");
    }

    #[test]
    fn test_alias_is_per_direction() {
        let entry = CompositionEntry::new(ModuleSpec::processor().build()).with_alias(
            Direction::Inbound,
            "input",
            "numbers",
        );
        assert_eq!(entry.composite_name(Direction::Inbound, "input"), "numbers");
        assert_eq!(entry.composite_name(Direction::Outbound, "input"), "input");
    }

    #[test]
    fn test_builder_links_adjacent_modules() {
        let composition = AggregateBuilder::from(ModuleSpec::source().build())
            .as_role("source")
            .to(ModuleSpec::new("proc").input("input").output("output2").build())
            .as_role("processor")
            .build()
            .unwrap();

        let entries = composition.entries();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].composite_name(Direction::Outbound, "output"), "source.output");
        assert_eq!(entries[1].composite_name(Direction::Inbound, "input"), "source.output");
        assert_eq!(entries[1].composite_name(Direction::Outbound, "output2"), "output2");
        assert_eq!(entries[1].role(), "processor");
    }

    #[test]
    fn test_builder_chain_of_three_uses_distinct_links() {
        let composition = AggregateBuilder::from(ModuleSpec::source().build())
            .to(ModuleSpec::processor().build())
            .to(ModuleSpec::sink().build())
            .build()
            .unwrap();

        let entries = composition.entries();
        assert_eq!(entries[1].composite_name(Direction::Inbound, "input"), "source.output");
        assert_eq!(entries[1].composite_name(Direction::Outbound, "output"), "processor.output");
        assert_eq!(entries[2].composite_name(Direction::Inbound, "input"), "processor.output");
    }

    #[test]
    fn test_builder_rejects_ambiguous_link() {
        let err = AggregateBuilder::from(ModuleSpec::new("two").output("a").output("b").build())
            .to(ModuleSpec::sink().build())
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("exactly one outbound channel"));
    }
}
