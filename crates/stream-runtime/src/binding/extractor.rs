//! Channel descriptor extraction.
//!
//! Turns the slots a module declares into validated descriptors. Rejects
//! modules that declare nothing, slots without a name and the same
//! (name, direction) declared twice.

use std::collections::BTreeSet;

use stream_types::{BindingError, BindingResult, ChannelDescriptor, Direction};

use crate::adapters::ports::ModuleDefinition;

/// Extract the descriptor set of `module`.
pub fn extract(module: &dyn ModuleDefinition) -> BindingResult<BTreeSet<ChannelDescriptor>> {
    let slots = module.channels();
    if slots.is_empty() {
        return Err(BindingError::config(format!(
            "module '{}' declares no channels",
            module.name()
        )));
    }

    let mut seen: BTreeSet<(String, Direction)> = BTreeSet::new();
    let mut descriptors = BTreeSet::new();
    for slot in slots {
        let name = slot.name.trim();
        if name.is_empty() {
            return Err(BindingError::config(format!(
                "module '{}' declares a {} channel with an empty name",
                module.name(),
                slot.direction
            )));
        }

        if !seen.insert((name.to_string(), slot.direction)) {
            return Err(BindingError::config_for(
                name,
                format!(
                    "module '{}' declares {} channel '{}' more than once",
                    module.name(),
                    slot.direction,
                    name
                ),
            ));
        }

        let content_type = slot.content_type.filter(|ct| !ct.trim().is_empty());
        descriptors.insert(ChannelDescriptor::new(name, slot.direction, content_type));
    }

    Ok(descriptors)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use stream_types::ChannelSlot;

    struct Declared(Vec<ChannelSlot>);

    impl ModuleDefinition for Declared {
        fn name(&self) -> &str {
            "declared"
        }

        fn channels(&self) -> Vec<ChannelSlot> {
            self.0.clone()
        }
    }

    #[test]
    fn test_extracts_each_slot() {
        let module = Declared(vec![
            ChannelSlot::input("input"),
            ChannelSlot::output("output").with_content_type("application/json"),
        ]);

        let descriptors = extract(&module).unwrap();
        assert_eq!(descriptors.len(), 2);

        let output = descriptors
            .iter()
            .find(|d| d.direction() == Direction::Outbound)
            .unwrap();
        assert_eq!(output.name(), "output");
        assert_eq!(output.content_type(), Some("application/json"));
    }

    #[test]
    fn test_same_name_both_directions_allowed() {
        let module = Declared(vec![ChannelSlot::input("data"), ChannelSlot::output("data")]);
        assert_eq!(extract(&module).unwrap().len(), 2);
    }

    #[test]
    fn test_no_channels_rejected() {
        let err = extract(&Declared(vec![])).unwrap_err();
        assert!(err.to_string().contains("declares no channels"));
    }

    #[test]
    fn test_duplicate_rejected() {
        let module = Declared(vec![ChannelSlot::input("input"), ChannelSlot::input("input")]);
        let err = extract(&module).unwrap_err();
        assert_eq!(err.kind(), "configuration");
        assert!(err.to_string().contains("'input'"));
    }

    #[test]
    fn test_duplicate_with_different_content_type_rejected() {
        let module = Declared(vec![
            ChannelSlot::output("output").with_content_type("text/plain"),
            ChannelSlot::output("output").with_content_type("application/json"),
        ]);
        assert!(extract(&module).is_err());
    }

    #[test]
    fn test_empty_name_rejected() {
        let module = Declared(vec![ChannelSlot::output(" ")]);
        assert!(extract(&module).is_err());
    }

    proptest! {
        #[test]
        fn prop_unique_slots_yield_one_descriptor_each(
            names in proptest::collection::btree_set("[a-z][a-z0-9]{0,8}", 1..12),
            outbound in proptest::collection::vec(any::<bool>(), 12),
        ) {
            let slots: Vec<ChannelSlot> = names
                .iter()
                .zip(outbound.iter())
                .map(|(name, out)| if *out { ChannelSlot::output(name.clone()) } else { ChannelSlot::input(name.clone()) })
                .collect();
            let expected = slots.len();

            let descriptors = extract(&Declared(slots)).unwrap();
            prop_assert_eq!(descriptors.len(), expected);
        }
    }
}
