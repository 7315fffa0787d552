//! # Descriptor Extraction
//!
//! Declared slots become descriptors one-for-one; malformed declarations are
//! rejected before anything is bound.

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use stream_runtime::{extract, ModuleDefinition, ModuleShape, ModuleSpec};
    use stream_types::{BindingError, ChannelSlot, Direction};

    // =============================================================================
    // STANDARD SHAPES
    // =============================================================================

    #[test]
    fn test_standard_shapes() {
        let cases = [
            (ModuleShape::Source, 1, 0),
            (ModuleShape::Sink, 0, 1),
            (ModuleShape::Processor, 1, 1),
        ];

        for (shape, outputs, inputs) in cases {
            let descriptors = extract(&ModuleSpec::shaped(shape)).unwrap();
            let count = |d: Direction| descriptors.iter().filter(|x| x.direction() == d).count();
            assert_eq!(count(Direction::Outbound), outputs, "{shape:?}");
            assert_eq!(count(Direction::Inbound), inputs, "{shape:?}");
        }
    }

    #[test]
    fn test_declared_content_type_is_kept() {
        let module = ModuleSpec::new("typed")
            .output("events")
            .content_type("events", "application/json");

        let descriptors = extract(&module).unwrap();
        let events = descriptors.iter().next().unwrap();
        assert_eq!(events.content_type(), Some("application/json"));
    }

    // =============================================================================
    // REJECTED DECLARATIONS
    // =============================================================================

    #[test]
    fn test_module_without_channels() {
        let err = extract(&ModuleSpec::new("empty")).unwrap_err();
        assert!(matches!(err, BindingError::Configuration { .. }));
        assert!(err.to_string().contains("'empty'"));
    }

    #[test]
    fn test_duplicate_slot() {
        let module = ModuleSpec::new("dup").output("output").output("output");
        let err = extract(&module).unwrap_err();
        assert!(err.to_string().contains("more than once"));
    }

    proptest! {
        #[test]
        fn prop_descriptor_count_matches_unique_slots(
            inputs in proptest::collection::btree_set("[a-z]{1,6}", 0..8),
            outputs in proptest::collection::btree_set("[a-z]{1,6}", 0..8),
        ) {
            prop_assume!(!inputs.is_empty() || !outputs.is_empty());

            let slots: Vec<ChannelSlot> = inputs
                .iter()
                .map(|n| ChannelSlot::input(n.clone()))
                .chain(outputs.iter().map(|n| ChannelSlot::output(n.clone())))
                .collect();
            let module = ModuleSpec::new("generated").with_slots(slots);

            let descriptors = extract(&module).unwrap();
            prop_assert_eq!(descriptors.len(), inputs.len() + outputs.len());
            prop_assert_eq!(module.channels().len(), descriptors.len());
        }
    }
}
