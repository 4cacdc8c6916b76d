// Cable list derivation. Amount is the sole count driver; light type is accepted but
// does not shape the output. Callers pick the amount per light type before calling.

use tracing::warn;

use crate::catalog::{DesignCatalog, Namespace, DEFAULT_DESIGN};
use crate::error::Result;
use crate::types::{check_light_amount, CableAssignment, DesignSelection, LightType};

/// Build `light_amount` pendant cables, taking position `i`'s design from `designs[i]`.
///
/// Positions past the end of `designs` are padded with [`DEFAULT_DESIGN`]. Asset ids are
/// always resolved from the catalog; a supplied `design_id` that disagrees is replaced.
pub fn generate_cables(
    _light_type: LightType,
    light_amount: u32,
    designs: &[DesignSelection],
    catalog: &DesignCatalog,
) -> Result<Vec<CableAssignment>> {
    check_light_amount(light_amount)?;

    (0..light_amount as usize)
        .map(|position| {
            let selection = designs.get(position);
            let design = selection
                .and_then(|s| s.design.as_deref())
                .unwrap_or(DEFAULT_DESIGN);
            let design_id = catalog.resolve(Namespace::Pendant, design)?;

            if let Some(supplied) = selection.and_then(|s| s.design_id.as_deref()) {
                if supplied != design_id {
                    warn!(
                        position,
                        design,
                        supplied,
                        resolved = design_id,
                        "replacing stale designId with catalog value"
                    );
                }
            }

            Ok(CableAssignment {
                is_system: false,
                design: design.to_string(),
                design_id: design_id.to_string(),
                system_type: None,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ConfiguratorError;
    use crate::types::MAX_LIGHT_AMOUNT;
    use proptest::prelude::*;

    fn selection(design: &str, design_id: &str) -> DesignSelection {
        DesignSelection {
            design: Some(design.to_string()),
            design_id: Some(design_id.to_string()),
        }
    }

    #[test]
    fn ceiling_with_three_designs() {
        let catalog = DesignCatalog::default();
        let designs = vec![
            selection("Ico", "product_4"),
            selection("Bumble", "product_1"),
            selection("Fina", "product_3"),
        ];

        let cables = generate_cables(LightType::Ceiling, 3, &designs, &catalog).unwrap();
        assert_eq!(cables.len(), 3);
        assert!(cables.iter().all(|c| !c.is_system));
        let ids: Vec<&str> = cables.iter().map(|c| c.design_id.as_str()).collect();
        assert_eq!(ids, vec!["product_4", "product_1", "product_3"]);
    }

    #[test]
    fn short_design_list_is_padded_with_default() {
        let catalog = DesignCatalog::default();
        let designs = vec![DesignSelection::named("Fina")];

        let cables = generate_cables(LightType::Floor, 3, &designs, &catalog).unwrap();
        assert_eq!(cables.len(), 3);
        assert_eq!(cables[0].design, "Fina");
        assert_eq!(cables[1].design, DEFAULT_DESIGN);
        assert_eq!(cables[2].design_id, "product_4");
    }

    #[test]
    fn missing_design_falls_back_to_default() {
        let catalog = DesignCatalog::default();
        let cables =
            generate_cables(LightType::Wall, 1, &[DesignSelection::default()], &catalog).unwrap();
        assert_eq!(cables[0].design, "Ico");
        assert_eq!(cables[0].design_id, "product_4");
    }

    #[test]
    fn stale_design_id_is_replaced() {
        let catalog = DesignCatalog::default();
        let designs = vec![selection("Bumble", "product_4")];
        let cables = generate_cables(LightType::Wall, 1, &designs, &catalog).unwrap();
        assert_eq!(cables[0].design_id, "product_1");
    }

    #[test]
    fn unknown_design_fails() {
        let catalog = DesignCatalog::default();
        let designs = vec![DesignSelection::named("Orbit")];
        assert!(matches!(
            generate_cables(LightType::Wall, 1, &designs, &catalog),
            Err(ConfiguratorError::DesignNotFound { .. })
        ));
    }

    #[test]
    fn zero_amount_is_rejected() {
        let catalog = DesignCatalog::default();
        assert!(generate_cables(LightType::Ceiling, 0, &[], &catalog).is_err());
    }

    #[test]
    fn oversized_amount_is_rejected() {
        let catalog = DesignCatalog::default();
        assert!(generate_cables(LightType::Ceiling, MAX_LIGHT_AMOUNT, &[], &catalog).is_ok());
        assert!(matches!(
            generate_cables(LightType::Ceiling, u32::MAX, &[], &catalog),
            Err(ConfiguratorError::InvalidConfig(_))
        ));
    }

    mod property_tests {
        use super::*;

        fn light_type_strategy() -> impl Strategy<Value = LightType> {
            prop_oneof![
                Just(LightType::Wall),
                Just(LightType::Ceiling),
                Just(LightType::Floor),
            ]
        }

        fn designs_strategy() -> impl Strategy<Value = Vec<DesignSelection>> {
            let names: Vec<String> = DesignCatalog::default()
                .designs(Namespace::Pendant)
                .map(|(name, _)| name.to_string())
                .collect();
            prop::collection::vec(
                prop::option::of(prop::sample::select(names)).prop_map(|design| {
                    DesignSelection {
                        design,
                        design_id: None,
                    }
                }),
                0..12,
            )
        }

        proptest! {
            /// Property: Cable Count
            /// The derived list always has exactly `light_amount` entries,
            /// whatever the light type and however many designs were supplied.
            #[test]
            fn cable_count_matches_amount(
                light_type in light_type_strategy(),
                amount in 1u32..12,
                designs in designs_strategy(),
            ) {
                let catalog = DesignCatalog::default();
                let cables = generate_cables(light_type, amount, &designs, &catalog).unwrap();
                prop_assert_eq!(cables.len(), amount as usize);
            }

            /// Property: designId Consistency
            /// Every derived cable carries the catalog id of its design.
            #[test]
            fn design_ids_match_catalog(
                amount in 1u32..12,
                designs in designs_strategy(),
            ) {
                let catalog = DesignCatalog::default();
                let cables = generate_cables(LightType::Ceiling, amount, &designs, &catalog).unwrap();
                for cable in &cables {
                    prop_assert!(cable.validate(&catalog).is_ok());
                }
            }

            /// Property: Positional Order
            /// Position `i` takes the design requested at `i`.
            #[test]
            fn positions_follow_requested_order(designs in designs_strategy()) {
                prop_assume!(!designs.is_empty());
                let catalog = DesignCatalog::default();
                let cables = generate_cables(
                    LightType::Ceiling,
                    designs.len() as u32,
                    &designs,
                    &catalog,
                ).unwrap();
                for (cable, requested) in cables.iter().zip(&designs) {
                    let expected = requested.design.as_deref().unwrap_or(DEFAULT_DESIGN);
                    prop_assert_eq!(cable.design.as_str(), expected);
                }
            }
        }
    }
}
