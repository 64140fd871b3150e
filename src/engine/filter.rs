//! Catalog filtering.
//!
//! Every active option narrows the result; options combine with AND, and so do
//! the selected types and the stat thresholds within their own option.
//! Surviving entries keep their catalog order.

use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::collections::BTreeMap;

use crate::catalog::{CatalogItem, StatKey};

/// Filter criteria. The default value filters nothing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct FilterOptions {
    /// Substring of the name, or an exact id.
    pub search_term: String,
    /// Generations to include. Empty means all.
    pub generations: Vec<u8>,
    /// Types an entry must carry, all of them.
    pub selected_types: Vec<String>,
    /// Substring of the flavor text.
    pub flavor_text: String,
    /// Minimum value per stat.
    pub stat_minimums: BTreeMap<StatKey, u32>,
    /// Substring of any ability name.
    pub ability: String,
    /// Only entries with exactly one type.
    pub mono_type_only: bool,
    /// Minimum base-stat total.
    pub min_total: Option<u32>,
}

impl FilterOptions {
    pub fn is_empty(&self) -> bool {
        *self == FilterOptions::default()
    }
}

/// Case-folded needles, computed once per filter pass.
struct Needles {
    search: String,
    search_id: Option<u32>,
    flavor: String,
    ability: String,
}

impl Needles {
    fn new(options: &FilterOptions) -> Self {
        let search = options.search_term.trim().to_lowercase();
        Self {
            search_id: search.parse().ok(),
            search,
            flavor: options.flavor_text.trim().to_lowercase(),
            ability: options.ability.trim().to_lowercase(),
        }
    }
}

fn lowered<'a>(shadow: Option<&'a str>, raw: &'a str) -> Cow<'a, str> {
    match shadow {
        Some(s) => Cow::Borrowed(s),
        None => Cow::Owned(raw.to_lowercase()),
    }
}

fn matches_search(item: &CatalogItem, needles: &Needles) -> bool {
    if needles.search.is_empty() {
        return true;
    }
    if needles.search_id == Some(item.id) {
        return true;
    }
    lowered(item.name_lower.as_deref(), &item.name).contains(&needles.search)
}

fn matches_flavor(item: &CatalogItem, needles: &Needles) -> bool {
    if needles.flavor.is_empty() {
        return true;
    }
    lowered(item.flavor_lower.as_deref(), &item.flavor_text).contains(&needles.flavor)
}

fn matches_ability(item: &CatalogItem, needles: &Needles) -> bool {
    if needles.ability.is_empty() {
        return true;
    }
    match &item.abilities_lower {
        Some(shadow) => shadow.iter().any(|a| a.contains(&needles.ability)),
        None => item
            .abilities
            .iter()
            .any(|a| a.to_lowercase().contains(&needles.ability)),
    }
}

fn matches_types(item: &CatalogItem, selected: &[String]) -> bool {
    selected
        .iter()
        .all(|wanted| item.types.iter().any(|t| t.eq_ignore_ascii_case(wanted)))
}

fn matches_generation(item: &CatalogItem, generations: &[u8]) -> bool {
    if generations.is_empty() {
        return true;
    }
    item.generation().is_some_and(|g| generations.contains(&g))
}

fn matches_stats(item: &CatalogItem, minimums: &BTreeMap<StatKey, u32>) -> bool {
    minimums
        .iter()
        .all(|(&stat, &min)| item.stats.get(stat) >= min)
}

fn matches(item: &CatalogItem, options: &FilterOptions, needles: &Needles) -> bool {
    matches_search(item, needles)
        && matches_generation(item, &options.generations)
        && matches_types(item, &options.selected_types)
        && matches_flavor(item, needles)
        && matches_stats(item, &options.stat_minimums)
        && matches_ability(item, needles)
        && (!options.mono_type_only || item.types.len() == 1)
        && options.min_total.is_none_or(|min| item.base_total() >= min)
}

/// Returns the entries satisfying every active option, in catalog order.
pub fn filter_catalog<'a>(catalog: &'a [CatalogItem], options: &FilterOptions) -> Vec<&'a CatalogItem> {
    let needles = Needles::new(options);
    catalog
        .iter()
        .filter(|item| matches(item, options, &needles))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Stats;
    use proptest::prelude::*;

    fn stats(hp: u32, speed: u32) -> Stats {
        Stats {
            hp,
            speed,
            ..Stats::default()
        }
    }

    fn sample() -> Vec<CatalogItem> {
        vec![
            CatalogItem::new(1, "Bulbasaur", &["grass", "poison"])
                .with_stats(stats(45, 45))
                .with_abilities(&["Overgrow", "Chlorophyll"])
                .with_flavor("A strange seed was planted on its back at birth."),
            CatalogItem::new(4, "Charmander", &["fire"])
                .with_stats(stats(39, 65))
                .with_abilities(&["Blaze", "Solar Power"])
                .with_flavor("The flame on its tail shows the strength of its life."),
            CatalogItem::new(152, "Chikorita", &["grass"])
                .with_stats(stats(45, 45))
                .with_abilities(&["Overgrow", "Leaf Guard"])
                .with_flavor("A sweet aroma gently wafts from the leaf on its head."),
            CatalogItem::new(258, "Mudkip", &["water"])
                .with_stats(stats(50, 40))
                .with_abilities(&["Torrent", "Damp"]),
        ]
    }

    fn ids(items: &[&CatalogItem]) -> Vec<u32> {
        items.iter().map(|i| i.id).collect()
    }

    #[test]
    fn empty_options_return_everything() {
        let catalog = sample();
        assert_eq!(ids(&filter_catalog(&catalog, &FilterOptions::default())), vec![1, 4, 152, 258]);
    }

    #[test]
    fn single_type_scenario() {
        let catalog = vec![
            CatalogItem::new(1, "bulbasaur", &["grass", "poison"]),
            CatalogItem::new(4, "charmander", &["fire"]),
        ];
        let options = FilterOptions {
            selected_types: vec!["grass".to_string()],
            ..FilterOptions::default()
        };
        assert_eq!(ids(&filter_catalog(&catalog, &options)), vec![1]);
    }

    #[test]
    fn types_are_conjunctive() {
        let catalog = sample();
        let options = FilterOptions {
            selected_types: vec!["grass".to_string(), "poison".to_string()],
            ..FilterOptions::default()
        };
        assert_eq!(ids(&filter_catalog(&catalog, &options)), vec![1]);
    }

    #[test]
    fn search_matches_name_case_insensitively_or_exact_id() {
        let catalog = sample();
        let by_name = FilterOptions {
            search_term: "CHAR".to_string(),
            ..FilterOptions::default()
        };
        assert_eq!(ids(&filter_catalog(&catalog, &by_name)), vec![4]);

        let by_id = FilterOptions {
            search_term: "152".to_string(),
            ..FilterOptions::default()
        };
        assert_eq!(ids(&filter_catalog(&catalog, &by_id)), vec![152]);
    }

    #[test]
    fn generation_membership() {
        let catalog = sample();
        let options = FilterOptions {
            generations: vec![2, 3],
            ..FilterOptions::default()
        };
        assert_eq!(ids(&filter_catalog(&catalog, &options)), vec![152, 258]);
    }

    #[test]
    fn stat_minimums_are_conjunctive() {
        let catalog = sample();
        let mut minimums = BTreeMap::new();
        minimums.insert(StatKey::Hp, 45);
        minimums.insert(StatKey::Speed, 45);
        let options = FilterOptions {
            stat_minimums: minimums,
            ..FilterOptions::default()
        };
        assert_eq!(ids(&filter_catalog(&catalog, &options)), vec![1, 152]);
    }

    #[test]
    fn ability_flavor_mono_and_total() {
        let catalog = sample();
        let ability = FilterOptions {
            ability: "overgrow".to_string(),
            ..FilterOptions::default()
        };
        assert_eq!(ids(&filter_catalog(&catalog, &ability)), vec![1, 152]);

        let flavor = FilterOptions {
            flavor_text: "FLAME".to_string(),
            ..FilterOptions::default()
        };
        assert_eq!(ids(&filter_catalog(&catalog, &flavor)), vec![4]);

        let mono = FilterOptions {
            mono_type_only: true,
            ..FilterOptions::default()
        };
        assert_eq!(ids(&filter_catalog(&catalog, &mono)), vec![4, 152, 258]);

        let total = FilterOptions {
            min_total: Some(100),
            ..FilterOptions::default()
        };
        assert_eq!(ids(&filter_catalog(&catalog, &total)), vec![4]);
    }

    #[test]
    fn shadows_give_identical_results() {
        let plain = sample();
        let shadowed: Vec<CatalogItem> = sample().into_iter().map(CatalogItem::with_shadows).collect();
        let cases = [
            FilterOptions {
                search_term: "chi".to_string(),
                ..FilterOptions::default()
            },
            FilterOptions {
                flavor_text: "Leaf".to_string(),
                ..FilterOptions::default()
            },
            FilterOptions {
                ability: "BLAZE".to_string(),
                ..FilterOptions::default()
            },
            FilterOptions {
                min_total: Some(90),
                ..FilterOptions::default()
            },
        ];
        for options in &cases {
            assert_eq!(
                ids(&filter_catalog(&plain, options)),
                ids(&filter_catalog(&shadowed, options))
            );
        }
    }

    const TYPES: [&str; 4] = ["grass", "fire", "water", "poison"];

    fn arb_catalog() -> impl Strategy<Value = Vec<CatalogItem>> {
        prop::collection::vec(
            (1u32..1025, "[a-z]{3,8}", prop::sample::subsequence(TYPES.to_vec(), 1..3), 0u32..150),
            0..40,
        )
        .prop_map(|rows| {
            rows.into_iter()
                .map(|(id, name, types, hp)| CatalogItem::new(id, &name, &types).with_stats(stats(hp, hp)))
                .collect()
        })
    }

    fn arb_options() -> impl Strategy<Value = FilterOptions> {
        (
            "[a-z]{0,2}",
            prop::sample::subsequence(TYPES.to_vec(), 0..3),
            prop::option::of(0u32..300),
            any::<bool>(),
        )
            .prop_map(|(search_term, types, min_total, mono_type_only)| FilterOptions {
                search_term,
                selected_types: types.into_iter().map(String::from).collect(),
                min_total,
                mono_type_only,
                ..FilterOptions::default()
            })
    }

    proptest! {
        #[test]
        fn identity_law(catalog in arb_catalog()) {
            let result = filter_catalog(&catalog, &FilterOptions::default());
            prop_assert_eq!(result.len(), catalog.len());
            for (kept, original) in result.iter().zip(catalog.iter()) {
                prop_assert!(std::ptr::eq(*kept, original));
            }
        }

        #[test]
        fn filtering_preserves_relative_order(catalog in arb_catalog(), options in arb_options()) {
            let result = filter_catalog(&catalog, &options);
            let positions: Vec<usize> = result
                .iter()
                .map(|kept| catalog.iter().position(|c| std::ptr::eq(c, *kept)).unwrap())
                .collect();
            prop_assert!(positions.windows(2).all(|w| w[0] < w[1]));
        }

        #[test]
        fn multi_type_is_subset_of_each_single(catalog in arb_catalog(), t1 in 0usize..4, t2 in 0usize..4) {
            let only = |types: Vec<&str>| FilterOptions {
                selected_types: types.into_iter().map(String::from).collect(),
                ..FilterOptions::default()
            };
            let both = ids(&filter_catalog(&catalog, &only(vec![TYPES[t1], TYPES[t2]])));
            let first = ids(&filter_catalog(&catalog, &only(vec![TYPES[t1]])));
            let second = ids(&filter_catalog(&catalog, &only(vec![TYPES[t2]])));
            for id in both {
                prop_assert!(first.contains(&id) && second.contains(&id));
            }
        }

        #[test]
        fn shadows_never_change_results(catalog in arb_catalog(), options in arb_options()) {
            let shadowed: Vec<CatalogItem> = catalog.iter().cloned().map(CatalogItem::with_shadows).collect();
            prop_assert_eq!(
                ids(&filter_catalog(&catalog, &options)),
                ids(&filter_catalog(&shadowed, &options))
            );
        }
    }
}
