//! Filter criteria.

use crate::catalog::GENERATION_CEILINGS;
use crate::config::StoreConfig;
use crate::engine::FilterOptions;
use crate::store::{Action, Reduction, State, StatePatch};

fn set(state: &State, filters: FilterOptions) -> Reduction {
    if filters == state.filters {
        return Reduction::Unchanged;
    }
    Reduction::Patch(StatePatch {
        filters: Some(filters),
        ..StatePatch::default()
    })
}

fn toggle<T: PartialEq + Clone>(list: &[T], value: &T) -> Vec<T> {
    if list.contains(value) {
        list.iter().filter(|v| *v != value).cloned().collect()
    } else {
        let mut next = list.to_vec();
        next.push(value.clone());
        next
    }
}

fn is_known_generation(generation: u8) -> bool {
    generation >= 1 && (generation as usize) <= GENERATION_CEILINGS.len()
}

pub fn reduce(state: &State, action: &Action, _config: &StoreConfig) -> Reduction {
    let current = &state.filters;
    match action {
        Action::SetSearchTerm(term) => set(
            state,
            FilterOptions {
                search_term: term.clone(),
                ..current.clone()
            },
        ),
        Action::SetGenerations(generations) => {
            let mut generations: Vec<u8> = generations
                .iter()
                .copied()
                .filter(|g| is_known_generation(*g))
                .collect();
            generations.sort_unstable();
            generations.dedup();
            set(
                state,
                FilterOptions {
                    generations,
                    ..current.clone()
                },
            )
        }
        Action::ToggleGeneration(generation) => {
            if !is_known_generation(*generation) {
                return Reduction::Unchanged;
            }
            let mut generations = toggle(&current.generations, generation);
            generations.sort_unstable();
            set(
                state,
                FilterOptions {
                    generations,
                    ..current.clone()
                },
            )
        }
        Action::ToggleType(ty) => {
            let ty = ty.trim().to_lowercase();
            if ty.is_empty() {
                return Reduction::Unchanged;
            }
            set(
                state,
                FilterOptions {
                    selected_types: toggle(&current.selected_types, &ty),
                    ..current.clone()
                },
            )
        }
        Action::SetSelectedTypes(types) => {
            let mut selected: Vec<String> = Vec::new();
            for ty in types {
                let ty = ty.trim().to_lowercase();
                if !ty.is_empty() && !selected.contains(&ty) {
                    selected.push(ty);
                }
            }
            set(
                state,
                FilterOptions {
                    selected_types: selected,
                    ..current.clone()
                },
            )
        }
        Action::SetFlavorText(text) => set(
            state,
            FilterOptions {
                flavor_text: text.clone(),
                ..current.clone()
            },
        ),
        Action::SetAbilityFilter(ability) => set(
            state,
            FilterOptions {
                ability: ability.clone(),
                ..current.clone()
            },
        ),
        Action::SetStatMinimum { stat, min } => {
            let mut stat_minimums = current.stat_minimums.clone();
            match min {
                Some(value) if *value > 0 => {
                    stat_minimums.insert(*stat, *value);
                }
                _ => {
                    stat_minimums.remove(stat);
                }
            }
            set(
                state,
                FilterOptions {
                    stat_minimums,
                    ..current.clone()
                },
            )
        }
        Action::SetMonoTypeOnly(mono) => set(
            state,
            FilterOptions {
                mono_type_only: *mono,
                ..current.clone()
            },
        ),
        Action::SetMinTotal(min) => set(
            state,
            FilterOptions {
                min_total: min.filter(|m| *m > 0),
                ..current.clone()
            },
        ),
        Action::ResetFilters => set(state, FilterOptions::default()),
        _ => Reduction::NotHandled,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::StatKey;
    use crate::store::Store;

    #[test]
    fn toggle_type_adds_then_removes() {
        let mut s = Store::default();
        assert!(s.dispatch(Action::ToggleType("Grass".to_string())));
        assert!(s.dispatch(Action::ToggleType("poison".to_string())));
        assert_eq!(s.state().filters.selected_types, vec!["grass", "poison"]);
        assert!(s.dispatch(Action::ToggleType("grass".to_string())));
        assert_eq!(s.state().filters.selected_types, vec!["poison"]);
    }

    #[test]
    fn same_value_is_unchanged() {
        let mut s = Store::default();
        assert!(s.dispatch(Action::SetSearchTerm("char".to_string())));
        assert!(!s.dispatch(Action::SetSearchTerm("char".to_string())));
        assert!(!s.dispatch(Action::SetMonoTypeOnly(false)));
    }

    #[test]
    fn stat_minimum_zero_or_none_clears() {
        let mut s = Store::default();
        s.dispatch(Action::SetStatMinimum {
            stat: StatKey::Speed,
            min: Some(100),
        });
        assert_eq!(s.state().filters.stat_minimums.get(&StatKey::Speed), Some(&100));
        s.dispatch(Action::SetStatMinimum {
            stat: StatKey::Speed,
            min: Some(0),
        });
        assert!(s.state().filters.stat_minimums.is_empty());
    }

    #[test]
    fn generations_are_validated_and_sorted() {
        let mut s = Store::default();
        s.dispatch(Action::SetGenerations(vec![3, 1, 3, 0, 12]));
        assert_eq!(s.state().filters.generations, vec![1, 3]);
        s.dispatch(Action::ToggleGeneration(2));
        assert_eq!(s.state().filters.generations, vec![1, 2, 3]);
        assert!(!s.dispatch(Action::ToggleGeneration(10)));
    }

    #[test]
    fn reset_restores_defaults() {
        let mut s = Store::default();
        s.dispatch(Action::SetMinTotal(Some(500)));
        s.dispatch(Action::ResetFilters);
        assert!(s.state().filters.is_empty());
        assert!(!s.dispatch(Action::ResetFilters));
    }
}
