//! Ordered, deduplicated comparison list.

use crate::config::StoreConfig;
use crate::store::{Action, Reduction, State, StatePatch, normalize_ids};

fn set(state: &State, comparison: Vec<u32>) -> Reduction {
    if comparison == state.comparison {
        return Reduction::Unchanged;
    }
    Reduction::Patch(StatePatch {
        comparison: Some(comparison),
        ..StatePatch::default()
    })
}

pub fn reduce(state: &State, action: &Action, config: &StoreConfig) -> Reduction {
    match action {
        Action::AddToComparison(id) => {
            if !config.is_valid_id(*id)
                || state.comparison.contains(id)
                || state.comparison.len() >= config.max_comparison
            {
                return Reduction::Unchanged;
            }
            let mut comparison = state.comparison.clone();
            comparison.push(*id);
            set(state, comparison)
        }
        Action::RemoveFromComparison(id) => set(
            state,
            state.comparison.iter().copied().filter(|c| c != id).collect(),
        ),
        Action::SetComparison(ids) => set(
            state,
            normalize_ids(ids.iter().copied(), config, config.max_comparison),
        ),
        Action::ClearComparison => set(state, Vec::new()),
        _ => Reduction::NotHandled,
    }
}
