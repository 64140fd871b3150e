//! Favorites set: valid ids only, hard-capped.

use std::collections::BTreeSet;

use crate::config::StoreConfig;
use crate::store::{Action, Reduction, State, StatePatch};

fn set(state: &State, favorites: BTreeSet<u32>) -> Reduction {
    if favorites == state.favorites {
        return Reduction::Unchanged;
    }
    Reduction::Patch(StatePatch {
        favorites: Some(favorites),
        ..StatePatch::default()
    })
}

pub fn reduce(state: &State, action: &Action, config: &StoreConfig) -> Reduction {
    match action {
        Action::ToggleFavorite(id) => {
            if !config.is_valid_id(*id) {
                return Reduction::Unchanged;
            }
            let mut favorites = state.favorites.clone();
            if !favorites.remove(id) {
                if favorites.len() >= config.max_favorites {
                    return Reduction::Unchanged;
                }
                favorites.insert(*id);
            }
            set(state, favorites)
        }
        Action::SetFavorites(ids) => {
            let favorites = ids
                .iter()
                .copied()
                .filter(|id| config.is_valid_id(*id))
                .collect::<BTreeSet<u32>>()
                .into_iter()
                .take(config.max_favorites)
                .collect();
            set(state, favorites)
        }
        Action::ClearFavorites => set(state, BTreeSet::new()),
        _ => Reduction::NotHandled,
    }
}
