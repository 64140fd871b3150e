//! Sort key and direction.

use crate::config::StoreConfig;
use crate::store::{Action, Reduction, State, StatePatch};

pub fn reduce(state: &State, action: &Action, _config: &StoreConfig) -> Reduction {
    match action {
        Action::SetSortKey(key) => {
            if *key == state.sort_key {
                return Reduction::Unchanged;
            }
            Reduction::Patch(StatePatch {
                sort_key: Some(key.clone()),
                ..StatePatch::default()
            })
        }
        Action::SetSortDirection(direction) => {
            if *direction == state.sort_direction {
                return Reduction::Unchanged;
            }
            Reduction::Patch(StatePatch {
                sort_direction: Some(*direction),
                ..StatePatch::default()
            })
        }
        Action::ToggleSortDirection => Reduction::Patch(StatePatch {
            sort_direction: Some(state.sort_direction.flipped()),
            ..StatePatch::default()
        }),
        _ => Reduction::NotHandled,
    }
}
