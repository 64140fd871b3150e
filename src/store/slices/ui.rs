//! Presentation preferences and the derived view.

use crate::config::StoreConfig;
use crate::persist::is_valid_accent;
use crate::store::{Action, Reduction, State, StatePatch};

pub fn reduce(state: &State, action: &Action, _config: &StoreConfig) -> Reduction {
    match action {
        Action::SetTheme(theme) => {
            if *theme == state.theme {
                return Reduction::Unchanged;
            }
            Reduction::Patch(StatePatch {
                theme: Some(*theme),
                ..StatePatch::default()
            })
        }
        Action::SetAccent(accent) => {
            if !is_valid_accent(accent) || *accent == state.accent {
                return Reduction::Unchanged;
            }
            Reduction::Patch(StatePatch {
                accent: Some(accent.clone()),
                ..StatePatch::default()
            })
        }
        Action::SelectCatalogIndex(index) => {
            if *index == state.catalog_index {
                return Reduction::Unchanged;
            }
            Reduction::Patch(StatePatch {
                catalog_index: Some(index.clone()),
                ..StatePatch::default()
            })
        }
        Action::SelectItem(id) => {
            if *id == state.selected_item {
                return Reduction::Unchanged;
            }
            Reduction::Patch(StatePatch {
                selected_item: Some(*id),
                ..StatePatch::default()
            })
        }
        Action::SetFilteredView(items) => Reduction::Patch(StatePatch {
            filtered: Some(items.clone()),
            filter_busy: Some(false),
            ..StatePatch::default()
        }),
        Action::SetFilterBusy(busy) => {
            if *busy == state.filter_busy {
                return Reduction::Unchanged;
            }
            Reduction::Patch(StatePatch {
                filter_busy: Some(*busy),
                ..StatePatch::default()
            })
        }
        _ => Reduction::NotHandled,
    }
}
