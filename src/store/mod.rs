//! Normalized application state and the action-driven store.
//!
//! State changes only through [`Store::dispatch`]. The action is offered to an
//! ordered chain of slice reducers; the first slice that handles it decides the
//! outcome and the rest are skipped. Slices are pure:
//! `(state, action, config) -> Reduction`, no I/O, no clocks, no randomness.
//!
//! The team is stored as ids only. Customizations live in a separate map keyed
//! by id, and [`Store::team_members`] resolves both against the catalog.

pub mod action;
pub mod history;
pub mod slices;

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use crate::catalog::{CatalogItem, Customization, TeamMember};
use crate::config::StoreConfig;
use crate::engine::{FilterOptions, SortDirection, SortKey};
use crate::persist::{GameStats, SavedTeamEntry, Theme};

pub use action::Action;
pub use history::History;

/// The whole client state.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct State {
    pub catalog: Arc<Vec<CatalogItem>>,
    pub catalog_loading: bool,
    pub catalog_error: Option<String>,

    pub filters: FilterOptions,
    pub sort_key: SortKey,
    pub sort_direction: SortDirection,

    pub team: Vec<u32>,
    pub customizations: BTreeMap<u32, Customization>,
    pub history: History,

    pub favorites: BTreeSet<u32>,
    pub comparison: Vec<u32>,

    pub filtered: Vec<CatalogItem>,
    pub filter_busy: bool,
    pub theme: Theme,
    pub accent: String,
    /// Selected regional index; the regional sort ranks against it.
    pub catalog_index: Option<String>,
    pub selected_item: Option<u32>,

    pub achievements: BTreeMap<String, u64>,
    pub game_stats: BTreeMap<String, GameStats>,
    pub saved_teams: Vec<SavedTeamEntry>,
}

impl State {
    pub fn find_item(&self, id: u32) -> Option<&CatalogItem> {
        self.catalog.iter().find(|item| item.id == id)
    }

    /// Resolve the roster against the catalog. Ids missing from the catalog
    /// are skipped.
    pub fn team_members(&self) -> Vec<TeamMember> {
        self.team
            .iter()
            .filter_map(|id| {
                let item = self.find_item(*id)?;
                Some(TeamMember {
                    item: item.clone(),
                    customization: self.customizations.get(id).cloned().unwrap_or_default(),
                })
            })
            .collect()
    }
}

/// Partial update produced by a slice. `None` leaves the field as it is.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StatePatch {
    pub catalog: Option<Arc<Vec<CatalogItem>>>,
    pub catalog_loading: Option<bool>,
    pub catalog_error: Option<Option<String>>,
    pub filters: Option<FilterOptions>,
    pub sort_key: Option<SortKey>,
    pub sort_direction: Option<SortDirection>,
    pub team: Option<Vec<u32>>,
    pub customizations: Option<BTreeMap<u32, Customization>>,
    pub history: Option<History>,
    pub favorites: Option<BTreeSet<u32>>,
    pub comparison: Option<Vec<u32>>,
    pub filtered: Option<Vec<CatalogItem>>,
    pub filter_busy: Option<bool>,
    pub theme: Option<Theme>,
    pub accent: Option<String>,
    pub catalog_index: Option<Option<String>>,
    pub selected_item: Option<Option<u32>>,
    pub achievements: Option<BTreeMap<String, u64>>,
    pub game_stats: Option<BTreeMap<String, GameStats>>,
    pub saved_teams: Option<Vec<SavedTeamEntry>>,
}

macro_rules! apply_fields {
    ($patch:ident, $state:ident, $($field:ident),+ $(,)?) => {
        $(
            if let Some(value) = $patch.$field {
                $state.$field = value;
            }
        )+
    };
}

impl StatePatch {
    pub fn apply(self, state: &mut State) {
        let patch = self;
        apply_fields!(
            patch,
            state,
            catalog,
            catalog_loading,
            catalog_error,
            filters,
            sort_key,
            sort_direction,
            team,
            customizations,
            history,
            favorites,
            comparison,
            filtered,
            filter_busy,
            theme,
            accent,
            catalog_index,
            selected_item,
            achievements,
            game_stats,
            saved_teams,
        );
    }
}

/// What a slice did with an action.
#[derive(Debug, Clone, PartialEq)]
pub enum Reduction {
    /// Not this slice's action; try the next one.
    NotHandled,
    /// Handled, and the state stays exactly as it was.
    Unchanged,
    Patch(StatePatch),
}

pub type SliceReducer = fn(&State, &Action, &StoreConfig) -> Reduction;

/// Slice order. First responder wins.
pub const SLICES: [SliceReducer; 8] = [
    slices::data::reduce,
    slices::filters::reduce,
    slices::sorting::reduce,
    slices::team::reduce,
    slices::favorites::reduce,
    slices::comparison::reduce,
    slices::ui::reduce,
    slices::persistence::reduce,
];

/// Run the slice chain. Returns `Unchanged` when no slice claims the action.
pub fn reduce(state: &State, action: &Action, config: &StoreConfig) -> Reduction {
    for slice in SLICES {
        match slice(state, action, config) {
            Reduction::NotHandled => continue,
            handled => return handled,
        }
    }
    tracing::debug!(?action, "no slice handled action");
    Reduction::Unchanged
}

/// Keep the first occurrence of each valid id, up to `cap` entries.
pub(crate) fn normalize_ids(
    ids: impl IntoIterator<Item = u32>,
    config: &StoreConfig,
    cap: usize,
) -> Vec<u32> {
    let mut out: Vec<u32> = Vec::new();
    for id in ids {
        if out.len() >= cap {
            break;
        }
        if config.is_valid_id(id) && !out.contains(&id) {
            out.push(id);
        }
    }
    out
}

/// Single-threaded store owning the state and its config.
#[derive(Debug, Clone, Default)]
pub struct Store {
    state: State,
    config: StoreConfig,
}

impl Store {
    pub fn new(config: StoreConfig) -> Self {
        Self {
            state: State::default(),
            config,
        }
    }

    pub fn state(&self) -> &State {
        &self.state
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Apply an action. Returns whether the state changed.
    pub fn dispatch(&mut self, action: Action) -> bool {
        match reduce(&self.state, &action, &self.config) {
            Reduction::Patch(patch) => {
                patch.apply(&mut self.state);
                true
            }
            Reduction::NotHandled | Reduction::Unchanged => false,
        }
    }

    pub fn team_members(&self) -> Vec<TeamMember> {
        self.state.team_members()
    }
}
