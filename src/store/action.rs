//! Every state transition the store accepts.

use std::sync::Arc;

use crate::catalog::{CatalogItem, Customization, StatKey};
use crate::engine::{SortDirection, SortKey};
use crate::persist::{PersistedSnapshot, SavedTeamEntry, Theme};

#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    // ── data ───────────────────────────────────────────────────────
    CatalogLoading,
    CatalogLoaded(Arc<Vec<CatalogItem>>),
    CatalogFailed(String),

    // ── filters ────────────────────────────────────────────────────
    SetSearchTerm(String),
    SetGenerations(Vec<u8>),
    ToggleGeneration(u8),
    ToggleType(String),
    SetSelectedTypes(Vec<String>),
    SetFlavorText(String),
    SetAbilityFilter(String),
    /// `None` clears the threshold for that stat.
    SetStatMinimum { stat: StatKey, min: Option<u32> },
    SetMonoTypeOnly(bool),
    SetMinTotal(Option<u32>),
    ResetFilters,

    // ── sorting ────────────────────────────────────────────────────
    SetSortKey(SortKey),
    SetSortDirection(SortDirection),
    ToggleSortDirection,

    // ── team ───────────────────────────────────────────────────────
    AddToTeam(u32),
    RemoveFromTeam(u32),
    ReorderTeam { from: usize, to: usize },
    ClearTeam,
    SetTeam(Vec<u32>),
    LoadSavedTeam(String),
    UpdateCustomization { id: u32, customization: Customization },
    Undo,
    Redo,

    // ── favorites ──────────────────────────────────────────────────
    ToggleFavorite(u32),
    SetFavorites(Vec<u32>),
    ClearFavorites,

    // ── comparison ─────────────────────────────────────────────────
    AddToComparison(u32),
    RemoveFromComparison(u32),
    SetComparison(Vec<u32>),
    ClearComparison,

    // ── ui ─────────────────────────────────────────────────────────
    SetTheme(Theme),
    SetAccent(String),
    SelectCatalogIndex(Option<String>),
    SelectItem(Option<u32>),
    SetFilteredView(Vec<CatalogItem>),
    SetFilterBusy(bool),

    // ── persistence ────────────────────────────────────────────────
    Hydrate(Box<PersistedSnapshot>),
    UnlockAchievement { id: String, at: u64 },
    RecordGame { game: String, won: bool, date: String },
    SaveTeam { id: String, name: String, at: u64 },
    RenameSavedTeam { id: String, name: String },
    DeleteSavedTeam(String),
    SetSavedTeams(Vec<SavedTeamEntry>),
}
