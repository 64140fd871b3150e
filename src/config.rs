//! Injected constants for the store, the effects layer and the codecs.
//!
//! The JS host passes a partial JSON object; every missing field keeps its
//! default.

use serde::{Deserialize, Serialize};

/// Store-wide limits, passed as the reducer context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct StoreConfig {
    /// Maximum team roster size.
    pub team_capacity: usize,
    /// Maximum number of entries in the comparison list.
    pub max_comparison: usize,
    /// Maximum length of both the undo and the redo stack.
    pub max_history: usize,
    /// Hard cap on the favorites set.
    pub max_favorites: usize,
    /// Highest catalog id considered valid.
    pub max_catalog_id: u32,
    /// Maximum number of saved teams.
    pub saved_team_cap: usize,
    /// Maximum length of each per-game history log.
    pub game_history_cap: usize,
    /// How long an offloaded request may stay unanswered before the
    /// coordinator recomputes it on the main thread.
    pub worker_timeout_ms: u64,
    /// Probe the pre-v2 storage keys when the current key is empty.
    pub legacy_migration: bool,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            team_capacity: 6,
            max_comparison: 4,
            max_history: 50,
            max_favorites: 1000,
            max_catalog_id: 1025,
            saved_team_cap: 50,
            game_history_cap: 30,
            worker_timeout_ms: 10_000,
            legacy_migration: true,
        }
    }
}

impl StoreConfig {
    /// Parse a host-supplied JSON config, falling back to defaults on error.
    pub fn from_json(json: &str) -> Self {
        match serde_json::from_str(json) {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!(error = %e, "invalid store config, using defaults");
                Self::default()
            }
        }
    }

    /// Favorites/team/comparison id predicate: positive and within the ceiling.
    pub fn is_valid_id(&self, id: u32) -> bool {
        id > 0 && id <= self.max_catalog_id
    }
}
