//! Durable client storage for the persisted subset of state.
//!
//! ## Layout
//!
//! ```text
//! "dexkit_state_v2" → JSON PersistedSnapshot
//! ├── team            [u32]            (capped, deduped)
//! ├── customizations  {id: Customization}
//! ├── favorites       [u32]
//! ├── theme / accent / catalogIndex
//! ├── achievements    {id: unlock timestamp}
//! ├── gameStats       {game: GameStats}
//! └── savedTeams      [SavedTeamEntry] (most recent first)
//! ```
//!
//! ## Lifecycle
//!
//! - **Every change to the subset:** the effects layer writes the snapshot.
//! - **Startup:** [`load`] validates each field on its own; a bad field falls
//!   back to its default without discarding the others.
//! - **First run after upgrade:** when the v2 key is empty, [`migrate`] probes
//!   the old per-field keys, writes a v2 snapshot and removes them.

pub mod migrate;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::cell::RefCell;
use std::collections::BTreeMap;
use tracing::{debug, warn};

use crate::catalog::{Customization, MAX_EFFORT, MAX_POTENTIAL, TeamMember};
use crate::config::StoreConfig;
use crate::error::StorageError;
use crate::sanitize::strip_markup;
use crate::store::{State, normalize_ids};

/// Storage key of the current format.
pub const STORAGE_KEY: &str = "dexkit_state_v2";

/// Longest achievement / game id kept.
const MAX_KEY_LEN: usize = 64;

// ── Persisted records ──────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    System,
    Light,
    Dark,
}

/// Accent colors are short tokens: a hex color or a palette name.
pub fn is_valid_accent(accent: &str) -> bool {
    !accent.is_empty()
        && accent.len() <= 32
        && accent
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '#' || c == '-')
}

/// A named team kept for later, with full members rather than ids.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SavedTeamEntry {
    pub id: String,
    pub name: String,
    pub team: Vec<TeamMember>,
    pub updated_at: u64,
}

impl SavedTeamEntry {
    /// Sanitize the name and every member's free text, clamp stat values, and
    /// cap the roster. Entries left without an id or a name are dropped.
    pub fn sanitized(self, config: &StoreConfig) -> Option<Self> {
        let name = strip_markup(&self.name);
        if self.id.is_empty() || name.is_empty() {
            return None;
        }
        let team = self
            .team
            .into_iter()
            .take(config.team_capacity)
            .map(|member| TeamMember {
                customization: clamp_customization(member.customization),
                ..member
            })
            .collect();
        Some(Self { name, team, ..self })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameRecord {
    pub date: String,
    pub won: bool,
}

/// Per-game results with streak tracking. `history` is newest first.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct GameStats {
    pub played: u32,
    pub won: u32,
    pub current_streak: u32,
    pub max_streak: u32,
    pub last_played: Option<String>,
    pub history: Vec<GameRecord>,
}

impl GameStats {
    /// Returns the stats after one more game.
    pub fn record(&self, won: bool, date: &str, history_cap: usize) -> GameStats {
        let current_streak = if won { self.current_streak.saturating_add(1) } else { 0 };
        let mut history = Vec::with_capacity(self.history.len() + 1);
        history.push(GameRecord {
            date: date.to_string(),
            won,
        });
        history.extend(self.history.iter().cloned());
        history.truncate(history_cap);
        GameStats {
            played: self.played.saturating_add(1),
            won: self.won.saturating_add(u32::from(won)),
            current_streak,
            max_streak: self.max_streak.max(current_streak),
            last_played: Some(date.to_string()),
            history,
        }
    }
}

/// The persisted subset of [`State`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PersistedSnapshot {
    pub team: Vec<u32>,
    pub customizations: BTreeMap<u32, Customization>,
    pub favorites: Vec<u32>,
    pub theme: Theme,
    pub accent: String,
    pub catalog_index: Option<String>,
    pub achievements: BTreeMap<String, u64>,
    pub game_stats: BTreeMap<String, GameStats>,
    pub saved_teams: Vec<SavedTeamEntry>,
}

impl PersistedSnapshot {
    pub fn from_state(state: &State) -> Self {
        Self {
            team: state.team.clone(),
            customizations: state
                .customizations
                .iter()
                .filter(|(id, _)| state.team.contains(id))
                .map(|(id, c)| (*id, c.clone()))
                .collect(),
            favorites: state.favorites.iter().copied().collect(),
            theme: state.theme,
            accent: state.accent.clone(),
            catalog_index: state.catalog_index.clone(),
            achievements: state.achievements.clone(),
            game_stats: state.game_stats.clone(),
            saved_teams: state.saved_teams.clone(),
        }
    }

    /// Enforce every bound the store enforces.
    pub fn normalized(self, config: &StoreConfig) -> Self {
        let team = normalize_ids(self.team, config, config.team_capacity);
        let customizations = self
            .customizations
            .into_iter()
            .filter(|(id, _)| team.contains(id))
            .map(|(id, c)| (id, clamp_customization(c)))
            .filter(|(_, c)| !c.is_default())
            .collect();
        let mut favorites: Vec<u32> = self
            .favorites
            .into_iter()
            .filter(|id| config.is_valid_id(*id))
            .collect();
        favorites.sort_unstable();
        favorites.dedup();
        favorites.truncate(config.max_favorites);

        let saved_teams = self
            .saved_teams
            .into_iter()
            .filter_map(|entry| entry.sanitized(config))
            .take(config.saved_team_cap)
            .collect();

        Self {
            team,
            customizations,
            favorites,
            theme: self.theme,
            accent: if is_valid_accent(&self.accent) {
                self.accent
            } else {
                String::new()
            },
            catalog_index: self
                .catalog_index
                .map(|i| strip_markup(&i))
                .filter(|i| !i.is_empty()),
            achievements: self
                .achievements
                .into_iter()
                .filter(|(k, _)| !k.is_empty() && k.len() <= MAX_KEY_LEN)
                .collect(),
            game_stats: self
                .game_stats
                .into_iter()
                .filter(|(k, _)| !k.is_empty() && k.len() <= MAX_KEY_LEN)
                .map(|(k, mut stats)| {
                    stats.history.truncate(config.game_history_cap);
                    (k, stats)
                })
                .collect(),
            saved_teams,
        }
    }
}

/// Clamp effort/potential values into range and sanitize free text.
pub(crate) fn clamp_customization(c: Customization) -> Customization {
    Customization {
        moves: c
            .moves
            .iter()
            .map(|m| strip_markup(m))
            .filter(|m| !m.is_empty())
            .collect(),
        ability: c.ability.map(|s| strip_markup(&s)).filter(|s| !s.is_empty()),
        nature: c.nature.map(|s| strip_markup(&s)).filter(|s| !s.is_empty()),
        item: c.item.map(|s| strip_markup(&s)).filter(|s| !s.is_empty()),
        effort_values: c.effort_values.map(|v| v.min(MAX_EFFORT)),
        potential_values: c.potential_values.map(|v| v.min(MAX_POTENTIAL)),
        shiny: c.shiny,
    }
}

// ── Storage primitive ──────────────────────────────────────────────

/// Key/value storage supplied by the host (localStorage in the browser).
pub trait Storage {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;
    fn remove(&self, key: &str);
}

/// In-memory storage for native hosts and tests.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    entries: RefCell<BTreeMap<String, String>>,
    read_only: bool,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Storage whose writes always fail, like a full or blocked localStorage.
    pub fn read_only() -> Self {
        Self {
            entries: RefCell::default(),
            read_only: true,
        }
    }

    pub fn with_entry(self, key: &str, value: &str) -> Self {
        self.entries.borrow_mut().insert(key.to_string(), value.to_string());
        self
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.borrow().contains_key(key)
    }
}

impl Storage for MemoryStorage {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.borrow().get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        if self.read_only {
            return Err(StorageError::Unavailable);
        }
        self.entries.borrow_mut().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) {
        if !self.read_only {
            self.entries.borrow_mut().remove(key);
        }
    }
}

// ── Save / load ────────────────────────────────────────────────────

/// Write the snapshot under [`STORAGE_KEY`].
pub fn save(storage: &dyn Storage, snapshot: &PersistedSnapshot) -> Result<(), StorageError> {
    let json = serde_json::to_string(snapshot)?;
    storage.set(STORAGE_KEY, &json)
}

/// Read one field; a missing or mistyped field yields `None`.
fn field<T: DeserializeOwned>(obj: &Map<String, Value>, name: &str) -> Option<T> {
    let value = obj.get(name)?;
    match serde_json::from_value(value.clone()) {
        Ok(parsed) => Some(parsed),
        Err(e) => {
            warn!(field = name, error = %e, "invalid persisted field, using default");
            None
        }
    }
}

/// Saved teams are parsed entry by entry so one bad entry does not drop the
/// rest. Sanitizing happens in [`PersistedSnapshot::normalized`].
fn saved_teams_field(obj: &Map<String, Value>) -> Vec<SavedTeamEntry> {
    let Some(Value::Array(entries)) = obj.get("savedTeams") else {
        return Vec::new();
    };
    entries
        .iter()
        .filter_map(|entry| match serde_json::from_value::<SavedTeamEntry>(entry.clone()) {
            Ok(parsed) => Some(parsed),
            Err(e) => {
                warn!(error = %e, "dropping invalid saved team");
                None
            }
        })
        .collect()
}

/// Validate a v2 JSON document field by field.
pub fn parse_snapshot(json: &str, config: &StoreConfig) -> PersistedSnapshot {
    let obj = match serde_json::from_str::<Value>(json) {
        Ok(Value::Object(obj)) => obj,
        Ok(_) | Err(_) => {
            warn!("persisted state is not a JSON object, using defaults");
            return PersistedSnapshot::default();
        }
    };
    PersistedSnapshot {
        team: field(&obj, "team").unwrap_or_default(),
        customizations: field(&obj, "customizations").unwrap_or_default(),
        favorites: field(&obj, "favorites").unwrap_or_default(),
        theme: field(&obj, "theme").unwrap_or_default(),
        accent: field(&obj, "accent").unwrap_or_default(),
        catalog_index: field(&obj, "catalogIndex").unwrap_or_default(),
        achievements: field(&obj, "achievements").unwrap_or_default(),
        game_stats: field(&obj, "gameStats").unwrap_or_default(),
        saved_teams: saved_teams_field(&obj),
    }
    .normalized(config)
}

/// Load the persisted subset, migrating legacy keys on first run.
pub fn load(storage: &dyn Storage, config: &StoreConfig) -> PersistedSnapshot {
    if let Some(json) = storage.get(STORAGE_KEY) {
        return parse_snapshot(&json, config);
    }
    if !config.legacy_migration {
        return PersistedSnapshot::default();
    }
    match migrate::from_legacy(storage, config) {
        Some(snapshot) => {
            match save(storage, &snapshot) {
                Ok(()) => {
                    migrate::remove_legacy_keys(storage);
                    debug!("migrated legacy storage to {}", STORAGE_KEY);
                }
                Err(e) => warn!(error = %e, "could not write migrated state; legacy keys kept"),
            }
            snapshot
        }
        None => PersistedSnapshot::default(),
    }
}
