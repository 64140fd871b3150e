//! One-time migration from the per-field storage layout.
//!
//! The old layout kept each field under its own key, and stored the team as
//! full member objects instead of ids. Every key is parsed on its own; a key
//! that fails to parse contributes nothing.

use serde_json::Value;
use std::collections::BTreeMap;
use tracing::{debug, warn};

use crate::catalog::Customization;
use crate::config::StoreConfig;

use super::{PersistedSnapshot, SavedTeamEntry, Storage, Theme};

pub const LEGACY_TEAM_KEY: &str = "pokedex_team";
pub const LEGACY_FAVORITES_KEY: &str = "pokedex_favorites";
pub const LEGACY_THEME_KEY: &str = "pokedex_theme";
pub const LEGACY_ACCENT_KEY: &str = "pokedex_accent";
pub const LEGACY_SAVED_TEAMS_KEY: &str = "pokedex_saved_teams";
pub const LEGACY_ACHIEVEMENTS_KEY: &str = "pokedex_achievements";

pub const LEGACY_KEYS: [&str; 6] = [
    LEGACY_TEAM_KEY,
    LEGACY_FAVORITES_KEY,
    LEGACY_THEME_KEY,
    LEGACY_ACCENT_KEY,
    LEGACY_SAVED_TEAMS_KEY,
    LEGACY_ACHIEVEMENTS_KEY,
];

fn parse_json(storage: &dyn Storage, key: &str) -> Option<Value> {
    let raw = storage.get(key)?;
    match serde_json::from_str(&raw) {
        Ok(value) => Some(value),
        Err(e) => {
            warn!(key, error = %e, "skipping unparseable legacy key");
            None
        }
    }
}

/// Ids may be bare numbers, numeric strings, or member objects with an `id`.
fn legacy_id(value: &Value) -> Option<u32> {
    match value {
        Value::Number(n) => n.as_u64().and_then(|n| u32::try_from(n).ok()),
        Value::String(s) => s.trim().parse().ok(),
        Value::Object(obj) => obj.get("id").and_then(legacy_id),
        _ => None,
    }
}

/// Team ids plus any customization carried on legacy member objects.
fn legacy_team(value: &Value) -> (Vec<u32>, BTreeMap<u32, Customization>) {
    let Value::Array(members) = value else {
        return (Vec::new(), BTreeMap::new());
    };
    let mut ids = Vec::with_capacity(members.len());
    let mut customizations = BTreeMap::new();
    for member in members {
        let Some(id) = legacy_id(member) else {
            continue;
        };
        ids.push(id);
        if let Some(raw) = member.get("customization")
            && let Ok(custom) = serde_json::from_value::<Customization>(raw.clone())
        {
            customizations.insert(id, custom);
        }
    }
    (ids, customizations)
}

/// Theme was stored either as a JSON string or as the bare word.
fn legacy_string(storage: &dyn Storage, key: &str) -> Option<String> {
    let raw = storage.get(key)?;
    match serde_json::from_str::<Value>(&raw) {
        Ok(Value::String(s)) => Some(s),
        _ => Some(raw.trim().to_string()),
    }
}

/// Build a snapshot from legacy keys. `None` when no legacy key exists.
pub fn from_legacy(storage: &dyn Storage, config: &StoreConfig) -> Option<PersistedSnapshot> {
    if !LEGACY_KEYS.iter().any(|key| storage.get(key).is_some()) {
        return None;
    }
    debug!("legacy storage keys found, migrating");

    let (team, customizations) = parse_json(storage, LEGACY_TEAM_KEY)
        .map(|v| legacy_team(&v))
        .unwrap_or_default();

    let favorites = match parse_json(storage, LEGACY_FAVORITES_KEY) {
        Some(Value::Array(ids)) => ids.iter().filter_map(legacy_id).collect(),
        _ => Vec::new(),
    };

    let theme = legacy_string(storage, LEGACY_THEME_KEY)
        .and_then(|t| serde_json::from_value::<Theme>(Value::String(t.to_lowercase())).ok())
        .unwrap_or_default();

    let accent = legacy_string(storage, LEGACY_ACCENT_KEY).unwrap_or_default();

    let saved_teams = match parse_json(storage, LEGACY_SAVED_TEAMS_KEY) {
        Some(Value::Array(entries)) => entries
            .into_iter()
            .filter_map(|e| serde_json::from_value::<SavedTeamEntry>(e).ok())
            .collect(),
        _ => Vec::new(),
    };

    let achievements = parse_json(storage, LEGACY_ACHIEVEMENTS_KEY)
        .and_then(|v| serde_json::from_value(v).ok())
        .unwrap_or_default();

    Some(
        PersistedSnapshot {
            team,
            customizations,
            favorites,
            theme,
            accent,
            catalog_index: None,
            achievements,
            game_stats: BTreeMap::new(),
            saved_teams,
        }
        .normalized(config),
    )
}

pub fn remove_legacy_keys(storage: &dyn Storage) {
    for key in LEGACY_KEYS {
        storage.remove(key);
    }
}
