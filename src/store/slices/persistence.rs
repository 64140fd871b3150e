//! Hydration and the persisted auxiliary records: achievements, game stats
//! and saved teams.

use crate::config::StoreConfig;
use crate::persist::{PersistedSnapshot, SavedTeamEntry};
use crate::sanitize::strip_markup;
use crate::store::{Action, History, Reduction, State, StatePatch};

fn hydrate(snapshot: &PersistedSnapshot, config: &StoreConfig) -> Reduction {
    let snapshot = snapshot.clone().normalized(config);
    Reduction::Patch(StatePatch {
        team: Some(snapshot.team),
        customizations: Some(snapshot.customizations),
        history: Some(History::default()),
        favorites: Some(snapshot.favorites.into_iter().collect()),
        theme: Some(snapshot.theme),
        accent: Some(snapshot.accent),
        catalog_index: Some(snapshot.catalog_index),
        achievements: Some(snapshot.achievements),
        game_stats: Some(snapshot.game_stats),
        saved_teams: Some(snapshot.saved_teams),
        ..StatePatch::default()
    })
}

fn set_saved_teams(state: &State, saved_teams: Vec<SavedTeamEntry>) -> Reduction {
    if saved_teams == state.saved_teams {
        return Reduction::Unchanged;
    }
    Reduction::Patch(StatePatch {
        saved_teams: Some(saved_teams),
        ..StatePatch::default()
    })
}

/// Upsert by id: any entry with the same id is dropped, the new entry goes to
/// the front, and the tail beyond the cap is evicted.
fn save_team(state: &State, id: &str, name: &str, at: u64, config: &StoreConfig) -> Reduction {
    let name = strip_markup(name);
    let team = state.team_members();
    if id.is_empty() || name.is_empty() || team.is_empty() {
        return Reduction::Unchanged;
    }
    let mut saved_teams = Vec::with_capacity(state.saved_teams.len() + 1);
    saved_teams.push(SavedTeamEntry {
        id: id.to_string(),
        name,
        team,
        updated_at: at,
    });
    saved_teams.extend(state.saved_teams.iter().filter(|e| e.id != id).cloned());
    saved_teams.truncate(config.saved_team_cap);
    set_saved_teams(state, saved_teams)
}

pub fn reduce(state: &State, action: &Action, config: &StoreConfig) -> Reduction {
    match action {
        Action::Hydrate(snapshot) => hydrate(snapshot, config),
        Action::UnlockAchievement { id, at } => {
            if id.is_empty() || state.achievements.contains_key(id) {
                return Reduction::Unchanged;
            }
            let mut achievements = state.achievements.clone();
            achievements.insert(id.clone(), *at);
            Reduction::Patch(StatePatch {
                achievements: Some(achievements),
                ..StatePatch::default()
            })
        }
        Action::RecordGame { game, won, date } => {
            if game.is_empty() {
                return Reduction::Unchanged;
            }
            let mut game_stats = state.game_stats.clone();
            let next = game_stats
                .get(game)
                .cloned()
                .unwrap_or_default()
                .record(*won, date, config.game_history_cap);
            game_stats.insert(game.clone(), next);
            Reduction::Patch(StatePatch {
                game_stats: Some(game_stats),
                ..StatePatch::default()
            })
        }
        Action::SaveTeam { id, name, at } => save_team(state, id, name, *at, config),
        Action::RenameSavedTeam { id, name } => {
            let name = strip_markup(name);
            if name.is_empty() {
                return Reduction::Unchanged;
            }
            let saved_teams = state
                .saved_teams
                .iter()
                .map(|e| {
                    if e.id == *id {
                        SavedTeamEntry {
                            name: name.clone(),
                            ..e.clone()
                        }
                    } else {
                        e.clone()
                    }
                })
                .collect();
            set_saved_teams(state, saved_teams)
        }
        Action::DeleteSavedTeam(id) => set_saved_teams(
            state,
            state.saved_teams.iter().filter(|e| e.id != *id).cloned().collect(),
        ),
        Action::SetSavedTeams(entries) => {
            let saved_teams = entries
                .iter()
                .cloned()
                .filter_map(|entry| entry.sanitized(config))
                .take(config.saved_team_cap)
                .collect();
            set_saved_teams(state, saved_teams)
        }
        _ => Reduction::NotHandled,
    }
}
