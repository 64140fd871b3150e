//! Team roster, customizations and undo/redo.
//!
//! Roster changes that cannot apply (full team, duplicate id, bad reorder
//! index, missing saved team) are silent no-ops. Every roster change that does
//! apply records the previous roster in history and clears the redo stack.
//! Customization edits leave history alone. A member leaving the roster takes
//! its customization with it.

use std::collections::BTreeMap;

use crate::catalog::Customization;
use crate::config::StoreConfig;
use crate::store::{Action, History, Reduction, State, StatePatch, normalize_ids};

/// Customizations of members that are still on `team`, or `None` if nothing
/// was dropped.
fn pruned(state: &State, team: &[u32]) -> Option<BTreeMap<u32, Customization>> {
    if state.customizations.keys().all(|id| team.contains(id)) {
        return None;
    }
    Some(
        state
            .customizations
            .iter()
            .filter(|(id, _)| team.contains(id))
            .map(|(id, c)| (*id, c.clone()))
            .collect(),
    )
}

/// Replace the roster, recording the old one.
fn commit(state: &State, team: Vec<u32>, config: &StoreConfig) -> Reduction {
    if team == state.team {
        return Reduction::Unchanged;
    }
    Reduction::Patch(StatePatch {
        history: Some(state.history.record(state.team.clone(), config.max_history)),
        customizations: pruned(state, &team),
        team: Some(team),
        ..StatePatch::default()
    })
}

/// Apply an undo/redo step.
fn travel(state: &State, step: Option<(Vec<u32>, History)>) -> Reduction {
    match step {
        Some((team, history)) => Reduction::Patch(StatePatch {
            customizations: pruned(state, &team),
            team: Some(team),
            history: Some(history),
            ..StatePatch::default()
        }),
        None => Reduction::Unchanged,
    }
}

fn add(state: &State, id: u32, config: &StoreConfig) -> Reduction {
    if !config.is_valid_id(id) || state.team.len() >= config.team_capacity || state.team.contains(&id) {
        return Reduction::Unchanged;
    }
    let mut team = state.team.clone();
    team.push(id);
    commit(state, team, config)
}

fn remove(state: &State, id: u32, config: &StoreConfig) -> Reduction {
    if !state.team.contains(&id) {
        return Reduction::Unchanged;
    }
    let team = state.team.iter().copied().filter(|t| *t != id).collect();
    commit(state, team, config)
}

fn reorder(state: &State, from: usize, to: usize, config: &StoreConfig) -> Reduction {
    let len = state.team.len();
    if from >= len || to >= len || from == to {
        return Reduction::Unchanged;
    }
    let mut team = state.team.clone();
    let moved = team.remove(from);
    team.insert(to, moved);
    commit(state, team, config)
}

fn load_saved(state: &State, saved_id: &str, config: &StoreConfig) -> Reduction {
    let Some(entry) = state.saved_teams.iter().find(|e| e.id == saved_id) else {
        return Reduction::Unchanged;
    };
    let team = normalize_ids(entry.team.iter().map(|m| m.id()), config, config.team_capacity);
    let mut customizations = pruned(state, &team).unwrap_or_else(|| state.customizations.clone());
    for member in &entry.team {
        if !team.contains(&member.id()) {
            continue;
        }
        if member.customization.is_default() {
            customizations.remove(&member.id());
        } else {
            customizations.insert(member.id(), member.customization.clone());
        }
    }
    match commit(state, team, config) {
        Reduction::Patch(mut patch) => {
            patch.customizations = Some(customizations);
            Reduction::Patch(patch)
        }
        _ if customizations != state.customizations => Reduction::Patch(StatePatch {
            customizations: Some(customizations),
            ..StatePatch::default()
        }),
        other => other,
    }
}

pub fn reduce(state: &State, action: &Action, config: &StoreConfig) -> Reduction {
    match action {
        Action::AddToTeam(id) => add(state, *id, config),
        Action::RemoveFromTeam(id) => remove(state, *id, config),
        Action::ReorderTeam { from, to } => reorder(state, *from, *to, config),
        Action::ClearTeam => commit(state, Vec::new(), config),
        Action::SetTeam(ids) => commit(
            state,
            normalize_ids(ids.iter().copied(), config, config.team_capacity),
            config,
        ),
        Action::LoadSavedTeam(saved_id) => load_saved(state, saved_id, config),
        Action::UpdateCustomization { id, customization } => {
            if !state.team.contains(id) {
                return Reduction::Unchanged;
            }
            let mut customizations = state.customizations.clone();
            if customization.is_default() {
                customizations.remove(id);
            } else {
                customizations.insert(*id, customization.clone());
            }
            if customizations == state.customizations {
                return Reduction::Unchanged;
            }
            Reduction::Patch(StatePatch {
                customizations: Some(customizations),
                ..StatePatch::default()
            })
        }
        Action::Undo => travel(state, state.history.undo(&state.team, config.max_history)),
        Action::Redo => travel(state, state.history.redo(&state.team, config.max_history)),
        _ => Reduction::NotHandled,
    }
}
