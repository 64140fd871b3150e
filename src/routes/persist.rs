//! `/api/persist/normalize`: validate a stored snapshot for the JS host before
//! it hydrates the UI.

use crate::config::StoreConfig;
use crate::persist::parse_snapshot;
use crate::routes::util::{get_param, parse_query};

// ── POST /api/persist/normalize?config={json} ──────────────────────

/// Body is the raw stored JSON. Returns the normalized snapshot; anything
/// invalid comes back as its default.
pub fn handle_normalize_post(query: &str, body: &str) -> String {
    let params = parse_query(query);
    let config = get_param(&params, "config")
        .map(StoreConfig::from_json)
        .unwrap_or_default();
    let snapshot = parse_snapshot(body, &config);
    serde_json::to_string(&snapshot).unwrap_or_else(|_| "{}".to_string())
}
