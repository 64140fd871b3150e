//! `/api/share/*` and `/api/catalog` routes: share-link encode/decode for the
//! JS host.
//!
//! Decoding resolves ids against the catalog last posted to `/api/catalog`.

use std::cell::RefCell;
use std::sync::Arc;

use tracing::warn;

use crate::catalog::{CatalogItem, TeamMember};
use crate::routes::util::{get_param, json_error, parse_query};
use crate::share;

thread_local! {
    static CATALOG: RefCell<Arc<Vec<CatalogItem>>> = RefCell::new(Arc::new(Vec::new()));
}

// ── POST /api/catalog ──────────────────────────────────────────────

/// Body is the catalog array. Returns `{"count": n}`.
pub fn handle_catalog_post(body: &str) -> String {
    match serde_json::from_str::<Vec<CatalogItem>>(body) {
        Ok(items) => {
            let count = items.len();
            CATALOG.with(|cell| *cell.borrow_mut() = Arc::new(items));
            serde_json::json!({ "count": count }).to_string()
        }
        Err(e) => {
            warn!(error = %e, "rejected catalog upload");
            json_error("invalid catalog")
        }
    }
}

// ── POST /api/share/encode ─────────────────────────────────────────

/// Body is a JSON array of team members. Returns `{"token": "..."}`.
pub fn handle_encode_post(body: &str) -> String {
    let team: Vec<TeamMember> = match serde_json::from_str(body) {
        Ok(team) => team,
        Err(e) => {
            warn!(error = %e, "invalid team for share encode");
            return json_error("invalid team");
        }
    };
    match share::encode(&team) {
        Ok(token) => serde_json::json!({ "token": token }).to_string(),
        Err(e) => {
            warn!(error = %e, "share encode failed");
            json_error("encode failed")
        }
    }
}

// ── GET /api/share/decode?team={token} ─────────────────────────────

/// Returns the decoded team as a JSON array; `[]` for any invalid token.
pub fn handle_decode_get(query: &str) -> String {
    let params = parse_query(query);
    let token = get_param(&params, "team").unwrap_or("");
    let catalog = CATALOG.with(|cell| Arc::clone(&cell.borrow()));
    let team = share::decode(token, &catalog);
    serde_json::to_string(&team).unwrap_or_else(|_| "[]".to_string())
}
