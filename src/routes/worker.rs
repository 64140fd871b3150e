//! `/api/worker/*` routes: the filter worker as seen from the web worker
//! bridge.
//!
//! The worker's cached catalog and comparator input live in a `thread_local`
//! for the lifetime of the web worker, so requests that omit them reuse the
//! last copy sent.

use std::cell::RefCell;

use crate::offload::WorkerState;

thread_local! {
    static WORKER: RefCell<WorkerState> = RefCell::new(WorkerState::new());
}

// ── POST /api/worker/filter ────────────────────────────────────────

/// Body is one worker request. Returns the response JSON, or an empty string
/// when the request cannot be correlated and is dropped.
pub fn handle_filter_post(body: &str) -> String {
    WORKER
        .with(|cell| cell.borrow_mut().handle_message(body))
        .unwrap_or_default()
}

// ── POST /api/worker/reset ─────────────────────────────────────────

/// Drop the cached catalog and comparator input.
pub fn handle_reset_post() -> String {
    WORKER.with(|cell| *cell.borrow_mut() = WorkerState::new());
    r#"{"ok":true}"#.to_string()
}
