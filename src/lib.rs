//! Dexkit: client-side state core for a catalog browser.
//!
//! A normalized action-driven store with bounded undo/redo, a filter/sort
//! engine that can run on a background worker, validated persistence with
//! legacy migration, and a hardened share-link codec.
//!
//! In the browser, the web worker bridge calls
//! `handle_request(method, path, query, body)`, routed with `matchit`, and gets
//! a JSON string back. Native hosts use [`effects::Session`] directly.

use wasm_bindgen::prelude::*;

pub mod catalog;
pub mod config;
pub mod effects;
pub mod engine;
pub mod error;
pub mod offload;
pub mod persist;
pub mod routes;
pub mod sanitize;
pub mod share;
pub mod store;

/// Install the panic hook and route `tracing` output to the browser console.
/// Call once from JS after the module loads.
#[cfg(target_arch = "wasm32")]
#[wasm_bindgen]
pub fn init_logging() {
    console_error_panic_hook::set_once();
    tracing_wasm::set_as_global_default();
}

/// Process an HTTP-like request from the web worker bridge.
///
/// # Arguments
/// * `method`: HTTP method ("GET" or "POST")
/// * `path`: URL path (e.g., "/api/worker/filter")
/// * `query`: Query string (e.g., "?team=...")
/// * `body`: Request body. Empty string for GET requests.
///
/// # Returns
/// A JSON string. Dropped worker requests return an empty string.
#[wasm_bindgen]
pub fn handle_request(method: &str, path: &str, query: &str, body: &str) -> String {
    let mut router = matchit::Router::new();

    router.insert("/api/worker/filter", "worker_filter").ok();
    router.insert("/api/worker/reset", "worker_reset").ok();
    router.insert("/api/catalog", "catalog").ok();
    router.insert("/api/share/encode", "share_encode").ok();
    router.insert("/api/share/decode", "share_decode").ok();
    router.insert("/api/persist/normalize", "persist_normalize").ok();

    match router.at(path) {
        Ok(matched) => match (*matched.value, method) {
            ("worker_filter", "POST") => routes::worker::handle_filter_post(body),
            ("worker_reset", "POST") => routes::worker::handle_reset_post(),
            ("catalog", "POST") => routes::share::handle_catalog_post(body),
            ("share_encode", "POST") => routes::share::handle_encode_post(body),
            ("share_decode", "GET") => routes::share::handle_decode_get(query),
            ("persist_normalize", "POST") => routes::persist::handle_normalize_post(query, body),
            _ => method_not_allowed(),
        },
        Err(_) => not_found(),
    }
}

fn not_found() -> String {
    routes::util::json_error("404 route not found")
}

fn method_not_allowed() -> String {
    routes::util::json_error("405 method not allowed")
}
