//! Worker side of the offload protocol.
//!
//! Holds the last catalog and comparator input it was sent. A request that
//! omits either field reuses the cached copy.

use std::collections::BTreeSet;
use std::panic::{AssertUnwindSafe, catch_unwind};

use tracing::{debug, warn};

use crate::catalog::CatalogItem;
use crate::engine::{SortContext, compute_ids};
use crate::error::ProtocolError;

use super::protocol::{ValidRequest, Validated, WorkerResponse, validate};

#[derive(Debug, Default)]
pub struct WorkerState {
    catalog: Option<Vec<CatalogItem>>,
    comparator_input: BTreeSet<u32>,
}

impl WorkerState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn catalog_len(&self) -> Option<usize> {
        self.catalog.as_ref().map(Vec::len)
    }

    fn compute(&mut self, request: ValidRequest) -> WorkerResponse {
        if let Some(catalog) = request.catalog {
            self.catalog = Some(catalog);
        }
        if let Some(input) = request.comparator_input {
            self.comparator_input = input.into_iter().collect();
        }
        let Some(catalog) = self.catalog.as_deref() else {
            return WorkerResponse::failed(request.request_id, ProtocolError::NoCatalog.to_string());
        };
        let ctx = SortContext {
            favorites: Some(&self.comparator_input),
            ranks: None,
        };
        let ids = compute_ids(
            catalog,
            &request.filter_options,
            &request.sort_key,
            request.sort_direction,
            &ctx,
        );
        WorkerResponse::ok(request.request_id, ids)
    }

    /// Handle one raw request. `None` means no reply can be correlated.
    pub fn handle_message(&mut self, raw: &str) -> Option<String> {
        let response = match validate(raw) {
            Validated::Valid(request) => {
                let request_id = request.request_id;
                match catch_unwind(AssertUnwindSafe(|| self.compute(*request))) {
                    Ok(response) => response,
                    Err(_) => {
                        warn!(request_id, "filter computation panicked");
                        WorkerResponse::failed(request_id, "internal error")
                    }
                }
            }
            Validated::Rejected {
                request_id: Some(request_id),
                error,
            } => {
                debug!(request_id, %error, "rejected worker request");
                WorkerResponse::failed(request_id, error.to_string())
            }
            Validated::Rejected {
                request_id: None,
                error,
            } => {
                warn!(%error, "dropping uncorrelated worker request");
                return None;
            }
        };
        match serde_json::to_string(&response) {
            Ok(json) => Some(json),
            Err(e) => {
                warn!(error = %e, "could not serialize worker response");
                None
            }
        }
    }
}
