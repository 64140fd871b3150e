//! Catalog loading state.

use std::sync::Arc;

use crate::config::StoreConfig;
use crate::store::{Action, Reduction, State, StatePatch};

pub fn reduce(state: &State, action: &Action, _config: &StoreConfig) -> Reduction {
    match action {
        Action::CatalogLoading => {
            if state.catalog_loading && state.catalog_error.is_none() {
                return Reduction::Unchanged;
            }
            Reduction::Patch(StatePatch {
                catalog_loading: Some(true),
                catalog_error: Some(None),
                ..StatePatch::default()
            })
        }
        Action::CatalogLoaded(catalog) => {
            if Arc::ptr_eq(&state.catalog, catalog) && !state.catalog_loading {
                return Reduction::Unchanged;
            }
            // The derived view belongs to the old catalog; the effects layer
            // recomputes it.
            Reduction::Patch(StatePatch {
                catalog: Some(Arc::clone(catalog)),
                catalog_loading: Some(false),
                catalog_error: Some(None),
                filtered: Some(Vec::new()),
                ..StatePatch::default()
            })
        }
        Action::CatalogFailed(reason) => Reduction::Patch(StatePatch {
            catalog_loading: Some(false),
            catalog_error: Some(Some(reason.clone())),
            ..StatePatch::default()
        }),
        _ => Reduction::NotHandled,
    }
}
