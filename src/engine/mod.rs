//! Filter/sort engine. Pure and synchronous; runs unchanged on the main thread
//! or inside the background worker.

pub mod filter;
pub mod sort;

use crate::catalog::CatalogItem;
pub use filter::{FilterOptions, filter_catalog};
pub use sort::{SortContext, SortDirection, SortKey, sort_items};

/// Filter then sort, returning the surviving entries in display order.
pub fn compute<'a>(
    catalog: &'a [CatalogItem],
    options: &FilterOptions,
    key: &SortKey,
    direction: SortDirection,
    ctx: &SortContext<'_>,
) -> Vec<&'a CatalogItem> {
    let mut items = filter_catalog(catalog, options);
    sort_items(&mut items, key, direction, ctx);
    items
}

/// Same as [`compute`], returning only ids.
pub fn compute_ids(
    catalog: &[CatalogItem],
    options: &FilterOptions,
    key: &SortKey,
    direction: SortDirection,
    ctx: &SortContext<'_>,
) -> Vec<u32> {
    compute(catalog, options, key, direction, ctx)
        .into_iter()
        .map(|item| item.id)
        .collect()
}
