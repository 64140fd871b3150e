//! Stable catalog sorting.

use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::cmp::Ordering;
use std::collections::{BTreeSet, HashMap};

use crate::catalog::{CatalogItem, StatKey};

/// Sort key. Unrecognised wire names are kept as `Unknown` and compare equal,
/// which leaves the input order untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum SortKey {
    #[default]
    Id,
    Name,
    Type,
    Favorite,
    Total,
    Stat(StatKey),
    /// Externally supplied regional rank.
    Regional,
    Unknown(String),
}

impl SortKey {
    pub fn as_str(&self) -> &str {
        match self {
            SortKey::Id => "id",
            SortKey::Name => "name",
            SortKey::Type => "type",
            SortKey::Favorite => "favorite",
            SortKey::Total => "total",
            SortKey::Stat(stat) => stat.as_str(),
            SortKey::Regional => "regional",
            SortKey::Unknown(raw) => raw,
        }
    }

    /// Whether the comparison reads the favorites set.
    pub fn needs_favorites(&self) -> bool {
        matches!(self, SortKey::Favorite)
    }
}

impl From<&str> for SortKey {
    fn from(s: &str) -> Self {
        match s {
            "id" => SortKey::Id,
            "name" => SortKey::Name,
            "type" => SortKey::Type,
            "favorite" => SortKey::Favorite,
            "total" => SortKey::Total,
            "regional" => SortKey::Regional,
            other => match StatKey::parse(other) {
                Some(stat) => SortKey::Stat(stat),
                None => SortKey::Unknown(other.to_string()),
            },
        }
    }
}

impl From<String> for SortKey {
    fn from(s: String) -> Self {
        SortKey::from(s.as_str())
    }
}

impl From<SortKey> for String {
    fn from(key: SortKey) -> Self {
        key.as_str().to_string()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl SortDirection {
    pub fn parse(s: &str) -> Option<SortDirection> {
        match s {
            "asc" => Some(SortDirection::Asc),
            "desc" => Some(SortDirection::Desc),
            _ => None,
        }
    }

    pub fn flipped(self) -> SortDirection {
        match self {
            SortDirection::Asc => SortDirection::Desc,
            SortDirection::Desc => SortDirection::Asc,
        }
    }

    fn apply(self, ord: Ordering) -> Ordering {
        match self {
            SortDirection::Asc => ord,
            SortDirection::Desc => ord.reverse(),
        }
    }
}

/// Data some sort keys compare against, beyond the entries themselves.
#[derive(Debug, Clone, Copy, Default)]
pub struct SortContext<'a> {
    pub favorites: Option<&'a BTreeSet<u32>>,
    pub ranks: Option<&'a HashMap<u32, u32>>,
}

fn name_key(item: &CatalogItem) -> Cow<'_, str> {
    match &item.name_lower {
        Some(lower) => Cow::Borrowed(lower.as_str()),
        None => Cow::Owned(item.name.to_lowercase()),
    }
}

fn first_type(item: &CatalogItem) -> &str {
    item.types.first().map(String::as_str).unwrap_or("")
}

fn compare(
    a: &CatalogItem,
    b: &CatalogItem,
    key: &SortKey,
    direction: SortDirection,
    ctx: &SortContext<'_>,
) -> Ordering {
    match key {
        SortKey::Id => direction.apply(a.id.cmp(&b.id)),
        SortKey::Name => direction.apply(name_key(a).cmp(&name_key(b))),
        SortKey::Type => direction.apply(first_type(a).cmp(first_type(b))),
        SortKey::Favorite => {
            let fav = |item: &CatalogItem| ctx.favorites.is_some_and(|f| f.contains(&item.id)) as u8;
            // Favorites (1) come first when ascending.
            direction.apply(fav(b).cmp(&fav(a)))
        }
        SortKey::Total => direction.apply(a.base_total().cmp(&b.base_total())),
        SortKey::Stat(stat) => direction.apply(a.stats.get(*stat).cmp(&b.stats.get(*stat))),
        SortKey::Regional => {
            let rank = |item: &CatalogItem| ctx.ranks.and_then(|r| r.get(&item.id).copied());
            match (rank(a), rank(b)) {
                (Some(ra), Some(rb)) => direction.apply(ra.cmp(&rb)),
                (Some(_), None) => Ordering::Less,
                (None, Some(_)) => Ordering::Greater,
                (None, None) => Ordering::Equal,
            }
        }
        SortKey::Unknown(_) => Ordering::Equal,
    }
}

/// Sorts in place. `slice::sort_by` is stable, so ties keep their order.
pub fn sort_items(items: &mut [&CatalogItem], key: &SortKey, direction: SortDirection, ctx: &SortContext<'_>) {
    if matches!(key, SortKey::Unknown(_)) {
        return;
    }
    items.sort_by(|a, b| compare(a, b, key, direction, ctx));
}
