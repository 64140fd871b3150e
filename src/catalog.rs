//! Catalog entities and team members.
//!
//! The catalog is loaded once by the host and never mutated afterwards; the
//! store holds it behind an `Arc` so "did the catalog change" is a pointer
//! comparison.

use serde::{Deserialize, Serialize};

/// Number of stats every entry carries.
pub const STAT_COUNT: usize = 6;

/// Largest effort value a single stat can hold.
pub const MAX_EFFORT: u16 = 252;

/// Largest (and default) potential value of a stat.
pub const MAX_POTENTIAL: u8 = 31;

/// Highest id of each generation, in order. Generation `n` covers the ids
/// after generation `n - 1`'s ceiling up to and including its own.
pub const GENERATION_CEILINGS: [u32; 9] = [151, 251, 386, 493, 649, 721, 809, 905, 1025];

/// Returns the 1-based generation an id belongs to.
pub fn generation_of(id: u32) -> Option<u8> {
    if id == 0 {
        return None;
    }
    GENERATION_CEILINGS
        .iter()
        .position(|&ceiling| id <= ceiling)
        .map(|idx| (idx + 1) as u8)
}

/// One of the six base stats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum StatKey {
    Hp,
    Attack,
    Defense,
    SpecialAttack,
    SpecialDefense,
    Speed,
}

impl StatKey {
    pub const ALL: [StatKey; STAT_COUNT] = [
        StatKey::Hp,
        StatKey::Attack,
        StatKey::Defense,
        StatKey::SpecialAttack,
        StatKey::SpecialDefense,
        StatKey::Speed,
    ];

    /// Wire name, as used by sort keys and filter maps.
    pub fn as_str(self) -> &'static str {
        match self {
            StatKey::Hp => "hp",
            StatKey::Attack => "attack",
            StatKey::Defense => "defense",
            StatKey::SpecialAttack => "specialAttack",
            StatKey::SpecialDefense => "specialDefense",
            StatKey::Speed => "speed",
        }
    }

    pub fn parse(s: &str) -> Option<StatKey> {
        StatKey::ALL.into_iter().find(|k| k.as_str() == s)
    }
}

/// Base stat block.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Stats {
    pub hp: u32,
    pub attack: u32,
    pub defense: u32,
    pub special_attack: u32,
    pub special_defense: u32,
    pub speed: u32,
}

impl Stats {
    pub fn get(&self, key: StatKey) -> u32 {
        match key {
            StatKey::Hp => self.hp,
            StatKey::Attack => self.attack,
            StatKey::Defense => self.defense,
            StatKey::SpecialAttack => self.special_attack,
            StatKey::SpecialDefense => self.special_defense,
            StatKey::Speed => self.speed,
        }
    }

    /// Base-stat total.
    pub fn total(&self) -> u32 {
        StatKey::ALL
            .iter()
            .fold(0u32, |sum, &k| sum.saturating_add(self.get(k)))
    }
}

/// A browsable catalog entry.
///
/// The `*_lower` and `total` fields are optional precomputed shadows. They
/// only make filtering cheaper; results are identical without them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogItem {
    pub id: u32,
    pub name: String,
    #[serde(default)]
    pub types: Vec<String>,
    #[serde(default)]
    pub stats: Stats,
    #[serde(default)]
    pub abilities: Vec<String>,
    #[serde(default)]
    pub flavor_text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name_lower: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub flavor_lower: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub abilities_lower: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total: Option<u32>,
}

impl CatalogItem {
    pub fn new(id: u32, name: &str, types: &[&str]) -> Self {
        Self {
            id,
            name: name.to_string(),
            types: types.iter().map(|t| t.to_string()).collect(),
            stats: Stats::default(),
            abilities: Vec::new(),
            flavor_text: String::new(),
            name_lower: None,
            flavor_lower: None,
            abilities_lower: None,
            total: None,
        }
    }

    pub fn with_stats(mut self, stats: Stats) -> Self {
        self.stats = stats;
        self
    }

    pub fn with_abilities(mut self, abilities: &[&str]) -> Self {
        self.abilities = abilities.iter().map(|a| a.to_string()).collect();
        self
    }

    pub fn with_flavor(mut self, flavor: &str) -> Self {
        self.flavor_text = flavor.to_string();
        self
    }

    /// Fill in the lowercase shadows and the precomputed total.
    pub fn with_shadows(mut self) -> Self {
        self.name_lower = Some(self.name.to_lowercase());
        self.flavor_lower = Some(self.flavor_text.to_lowercase());
        self.abilities_lower = Some(self.abilities.iter().map(|a| a.to_lowercase()).collect());
        self.total = Some(self.stats.total());
        self
    }

    /// Base-stat total, using the precomputed value when present.
    pub fn base_total(&self) -> u32 {
        self.total.unwrap_or_else(|| self.stats.total())
    }

    pub fn generation(&self) -> Option<u8> {
        generation_of(self.id)
    }
}

/// Optional per-member customization. Every field has a default meaning:
/// no moves, no ability/nature/item, zero effort, maximum potential.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Customization {
    pub moves: Vec<String>,
    pub ability: Option<String>,
    pub nature: Option<String>,
    pub item: Option<String>,
    pub effort_values: [u16; STAT_COUNT],
    pub potential_values: [u8; STAT_COUNT],
    pub shiny: bool,
}

impl Default for Customization {
    fn default() -> Self {
        Self {
            moves: Vec::new(),
            ability: None,
            nature: None,
            item: None,
            effort_values: [0; STAT_COUNT],
            potential_values: [MAX_POTENTIAL; STAT_COUNT],
            shiny: false,
        }
    }
}

impl Customization {
    pub fn is_default(&self) -> bool {
        *self == Customization::default()
    }
}

/// A catalog entry as it sits on a team, with its customization resolved.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TeamMember {
    pub item: CatalogItem,
    #[serde(default)]
    pub customization: Customization,
}

impl TeamMember {
    pub fn new(item: CatalogItem) -> Self {
        Self {
            item,
            customization: Customization::default(),
        }
    }

    pub fn id(&self) -> u32 {
        self.item.id
    }
}
