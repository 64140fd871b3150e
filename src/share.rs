//! Share links: a team as one compact, URL-safe token.
//!
//! ## Format
//!
//! ```text
//! token = base64url_nopad( deflate( JSON [SharedMember, ...] ) )
//! SharedMember = { id, moves?, ability?, nature?, item?,
//!                  effortValues?, potentialValues?, shiny? }
//! ```
//!
//! Only non-default values are written: all-zero effort values, all-maximum
//! potential values, empty moves and `shiny: false` are left out, and decoding
//! fills them back in with their defaults.
//!
//! ## Decoding bounds
//!
//! Applied in order, any failure yields an empty team:
//! 1. token length ceiling, checked before any decoding
//! 2. decompressed length ceiling, enforced while inflating
//! 3. entry cap, extra entries are never looked at
//! 4. every free-text field goes through the sanitizer

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use flate2::Compression;
use flate2::read::DeflateDecoder;
use flate2::write::DeflateEncoder;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::io::{Read, Write};
use tracing::warn;

use crate::catalog::{CatalogItem, Customization, MAX_EFFORT, MAX_POTENTIAL, STAT_COUNT, TeamMember};
use crate::error::ShareError;
use crate::persist::clamp_customization;
use crate::sanitize::strip_markup;
use crate::store::Action;

/// Longest token accepted.
pub const MAX_TOKEN_LEN: usize = 2048;

/// Largest decompressed payload accepted.
pub const MAX_DECODED_LEN: usize = 8 * 1024;

/// Most entries read from one token.
pub const MAX_SHARED_MEMBERS: usize = 6;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SharedMember {
    id: u32,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    moves: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    ability: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    nature: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    item: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    effort_values: Option<[u16; STAT_COUNT]>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    potential_values: Option<[u8; STAT_COUNT]>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    shiny: bool,
}

impl SharedMember {
    fn new(id: u32, c: &Customization) -> Self {
        Self {
            id,
            moves: c.moves.clone(),
            ability: c.ability.clone(),
            nature: c.nature.clone(),
            item: c.item.clone(),
            effort_values: c.effort_values.iter().any(|v| *v != 0).then_some(c.effort_values),
            potential_values: c
                .potential_values
                .iter()
                .any(|v| *v != MAX_POTENTIAL)
                .then_some(c.potential_values),
            shiny: c.shiny,
        }
    }

    fn into_customization(self, sanitize: &dyn Fn(&str) -> String) -> Customization {
        let text = |s: Option<String>| s.map(|s| sanitize(&s)).filter(|s| !s.is_empty());
        Customization {
            moves: self
                .moves
                .iter()
                .map(|m| sanitize(m))
                .filter(|m| !m.is_empty())
                .collect(),
            ability: text(self.ability),
            nature: text(self.nature),
            item: text(self.item),
            effort_values: self
                .effort_values
                .map(|evs| evs.map(|v| v.min(MAX_EFFORT)))
                .unwrap_or([0; STAT_COUNT]),
            potential_values: self
                .potential_values
                .map(|ivs| ivs.map(|v| v.min(MAX_POTENTIAL)))
                .unwrap_or([MAX_POTENTIAL; STAT_COUNT]),
            shiny: self.shiny,
        }
    }
}

// ── Encode ─────────────────────────────────────────────────────────

/// Encode under the same bounds decoding applies: at most
/// [`MAX_SHARED_MEMBERS`] distinct members, free text sanitized and values
/// clamped, so decoding the token gives back exactly what was written.
pub fn encode(team: &[TeamMember]) -> Result<String, ShareError> {
    let mut records: Vec<SharedMember> = Vec::with_capacity(team.len().min(MAX_SHARED_MEMBERS));
    for member in team {
        if records.len() == MAX_SHARED_MEMBERS {
            break;
        }
        if records.iter().any(|r| r.id == member.id()) {
            continue;
        }
        records.push(SharedMember::new(
            member.id(),
            &clamp_customization(member.customization.clone()),
        ));
    }
    let json = serde_json::to_vec(&records)?;
    let mut encoder = DeflateEncoder::new(Vec::new(), Compression::best());
    encoder.write_all(&json)?;
    let compressed = encoder.finish()?;
    Ok(URL_SAFE_NO_PAD.encode(compressed))
}

// ── Decode ─────────────────────────────────────────────────────────

/// Inflate at most `limit` bytes; anything longer is rejected.
pub fn inflate_bounded(compressed: &[u8], limit: usize) -> Result<Vec<u8>, ShareError> {
    let mut out = Vec::new();
    DeflateDecoder::new(compressed)
        .take(limit as u64 + 1)
        .read_to_end(&mut out)?;
    if out.len() > limit {
        return Err(ShareError::DecodedTooLong { limit });
    }
    Ok(out)
}

/// Decode with the default sanitizer and inflater. Failures give an empty team.
pub fn decode(token: &str, catalog: &[CatalogItem]) -> Vec<TeamMember> {
    decode_with(token, catalog, &strip_markup, inflate_bounded)
}

/// Decode with a caller-supplied sanitizer and inflate routine.
pub fn decode_with<F>(
    token: &str,
    catalog: &[CatalogItem],
    sanitize: &dyn Fn(&str) -> String,
    inflate: F,
) -> Vec<TeamMember>
where
    F: FnOnce(&[u8], usize) -> Result<Vec<u8>, ShareError>,
{
    match try_decode(token, catalog, sanitize, inflate) {
        Ok(team) => team,
        Err(e) => {
            warn!(error = %e, "rejected share token");
            Vec::new()
        }
    }
}

fn try_decode<F>(
    token: &str,
    catalog: &[CatalogItem],
    sanitize: &dyn Fn(&str) -> String,
    inflate: F,
) -> Result<Vec<TeamMember>, ShareError>
where
    F: FnOnce(&[u8], usize) -> Result<Vec<u8>, ShareError>,
{
    let token = token.trim();
    if token.len() > MAX_TOKEN_LEN {
        return Err(ShareError::TokenTooLong {
            len: token.len(),
            limit: MAX_TOKEN_LEN,
        });
    }
    if token.is_empty() {
        return Ok(Vec::new());
    }
    let compressed = URL_SAFE_NO_PAD.decode(token)?;
    let json = inflate(&compressed, MAX_DECODED_LEN)?;
    if json.len() > MAX_DECODED_LEN {
        return Err(ShareError::DecodedTooLong {
            limit: MAX_DECODED_LEN,
        });
    }

    let Value::Array(entries) = serde_json::from_slice::<Value>(&json)? else {
        return Err(ShareError::NotAnArray);
    };

    let mut team: Vec<TeamMember> = Vec::new();
    for (index, entry) in entries.into_iter().take(MAX_SHARED_MEMBERS).enumerate() {
        if !entry.is_object() {
            return Err(ShareError::MalformedEntry {
                index,
                reason: "not an object",
            });
        }
        let record: SharedMember =
            serde_json::from_value(entry).map_err(|_| ShareError::MalformedEntry {
                index,
                reason: "invalid field",
            })?;
        let item = catalog
            .iter()
            .find(|item| item.id == record.id)
            .ok_or(ShareError::UnknownId(record.id))?;
        if team.iter().any(|m| m.id() == record.id) {
            continue;
        }
        team.push(TeamMember {
            item: item.clone(),
            customization: record.into_customization(sanitize),
        });
    }
    Ok(team)
}

/// Actions that load a decoded team into the store: the roster in one step,
/// then each non-default customization.
pub fn import_actions(team: &[TeamMember]) -> Vec<Action> {
    let mut actions = vec![Action::SetTeam(team.iter().map(TeamMember::id).collect())];
    actions.extend(
        team.iter()
            .filter(|m| !m.customization.is_default())
            .map(|m| Action::UpdateCustomization {
                id: m.id(),
                customization: m.customization.clone(),
            }),
    );
    actions
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::cell::Cell;

    fn catalog() -> Vec<CatalogItem> {
        vec![
            CatalogItem::new(1, "bulbasaur", &["grass", "poison"]),
            CatalogItem::new(4, "charmander", &["fire"]),
            CatalogItem::new(25, "pikachu", &["electric"]),
        ]
    }

    fn member(id: u32, customization: Customization) -> TeamMember {
        let item = catalog().into_iter().find(|i| i.id == id).unwrap();
        TeamMember { item, customization }
    }

    fn raw_token(json: &str) -> String {
        let mut encoder = DeflateEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(json.as_bytes()).unwrap();
        URL_SAFE_NO_PAD.encode(encoder.finish().unwrap())
    }

    #[test]
    fn roundtrip_keeps_explicit_fields() {
        let team = vec![
            member(
                25,
                Customization {
                    moves: vec!["Thunderbolt".to_string(), "Quick Attack".to_string()],
                    ability: Some("Static".to_string()),
                    nature: Some("Timid".to_string()),
                    item: Some("Light Ball".to_string()),
                    effort_values: [0, 0, 0, 252, 4, 252],
                    potential_values: [31, 0, 31, 31, 31, 31],
                    shiny: true,
                },
            ),
            member(1, Customization::default()),
        ];
        let token = encode(&team).unwrap();
        assert_eq!(decode(&token, &catalog()), team);
    }

    #[test]
    fn apostrophes_survive_the_roundtrip() {
        let team = vec![member(
            1,
            Customization {
                item: Some("King's Rock".to_string()),
                moves: vec!["Land's Wrath".to_string()],
                ..Customization::default()
            },
        )];
        let token = encode(&team).unwrap();
        assert_eq!(decode(&token, &catalog()), team);
    }

    #[test]
    fn encode_writes_at_most_the_entry_cap() {
        let wide: Vec<CatalogItem> = (1..=8).map(|id| CatalogItem::new(id, "mon", &["normal"])).collect();
        let team: Vec<TeamMember> = wide.iter().cloned().map(TeamMember::new).collect();
        let token = encode(&team).unwrap();
        let compressed = URL_SAFE_NO_PAD.decode(&token).unwrap();
        let json = inflate_bounded(&compressed, MAX_DECODED_LEN).unwrap();
        let entries: Vec<Value> = serde_json::from_slice(&json).unwrap();
        assert_eq!(entries.len(), MAX_SHARED_MEMBERS);
        assert_eq!(decode(&token, &wide), team[..MAX_SHARED_MEMBERS].to_vec());
    }

    #[test]
    fn encode_applies_decode_bounds_to_text() {
        let long = "x".repeat(200);
        let team = vec![member(
            4,
            Customization {
                ability: Some(long),
                nature: Some("<Bold>".to_string()),
                effort_values: [999, 0, 0, 0, 0, 0],
                ..Customization::default()
            },
        )];
        let decoded = decode(&encode(&team).unwrap(), &catalog());
        let c = &decoded[0].customization;
        assert_eq!(c.ability.as_deref().map(str::len), Some(crate::sanitize::MAX_TEXT_LEN));
        assert_eq!(c.nature.as_deref(), Some("Bold"));
        assert_eq!(c.effort_values[0], MAX_EFFORT);
        assert_eq!(encode(&decoded).unwrap(), encode(&team).unwrap());
    }

    fn text() -> impl Strategy<Value = String> {
        "[A-Za-z][A-Za-z' .-]{0,30}[A-Za-z]"
    }

    fn customization() -> impl Strategy<Value = Customization> {
        (
            proptest::collection::vec(text(), 0..4),
            proptest::option::of(text()),
            proptest::option::of(text()),
            proptest::option::of(text()),
            proptest::array::uniform6(0..=MAX_EFFORT),
            proptest::array::uniform6(0..=MAX_POTENTIAL),
            any::<bool>(),
        )
            .prop_map(|(moves, ability, nature, item, effort_values, potential_values, shiny)| Customization {
                moves,
                ability,
                nature,
                item,
                effort_values,
                potential_values,
                shiny,
            })
    }

    proptest! {
        #[test]
        fn valid_teams_roundtrip_exactly(
            customizations in proptest::collection::vec(customization(), 1..=3),
        ) {
            let team: Vec<TeamMember> = catalog()
                .into_iter()
                .zip(customizations)
                .map(|(item, customization)| TeamMember { item, customization })
                .collect();
            let token = encode(&team).unwrap();
            prop_assert_eq!(decode(&token, &catalog()), team);
        }
    }

    #[test]
    fn default_fields_are_omitted() {
        let token = encode(&[member(4, Customization::default())]).unwrap();
        let compressed = URL_SAFE_NO_PAD.decode(&token).unwrap();
        let json = inflate_bounded(&compressed, MAX_DECODED_LEN).unwrap();
        assert_eq!(String::from_utf8(json).unwrap(), r#"[{"id":4}]"#);
    }

    #[test]
    fn sparse_record_expands_to_defaults() {
        let token = raw_token(r#"[{"id":1,"effortValues":[4,0,0,0,0,0]}]"#);
        let team = decode(&token, &catalog());
        let c = &team[0].customization;
        assert_eq!(c.effort_values, [4, 0, 0, 0, 0, 0]);
        assert_eq!(c.potential_values, [MAX_POTENTIAL; STAT_COUNT]);
        assert!(!c.shiny);
    }

    #[test]
    fn oversize_token_never_reaches_inflate() {
        let called = Cell::new(false);
        let token = "A".repeat(MAX_TOKEN_LEN + 1);
        let team = decode_with(&token, &catalog(), &strip_markup, |bytes, limit| {
            called.set(true);
            inflate_bounded(bytes, limit)
        });
        assert!(team.is_empty());
        assert!(!called.get());
    }

    #[test]
    fn decompression_bomb_is_rejected() {
        let padding = " ".repeat(MAX_DECODED_LEN * 4);
        let token = raw_token(&format!(r#"[{{"id":1}}{padding}]"#));
        assert!(token.len() <= MAX_TOKEN_LEN);
        assert!(decode(&token, &catalog()).is_empty());
    }

    #[test]
    fn unknown_id_empties_the_whole_result() {
        let token = raw_token(r#"[{"id":1},{"id":999}]"#);
        assert!(decode(&token, &catalog()).is_empty());
    }

    #[test]
    fn malformed_payloads_give_empty() {
        for json in [r#"{"id":1}"#, r#"[1]"#, r#"[{"id":"one"}]"#, "not json"] {
            assert!(decode(&raw_token(json), &catalog()).is_empty(), "{json}");
        }
        assert!(decode("!!!not-base64!!!", &catalog()).is_empty());
    }

    #[test]
    fn entry_cap_ignores_extra_entries() {
        let mut entries: Vec<String> = [1, 4, 25, 1, 4, 25].iter().map(|id| format!(r#"{{"id":{id}}}"#)).collect();
        // Past the cap: never resolved, so the unknown id does not matter.
        entries.push(r#"{"id":999}"#.to_string());
        let token = raw_token(&format!("[{}]", entries.join(",")));
        let ids: Vec<u32> = decode(&token, &catalog()).iter().map(TeamMember::id).collect();
        assert_eq!(ids, vec![1, 4, 25]);
    }

    #[test]
    fn text_fields_are_sanitized() {
        let token = raw_token(
            r#"[{"id":4,"moves":["<script>Ember</script>",""],"item":"\"><img src=x>","nature":"Bold"}]"#,
        );
        let team = decode(&token, &catalog());
        let c = &team[0].customization;
        assert_eq!(c.moves, vec!["scriptEmber/script".to_string()]);
        assert_eq!(c.item.as_deref(), Some("img src=x"));
        assert_eq!(c.nature.as_deref(), Some("Bold"));
    }

    #[test]
    fn out_of_range_values_are_clamped() {
        let token = raw_token(r#"[{"id":4,"effortValues":[999,0,0,0,0,0],"potentialValues":[99,0,0,0,0,0]}]"#);
        let c = &decode(&token, &catalog())[0].customization;
        assert_eq!(c.effort_values[0], MAX_EFFORT);
        assert_eq!(c.potential_values[0], MAX_POTENTIAL);
    }

    #[test]
    fn import_actions_set_roster_then_customizations() {
        let shiny = Customization {
            shiny: true,
            ..Customization::default()
        };
        let actions = import_actions(&[member(4, shiny.clone()), member(1, Customization::default())]);
        assert_eq!(
            actions,
            vec![
                Action::SetTeam(vec![4, 1]),
                Action::UpdateCustomization {
                    id: 4,
                    customization: shiny,
                },
            ]
        );
    }
}
