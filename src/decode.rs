//! Decoders for the three backend payloads.
//!
//! The backend is inconsistent about shapes and key names, so every field is read through one
//! explicit fallback chain and every payload degrades to an empty value instead of an error.
//! Only transport and JSON syntax errors surface from the fetch layer; anything that parses as
//! JSON decodes here.

use std::collections::HashMap;

use serde::de::IgnoredAny;
use serde::Deserialize;
use serde_json::Value;

use crate::EMPTY_CATEGORY_SENTINEL;

const TITLE_SEPARATOR: &str = " - ";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompetitionMeta {
    /// Title with the ` - <category>` suffix removed.
    pub title: String,
    pub category: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AthleteRecord {
    pub user_id: String,
    pub name: String,
}

/// `userId -> full name`
pub type Roster = HashMap<String, String>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProtocolEntry {
    pub user_id: String,
    pub rank: i64,
}

/// Any JSON value in a slot that should hold a scalar.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum Scalar {
    Text(String),
    Int(i64),
    Float(f64),
    Bool(bool),
    Other(IgnoredAny),
}

impl Scalar {
    /// Trimmed text form, `None` when empty or not a scalar.
    fn text(&self) -> Option<String> {
        let text = match self {
            Scalar::Text(s) => s.trim().to_owned(),
            Scalar::Int(n) => n.to_string(),
            // 3.0 renders as "3", the same id as the integer 3.
            Scalar::Float(f) => f.to_string(),
            Scalar::Bool(b) => b.to_string(),
            Scalar::Other(_) => return None,
        };
        (!text.is_empty()).then_some(text)
    }

    fn rank(&self) -> Option<i64> {
        match self {
            Scalar::Int(n) => Some(*n),
            Scalar::Float(f) if f.is_finite() => Some(f.trunc() as i64),
            Scalar::Text(s) => s.trim().parse().ok(),
            _ => None,
        }
    }
}

/// First candidate holding non-empty text.
fn first_text<'a>(candidates: impl IntoIterator<Item = Option<&'a Scalar>>) -> Option<String> {
    candidates.into_iter().flatten().find_map(Scalar::text)
}

#[derive(Debug, Default, Deserialize)]
struct RawCompetition {
    title: Option<Scalar>,
    #[serde(rename = "limitationGroup")]
    limitation_group: Option<Scalar>,
    #[serde(rename = "limitation_group")]
    limitation_group_snake: Option<Scalar>,
    category: Option<Scalar>,
    group: Option<Scalar>,
}

#[derive(Debug, Default, Deserialize)]
struct RawUser {
    id: Option<Scalar>,
}

/// `user` is an embedded object when populated, a bare reference otherwise.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum UserRef {
    Object(RawUser),
    Other(IgnoredAny),
}

#[derive(Debug, Default, Deserialize)]
struct RawAthlete {
    #[serde(rename = "userId")]
    user_id: Option<Scalar>,
    #[serde(rename = "user_id")]
    user_id_snake: Option<Scalar>,
    id: Option<Scalar>,
    user: Option<UserRef>,

    name: Option<Scalar>,
    #[serde(rename = "firstName")]
    first_name: Option<Scalar>,
    #[serde(rename = "lastName")]
    last_name: Option<Scalar>,
    surname: Option<Scalar>,
    #[serde(rename = "fullName")]
    full_name: Option<Scalar>,
    #[serde(rename = "displayName")]
    display_name: Option<Scalar>,
}

impl RawAthlete {
    fn user_id(&self) -> Option<String> {
        let nested = match &self.user {
            Some(UserRef::Object(user)) => user.id.as_ref(),
            _ => None,
        };
        first_text([
            self.user_id.as_ref(),
            self.user_id_snake.as_ref(),
            self.id.as_ref(),
            nested,
        ])
    }

    fn full_name(&self) -> Option<String> {
        let first = first_text([self.name.as_ref(), self.first_name.as_ref()]).unwrap_or_default();
        let last = first_text([self.last_name.as_ref(), self.surname.as_ref()]).unwrap_or_default();
        let joined = format!("{first} {last}").trim().to_owned();
        if joined.is_empty() {
            first_text([self.full_name.as_ref(), self.display_name.as_ref()])
        } else {
            Some(joined)
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct RawProtocolEntry {
    #[serde(rename = "userId")]
    user_id: Option<Scalar>,
    rank: Option<Scalar>,
}

/// `{ key: [..] }` or a bare array; anything else is empty.
fn listing<'a>(body: &'a Value, key: &str) -> &'a [Value] {
    match body {
        Value::Object(map) => map
            .get(key)
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or(&[]),
        Value::Array(items) => items,
        _ => &[],
    }
}

/// Part of a title before the first ` - `.
pub fn competition_title_only(title: &str) -> &str {
    match title.split_once(TITLE_SEPARATOR) {
        Some((head, _)) => head.trim(),
        None => title.trim(),
    }
}

/// Part of a title after the last ` - `, empty when there is no separator.
pub fn category_from_title(title: &str) -> &str {
    match title.rsplit_once(TITLE_SEPARATOR) {
        Some((_, tail)) => tail.trim(),
        None => "",
    }
}

/// Decodes `GET /competitions/{id}`. A singleton array is unwrapped, and the backend's
/// `Empty` category is replaced by `empty_label`.
pub fn competition_meta(body: &Value, empty_label: &str) -> CompetitionMeta {
    let object = match body {
        Value::Array(items) => items.first(),
        other => Some(other),
    };
    let raw = object
        .and_then(|v| RawCompetition::deserialize(v).ok())
        .unwrap_or_default();

    let title = raw.title.as_ref().and_then(Scalar::text).unwrap_or_default();
    let category = first_text([
        raw.limitation_group.as_ref(),
        raw.limitation_group_snake.as_ref(),
        raw.category.as_ref(),
        raw.group.as_ref(),
    ])
    .unwrap_or_default();

    CompetitionMeta {
        title: competition_title_only(&title).to_owned(),
        category: normalize_category(category, empty_label),
    }
}

pub fn normalize_category(category: String, empty_label: &str) -> String {
    if category.trim().eq_ignore_ascii_case(EMPTY_CATEGORY_SENTINEL) {
        empty_label.to_owned()
    } else {
        category
    }
}

/// Decodes `GET /competitions/{id}/athletes` into records. Items without an id or without any
/// name are left out.
pub fn athletes(body: &Value) -> Vec<AthleteRecord> {
    listing(body, "data")
        .iter()
        .filter_map(|item| RawAthlete::deserialize(item).ok())
        .filter_map(|raw| {
            Some(AthleteRecord {
                user_id: raw.user_id()?,
                name: raw.full_name()?,
            })
        })
        .collect()
}

pub fn roster(body: &Value) -> Roster {
    athletes(body)
        .into_iter()
        .map(|AthleteRecord { user_id, name }| (user_id, name))
        .collect()
}

/// Decodes `GET /competitions/{id}/protocol`. Entries missing `userId` or `rank` are dropped,
/// the rest come back in ascending rank order (stable for ties).
pub fn protocol(body: &Value) -> Vec<ProtocolEntry> {
    let mut entries: Vec<ProtocolEntry> = listing(body, "protocol")
        .iter()
        .filter_map(|item| RawProtocolEntry::deserialize(item).ok())
        .filter_map(|raw| {
            Some(ProtocolEntry {
                user_id: raw.user_id.as_ref().and_then(Scalar::text)?,
                rank: raw.rank.as_ref().and_then(Scalar::rank)?,
            })
        })
        .collect();
    entries.sort_by_key(|entry| entry.rank);
    entries
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn meta_unwraps_singleton_array() {
        let body = json!([{ "title": "Kyiv Cup - h1", "limitationGroup": "h1" }]);
        let meta = competition_meta(&body, "Open");
        assert_eq!(
            meta,
            CompetitionMeta {
                title: "Kyiv Cup".into(),
                category: "h1".into()
            }
        );
    }

    #[test]
    fn meta_category_chain_skips_empty_values() {
        let body = json!({
            "title": "Cup",
            "limitationGroup": "",
            "limitation_group": null,
            "category": "  n2.2 ",
            "group": "r1"
        });
        assert_eq!(competition_meta(&body, "Open").category, "n2.2");

        let body = json!({ "title": "Cup", "group": "r1" });
        assert_eq!(competition_meta(&body, "Open").category, "r1");
    }

    #[test]
    fn meta_empty_sentinel_becomes_fallback_label() {
        let body = json!({ "title": "Cup", "category": "Empty" });
        assert_eq!(competition_meta(&body, "Absolute").category, "Absolute");
    }

    #[test]
    fn meta_without_category_has_empty_category() {
        let meta = competition_meta(&json!({ "title": "City Open - h1" }), "Open");
        assert_eq!(meta.title, "City Open");
        assert_eq!(meta.category, "");
    }

    #[test]
    fn meta_from_unexpected_shapes_is_empty() {
        for body in [json!([]), json!("oops"), json!(42), json!({ "title": { "en": "x" } })] {
            let meta = competition_meta(&body, "Open");
            assert_eq!(meta.title, "");
            assert_eq!(meta.category, "");
        }
    }

    #[test]
    fn title_helpers() {
        assert_eq!(competition_title_only("City Open - h1"), "City Open");
        assert_eq!(competition_title_only("  City Open "), "City Open");
        assert_eq!(category_from_title("City Open - Day 2 - h1"), "h1");
        assert_eq!(category_from_title("City Open"), "");
    }

    #[test]
    fn roster_reads_every_id_and_name_variant() {
        let body = json!({ "data": [
            { "userId": "a1", "name": "Ann", "lastName": "Lee" },
            { "user_id": "a2", "firstName": "Bob", "surname": "Ray" },
            { "id": 3, "fullName": "Cid Moe" },
            { "user": { "id": "a4" }, "displayName": "Dee" },
            { "userId": "a5" },
            { "name": "No Id" },
            "not an object"
        ]});
        let roster = roster(&body);
        assert_eq!(roster.len(), 4);
        assert_eq!(roster["a1"], "Ann Lee");
        assert_eq!(roster["a2"], "Bob Ray");
        assert_eq!(roster["3"], "Cid Moe");
        assert_eq!(roster["a4"], "Dee");
    }

    #[test]
    fn roster_keeps_athletes_with_unpopulated_user_reference() {
        let body = json!({ "data": [
            { "userId": "u1", "name": "Ann", "lastName": "Lee", "user": "68ca9822ca7b8219ba2c1e19" },
            { "userId": "u2", "name": "Bob", "user": 42 },
            { "name": "Cid", "user": ["u3"] }
        ]});
        let roster = roster(&body);
        assert_eq!(roster.len(), 2);
        assert_eq!(roster["u1"], "Ann Lee");
        assert_eq!(roster["u2"], "Bob");
    }

    #[test]
    fn integral_float_ids_match_integer_ids() {
        let roster = roster(&json!([{ "id": 3.0, "name": "Ann" }]));
        let protocol = protocol(&json!([{ "userId": 3, "rank": 1 }]));
        assert_eq!(roster.get(&protocol[0].user_id).map(String::as_str), Some("Ann"));
        assert_eq!(protocol[0].user_id, "3");
    }

    #[test]
    fn roster_accepts_raw_array_and_ignores_other_shapes() {
        let body = json!([{ "id": "u1", "name": "Ann" }]);
        assert_eq!(roster(&body)["u1"], "Ann");
        assert!(roster(&json!({ "data": null })).is_empty());
        assert!(roster(&json!({ "athletes": [] })).is_empty());
    }

    #[test]
    fn protocol_drops_incomplete_entries_and_sorts_by_rank() {
        let body = json!({ "protocol": [
            { "userId": "c", "rank": 3 },
            { "userId": "a", "rank": "1" },
            { "userId": "x" },
            { "rank": 2 },
            { "userId": "b", "rank": 2.0 },
            { "userId": "d", "rank": "first" }
        ]});
        let entries = protocol(&body);
        let ids: Vec<_> = entries.iter().map(|e| e.user_id.as_str()).collect();
        assert_eq!(ids, ["a", "b", "c"]);
        assert!(entries.windows(2).all(|w| w[0].rank <= w[1].rank));
    }

    #[test]
    fn protocol_keeps_submission_order_on_equal_ranks() {
        let body = json!([
            { "userId": "first", "rank": 1 },
            { "userId": "second", "rank": 1 }
        ]);
        let ids: Vec<_> = protocol(&body).into_iter().map(|e| e.user_id).collect();
        assert_eq!(ids, ["first", "second"]);
    }
}
