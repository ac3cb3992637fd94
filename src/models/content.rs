use chrono::{DateTime, Utc};
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use tracing::warn;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Competition {
    pub id: i64,
    pub name: String,
    pub icon: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Carousel row as persisted. `parents` holds the current nested layout,
/// `dropdowns` the legacy flat layout written by older releases.
#[derive(Debug, Clone)]
pub struct CarouselRecord {
    pub id: i64,
    pub title: String,
    pub date: Option<String>,
    pub subtitle: Option<String>,
    pub description: Option<String>,
    pub parents: Option<String>,
    pub dropdowns: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Mutable carousel fields, always written in the nested layout
#[derive(Debug, Clone, PartialEq)]
pub struct CarouselDraft {
    pub title: String,
    pub date: Option<String>,
    pub subtitle: Option<String>,
    pub description: Option<String>,
    pub parents: Vec<StoredParent>,
}

impl CarouselDraft {
    pub fn parents_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(&self.parents)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct StoredParent {
    #[serde(default)]
    pub title: String,
    pub dropdowns: Vec<StoredDropdown>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct StoredDropdown {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default, deserialize_with = "lenient_id")]
    pub competition_id: Option<i64>,
}

/// Both on-disk layouts, as read back from stored rows. Nested is tried
/// first; a flat list has no `dropdowns` key on its items and falls through
/// to `Flat`.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum StoredLayout {
    Nested(Vec<StoredParent>),
    Flat(Vec<StoredDropdown>),
}

impl StoredLayout {
    fn into_parents(self) -> Vec<StoredParent> {
        match self {
            StoredLayout::Nested(parents) => parents,
            StoredLayout::Flat(dropdowns) if dropdowns.is_empty() => Vec::new(),
            StoredLayout::Flat(dropdowns) => vec![StoredParent {
                title: String::new(),
                dropdowns,
            }],
        }
    }
}

/// Parse submitted parent groups. Accepts either layout, or the same JSON
/// sent as a string by form posts; `null` means no groups.
///
/// Unlike stored rows this never guesses: a list is read as flat only when
/// none of its items carries a `dropdowns` key, and every competition id
/// must be an integer or a numeric string.
pub fn parents_from_value(value: Value) -> Result<Vec<StoredParent>, serde_json::Error> {
    let value = match value {
        Value::Null => return Ok(Vec::new()),
        Value::String(raw) if raw.trim().is_empty() => return Ok(Vec::new()),
        Value::String(raw) => serde_json::from_str(&raw)?,
        other => other,
    };

    let Value::Array(items) = &value else {
        return Err(serde_json::Error::custom("expected a list of groups"));
    };

    let nested = items.iter().any(|item| item.get("dropdowns").is_some());
    let dropdowns: Vec<&Value> = if nested {
        items
            .iter()
            .filter_map(|item| item.get("dropdowns").and_then(Value::as_array))
            .flatten()
            .collect()
    } else {
        items.iter().collect()
    };
    dropdowns.into_iter().try_for_each(check_submitted_id)?;

    if nested {
        serde_json::from_value(value)
    } else {
        serde_json::from_value(value).map(|flat| StoredLayout::Flat(flat).into_parents())
    }
}

fn check_submitted_id(dropdown: &Value) -> Result<(), serde_json::Error> {
    match dropdown.get("competition_id") {
        None | Some(Value::Null) => Ok(()),
        Some(Value::Number(n)) if n.is_i64() => Ok(()),
        Some(Value::String(s)) if s.trim().is_empty() || s.trim().parse::<i64>().is_ok() => Ok(()),
        Some(other) => Err(serde_json::Error::custom(format!(
            "invalid competition_id {}",
            other
        ))),
    }
}

// Older forms posted competition ids as strings, sometimes empty
fn lenient_id<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Int(i64),
        Text(String),
    }

    Ok(match Option::<Raw>::deserialize(deserializer)? {
        Some(Raw::Int(id)) => Some(id),
        Some(Raw::Text(s)) if s.trim().is_empty() => None,
        Some(Raw::Text(s)) => match s.trim().parse() {
            Ok(id) => Some(id),
            Err(_) => {
                warn!(value = %s, "Ignoring non-numeric competition id");
                None
            }
        },
        None => None,
    })
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CarouselCard {
    pub id: i64,
    pub title: String,
    pub date: Option<String>,
    pub subtitle: Option<String>,
    pub description: Option<String>,
    pub parents: Vec<ParentGroup>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ParentGroup {
    pub title: String,
    pub dropdowns: Vec<Dropdown>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Dropdown {
    pub title: String,
    pub content: Option<String>,
    pub competition_id: Option<i64>,
    pub competition_name: Option<String>,
    pub competition_icon: Option<String>,
}

impl Dropdown {
    fn resolve(stored: StoredDropdown, competitions: &HashMap<i64, Competition>) -> Self {
        let competition = stored.competition_id.and_then(|id| competitions.get(&id));

        Self {
            title: stored.title,
            content: stored.content,
            competition_id: stored.competition_id,
            competition_name: competition.map(|c| c.name.clone()),
            competition_icon: competition.and_then(|c| c.icon.clone()),
        }
    }
}

fn parse_layout(record_id: i64, column: &str, raw: &str) -> Option<Vec<StoredParent>> {
    if raw.trim().is_empty() {
        return None;
    }

    match serde_json::from_str::<StoredLayout>(raw) {
        Ok(layout) => Some(layout.into_parents()),
        Err(e) => {
            warn!(
                carousel_id = record_id,
                column = column,
                error = %e,
                "Unreadable carousel layout, treating as empty"
            );
            None
        }
    }
}

impl CarouselRecord {
    /// Normalize either stored layout into nested groups and attach the
    /// competition name and icon to every dropdown.
    pub fn normalize(self, competitions: &HashMap<i64, Competition>) -> CarouselCard {
        let stored = self
            .parents
            .as_deref()
            .and_then(|raw| parse_layout(self.id, "parents", raw))
            .or_else(|| {
                self.dropdowns
                    .as_deref()
                    .and_then(|raw| parse_layout(self.id, "dropdowns", raw))
            })
            .unwrap_or_default();

        let parents = stored
            .into_iter()
            .map(|parent| ParentGroup {
                title: parent.title,
                dropdowns: parent
                    .dropdowns
                    .into_iter()
                    .map(|d| Dropdown::resolve(d, competitions))
                    .collect(),
            })
            .collect();

        CarouselCard {
            id: self.id,
            title: self.title,
            date: self.date,
            subtitle: self.subtitle,
            description: self.description,
            parents,
            created_at: self.created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn competitions() -> HashMap<i64, Competition> {
        let mut map = HashMap::new();
        map.insert(
            7,
            Competition {
                id: 7,
                name: "Premier League".to_string(),
                icon: Some("/icons/pl.png".to_string()),
                created_at: Utc::now(),
            },
        );
        map
    }

    fn record(parents: Option<&str>, dropdowns: Option<&str>) -> CarouselRecord {
        CarouselRecord {
            id: 1,
            title: "Weekend picks".to_string(),
            date: None,
            subtitle: None,
            description: None,
            parents: parents.map(str::to_string),
            dropdowns: dropdowns.map(str::to_string),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_nested_layout_resolves_competition() {
        let card = record(
            Some(r#"[{"title":"Saturday","dropdowns":[{"title":"Derby","competition_id":7}]}]"#),
            None,
        )
        .normalize(&competitions());

        assert_eq!(card.parents.len(), 1);
        assert_eq!(card.parents[0].title, "Saturday");
        let dropdown = &card.parents[0].dropdowns[0];
        assert_eq!(dropdown.competition_name.as_deref(), Some("Premier League"));
        assert_eq!(dropdown.competition_icon.as_deref(), Some("/icons/pl.png"));
    }

    #[test]
    fn test_legacy_flat_column_wrapped_in_one_group() {
        let card = record(
            None,
            Some(r#"[{"title":"A","content":"x","competition_id":"7"},{"title":"B"}]"#),
        )
        .normalize(&competitions());

        assert_eq!(card.parents.len(), 1);
        assert_eq!(card.parents[0].title, "");
        assert_eq!(card.parents[0].dropdowns.len(), 2);
        assert_eq!(card.parents[0].dropdowns[0].competition_id, Some(7));
        assert_eq!(
            card.parents[0].dropdowns[0].competition_name.as_deref(),
            Some("Premier League")
        );
        assert_eq!(card.parents[0].dropdowns[1].competition_name, None);
    }

    #[test]
    fn test_flat_list_in_parents_column() {
        let card = record(Some(r#"[{"title":"Only"}]"#), None).normalize(&competitions());
        assert_eq!(card.parents.len(), 1);
        assert_eq!(card.parents[0].dropdowns[0].title, "Only");
    }

    #[test]
    fn test_unknown_competition_resolves_to_none() {
        let card = record(
            Some(r#"[{"title":"G","dropdowns":[{"title":"D","competition_id":99}]}]"#),
            None,
        )
        .normalize(&competitions());

        let dropdown = &card.parents[0].dropdowns[0];
        assert_eq!(dropdown.competition_id, Some(99));
        assert!(dropdown.competition_name.is_none());
        assert!(dropdown.competition_icon.is_none());
    }

    #[test]
    fn test_corrupt_layout_falls_back_to_legacy_then_empty() {
        let card = record(Some("{not json"), Some(r#"[{"title":"L"}]"#)).normalize(&competitions());
        assert_eq!(card.parents[0].dropdowns[0].title, "L");

        let card = record(Some("{not json"), None).normalize(&competitions());
        assert!(card.parents.is_empty());
    }

    #[test]
    fn test_empty_id_string_is_none() {
        let dropdown: StoredDropdown =
            serde_json::from_str(r#"{"title":"x","competition_id":""}"#).unwrap();
        assert_eq!(dropdown.competition_id, None);
    }

    #[test]
    fn test_parents_from_value_variants() {
        let nested = serde_json::json!([{"title":"G","dropdowns":[{"title":"D","competition_id":7,"competition_name":"ignored"}]}]);
        let parents = parents_from_value(nested).unwrap();
        assert_eq!(parents[0].dropdowns[0].competition_id, Some(7));

        let as_string = serde_json::Value::String(r#"[{"title":"flat"}]"#.to_string());
        let parents = parents_from_value(as_string).unwrap();
        assert_eq!(parents.len(), 1);
        assert_eq!(parents[0].dropdowns[0].title, "flat");

        assert!(parents_from_value(serde_json::Value::Null).unwrap().is_empty());
        assert!(parents_from_value(serde_json::json!({"title": 1})).is_err());
    }

    #[test]
    fn test_submitted_groups_never_fall_back_to_flat() {
        use serde_json::json;

        assert!(parents_from_value(json!([{"title": "Saturday", "dropdowns": null}])).is_err());
        assert!(parents_from_value(json!([
            {"title": "Saturday", "dropdowns": [{"title": "D", "competition_id": 7.0}]}
        ]))
        .is_err());
        // one grouped item makes the whole list grouped
        assert!(parents_from_value(json!([
            {"title": "Saturday", "dropdowns": []},
            {"title": "loose dropdown"}
        ]))
        .is_err());
    }

    #[test]
    fn test_submitted_competition_ids_must_be_numeric() {
        use serde_json::json;

        assert!(parents_from_value(json!([{"title": "D", "competition_id": "abc"}])).is_err());
        assert!(parents_from_value(json!([{"title": "D", "competition_id": 7.5}])).is_err());

        let parents = parents_from_value(json!([
            {"title": "G", "dropdowns": [{"title": "D", "competition_id": " 12 "}, {"title": "E", "competition_id": ""}]}
        ]))
        .unwrap();
        assert_eq!(parents[0].dropdowns[0].competition_id, Some(12));
        assert_eq!(parents[0].dropdowns[1].competition_id, None);
    }

    #[test]
    fn test_stored_non_numeric_id_is_dropped() {
        let card = record(Some(r#"[{"title":"G","dropdowns":[{"title":"D","competition_id":"abc"}]}]"#), None)
            .normalize(&competitions());

        assert_eq!(card.parents[0].dropdowns[0].title, "D");
        assert_eq!(card.parents[0].dropdowns[0].competition_id, None);
    }

    #[test]
    fn test_draft_writes_nested_layout() {
        let draft = CarouselDraft {
            title: "t".to_string(),
            date: None,
            subtitle: None,
            description: None,
            parents: vec![StoredParent {
                title: "g".to_string(),
                dropdowns: vec![StoredDropdown {
                    title: "d".to_string(),
                    content: None,
                    competition_id: Some(3),
                }],
            }],
        };

        let json: serde_json::Value = serde_json::from_str(&draft.parents_json().unwrap()).unwrap();
        assert_eq!(json[0]["dropdowns"][0]["competition_id"], 3);
    }
}
