//! Wire-model types for the upstream hypermedia API.
//!
//! Resources arrive as OSDI-style JSON: compound identifiers
//! (`system:uuid`), `_links` relation maps for sub-resource discovery, and
//! `_embedded` collections inside paginated envelopes. These types decode
//! only the fields the pipeline reads; everything else is ignored.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ─── Field and relation names ────────────────────────────────────────────────

/// The connection type linking a person to their unit.
pub const CONNECTION_PEOPLE_UNITS: &str = "People + Units";
/// Tagging field carrying the membership status value.
pub const FIELD_MEMBERSHIP_STATUS: &str = "Membership Status";
/// Tagging field carrying the membership type value.
pub const FIELD_MEMBERSHIP_TYPE: &str = "Membership Type";
/// The one status value that marks a member as active.
pub const STATUS_ACTIVE: &str = "Active";
/// Membership type for which a missing unit-side status id is expected.
pub const TYPE_NON_MEMBER: &str = "Non-Member";
/// Placeholder when a record has no resolvable unit.
pub const UNKNOWN_UNIT: &str = "Unknown Unit";

/// `_links` relation from a person to their connections collection.
pub const REL_CONNECTIONS: &str = "action_builder:connections";
/// `_links` relation from a connection to the unit entity.
pub const REL_UNIT: &str = "osdi:person";
/// `_links` relation to a taggings collection.
pub const REL_TAGGINGS: &str = "osdi:taggings";

/// `_embedded` key for people collections.
pub const EMBED_PEOPLE: &str = "osdi:people";
/// `_embedded` key for connection collections.
pub const EMBED_CONNECTIONS: &str = "action_builder:connections";
/// `_embedded` key for tagging collections.
pub const EMBED_TAGGINGS: &str = "osdi:taggings";

// ─── Identifiers ─────────────────────────────────────────────────────────────

/// Extract the bare id from a compound identifier — the component after the
/// last `:`. An identifier with no separator is returned unchanged.
pub fn short_id(compound: &str) -> &str {
  compound.rsplit(':').next().unwrap_or(compound)
}

// ─── Hypermedia plumbing ─────────────────────────────────────────────────────

/// A single hypermedia link.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Link {
  pub href: String,
}

/// The `_links` relation map on a resource.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkSet(pub HashMap<String, Link>);

impl LinkSet {
  /// The href for a relation, if the resource exposes it.
  pub fn href(&self, rel: &str) -> Option<&str> {
    self.0.get(rel).map(|l| l.href.as_str())
  }
}

/// One page of a paginated collection response.
///
/// Items live under `_embedded.<collection-name>` and are decoded on demand;
/// pagination advances via `_links.next.href` or the `page`/`total_pages`
/// pair, depending on the endpoint.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PageEnvelope {
  #[serde(default)]
  pub total_pages: Option<u32>,
  #[serde(rename = "_embedded", default)]
  embedded:        HashMap<String, Vec<serde_json::Value>>,
  #[serde(rename = "_links", default)]
  pub links:       LinkSet,
}

impl PageEnvelope {
  /// Decode the embedded items of `collection`. Items that fail to decode
  /// are logged and skipped; a missing collection key yields an empty list.
  pub fn items<T: serde::de::DeserializeOwned>(&self, collection: &str) -> Vec<T> {
    let Some(raw) = self.embedded.get(collection) else {
      return Vec::new();
    };
    raw
      .iter()
      .filter_map(|value| match serde_json::from_value(value.clone()) {
        Ok(item) => Some(item),
        Err(e) => {
          tracing::warn!("undecodable item in {collection}: {e}");
          None
        }
      })
      .collect()
  }

  /// The cursor to the next page, if the collection has one.
  pub fn next_href(&self) -> Option<&str> {
    self.links.href("next")
  }
}

// ─── Resources ───────────────────────────────────────────────────────────────

/// A person record in the source campaign.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Person {
  #[serde(default)]
  pub identifiers:   Vec<String>,
  #[serde(default)]
  pub given_name:    Option<String>,
  #[serde(default)]
  pub family_name:   Option<String>,
  /// Link to the record in the upstream UI; carried through to logs so a
  /// human can inspect flagged records.
  #[serde(default)]
  pub browser_url:   Option<String>,
  #[serde(default)]
  pub modified_date: Option<DateTime<Utc>>,
  #[serde(rename = "_links", default)]
  pub links:         LinkSet,
}

impl Person {
  /// The bare id from the first compound identifier, if any.
  pub fn short_id(&self) -> Option<&str> {
    self.identifiers.first().map(|id| short_id(id))
  }
}

/// A typed relationship from a person to another entity.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Connection {
  #[serde(default)]
  pub connection_type: Option<String>,
  #[serde(default)]
  pub inactive:        Option<bool>,
  #[serde(rename = "_links", default)]
  pub links:           LinkSet,
}

impl Connection {
  pub fn is_people_units(&self) -> bool {
    self.connection_type.as_deref() == Some(CONNECTION_PEOPLE_UNITS)
  }
}

/// The organisational entity on the far side of a connection.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Unit {
  #[serde(rename = "action_builder:name", default)]
  pub name: Option<String>,
}

/// A field/value annotation on a person or connection.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Tagging {
  #[serde(default)]
  pub identifiers: Vec<String>,
  #[serde(rename = "action_builder:field", default)]
  pub field:       Option<String>,
  #[serde(rename = "action_builder:name", default)]
  pub name:        Option<String>,
}

impl Tagging {
  /// The short tag id derived from the first compound identifier.
  pub fn tag_id(&self) -> Option<&str> {
    self.identifiers.first().map(|id| short_id(id))
  }
}

/// Request body for creating or updating a tagging.
#[derive(Debug, Clone, Serialize)]
pub struct TaggingWrite {
  pub origin_system: String,
  #[serde(rename = "action_builder:section")]
  pub section:       String,
  #[serde(rename = "action_builder:field")]
  pub field:         String,
  #[serde(rename = "action_builder:field_type")]
  pub field_type:    String,
  pub name:          String,
}

impl TaggingWrite {
  /// A standard membership-section write for `field` = `value`.
  pub fn membership(field: &str, value: &str) -> Self {
    Self {
      origin_system: "rollcall".to_string(),
      section:       "Membership".to_string(),
      field:         field.to_string(),
      field_type:    "standard".to_string(),
      name:          value.to_string(),
    }
  }
}

// ─── Membership field extraction ─────────────────────────────────────────────

/// The membership status/type pair read from one side (unit connection or
/// the person's own taggings).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MembershipFields {
  pub status_value: Option<String>,
  pub status_id:    Option<String>,
  pub type_value:   Option<String>,
  pub type_id:      Option<String>,
}

impl MembershipFields {
  /// Scan a tagging list for the two membership fields. When a field occurs
  /// more than once the last occurrence wins.
  pub fn from_taggings(taggings: &[Tagging]) -> Self {
    let mut fields = Self::default();
    for tagging in taggings {
      match tagging.field.as_deref() {
        Some(FIELD_MEMBERSHIP_STATUS) => {
          fields.status_value = tagging.name.clone();
          fields.status_id = tagging.tag_id().map(str::to_string);
        }
        Some(FIELD_MEMBERSHIP_TYPE) => {
          fields.type_value = tagging.name.clone();
          fields.type_id = tagging.tag_id().map(str::to_string);
        }
        _ => {}
      }
    }
    fields
  }

  /// Whether both membership tag ids are present.
  pub fn has_ids(&self) -> bool {
    self.status_id.is_some() && self.type_id.is_some()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn tagging(field: &str, name: &str, id: &str) -> Tagging {
    Tagging {
      identifiers: vec![format!("action_builder:{id}")],
      field:       Some(field.to_string()),
      name:        Some(name.to_string()),
    }
  }

  #[test]
  fn short_id_takes_component_after_last_colon() {
    assert_eq!(short_id("action_builder:abc-123"), "abc-123");
    assert_eq!(short_id("a:b:c"), "c");
    assert_eq!(short_id("bare"), "bare");
  }

  #[test]
  fn person_short_id_uses_first_identifier() {
    let person = Person {
      identifiers: vec![
        "action_builder:1111".to_string(),
        "other:2222".to_string(),
      ],
      ..Person::default()
    };
    assert_eq!(person.short_id(), Some("1111"));
    assert_eq!(Person::default().short_id(), None);
  }

  #[test]
  fn membership_scan_picks_both_fields() {
    let fields = MembershipFields::from_taggings(&[
      tagging(FIELD_MEMBERSHIP_STATUS, "Active", "s1"),
      tagging("Steward", "Yes", "x1"),
      tagging(FIELD_MEMBERSHIP_TYPE, "Full", "t1"),
    ]);
    assert_eq!(fields.status_value.as_deref(), Some("Active"));
    assert_eq!(fields.status_id.as_deref(), Some("s1"));
    assert_eq!(fields.type_value.as_deref(), Some("Full"));
    assert_eq!(fields.type_id.as_deref(), Some("t1"));
    assert!(fields.has_ids());
  }

  #[test]
  fn membership_scan_last_occurrence_wins() {
    let fields = MembershipFields::from_taggings(&[
      tagging(FIELD_MEMBERSHIP_STATUS, "Lapsed", "s1"),
      tagging(FIELD_MEMBERSHIP_STATUS, "Active", "s2"),
    ]);
    assert_eq!(fields.status_value.as_deref(), Some("Active"));
    assert_eq!(fields.status_id.as_deref(), Some("s2"));
    assert!(!fields.has_ids());
  }

  #[test]
  fn membership_scan_empty_list_is_all_absent() {
    let fields = MembershipFields::from_taggings(&[]);
    assert_eq!(fields, MembershipFields::default());
  }

  #[test]
  fn page_envelope_decodes_embedded_items() {
    let json = serde_json::json!({
      "total_pages": 3,
      "_embedded": {
        "osdi:people": [
          { "identifiers": ["action_builder:p1"] },
          { "identifiers": ["action_builder:p2"] }
        ]
      },
      "_links": { "next": { "href": "https://x.test/people?page=2" } }
    });
    let envelope: PageEnvelope = serde_json::from_value(json).unwrap();
    let people: Vec<Person> = envelope.items(EMBED_PEOPLE);
    assert_eq!(people.len(), 2);
    assert_eq!(people[0].short_id(), Some("p1"));
    assert_eq!(envelope.total_pages, Some(3));
    assert_eq!(envelope.next_href(), Some("https://x.test/people?page=2"));
  }

  #[test]
  fn page_envelope_missing_collection_is_empty() {
    let envelope: PageEnvelope = serde_json::from_value(serde_json::json!({})).unwrap();
    let people: Vec<Person> = envelope.items(EMBED_PEOPLE);
    assert!(people.is_empty());
    assert_eq!(envelope.next_href(), None);
  }

  #[test]
  fn tagging_write_serialises_prefixed_fields() {
    let write = TaggingWrite::membership(FIELD_MEMBERSHIP_STATUS, "Active");
    let value = serde_json::to_value(&write).unwrap();
    assert_eq!(value["origin_system"], "rollcall");
    assert_eq!(value["action_builder:section"], "Membership");
    assert_eq!(value["action_builder:field"], "Membership Status");
    assert_eq!(value["action_builder:field_type"], "standard");
    assert_eq!(value["name"], "Active");
  }
}
