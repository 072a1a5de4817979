//! In-memory `CampaignApi` fake shared by the crate's tests.

use std::{
  collections::{HashMap, HashSet},
  sync::Mutex,
};

use rollcall_core::{
  CampaignApi,
  record::{
    CONNECTION_PEOPLE_UNITS, Connection, Link, LinkSet, Person,
    REL_TAGGINGS, REL_UNIT, Tagging, Unit,
  },
};
use thiserror::Error;

#[derive(Debug, Error)]
#[error("fake api: {0}")]
pub struct FakeError(pub String);

/// A scriptable in-memory campaign. Lookups are keyed by bare person id,
/// unit href, or taggings href; the `fail_*` sets force errors on specific
/// keys.
#[derive(Default)]
pub struct FakeApi {
  pub people:               HashMap<String, Person>,
  pub connections:          HashMap<String, Vec<Connection>>,
  pub units:                HashMap<String, Unit>,
  pub connection_taggings:  HashMap<String, Vec<Tagging>>,
  pub person_taggings:      HashMap<String, Vec<Tagging>>,
  pub fail_person_taggings: HashSet<String>,
  pub fail_unit_hrefs:      HashSet<String>,
  /// Tagging ids whose deletion reports "already gone".
  pub missing_taggings:     HashSet<String>,
  /// Tagging ids whose deletion errors out.
  pub fail_deletes:         HashSet<String>,
  /// Every `(person_id, tagging_id)` deletion attempted, in call order.
  pub deleted:              Mutex<Vec<(String, String)>>,
}

impl CampaignApi for FakeApi {
  type Error = FakeError;

  async fn person(&self, id: &str) -> Result<Option<Person>, FakeError> {
    Ok(self.people.get(id).cloned())
  }

  async fn connections(
    &self,
    person: &Person,
  ) -> Result<Vec<Connection>, FakeError> {
    let id = person.short_id().unwrap_or_default();
    Ok(self.connections.get(id).cloned().unwrap_or_default())
  }

  async fn unit(&self, connection: &Connection) -> Result<Option<Unit>, FakeError> {
    let Some(href) = connection.links.href(REL_UNIT) else {
      return Ok(None);
    };
    if self.fail_unit_hrefs.contains(href) {
      return Err(FakeError(format!("unit fetch failed: {href}")));
    }
    Ok(self.units.get(href).cloned())
  }

  async fn connection_taggings(
    &self,
    connection: &Connection,
  ) -> Result<Vec<Tagging>, FakeError> {
    let Some(href) = connection.links.href(REL_TAGGINGS) else {
      return Ok(Vec::new());
    };
    Ok(self.connection_taggings.get(href).cloned().unwrap_or_default())
  }

  async fn person_taggings(&self, id: &str) -> Result<Vec<Tagging>, FakeError> {
    if self.fail_person_taggings.contains(id) {
      return Err(FakeError(format!("taggings fetch failed: {id}")));
    }
    Ok(self.person_taggings.get(id).cloned().unwrap_or_default())
  }

  async fn delete_tagging(
    &self,
    person_id: &str,
    tagging_id: &str,
  ) -> Result<bool, FakeError> {
    self
      .deleted
      .lock()
      .unwrap()
      .push((person_id.to_string(), tagging_id.to_string()));
    if self.fail_deletes.contains(tagging_id) {
      Err(FakeError(format!("delete failed: {tagging_id}")))
    } else if self.missing_taggings.contains(tagging_id) {
      Ok(false)
    } else {
      Ok(true)
    }
  }
}

pub fn make_person(id: &str) -> Person {
  Person {
    identifiers: vec![format!("action_builder:{id}")],
    browser_url: Some(format!("https://x.test/people/{id}")),
    ..Person::default()
  }
}

pub fn make_connection(unit_href: &str, taggings_href: &str) -> Connection {
  let mut links = HashMap::new();
  links.insert(REL_UNIT.to_string(), Link { href: unit_href.to_string() });
  links.insert(
    REL_TAGGINGS.to_string(),
    Link { href: taggings_href.to_string() },
  );
  Connection {
    connection_type: Some(CONNECTION_PEOPLE_UNITS.to_string()),
    inactive:        Some(false),
    links:           LinkSet(links),
  }
}

pub fn other_connection() -> Connection {
  Connection {
    connection_type: Some("People + Groups".to_string()),
    ..Connection::default()
  }
}

pub fn make_unit(name: &str) -> Unit {
  Unit { name: Some(name.to_string()) }
}

pub fn make_tagging(field: &str, name: &str, id: &str) -> Tagging {
  Tagging {
    identifiers: vec![format!("action_builder:{id}")],
    field:       Some(field.to_string()),
    name:        Some(name.to_string()),
  }
}
