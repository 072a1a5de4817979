//! Per-record resolution: from a changed person record to an optional
//! correction entry.
//!
//! Every remote failure along the way is contained to the record at hand:
//! the step logs what it could not do and the record resolves to `None` (or
//! degrades to a placeholder, for the unit name). One bad record never stops
//! the run.

use rollcall_core::{
  CampaignApi, PersonUnitInfo, diff,
  record::{MembershipFields, Person, TYPE_NON_MEMBER, UNKNOWN_UNIT},
};

/// Resolve one changed record to a correction entry, or `None` when the
/// record's unit-side and person-side state agree (or the record cannot be
/// resolved at all).
pub async fn resolve_record<A: CampaignApi>(
  api: &A,
  record: &Person,
) -> Option<PersonUnitInfo> {
  let Some(person_id) = record.short_id().map(str::to_string) else {
    tracing::warn!("record carries no identifier, skipping");
    return None;
  };

  let person = match api.person(&person_id).await {
    Ok(Some(person)) => person,
    Ok(None) => {
      tracing::warn!("person {person_id} not found, skipping");
      return None;
    }
    Err(error) => {
      tracing::warn!("person {person_id} fetch failed, skipping: {error}");
      return None;
    }
  };
  let browser_url = person
    .browser_url
    .clone()
    .unwrap_or_else(|| "no browser URL".to_string());

  let connections = match api.connections(&person).await {
    Ok(connections) => connections,
    Err(error) => {
      tracing::warn!("connections fetch failed for {person_id}: {error}");
      Vec::new()
    }
  };
  if connections.is_empty() {
    tracing::warn!("no connections for person {person_id} ({browser_url})");
    return None;
  }

  let connection = connections.iter().find(|c| c.is_people_units());

  let unit_name = match connection {
    Some(connection) => match api.unit(connection).await {
      Ok(Some(unit)) => unit.name.unwrap_or_else(|| UNKNOWN_UNIT.to_string()),
      Ok(None) => UNKNOWN_UNIT.to_string(),
      Err(error) => {
        tracing::warn!("unit fetch failed for {person_id}: {error}");
        UNKNOWN_UNIT.to_string()
      }
    },
    None => UNKNOWN_UNIT.to_string(),
  };

  let unit_taggings = match connection {
    Some(connection) => match api.connection_taggings(connection).await {
      Ok(taggings) => taggings,
      Err(error) => {
        tracing::warn!("unit taggings fetch failed for {person_id}: {error}");
        Vec::new()
      }
    },
    None => Vec::new(),
  };
  let unit = MembershipFields::from_taggings(&unit_taggings);

  // Observational only: these records are still compared, and a mismatch
  // still produces an entry — the deletions that follow target the person's
  // own tag ids, not the unit-side ids this log is about.
  if unit.type_value.as_deref() == Some(TYPE_NON_MEMBER) && unit.status_id.is_none() {
    tracing::info!(
      "non-member without unit status: {person_id}, {unit_name} ({browser_url})"
    );
  } else if !unit.has_ids() {
    tracing::warn!(
      "unit membership ids incomplete: {person_id}, {unit_name}, \
       status={:?} type={:?} ({browser_url})",
      unit.status_value,
      unit.type_value,
    );
  }

  let current_taggings = match api.person_taggings(&person_id).await {
    Ok(taggings) => taggings,
    Err(error) => {
      tracing::warn!(
        "current taggings fetch failed for {person_id}, skipping: {error}"
      );
      return None;
    }
  };
  let current = MembershipFields::from_taggings(&current_taggings);

  tracing::debug!(
    "comparing {unit_name}: unit {:?}/{:?} vs person {:?}/{:?} ({browser_url})",
    unit.status_value,
    unit.type_value,
    current.status_value,
    current.type_value,
  );

  diff::compare(&person_id, &unit_name, &unit, &current)
}
