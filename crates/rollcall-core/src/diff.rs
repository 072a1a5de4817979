//! The diff & collect decision — where a correction-set entry is born.
//!
//! Comparison is exact string equality per field. An absent value is its own
//! state: if one side carries a value and the other carries none, that is a
//! discrepancy like any other.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::record::{MembershipFields, STATUS_ACTIVE};

/// The correction set, keyed by bare person id. Keyed, not sequenced — the
/// map order carries no meaning beyond making reports deterministic.
pub type CorrectionMap = BTreeMap<String, PersonUnitInfo>;

/// One record whose unit-side and person-side membership state disagree.
///
/// `status_tag_id`/`type_tag_id` are the ids of the *person's own* stale
/// taggings — those are what the correction pass deletes. The value fields
/// hold the authoritative unit-side state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PersonUnitInfo {
  pub person_id:         String,
  pub unit_name:         String,
  pub status_tag_id:     String,
  pub type_tag_id:       String,
  pub membership_status: String,
  pub membership_type:   String,
  pub inactive:          bool,
}

/// Compare unit-side membership state against the person's current taggings.
///
/// Returns `Some` only when the `(status, type)` pairs differ; agreement —
/// including agreement on absence — never produces an entry. The `inactive`
/// flag derives from the unit-side status alone.
pub fn compare(
  person_id: &str,
  unit_name: &str,
  unit: &MembershipFields,
  current: &MembershipFields,
) -> Option<PersonUnitInfo> {
  if unit.status_value == current.status_value && unit.type_value == current.type_value {
    return None;
  }

  Some(PersonUnitInfo {
    person_id:         person_id.to_string(),
    unit_name:         unit_name.to_string(),
    status_tag_id:     current.status_id.clone().unwrap_or_default(),
    type_tag_id:       current.type_id.clone().unwrap_or_default(),
    membership_status: unit.status_value.clone().unwrap_or_default(),
    membership_type:   unit.type_value.clone().unwrap_or_default(),
    inactive:          unit.status_value.as_deref() != Some(STATUS_ACTIVE),
  })
}
