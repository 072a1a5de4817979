//! CSV rendering of the correction map.
//!
//! The report deliberately narrows the correction record: inactive entries
//! are dropped, and only `person_id`, `unit_name`, and `membership_type`
//! survive as columns — tag ids and the status value are working data, not
//! report material.

use crate::diff::CorrectionMap;

/// Column header, in declaration order of the surviving fields.
const HEADER: &str = "person_id,unit_name,membership_type";

/// Render the active entries of `map` as CSV.
///
/// Returns the CSV text and the data-row count. An empty map, or a map whose
/// entries are all inactive, yields `("", 0)` — the empty report is a
/// distinct signal, not a header-only file.
pub fn render_csv(map: &CorrectionMap) -> (String, usize) {
  let rows: Vec<String> = map
    .values()
    .filter(|info| !info.inactive)
    .map(|info| {
      format!(
        "{},{},{}",
        escape(&info.person_id),
        escape(&info.unit_name),
        escape(&info.membership_type),
      )
    })
    .collect();

  if rows.is_empty() {
    return (String::new(), 0);
  }

  let count = rows.len();
  let mut out = String::with_capacity(HEADER.len() + 1 + rows.iter().map(|r| r.len() + 1).sum::<usize>());
  out.push_str(HEADER);
  out.push('\n');
  for row in rows {
    out.push_str(&row);
    out.push('\n');
  }
  (out, count)
}

/// Quote a field when it contains a comma, quote, or newline.
fn escape(field: &str) -> String {
  if field.contains([',', '"', '\n']) {
    format!("\"{}\"", field.replace('"', "\"\""))
  } else {
    field.to_string()
  }
}
