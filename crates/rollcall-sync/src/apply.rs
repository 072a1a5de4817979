//! Applying corrections: deleting the person-side stale membership tags.

use std::sync::Arc;

use rollcall_core::{CampaignApi, CorrectionMap, source::IterSource};

use crate::batch::BatchRunner;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeletionStats {
  pub attempted: usize,
  pub deleted:   usize,
}

/// Delete every stale tag recorded in `map`, at most `workers` deletions in
/// flight at once. Entries with an empty tag id field contribute no deletion
/// for that field. A deletion that fails (after the client's retries) is
/// logged and skipped; it never aborts the pass.
pub async fn delete_stale_tags<A>(
  api: Arc<A>,
  map: &CorrectionMap,
  workers: usize,
) -> DeletionStats
where
  A: CampaignApi + 'static,
{
  let mut stale: Vec<(String, String, &'static str)> = Vec::new();
  for (person_id, info) in map {
    if !info.status_tag_id.is_empty() {
      stale.push((person_id.clone(), info.status_tag_id.clone(), "status"));
    }
    if !info.type_tag_id.is_empty() {
      stale.push((person_id.clone(), info.type_tag_id.clone(), "type"));
    }
  }
  if stale.is_empty() {
    tracing::info!("no stale tags to delete");
    return DeletionStats::default();
  }

  let attempted = stale.len();
  tracing::info!("deleting {attempted} stale tags across {workers} workers");

  // Deletions are independent of one another, so each batch is one deletion.
  let runner = BatchRunner::new(workers, 1);
  let results = runner
    .run(IterSource::new(stale.into_iter()), move |batch| {
      let api = api.clone();
      async move {
        let mut outcomes = Vec::with_capacity(batch.len());
        for (index, (person_id, tag_id, kind)) in batch {
          let outcome = match api.delete_tagging(&person_id, &tag_id).await {
            // "Already gone" counts as done.
            Ok(_) => Some(()),
            Err(error) => {
              tracing::warn!(
                "failed to delete {kind} tag {tag_id} for {person_id}: {error}"
              );
              None
            }
          };
          outcomes.push((index, outcome));
        }
        outcomes
      }
    })
    .await;

  let deleted = results.iter().filter(|(_, outcome)| outcome.is_some()).count();
  tracing::info!("deleted {deleted}/{attempted} stale tags");
  DeletionStats { attempted, deleted }
}
