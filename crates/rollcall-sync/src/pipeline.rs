//! The end-to-end sync run.
//!
//! A run moves through four stages: resolve every changed record into the
//! correction map, delete the stale person-side tags, render the CSV report,
//! and deliver exactly one notification — with data, or the
//! nothing-to-report variant. Per-record and per-tag failures are absorbed
//! upstream; only a delivery failure aborts the run.

use std::{
  future::Future,
  sync::{
    Arc,
    atomic::{AtomicUsize, Ordering},
  },
};

use rollcall_client::RetryPolicy;
use rollcall_core::{
  CampaignApi, CorrectionMap, ItemSource, record::Person, report,
};

use crate::{
  apply::{self, DeletionStats},
  batch::BatchRunner,
  error::SyncError,
  resolve::resolve_record,
};

/// Where the rendered report goes. Implementations deliver one notification
/// per call; `csv` is `None` for the nothing-to-report variant.
pub trait ReportSink: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  fn deliver<'a>(
    &'a self,
    subject: &'a str,
    body: &'a str,
    csv: Option<&'a str>,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'a;
}

#[derive(Debug, Clone)]
pub struct SyncOptions {
  pub workers:        usize,
  pub batch_size:     usize,
  /// Leads every report subject line.
  pub subject_prefix: String,
}

impl Default for SyncOptions {
  fn default() -> Self {
    Self {
      workers:        4,
      batch_size:     10,
      subject_prefix: "Membership sync".to_string(),
    }
  }
}

/// Counters summarising one completed run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncOutcome {
  pub processed:           usize,
  pub corrections:         usize,
  pub deletions_attempted: usize,
  pub deletions_succeeded: usize,
  pub report_rows:         usize,
}

/// Resolve a stream of changed records into the correction map.
///
/// Records are drained lazily into batches and resolved with bounded
/// parallelism. Returns the map and the number of records that completed
/// resolution.
pub async fn build_correction_map<A, Src>(
  api: Arc<A>,
  records: Src,
  options: &SyncOptions,
) -> (CorrectionMap, usize)
where
  A: CampaignApi + 'static,
  Src: ItemSource<Item = Person>,
{
  let progress = Arc::new(AtomicUsize::new(0));
  let runner = BatchRunner::new(options.workers, options.batch_size);
  let worker_progress = progress.clone();

  let results = runner
    .run(records, move |batch| {
      let api = api.clone();
      let progress = worker_progress.clone();
      async move {
        let mut outcomes = Vec::with_capacity(batch.len());
        for (index, record) in batch {
          let resolved = resolve_record(api.as_ref(), &record).await;
          let done = progress.fetch_add(1, Ordering::SeqCst) + 1;
          if done % 50 == 0 {
            tracing::info!("processed {done} records");
          }
          outcomes.push((index, resolved));
        }
        outcomes
      }
    })
    .await;

  let processed = results.len();
  let mut map = CorrectionMap::new();
  for (_, resolved) in results {
    if let Some(info) = resolved {
      map.insert(info.person_id.clone(), info);
    }
  }
  (map, processed)
}

/// Run the whole pipeline against a stream of changed records.
pub async fn run_sync<A, Src, Sink>(
  api: Arc<A>,
  records: Src,
  sink: &Sink,
  options: &SyncOptions,
) -> Result<SyncOutcome, SyncError>
where
  A: CampaignApi + 'static,
  Src: ItemSource<Item = Person>,
  Sink: ReportSink,
{
  tracing::info!("resolving changed records");
  let (map, processed) = build_correction_map(api.clone(), records, options).await;
  tracing::info!(
    "{processed} records processed, {} with membership differences",
    map.len()
  );

  let stats = if map.is_empty() {
    DeletionStats::default()
  } else {
    apply::delete_stale_tags(api, &map, options.workers).await
  };

  let (csv, rows) = report::render_csv(&map);
  let retry = RetryPolicy::delivery();
  if rows > 0 {
    let subject = format!("{} ran, {rows} rows attached", options.subject_prefix);
    retry
      .run(|| {
        sink.deliver(
          &subject,
          "Attached is the membership correction report.",
          Some(&csv),
        )
      })
      .await
      .map_err(|e| SyncError::Delivery(Box::new(e)))?;
    tracing::info!("report delivered with {rows} rows");
  } else {
    let subject = format!("{} ran, no entries synced", options.subject_prefix);
    retry
      .run(|| sink.deliver(&subject, "No data to send.", None))
      .await
      .map_err(|e| SyncError::Delivery(Box::new(e)))?;
    tracing::info!("nothing to report");
  }

  Ok(SyncOutcome {
    processed,
    corrections: map.len(),
    deletions_attempted: stats.attempted,
    deletions_succeeded: stats.deleted,
    report_rows: rows,
  })
}

#[cfg(test)]
mod tests {
  use std::sync::Mutex;

  use rollcall_core::{
    record::{FIELD_MEMBERSHIP_STATUS, FIELD_MEMBERSHIP_TYPE},
    source::IterSource,
  };

  use super::*;
  use crate::testutil::{
    FakeApi, make_connection, make_person, make_tagging, make_unit,
  };

  #[derive(Default)]
  struct CollectSink {
    fail:       bool,
    attempts:   AtomicUsize,
    deliveries: Mutex<Vec<(String, Option<String>)>>,
  }

  impl ReportSink for CollectSink {
    type Error = std::io::Error;

    async fn deliver(
      &self,
      subject: &str,
      _body: &str,
      csv: Option<&str>,
    ) -> Result<(), std::io::Error> {
      self.attempts.fetch_add(1, Ordering::SeqCst);
      if self.fail {
        return Err(std::io::Error::other("smtp down"));
      }
      self
        .deliveries
        .lock()
        .unwrap()
        .push((subject.to_string(), csv.map(str::to_string)));
      Ok(())
    }
  }

  /// One person whose unit says Active/Member but whose own tags say
  /// Inactive/Associate; one person in agreement.
  fn campaign() -> FakeApi {
    let mut api = FakeApi::default();
    for id in ["p1", "p2"] {
      api.people.insert(id.to_string(), make_person(id));
      api.connections.insert(
        id.to_string(),
        vec![make_connection("u1", &format!("ct-{id}"))],
      );
      api.connection_taggings.insert(format!("ct-{id}"), vec![
        make_tagging(FIELD_MEMBERSHIP_STATUS, "Active", "us1"),
        make_tagging(FIELD_MEMBERSHIP_TYPE, "Member", "ut1"),
      ]);
    }
    api.units.insert("u1".to_string(), make_unit("Local 9"));
    api.person_taggings.insert("p1".to_string(), vec![
      make_tagging(FIELD_MEMBERSHIP_STATUS, "Inactive", "ps1"),
      make_tagging(FIELD_MEMBERSHIP_TYPE, "Associate", "pt1"),
    ]);
    api.person_taggings.insert("p2".to_string(), vec![
      make_tagging(FIELD_MEMBERSHIP_STATUS, "Active", "ps2"),
      make_tagging(FIELD_MEMBERSHIP_TYPE, "Member", "pt2"),
    ]);
    api
  }

  #[tokio::test]
  async fn mismatches_flow_through_deletion_and_report() {
    let api = Arc::new(campaign());
    let sink = CollectSink::default();
    let records = IterSource::new(
      vec![make_person("p1"), make_person("p2")].into_iter(),
    );

    let outcome =
      run_sync(api.clone(), records, &sink, &SyncOptions::default())
        .await
        .unwrap();

    assert_eq!(outcome, SyncOutcome {
      processed:           2,
      corrections:         1,
      deletions_attempted: 2,
      deletions_succeeded: 2,
      report_rows:         1,
    });

    let mut deleted = api.deleted.lock().unwrap().clone();
    deleted.sort();
    assert_eq!(deleted, vec![
      ("p1".to_string(), "ps1".to_string()),
      ("p1".to_string(), "pt1".to_string()),
    ]);

    let deliveries = sink.deliveries.lock().unwrap();
    assert_eq!(deliveries.len(), 1);
    let (subject, csv) = &deliveries[0];
    assert_eq!(subject, "Membership sync ran, 1 rows attached");
    let csv = csv.as_deref().unwrap();
    assert!(csv.starts_with("person_id,unit_name,membership_type\n"));
    assert!(csv.contains("p1,Local 9,Member"));
  }

  #[tokio::test]
  async fn empty_stream_still_delivers_one_notification() {
    let api = Arc::new(FakeApi::default());
    let sink = CollectSink::default();
    let records = IterSource::new(Vec::<Person>::new().into_iter());

    let outcome = run_sync(api.clone(), records, &sink, &SyncOptions::default())
      .await
      .unwrap();

    assert_eq!(outcome, SyncOutcome::default());
    assert!(api.deleted.lock().unwrap().is_empty());

    let deliveries = sink.deliveries.lock().unwrap();
    assert_eq!(deliveries.len(), 1);
    assert_eq!(deliveries[0].0, "Membership sync ran, no entries synced");
    assert_eq!(deliveries[0].1, None);
  }

  #[tokio::test]
  async fn inactive_corrections_delete_tags_but_report_nothing() {
    let mut api = campaign();
    // Unit says Lapsed: a discrepancy, but an inactive one.
    api.connection_taggings.insert("ct-p1".to_string(), vec![
      make_tagging(FIELD_MEMBERSHIP_STATUS, "Lapsed", "us1"),
      make_tagging(FIELD_MEMBERSHIP_TYPE, "Member", "ut1"),
    ]);
    let api = Arc::new(api);
    let sink = CollectSink::default();
    let records = IterSource::new(vec![make_person("p1")].into_iter());

    let outcome = run_sync(api.clone(), records, &sink, &SyncOptions::default())
      .await
      .unwrap();

    assert_eq!(outcome.corrections, 1);
    assert_eq!(outcome.deletions_attempted, 2);
    assert_eq!(outcome.report_rows, 0);
    assert_eq!(api.deleted.lock().unwrap().len(), 2);

    let deliveries = sink.deliveries.lock().unwrap();
    assert_eq!(deliveries[0].0, "Membership sync ran, no entries synced");
  }

  #[tokio::test(start_paused = true)]
  async fn delivery_failure_is_fatal_after_retries() {
    let api = Arc::new(FakeApi::default());
    let sink = CollectSink { fail: true, ..CollectSink::default() };
    let records = IterSource::new(Vec::<Person>::new().into_iter());

    let result =
      run_sync(api, records, &sink, &SyncOptions::default()).await;
    assert!(matches!(result, Err(SyncError::Delivery(_))));
    assert_eq!(sink.attempts.load(Ordering::SeqCst), 3);
  }
}
