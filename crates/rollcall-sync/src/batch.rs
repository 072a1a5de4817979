//! Bounded-parallel batch execution.
//!
//! [`BatchRunner`] drains an [`ItemSource`] into fixed-size batches and runs
//! a worker future per batch on the runtime's thread pool, with at most
//! `workers` batches in flight at once. Items inside a batch are handled
//! sequentially by the worker; batches never overlap in membership. Results
//! carry each item's source index so callers can reassociate them; the fold
//! itself is order-insensitive.

use std::{future::Future, mem};

use rollcall_core::ItemSource;
use tokio::task::{JoinError, JoinSet};

#[derive(Debug, Clone)]
pub struct BatchRunner {
  workers:    usize,
  batch_size: usize,
}

impl BatchRunner {
  /// Both knobs are clamped to at least 1.
  pub fn new(workers: usize, batch_size: usize) -> Self {
    Self {
      workers:    workers.max(1),
      batch_size: batch_size.max(1),
    }
  }

  /// Drain `source` through `worker`, one spawned task per batch.
  ///
  /// Each batch is a `Vec` of `(source index, item)` pairs; the worker
  /// returns per-item `(index, Option<O>)` outcomes. A worker that panics
  /// loses its batch's outcomes — the failure is logged and the run
  /// continues.
  pub async fn run<S, O, F, Fut>(
    &self,
    mut source: S,
    worker: F,
  ) -> Vec<(usize, Option<O>)>
  where
    S: ItemSource,
    S::Item: 'static,
    O: Send + 'static,
    F: Fn(Vec<(usize, S::Item)>) -> Fut,
    Fut: Future<Output = Vec<(usize, Option<O>)>> + Send + 'static,
  {
    let mut tasks: JoinSet<Vec<(usize, Option<O>)>> = JoinSet::new();
    let mut results = Vec::new();
    let mut batch = Vec::with_capacity(self.batch_size);
    let mut index = 0usize;

    while let Some(item) = source.next_item().await {
      batch.push((index, item));
      index += 1;
      if batch.len() >= self.batch_size {
        admit(&mut tasks, &mut results, self.workers).await;
        tasks.spawn(worker(mem::take(&mut batch)));
      }
    }
    if !batch.is_empty() {
      admit(&mut tasks, &mut results, self.workers).await;
      tasks.spawn(worker(batch));
    }

    while let Some(joined) = tasks.join_next().await {
      fold(&mut results, joined);
    }
    results
  }
}

/// Wait until fewer than `limit` tasks are in flight.
async fn admit<O>(
  tasks: &mut JoinSet<Vec<(usize, Option<O>)>>,
  results: &mut Vec<(usize, Option<O>)>,
  limit: usize,
) where
  O: Send + 'static,
{
  while tasks.len() >= limit {
    if let Some(joined) = tasks.join_next().await {
      fold(results, joined);
    }
  }
}

fn fold<O>(
  results: &mut Vec<(usize, Option<O>)>,
  joined: Result<Vec<(usize, Option<O>)>, JoinError>,
) {
  match joined {
    Ok(mut outcomes) => results.append(&mut outcomes),
    Err(error) => {
      tracing::warn!("batch worker failed, dropping its outcomes: {error}");
    }
  }
}
