use thiserror::Error;

/// Failures that abort a sync run.
///
/// Per-record resolution and per-tag deletion failures are absorbed along
/// the way; the only fatal outcome left is failing to deliver the report.
#[derive(Debug, Error)]
pub enum SyncError {
  #[error("report delivery failed: {0}")]
  Delivery(#[source] Box<dyn std::error::Error + Send + Sync>),
}
