//! The membership reconciliation pipeline.
//!
//! Wires the `CampaignApi` seam into a full run: bounded-parallel batch
//! resolution of changed records ([`batch`], [`resolve`]), stale-tag
//! deletion ([`apply`]), and report rendering and delivery ([`pipeline`]).

pub mod apply;
pub mod batch;
pub mod error;
pub mod pipeline;
pub mod resolve;

#[cfg(test)]
pub(crate) mod testutil;

pub use crate::{
  apply::{DeletionStats, delete_stale_tags},
  batch::BatchRunner,
  error::SyncError,
  pipeline::{
    ReportSink, SyncOptions, SyncOutcome, build_correction_map, run_sync,
  },
  resolve::resolve_record,
};
