//! Core types and trait definitions for the rollcall membership
//! reconciliation pipeline.
//!
//! This crate is deliberately free of HTTP and runtime dependencies. It holds
//! the wire-model types for the upstream hypermedia API, the pure
//! diff/collect logic, the filter-expression builder, report rendering, and
//! the trait seams (`CampaignApi`, `ItemSource`) that the client and pipeline
//! crates implement.

pub mod api;
pub mod diff;
pub mod filter;
pub mod record;
pub mod report;
pub mod source;

pub use api::CampaignApi;
pub use diff::{CorrectionMap, PersonUnitInfo};
pub use source::ItemSource;
