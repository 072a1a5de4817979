//! The `CampaignApi` trait — the seam between the pipeline and the remote
//! service.
//!
//! The trait is implemented by the HTTP client (`rollcall-client`) and by
//! in-memory fakes in tests. Higher layers depend on this abstraction, not
//! on any concrete transport.

use std::future::Future;

use crate::record::{Connection, Person, Tagging, Unit};

/// Read and mutate operations against one campaign of the remote service.
///
/// All methods return `Send` futures so the trait can be used from tasks on
/// a multi-threaded runtime. Implementations own their retry and pacing
/// policy; callers treat every error as "no data for this branch".
pub trait CampaignApi: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Fetch the full person resource by bare id. `None` when absent.
  fn person<'a>(
    &'a self,
    id: &'a str,
  ) -> impl Future<Output = Result<Option<Person>, Self::Error>> + Send + 'a;

  /// All connections for a person, pagination followed to the end. A person
  /// exposing no connections link yields an empty list.
  fn connections<'a>(
    &'a self,
    person: &'a Person,
  ) -> impl Future<Output = Result<Vec<Connection>, Self::Error>> + Send + 'a;

  /// The unit entity linked from a connection, if the link exists.
  fn unit<'a>(
    &'a self,
    connection: &'a Connection,
  ) -> impl Future<Output = Result<Option<Unit>, Self::Error>> + Send + 'a;

  /// All taggings attached to a connection, pagination followed to the end.
  fn connection_taggings<'a>(
    &'a self,
    connection: &'a Connection,
  ) -> impl Future<Output = Result<Vec<Tagging>, Self::Error>> + Send + 'a;

  /// The person's own current taggings, pagination followed to the end.
  fn person_taggings<'a>(
    &'a self,
    id: &'a str,
  ) -> impl Future<Output = Result<Vec<Tagging>, Self::Error>> + Send + 'a;

  /// Delete one tagging from a person. `Ok(true)` when the remote deleted
  /// it, `Ok(false)` when it was already absent (both count as done);
  /// `Err` only after the implementation's retries are exhausted.
  fn delete_tagging<'a>(
    &'a self,
    person_id: &'a str,
    tagging_id: &'a str,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + 'a;
}
