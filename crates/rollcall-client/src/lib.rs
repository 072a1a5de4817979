//! Async HTTP client for the campaign hypermedia API.
//!
//! [`ApiClient`] implements the `CampaignApi` seam over the upstream REST
//! service: token-authenticated JSON requests, bounded retries on transient
//! failures, a short pacing pause after every call to stay under the remote
//! rate limit, and lazy pagination for collection endpoints.

pub mod error;
pub mod pages;
pub mod retry;

use std::{marker::PhantomData, sync::Arc, time::Duration};

use reqwest::{StatusCode, header::CONTENT_TYPE};
use rollcall_core::{
  CampaignApi,
  filter::SearchCriteria,
  record::{
    Connection, EMBED_CONNECTIONS, EMBED_PEOPLE, EMBED_TAGGINGS,
    FIELD_MEMBERSHIP_STATUS, FIELD_MEMBERSHIP_TYPE, MembershipFields,
    PageEnvelope, Person, REL_CONNECTIONS, REL_TAGGINGS, REL_UNIT, Tagging,
    TaggingWrite, Unit,
  },
};
use serde::de::DeserializeOwned;

pub use crate::{
  error::{Error, Result},
  pages::{Page, PageFetcher, Paginated},
  retry::RetryPolicy,
};

/// Authentication header used by the upstream service.
const TOKEN_HEADER: &str = "OSDI-API-Token";

// ─── Configuration ───────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct ApiConfig {
  /// Base URL of the tenant, e.g. `https://myorg.actionbuilder.org`.
  pub base_url:        String,
  pub campaign_id:     String,
  pub api_token:       String,
  /// Pause inserted after every remote call.
  pub pace_delay:      Duration,
  pub request_timeout: Duration,
}

impl ApiConfig {
  pub fn new(
    base_url: impl Into<String>,
    campaign_id: impl Into<String>,
    api_token: impl Into<String>,
  ) -> Self {
    Self {
      base_url:        base_url.into(),
      campaign_id:     campaign_id.into(),
      api_token:       api_token.into(),
      pace_delay:      Duration::from_millis(200),
      request_timeout: Duration::from_secs(30),
    }
  }
}

// ─── Client ──────────────────────────────────────────────────────────────────

#[derive(Clone)]
pub struct ApiClient {
  http:   reqwest::Client,
  config: Arc<ApiConfig>,
  retry:  RetryPolicy,
}

impl ApiClient {
  pub fn new(config: ApiConfig) -> Result<Self> {
    let http = reqwest::Client::builder()
      .timeout(config.request_timeout)
      .build()?;
    Ok(Self {
      http,
      config: Arc::new(config),
      retry: RetryPolicy::requests(),
    })
  }

  fn campaign_url(&self, path: &str) -> String {
    format!(
      "{}/api/rest/v1/campaigns/{}{path}",
      self.config.base_url.trim_end_matches('/'),
      self.config.campaign_id
    )
  }

  fn people_url(&self) -> String {
    self.campaign_url("/people")
  }

  fn person_url(&self, id: &str) -> String {
    self.campaign_url(&format!("/people/{id}"))
  }

  fn person_taggings_url(&self, person_id: &str) -> String {
    self.campaign_url(&format!("/people/{person_id}/taggings"))
  }

  fn tagging_url(&self, person_id: &str, tagging_id: &str) -> String {
    self.campaign_url(&format!("/people/{person_id}/taggings/{tagging_id}"))
  }

  async fn pace(&self) {
    if !self.config.pace_delay.is_zero() {
      tokio::time::sleep(self.config.pace_delay).await;
    }
  }

  async fn fetch_once(
    &self,
    url: &str,
    query: &[(&str, String)],
  ) -> Result<serde_json::Value> {
    let response = self
      .http
      .get(url)
      .query(query)
      .header(TOKEN_HEADER, &self.config.api_token)
      .header(CONTENT_TYPE, "application/json")
      .send()
      .await?;
    let status = response.status();
    if !status.is_success() {
      return Err(Error::Status { status, url: url.to_string() });
    }
    let body = response.text().await?;
    serde_json::from_str(&body)
      .map_err(|source| Error::Decode { url: url.to_string(), source })
  }

  /// GET `url` as JSON, with retries on transient failures and the pacing
  /// pause applied afterwards.
  async fn get_json(
    &self,
    url: &str,
    query: &[(&str, String)],
  ) -> Result<serde_json::Value> {
    let value = self
      .retry
      .run_if(|| self.fetch_once(url, query), Error::is_retryable)
      .await?;
    self.pace().await;
    Ok(value)
  }

  pub(crate) async fn get_resource<T: DeserializeOwned>(
    &self,
    url: &str,
    query: &[(&str, String)],
  ) -> Result<T> {
    let value = self.get_json(url, query).await?;
    serde_json::from_value(value)
      .map_err(|source| Error::Decode { url: url.to_string(), source })
  }

  /// Fetch every item of a linked collection, following `_links.next` until
  /// it runs out. A page that still fails after retries ends the walk with
  /// whatever was collected so far.
  async fn fetch_linked<T: DeserializeOwned>(
    &self,
    first: Option<&str>,
    collection: &str,
  ) -> Vec<T> {
    let Some(mut url) = first.map(str::to_string) else {
      return Vec::new();
    };
    let mut items = Vec::new();
    loop {
      let envelope: PageEnvelope = match self.get_resource(&url, &[]).await {
        Ok(envelope) => envelope,
        Err(error) => {
          tracing::warn!(
            "fetch of {collection} page failed, keeping {} items: {error}",
            items.len()
          );
          break;
        }
      };
      items.extend(envelope.items::<T>(collection));
      match envelope.next_href() {
        Some(next) => url = next.to_string(),
        None => break,
      }
    }
    items
  }

  /// Drain a page-numbered collection endpoint eagerly.
  async fn fetch_paged<T: DeserializeOwned + Send>(
    &self,
    url: String,
    collection: &'static str,
    per_page: u32,
  ) -> Vec<T> {
    let mut stream = Paginated::new(CollectionPages {
      client: self.clone(),
      url,
      collection,
      per_page,
      filter: None,
      _marker: PhantomData,
    });
    let mut items = Vec::new();
    while let Some(item) = stream.next().await {
      items.push(item);
    }
    items
  }

  /// Lazy stream of people matching `criteria`, most useful with a
  /// modified-date window to pick up recently changed records.
  pub fn search_people(
    &self,
    criteria: &SearchCriteria,
    per_page: u32,
  ) -> Paginated<Person, CollectionPages<Person>> {
    Paginated::new(CollectionPages {
      client:     self.clone(),
      url:        self.people_url(),
      collection: EMBED_PEOPLE,
      per_page,
      filter:     criteria.build(),
      _marker:    PhantomData,
    })
  }

  async fn delete_once(&self, url: &str) -> Result<bool> {
    let response = self
      .http
      .delete(url)
      .header(TOKEN_HEADER, &self.config.api_token)
      .send()
      .await?;
    delete_outcome(response.status(), url)
  }

  async fn post_json(
    &self,
    url: &str,
    body: &TaggingWrite,
  ) -> Result<serde_json::Value> {
    let send = || async {
      let response = self
        .http
        .post(url)
        .header(TOKEN_HEADER, &self.config.api_token)
        .json(body)
        .send()
        .await?;
      let status = response.status();
      if !status.is_success() {
        return Err(Error::Status { status, url: url.to_string() });
      }
      let text = response.text().await?;
      serde_json::from_str(&text)
        .map_err(|source| Error::Decode { url: url.to_string(), source })
    };
    let value = self.retry.run_if(send, Error::is_retryable).await?;
    self.pace().await;
    Ok(value)
  }

  /// Create a tagging (`existing_id` = `None`) or replace an existing one.
  /// The upstream service treats a POST to an existing tagging resource as
  /// an update.
  pub async fn write_tagging(
    &self,
    person_id: &str,
    existing_id: Option<&str>,
    write: &TaggingWrite,
  ) -> Result<serde_json::Value> {
    let url = match existing_id {
      Some(tagging_id) => self.tagging_url(person_id, tagging_id),
      None => self.person_taggings_url(person_id),
    };
    self.post_json(&url, write).await
  }

  /// Write both membership fields for a person, updating in place where
  /// `current` carries a tag id and creating otherwise.
  pub async fn write_membership(
    &self,
    person_id: &str,
    status: &str,
    membership_type: &str,
    current: &MembershipFields,
  ) -> Result<()> {
    self
      .write_tagging(
        person_id,
        current.status_id.as_deref(),
        &TaggingWrite::membership(FIELD_MEMBERSHIP_STATUS, status),
      )
      .await?;
    self
      .write_tagging(
        person_id,
        current.type_id.as_deref(),
        &TaggingWrite::membership(FIELD_MEMBERSHIP_TYPE, membership_type),
      )
      .await?;
    Ok(())
  }
}

impl CampaignApi for ApiClient {
  type Error = Error;

  async fn person(&self, id: &str) -> Result<Option<Person>> {
    match self.get_resource(&self.person_url(id), &[]).await {
      Ok(person) => Ok(Some(person)),
      Err(error) if error.status() == Some(StatusCode::NOT_FOUND) => Ok(None),
      Err(error) => Err(error),
    }
  }

  async fn connections(&self, person: &Person) -> Result<Vec<Connection>> {
    let first = person.links.href(REL_CONNECTIONS);
    Ok(self.fetch_linked(first, EMBED_CONNECTIONS).await)
  }

  async fn unit(&self, connection: &Connection) -> Result<Option<Unit>> {
    let Some(url) = connection.links.href(REL_UNIT) else {
      return Ok(None);
    };
    match self.get_resource(url, &[]).await {
      Ok(unit) => Ok(Some(unit)),
      Err(error) if error.status() == Some(StatusCode::NOT_FOUND) => Ok(None),
      Err(error) => Err(error),
    }
  }

  async fn connection_taggings(
    &self,
    connection: &Connection,
  ) -> Result<Vec<Tagging>> {
    let first = connection.links.href(REL_TAGGINGS);
    Ok(self.fetch_linked(first, EMBED_TAGGINGS).await)
  }

  async fn person_taggings(&self, id: &str) -> Result<Vec<Tagging>> {
    let url = self.person_taggings_url(id);
    Ok(self.fetch_paged(url, EMBED_TAGGINGS, 25).await)
  }

  async fn delete_tagging(
    &self,
    person_id: &str,
    tagging_id: &str,
  ) -> Result<bool> {
    let url = self.tagging_url(person_id, tagging_id);
    let deleted = self
      .retry
      .run_if(|| self.delete_once(&url), Error::is_retryable)
      .await?;
    self.pace().await;
    Ok(deleted)
  }
}

/// Classify a deletion response: any success status means the tagging is
/// gone, a 404 means it was already gone, anything else is an error (and
/// retryable upstream).
fn delete_outcome(status: StatusCode, url: &str) -> Result<bool> {
  if status.is_success() {
    Ok(true)
  } else if status == StatusCode::NOT_FOUND {
    Ok(false)
  } else {
    Err(Error::Status { status, url: url.to_string() })
  }
}

// ─── Page fetcher ────────────────────────────────────────────────────────────

/// [`PageFetcher`] over a page-numbered collection endpoint, optionally
/// filtered by an OData-style expression.
pub struct CollectionPages<T> {
  client:     ApiClient,
  url:        String,
  collection: &'static str,
  per_page:   u32,
  filter:     Option<String>,
  _marker:    PhantomData<fn() -> T>,
}

impl<T> PageFetcher<T> for CollectionPages<T>
where
  T: DeserializeOwned + Send,
{
  async fn fetch(&mut self, page: u32) -> Result<Page<T>> {
    let mut query: Vec<(&str, String)> = vec![
      ("page", page.to_string()),
      ("per_page", self.per_page.to_string()),
    ];
    if let Some(filter) = &self.filter {
      query.push(("filter", filter.clone()));
    }
    let envelope: PageEnvelope =
      self.client.get_resource(&self.url, &query).await?;
    Ok(Page {
      items:       envelope.items(self.collection),
      total_pages: envelope.total_pages,
    })
  }
}
