//! Lazy pull-based pagination.
//!
//! [`Paginated`] turns a page-numbered collection endpoint into an
//! [`ItemSource`]: pages are fetched on demand as the consumer pulls, never
//! ahead of it. The stream ends on the first empty page, and once the
//! current page number reaches the envelope's `total_pages` count — a page
//! without a count is treated as the last. A page fetch that still fails
//! after the client's retries ends the stream with whatever was already
//! yielded.

use std::{collections::VecDeque, future::Future};

use rollcall_core::ItemSource;

use crate::error::{Error, Result};

/// One fetched page of a collection.
#[derive(Debug, Clone)]
pub struct Page<T> {
  pub items:       Vec<T>,
  pub total_pages: Option<u32>,
}

/// Fetches one page of a collection by page number (1-based).
pub trait PageFetcher<T>: Send {
  fn fetch(&mut self, page: u32) -> impl Future<Output = Result<Page<T>>> + Send + '_;
}

/// A lazy item stream over a page-numbered collection.
pub struct Paginated<T, F> {
  fetcher:   F,
  next_page: u32,
  buffer:    VecDeque<T>,
  done:      bool,
}

impl<T, F> Paginated<T, F>
where
  F: PageFetcher<T>,
{
  pub fn new(fetcher: F) -> Self {
    Self {
      fetcher,
      next_page: 1,
      buffer: VecDeque::new(),
      done: false,
    }
  }

  /// Pull the next item, fetching the next page when the buffer runs dry.
  pub async fn next(&mut self) -> Option<T> {
    loop {
      if let Some(item) = self.buffer.pop_front() {
        return Some(item);
      }
      if self.done {
        return None;
      }

      let page = self.next_page;
      match self.fetcher.fetch(page).await {
        Ok(fetched) => {
          if fetched.items.is_empty() {
            self.done = true;
            return None;
          }
          self.buffer.extend(fetched.items);
          match fetched.total_pages {
            Some(total) if page < total => self.next_page = page + 1,
            // Reached the advertised last page, or no count at all: either
            // way this was the final page.
            Some(_) | None => self.done = true,
          }
        }
        Err(error) => {
          self.log_fetch_failure(page, &error);
          self.done = true;
          return None;
        }
      }
    }
  }

  fn log_fetch_failure(&self, page: u32, error: &Error) {
    tracing::warn!("fetch of page {page} failed, ending stream early: {error}");
  }
}

impl<T, F> ItemSource for Paginated<T, F>
where
  T: Send,
  F: PageFetcher<T>,
{
  type Item = T;

  async fn next_item(&mut self) -> Option<T> {
    self.next().await
  }
}
