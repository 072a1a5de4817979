//! Pull-based item sources.
//!
//! `ItemSource` is the lazy-sequence seam the batch runner drains: one item
//! per pull, `None` at end-of-stream, no restart — a fresh source must be
//! constructed from the original query to go again. The paginated fetcher in
//! `rollcall-client` implements it over the network; [`IterSource`] adapts
//! any in-memory iterator.

use std::future::Future;

/// A finite, non-restartable sequence of items, pulled one at a time.
pub trait ItemSource: Send {
  type Item: Send;

  /// The next item, or `None` once the source is exhausted. After the first
  /// `None`, all further calls return `None`.
  fn next_item(&mut self) -> impl Future<Output = Option<Self::Item>> + Send + '_;
}

/// An [`ItemSource`] over any in-memory iterator.
pub struct IterSource<I>(I);

impl<I> IterSource<I> {
  pub fn new(iter: I) -> Self {
    Self(iter)
  }
}

impl<I> ItemSource for IterSource<I>
where
  I: Iterator + Send,
  I::Item: Send,
{
  type Item = I::Item;

  async fn next_item(&mut self) -> Option<I::Item> {
    self.0.next()
  }
}
