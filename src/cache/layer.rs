//! Cache layer that orchestrates caching logic with network fetching.

use std::future::Future;
use std::ops::RangeInclusive;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use super::storage::DiskCache;
use super::traits::{CacheResult, CacheSource, Cacheable, Fetched};

/// Cache layer that manages caching logic and network fetching.
///
/// All walks are strictly sequential: each request completes, then the layer
/// sleeps for `delay`, then the next one starts. Cache hits do not sleep.
pub struct CacheLayer<T: Cacheable> {
  storage: Arc<DiskCache<T>>,
  /// Pause after every remote request
  delay: Duration,
}

impl<T: Cacheable> CacheLayer<T> {
  /// Create a new cache layer with the given storage backend.
  pub fn new(storage: DiskCache<T>, delay: Duration) -> Self {
    Self {
      storage: Arc::new(storage),
      delay,
    }
  }

  pub fn storage(&self) -> &DiskCache<T> {
    &self.storage
  }

  async fn pause(&self) {
    if !self.delay.is_zero() {
      tokio::time::sleep(self.delay).await;
    }
  }

  /// Fetch a single record with a cache-first strategy.
  ///
  /// A record fetched from the network is written through to storage
  /// before it is returned.
  pub async fn fetch_one<F, Fut>(&self, key: &str, fetcher: F) -> Fetched<CacheResult<T>>
  where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Fetched<T>>,
  {
    if let Some(cached) = self.storage.get(key).await {
      debug!(entity = T::entity_type(), key, "Using cached record");
      return Fetched::Found(CacheResult::from_cache(cached));
    }

    match fetcher().await {
      Fetched::Found(record) => {
        self.storage.put(key, record.clone()).await;
        Fetched::Found(CacheResult::from_network(record))
      }
      Fetched::NotFound => Fetched::NotFound,
      Fetched::Failed(e) => Fetched::Failed(e),
    }
  }

  /// Like `fetch_one`, but sleeps after any request that reached the network,
  /// whatever its outcome.
  pub async fn fetch_paced<F, Fut>(&self, key: &str, fetcher: F) -> Fetched<CacheResult<T>>
  where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Fetched<T>>,
  {
    let outcome = self.fetch_one(key, fetcher).await;
    if !matches!(&outcome, Fetched::Found(hit) if hit.source == CacheSource::Cache) {
      self.pause().await;
    }
    outcome
  }

  /// Walk ids upward from `start` until the first miss.
  ///
  /// Both a not-found answer and any other failure end the walk, so a
  /// transient upstream error truncates the result. The stop reason is
  /// logged so the two cases can be told apart.
  pub async fn backfill<F, Fut>(&self, start: u64, mut fetcher: F) -> Vec<T>
  where
    F: FnMut(u64) -> Fut,
    Fut: Future<Output = Fetched<T>>,
  {
    let mut records = Vec::new();
    let mut id = start;

    loop {
      debug!(entity = T::entity_type(), id, "Fetching record");
      match self.fetch_paced(&id.to_string(), || fetcher(id)).await {
        Fetched::Found(result) => records.push(result.data),
        Fetched::NotFound => {
          info!(
            entity = T::entity_type(),
            id,
            count = records.len(),
            "Backfill reached end of catalog"
          );
          break;
        }
        Fetched::Failed(e) => {
          warn!(
            entity = T::entity_type(),
            id,
            count = records.len(),
            error = %e,
            "Backfill stopped by fetch failure, result may be truncated"
          );
          break;
        }
      }
      id += 1;
    }

    records
  }

  /// Fetch every id in `ids`, skipping the ones that miss.
  pub async fn collect_range<F, Fut>(&self, ids: RangeInclusive<u64>, mut fetcher: F) -> Vec<T>
  where
    F: FnMut(u64) -> Fut,
    Fut: Future<Output = Fetched<T>>,
  {
    let mut records = Vec::new();

    for id in ids {
      debug!(entity = T::entity_type(), id, "Fetching record");
      match self.fetch_paced(&id.to_string(), || fetcher(id)).await {
        Fetched::Found(result) => records.push(result.data),
        Fetched::NotFound => debug!(entity = T::entity_type(), id, "Record not found, skipping"),
        Fetched::Failed(e) => {
          warn!(entity = T::entity_type(), id, error = %e, "Failed to fetch record, skipping")
        }
      }
    }

    records
  }

  /// Fetch pages in order and concatenate their items.
  ///
  /// A failed page contributes nothing and the walk moves on. An empty page
  /// means the catalog ended early. Items are stored under their position in
  /// the walk, so `values()` replays the last walk in order. Positions past
  /// the end of a non-empty walk are dropped.
  pub async fn backfill_pages<F, Fut>(&self, pages: RangeInclusive<u64>, mut fetch_page: F) -> Vec<T>
  where
    F: FnMut(u64) -> Fut,
    Fut: Future<Output = color_eyre::Result<Vec<T>>>,
  {
    let mut records = Vec::new();

    for page in pages {
      info!(entity = T::entity_type(), page, "Fetching page");
      match fetch_page(page).await {
        Ok(items) if items.is_empty() => {
          info!(entity = T::entity_type(), page, "Empty page, catalog ended early");
          break;
        }
        Ok(items) => {
          for item in items {
            self.storage.put(records.len().to_string(), item.clone()).await;
            records.push(item);
          }
        }
        Err(e) => {
          warn!(entity = T::entity_type(), page, error = %e, "Failed to fetch page, skipping")
        }
      }
      self.pause().await;
    }

    if !records.is_empty() {
      let len = records.len();
      self
        .storage
        .retain(|key| key.parse::<usize>().is_ok_and(|pos| pos < len))
        .await;
    }

    records
  }
}

impl<T: Cacheable> Clone for CacheLayer<T> {
  fn clone(&self) -> Self {
    Self {
      storage: Arc::clone(&self.storage),
      delay: self.delay,
    }
  }
}
