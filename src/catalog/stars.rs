use color_eyre::{eyre::eyre, Result};
use tracing::info;

use crate::cache::{CacheLayer, Fetched};
use crate::config::StarsConfig;

use super::client::{with_query, Auth, UpstreamClient};
use super::types::Star;

/// Paged stars resource
#[derive(Clone)]
pub struct StarCatalog {
  client: UpstreamClient,
  config: StarsConfig,
  cache: CacheLayer<Star>,
}

impl StarCatalog {
  pub fn new(client: UpstreamClient, config: StarsConfig, cache: CacheLayer<Star>) -> Self {
    Self {
      client,
      config,
      cache,
    }
  }

  /// Fetch one page. A not-found page is an empty page.
  async fn fetch_page(&self, page: u64) -> Result<Vec<Star>> {
    let url = with_query(&self.config.base_url, "page", &page.to_string())?;
    match self.client.get_json(url, Auth::ApiKey).await {
      Fetched::Found(stars) => Ok(stars),
      Fetched::NotFound => Ok(Vec::new()),
      Fetched::Failed(e) => Err(eyre!("Failed to fetch stars page {}: {}", page, e)),
    }
  }

  /// Every star, from the cache while the last full refresh is valid.
  pub async fn all_stars(&self) -> Vec<Star> {
    let storage = self.cache.storage();
    if storage.is_valid().await {
      info!("Using cached stars");
      return storage.values().await;
    }

    let stars = self
      .cache
      .backfill_pages(1..=self.config.total_pages, move |page| self.fetch_page(page))
      .await;

    if !stars.is_empty() {
      storage.mark_refreshed().await;
    }
    info!(count = stars.len(), "Fetched all stars");
    stars
  }
}
