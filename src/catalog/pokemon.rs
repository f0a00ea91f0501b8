use tracing::info;

use crate::cache::{CacheLayer, Fetched};
use crate::config::PokemonConfig;

use super::api_types::ApiPokemon;
use super::client::{endpoint, Auth, UpstreamClient};
use super::types::Pokemon;

/// PokéAPI catalog, addressed by sequential id
#[derive(Clone)]
pub struct PokemonCatalog {
  client: UpstreamClient,
  config: PokemonConfig,
  cache: CacheLayer<Pokemon>,
}

impl PokemonCatalog {
  pub fn new(client: UpstreamClient, config: PokemonConfig, cache: CacheLayer<Pokemon>) -> Self {
    Self {
      client,
      config,
      cache,
    }
  }

  /// Widest `start..=end` span `range` should be asked for.
  pub fn max_range(&self) -> u64 {
    self.config.max_range
  }

  async fn fetch_remote(&self, id: u64) -> Fetched<Pokemon> {
    let url = match endpoint(&self.config.base_url, &[&id.to_string()]) {
      Ok(url) => url,
      Err(e) => return Fetched::Failed(e),
    };
    self
      .client
      .get_json::<ApiPokemon>(url, Auth::None)
      .await
      .map(Pokemon::from)
  }

  /// A single Pokémon, cache first.
  pub async fn get(&self, id: u64) -> Fetched<Pokemon> {
    self
      .cache
      .fetch_one(&id.to_string(), || self.fetch_remote(id))
      .await
      .map(|result| result.data)
  }

  /// Pokémon `start..=end`, skipping ids that miss.
  pub async fn range(&self, start: u64, end: u64) -> Vec<Pokemon> {
    self
      .cache
      .collect_range(start..=end, move |id| self.fetch_remote(id))
      .await
  }

  /// The whole catalog, walked from id 1 unless the last full walk is still valid.
  pub async fn all(&self) -> Vec<Pokemon> {
    let storage = self.cache.storage();
    if storage.is_valid().await {
      info!("Using cached pokemon");
      return storage.values().await;
    }

    let pokemon = self.cache.backfill(1, move |id| self.fetch_remote(id)).await;
    if !pokemon.is_empty() {
      storage.mark_refreshed().await;
    }
    info!(count = pokemon.len(), "Fetched all pokemon");
    pokemon
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::cache::DiskCache;
  use crate::catalog::cache::pokemon_csv;
  use crate::catalog::test_support::spawn_upstream;
  use axum::extract::Path;
  use axum::http::StatusCode;
  use axum::response::IntoResponse;
  use axum::routing::get;
  use axum::{Json, Router};
  use serde_json::json;
  use std::time::Duration;

  /// Upstream with ids 1 to 3; id 2 is dual typed.
  fn upstream() -> Router {
    Router::new().route(
      "/pokemon/:id",
      get(|Path(id): Path<u64>| async move {
        let types = match id {
          1 => vec!["grass"],
          2 => vec!["fire", "flying"],
          3 => vec!["water"],
          _ => return StatusCode::NOT_FOUND.into_response(),
        };
        let types: Vec<_> = types
          .into_iter()
          .enumerate()
          .map(|(slot, name)| json!({"slot": slot + 1, "type": {"name": name}}))
          .collect();
        Json(json!({"id": id, "name": format!("mon-{}", id), "height": id * 10, "types": types}))
          .into_response()
      }),
    )
  }

  async fn catalog_at(storage: DiskCache<Pokemon>) -> PokemonCatalog {
    let base = spawn_upstream(upstream()).await;
    PokemonCatalog::new(
      UpstreamClient::new(None).unwrap(),
      PokemonConfig {
        base_url: format!("{}/pokemon", base),
        max_range: 10,
      },
      CacheLayer::new(storage, Duration::ZERO),
    )
  }

  #[tokio::test]
  async fn test_all_walks_until_not_found() {
    let catalog = catalog_at(DiskCache::in_memory(chrono::Duration::hours(24))).await;

    let all = catalog.all().await;
    let names: Vec<&str> = all.iter().map(|p| p.name.as_str()).collect();
    assert_eq!(names, vec!["mon-1", "mon-2", "mon-3"]);
    assert_eq!(all[1].types, vec!["fire", "flying"]);
  }

  #[tokio::test]
  async fn test_get_and_range() {
    let catalog = catalog_at(DiskCache::in_memory(chrono::Duration::hours(24))).await;

    assert!(matches!(catalog.get(2).await, Fetched::Found(p) if p.height == 20));
    assert!(matches!(catalog.get(99).await, Fetched::NotFound));

    let range = catalog.range(2, 5).await;
    assert_eq!(range.len(), 2);
  }

  #[tokio::test]
  async fn test_walk_persists_json_and_csv() {
    let dir = tempfile::tempdir().unwrap();
    let storage = DiskCache::open(dir.path().join("pokemon_cache.json"), chrono::Duration::hours(24))
      .await
      .with_csv(pokemon_csv(dir.path().join("pokemon_data.csv")));
    let catalog = catalog_at(storage).await;

    catalog.all().await;

    let csv = std::fs::read_to_string(dir.path().join("pokemon_data.csv")).unwrap();
    assert_eq!(
      csv,
      "id,name,height,types\n1,mon-1,10,grass\n2,mon-2,20,fire|flying\n3,mon-3,30,water\n"
    );

    let reloaded =
      DiskCache::<Pokemon>::open(dir.path().join("pokemon_cache.json"), chrono::Duration::hours(24))
        .await;
    assert!(reloaded.is_valid().await);
    assert_eq!(reloaded.len().await, 3);
  }
}
