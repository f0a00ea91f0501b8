//! JSON HTTP surface over the catalogs.

mod error;
mod routes;

use axum::routing::{get, post};
use axum::Router;
use color_eyre::{eyre::eyre, Result};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use crate::cache::{CacheLayer, Cacheable, DiskCache};
use crate::catalog::cache::pokemon_csv;
use crate::catalog::client::UpstreamClient;
use crate::catalog::oracle::Oracle;
use crate::catalog::pokemon::PokemonCatalog;
use crate::catalog::starwars::StarWarsCatalog;
use crate::catalog::stars::StarCatalog;
use crate::config::Config;

/// Catalog handles shared by every request. Built once at startup.
pub struct AppState {
  pub stars: StarCatalog,
  pub pokemon: PokemonCatalog,
  pub starwars: StarWarsCatalog,
}

async fn open_layer<T: Cacheable>(
  path: &Path,
  ttl: chrono::Duration,
  delay: Duration,
) -> CacheLayer<T> {
  CacheLayer::new(DiskCache::open(path, ttl).await, delay)
}

impl AppState {
  /// Open every cache under the data directory and wire up the catalogs.
  pub async fn from_config(config: &Config) -> Result<Self> {
    let api_key = config.get_api_key();
    if api_key.is_none() {
      warn!("No API key configured, stars and oracle requests will be rejected upstream");
    }
    let client = UpstreamClient::new(api_key)?;

    let dir = &config.data_dir;
    let ttl = config.cache_ttl();
    let delay = config.request_delay();

    let pokemon_cache = DiskCache::open(dir.join("pokemon_cache.json"), ttl)
      .await
      .with_csv(pokemon_csv(dir.join("pokemon_data.csv")));

    let oracle = Oracle::new(
      client.clone(),
      config.oracle.base_url.clone(),
      open_layer(&dir.join("oracle_cache.json"), ttl, delay).await,
    );

    Ok(Self {
      stars: StarCatalog::new(
        client.clone(),
        config.stars.clone(),
        open_layer(&dir.join("stars_cache.json"), ttl, delay).await,
      ),
      pokemon: PokemonCatalog::new(
        client.clone(),
        config.pokemon.clone(),
        CacheLayer::new(pokemon_cache, delay),
      ),
      starwars: StarWarsCatalog::new(
        client,
        config.starwars.base_url.clone(),
        config.starwars.max_people,
        open_layer(&dir.join("people_cache.json"), ttl, delay).await,
        open_layer(&dir.join("planets_cache.json"), ttl, delay).await,
        oracle,
      ),
    })
  }
}

pub fn router(state: Arc<AppState>) -> Router {
  Router::new()
    .route("/api/stars", get(routes::stars))
    .route("/pokemon/heights", get(routes::pokemon_heights))
    .route("/pokemon/range/:start/:end", get(routes::pokemon_range))
    .route("/pokemon/:id", get(routes::pokemon_by_id))
    .route("/radar", post(routes::radar))
    .route("/starwars", get(routes::starwars))
    .route("/starwars/", get(routes::starwars))
    .route(
      "/starwars/planets-with-residents",
      get(routes::planets_with_residents),
    )
    .with_state(state)
}

pub async fn serve(state: AppState, port: u16) -> Result<()> {
  let app = router(Arc::new(state));

  let listener = tokio::net::TcpListener::bind(("0.0.0.0", port))
    .await
    .map_err(|e| eyre!("Failed to bind port {}: {}", port, e))?;
  let local_addr = listener.local_addr()?;
  info!(address = %local_addr, "Server is running");

  axum::serve(listener, app)
    .with_graceful_shutdown(shutdown_signal())
    .await
    .map_err(|e| eyre!("Server error: {}", e))
}

async fn shutdown_signal() {
  if let Err(e) = tokio::signal::ctrl_c().await {
    warn!(error = %e, "Failed to listen for shutdown signal");
    std::future::pending::<()>().await;
  }
  info!("Shutting down");
}
