use tracing::info;

use crate::cache::{CacheLayer, Fetched};

use super::client::{endpoint, Auth, UpstreamClient};
use super::oracle::Oracle;
use super::types::{Person, Planet};

/// People and planets, with oracle notes attached to people
#[derive(Debug, Clone, Default)]
pub struct StarWarsSnapshot {
  pub people: Vec<Person>,
  pub planets: Vec<Planet>,
}

/// SWAPI people and planets plus oracle enrichment
#[derive(Clone)]
pub struct StarWarsCatalog {
  client: UpstreamClient,
  base_url: String,
  max_people: u64,
  people: CacheLayer<Person>,
  planets: CacheLayer<Planet>,
  oracle: Oracle,
}

impl StarWarsCatalog {
  pub fn new(
    client: UpstreamClient,
    base_url: String,
    max_people: u64,
    people: CacheLayer<Person>,
    planets: CacheLayer<Planet>,
    oracle: Oracle,
  ) -> Self {
    Self {
      client,
      base_url,
      max_people,
      people,
      planets,
      oracle,
    }
  }

  async fn fetch_resource<T: serde::de::DeserializeOwned>(
    &self,
    resource: &str,
    id: u64,
  ) -> Fetched<T> {
    // SWAPI canonical URLs end with a slash
    match endpoint(&self.base_url, &[resource, &id.to_string(), ""]) {
      Ok(url) => self.client.get_json(url, Auth::None).await,
      Err(e) => Fetched::Failed(e),
    }
  }

  /// People `1..=max_people` with oracle notes attached.
  ///
  /// The people catalog has holes, so misses are skipped rather than
  /// ending the walk.
  pub async fn all_people(&self) -> Vec<Person> {
    let people = self
      .people
      .collect_range(1..=self.max_people, move |id| {
        self.fetch_resource::<Person>("people", id)
      })
      .await;

    let mut enriched = Vec::with_capacity(people.len());
    for mut person in people {
      person.oracle_data = self.oracle.lookup(&person.name).await;
      enriched.push(person);
    }
    info!(count = enriched.len(), "Fetched all people");
    enriched
  }

  /// Planets walked from id 1 until the first miss.
  pub async fn all_planets(&self) -> Vec<Planet> {
    let planets = self
      .planets
      .backfill(1, move |id| self.fetch_resource::<Planet>("planets", id))
      .await;
    info!(count = planets.len(), "Fetched all planets");
    planets
  }

  /// People and planets, from the caches while every refresh is valid.
  ///
  /// Otherwise both walks run concurrently, each one sequential inside.
  pub async fn snapshot(&self) -> StarWarsSnapshot {
    if self.is_valid().await {
      info!("Using cached Star Wars data");
      return self.cached_snapshot().await;
    }

    let (people, planets) = futures::future::join(self.all_people(), self.all_planets()).await;

    if !people.is_empty() && !planets.is_empty() {
      self.people.storage().mark_refreshed().await;
      self.planets.storage().mark_refreshed().await;
      self.oracle.mark_refreshed().await;
    }

    StarWarsSnapshot { people, planets }
  }

  async fn is_valid(&self) -> bool {
    self.people.storage().is_valid().await
      && self.planets.storage().is_valid().await
      && self.oracle.is_valid().await
  }

  async fn cached_snapshot(&self) -> StarWarsSnapshot {
    let mut people = self.people.storage().values().await;
    for person in &mut people {
      person.oracle_data = self.oracle.cached(&person.name).await;
    }
    StarWarsSnapshot {
      people,
      planets: self.planets.storage().values().await,
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::cache::DiskCache;
  use crate::catalog::test_support::spawn_upstream;
  use crate::catalog::types::Side;
  use axum::extract::{Path, Query, State};
  use axum::http::StatusCode;
  use axum::response::{IntoResponse, Response};
  use axum::routing::get;
  use axum::{Json, Router};
  use base64::Engine;
  use serde_json::json;
  use std::collections::HashMap;
  use std::sync::atomic::{AtomicU32, Ordering};
  use std::sync::Arc;
  use std::time::Duration;

  /// People 1, 2 and 4 exist (3 is a hole); planets 1 and 2 exist.
  fn upstream(base: String, hits: Arc<AtomicU32>) -> Router {
    async fn person(
      State((base, hits)): State<(String, Arc<AtomicU32>)>,
      Path(id): Path<u64>,
    ) -> Response {
      hits.fetch_add(1, Ordering::SeqCst);
      let (name, planet) = match id {
        1 => ("Luke Skywalker", 1),
        2 => ("Darth Vader", 1),
        4 => ("Han Solo", 2),
        _ => return StatusCode::NOT_FOUND.into_response(),
      };
      Json(json!({
        "name": name,
        "homeworld": format!("{}/planets/{}/", base, planet),
        "url": format!("{}/people/{}/", base, id),
      }))
      .into_response()
    }

    async fn planet(
      State((base, hits)): State<(String, Arc<AtomicU32>)>,
      Path(id): Path<u64>,
    ) -> Response {
      hits.fetch_add(1, Ordering::SeqCst);
      let name = match id {
        1 => "Tatooine",
        2 => "Corellia",
        _ => return StatusCode::NOT_FOUND.into_response(),
      };
      Json(json!({"name": name, "url": format!("{}/planets/{}/", base, id)})).into_response()
    }

    async fn oracle(Query(params): Query<HashMap<String, String>>) -> Response {
      let notes = match params["name"].as_str() {
        "Luke Skywalker" => "Strong with the Light Side",
        "Darth Vader" => "Fell to the Dark Side",
        _ => "Scoundrel",
      };
      let encoded = base64::engine::general_purpose::STANDARD.encode(notes);
      Json(json!({ "oracle_notes": encoded })).into_response()
    }

    Router::new()
      .route("/people/:id/", get(person))
      .route("/planets/:id/", get(planet))
      .route("/oracle", get(oracle))
      .with_state((base, hits))
  }

  fn layer<T: crate::cache::Cacheable>() -> CacheLayer<T> {
    CacheLayer::new(DiskCache::in_memory(chrono::Duration::hours(24)), Duration::ZERO)
  }

  async fn catalog() -> (StarWarsCatalog, Arc<AtomicU32>) {
    // Bind first so the handlers can build URLs that point back at the server
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let base = format!("http://{}", listener.local_addr().unwrap());
    let hits = Arc::new(AtomicU32::new(0));
    let router = upstream(base.clone(), hits.clone());
    tokio::spawn(async move { axum::serve(listener, router).await.unwrap() });

    let client = UpstreamClient::new(Some("key".to_string())).unwrap();
    let oracle = Oracle::new(client.clone(), format!("{}/oracle", base), layer());
    let catalog = StarWarsCatalog::new(client, base, 5, layer(), layer(), oracle);
    (catalog, hits)
  }

  #[tokio::test]
  async fn test_people_skip_holes_and_carry_oracle_data() {
    let (catalog, _) = catalog().await;

    let people = catalog.all_people().await;
    let names: Vec<&str> = people.iter().map(|p| p.name.as_str()).collect();
    assert_eq!(names, vec!["Luke Skywalker", "Darth Vader", "Han Solo"]);

    let sides: Vec<Option<Side>> = people
      .iter()
      .map(|p| p.oracle_data.as_ref().and_then(|o| o.side))
      .collect();
    assert_eq!(sides, vec![Some(Side::Light), Some(Side::Dark), None]);
  }

  #[tokio::test]
  async fn test_planets_stop_at_first_miss() {
    let (catalog, _) = catalog().await;

    let planets = catalog.all_planets().await;
    assert_eq!(planets.len(), 2);
    assert_eq!(planets[0].name, "Tatooine");
    assert!(planets[0].url.ends_with("/planets/1/"));
  }

  #[tokio::test]
  async fn test_snapshot_served_from_cache_once_valid() {
    let (catalog, hits) = catalog().await;

    let fresh = catalog.snapshot().await;
    let hits_after_refresh = hits.load(Ordering::SeqCst);

    let cached = catalog.snapshot().await;
    assert_eq!(hits.load(Ordering::SeqCst), hits_after_refresh);
    assert_eq!(cached.people, fresh.people);
    assert_eq!(cached.planets, fresh.planets);
  }

  #[tokio::test]
  async fn test_people_and_planets_walk_concurrently() {
    // Person 1 and planet 1 each hold their answer until the other has been
    // asked for, which only overlapping walks can satisfy.
    let gate = Arc::new(tokio::sync::Barrier::new(2));
    let people_gate = gate.clone();
    let planets_gate = gate;

    let base = spawn_upstream(
      Router::new()
        .route(
          "/people/:id/",
          get(move |Path(id): Path<u64>| {
            let gate = people_gate.clone();
            async move {
              if id != 1 {
                return StatusCode::NOT_FOUND.into_response();
              }
              gate.wait().await;
              Json(json!({"name": "Leia Organa"})).into_response()
            }
          }),
        )
        .route(
          "/planets/:id/",
          get(move |Path(id): Path<u64>| {
            let gate = planets_gate.clone();
            async move {
              if id != 1 {
                return StatusCode::NOT_FOUND.into_response();
              }
              gate.wait().await;
              Json(json!({"name": "Alderaan"})).into_response()
            }
          }),
        )
        .route("/oracle", get(|| async { StatusCode::NOT_FOUND })),
    )
    .await;

    let client = UpstreamClient::new(None).unwrap();
    let oracle = Oracle::new(client.clone(), format!("{}/oracle", base), layer());
    let catalog = StarWarsCatalog::new(client, base, 2, layer(), layer(), oracle);

    let snapshot = tokio::time::timeout(Duration::from_secs(10), catalog.snapshot())
      .await
      .expect("people and planets walks did not overlap");
    assert_eq!(snapshot.people.len(), 1);
    assert_eq!(snapshot.planets.len(), 1);
  }
}
