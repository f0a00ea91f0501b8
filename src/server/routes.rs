//! HTTP handlers.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::Json;
use color_eyre::eyre::eyre;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::future::Future;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::aggregate::{self, PlanetAggregate};
use crate::cache::Fetched;
use crate::catalog::types::{Pokemon, Star};
use crate::radar;

use super::error::ApiError;
use super::AppState;

type ApiResult<T> = Result<Json<T>, ApiError>;

/// Run a catalog walk on its own task.
///
/// Walks fill the shared caches, so a client hanging up must not cancel one
/// halfway through.
async fn detached<T, Fut>(work: Fut) -> Result<T, ApiError>
where
  T: Send + 'static,
  Fut: Future<Output = T> + Send + 'static,
{
  tokio::spawn(work)
    .await
    .map_err(|e| ApiError::Internal(eyre!("Catalog task failed: {}", e)))
}

fn parse_id(raw: &str, what: &str) -> Result<u64, ApiError> {
  raw
    .parse::<u64>()
    .ok()
    .filter(|id| *id > 0)
    .ok_or_else(|| ApiError::BadRequest(format!("{} must be a positive integer", what)))
}

// ============================================================================
// Stars
// ============================================================================

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StarsResponse {
  pub total_stars: usize,
  pub total_resonance: f64,
  pub average_resonance: f64,
  pub data: Vec<Star>,
}

pub async fn stars(State(state): State<Arc<AppState>>) -> ApiResult<StarsResponse> {
  let catalog = state.stars.clone();
  let stars = detached(async move { catalog.all_stars().await }).await?;
  let resonance = aggregate::resonance(&stars);

  Ok(Json(StarsResponse {
    total_stars: stars.len(),
    total_resonance: resonance.total,
    average_resonance: resonance.average,
    data: stars,
  }))
}

// ============================================================================
// Pokémon
// ============================================================================

#[derive(Debug, Serialize)]
pub struct HeightsResponse {
  pub heights: BTreeMap<&'static str, f64>,
}

#[derive(Debug, Serialize)]
pub struct RangeResponse {
  pub total: usize,
  pub pokemon: Vec<Pokemon>,
}

pub async fn pokemon_heights(State(state): State<Arc<AppState>>) -> ApiResult<HeightsResponse> {
  let catalog = state.pokemon.clone();
  let all = detached(async move { catalog.all().await }).await?;
  info!(count = all.len(), "Calculating average heights by type");

  Ok(Json(HeightsResponse {
    heights: aggregate::average_heights_by_type(&all),
  }))
}

pub async fn pokemon_range(
  State(state): State<Arc<AppState>>,
  Path((start, end)): Path<(String, String)>,
) -> ApiResult<RangeResponse> {
  let start = parse_id(&start, "start")?;
  let end = parse_id(&end, "end")?;
  if start > end {
    return Err(ApiError::BadRequest(
      "start must not be greater than end".to_string(),
    ));
  }
  let max_range = state.pokemon.max_range();
  if end - start >= max_range {
    return Err(ApiError::BadRequest(format!(
      "range must span at most {} ids",
      max_range
    )));
  }

  let catalog = state.pokemon.clone();
  let pokemon = detached(async move { catalog.range(start, end).await }).await?;

  Ok(Json(RangeResponse {
    total: pokemon.len(),
    pokemon,
  }))
}

pub async fn pokemon_by_id(
  State(state): State<Arc<AppState>>,
  Path(id): Path<String>,
) -> ApiResult<Pokemon> {
  let id = parse_id(&id, "id")?;

  match state.pokemon.get(id).await {
    Fetched::Found(pokemon) => Ok(Json(pokemon)),
    Fetched::NotFound => Err(ApiError::NotFound("Pokemon not found".to_string())),
    Fetched::Failed(e) => {
      warn!(id, error = %e, "Failed to fetch pokemon");
      Err(ApiError::NotFound("Pokemon not found".to_string()))
    }
  }
}

// ============================================================================
// Radar
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct RadarRequest {
  pub coordinates: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
  pub message: &'static str,
}

pub async fn radar(body: Result<Json<RadarRequest>, JsonRejection>) -> ApiResult<MessageResponse> {
  let coordinates = body
    .ok()
    .and_then(|Json(request)| request.coordinates)
    .filter(|c| !c.is_empty())
    .ok_or_else(|| ApiError::BadRequest("Coordinates are required".to_string()))?;

  info!(coordinates = %coordinates, "Received radar coordinates");
  let grid = radar::parse_coordinates(&coordinates);
  debug!("Radar grid:\n{}", radar::render(&grid));

  Ok(Json(MessageResponse {
    message: "Radar coordinates processed successfully",
  }))
}

// ============================================================================
// Star Wars
// ============================================================================

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StarWarsResponse {
  pub total_people: usize,
  pub total_planets: usize,
  pub light_side_count: u32,
  pub dark_side_count: u32,
  pub planets: Vec<PlanetAggregate>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InhabitedPlanetsResponse {
  pub total_planets_with_residents: usize,
  pub light_side_count: u32,
  pub dark_side_count: u32,
  pub planets: Vec<PlanetAggregate>,
}

pub async fn starwars(State(state): State<Arc<AppState>>) -> ApiResult<StarWarsResponse> {
  let catalog = state.starwars.clone();
  let snapshot = detached(async move { catalog.snapshot().await }).await?;
  let (light, dark) = aggregate::side_counts(&snapshot.people);

  Ok(Json(StarWarsResponse {
    total_people: snapshot.people.len(),
    total_planets: snapshot.planets.len(),
    light_side_count: light,
    dark_side_count: dark,
    planets: aggregate::organize_people_by_planet(&snapshot.people, &snapshot.planets),
  }))
}

pub async fn planets_with_residents(
  State(state): State<Arc<AppState>>,
) -> ApiResult<InhabitedPlanetsResponse> {
  let catalog = state.starwars.clone();
  let snapshot = detached(async move { catalog.snapshot().await }).await?;
  let (light, dark) = aggregate::side_counts(&snapshot.people);
  let planets = aggregate::planets_with_residents(aggregate::organize_people_by_planet(
    &snapshot.people,
    &snapshot.planets,
  ));

  Ok(Json(InhabitedPlanetsResponse {
    total_planets_with_residents: planets.len(),
    light_side_count: light,
    dark_side_count: dark,
    planets,
  }))
}
