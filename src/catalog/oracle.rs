//! Oracle lookups: base64 notes per character, classified by force side.

use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use base64::Engine;
use color_eyre::{eyre::eyre, Result};
use tracing::{debug, warn};

use crate::cache::{CacheLayer, Fetched};

use super::api_types::ApiOracleResponse;
use super::client::{with_query, Auth, UpstreamClient};
use super::types::{OracleRecord, Side};

/// Standard alphabet, tolerant of missing padding
const NOTES_ENGINE: GeneralPurpose = GeneralPurpose::new(
  &alphabet::STANDARD,
  GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// Name-keyed oracle lookups with a write-through cache
#[derive(Clone)]
pub struct Oracle {
  client: UpstreamClient,
  base_url: String,
  cache: CacheLayer<OracleRecord>,
}

impl Oracle {
  pub fn new(client: UpstreamClient, base_url: String, cache: CacheLayer<OracleRecord>) -> Self {
    Self {
      client,
      base_url,
      cache,
    }
  }

  /// Look up a character by exact name, cache first.
  ///
  /// Every failure degrades to `None`.
  pub async fn lookup(&self, name: &str) -> Option<OracleRecord> {
    match self.cache.fetch_paced(name, || self.fetch_remote(name)).await {
      Fetched::Found(result) => Some(result.data),
      Fetched::NotFound => {
        debug!(name, "No oracle notes");
        None
      }
      Fetched::Failed(e) => {
        warn!(name, error = %e, "Failed to fetch oracle data");
        None
      }
    }
  }

  /// Cached record only, never touching the network.
  pub async fn cached(&self, name: &str) -> Option<OracleRecord> {
    self.cache.storage().get(name).await
  }

  pub async fn is_valid(&self) -> bool {
    self.cache.storage().is_valid().await
  }

  pub async fn mark_refreshed(&self) {
    self.cache.storage().mark_refreshed().await;
  }

  async fn fetch_remote(&self, name: &str) -> Fetched<OracleRecord> {
    let url = match with_query(&self.base_url, "name", name) {
      Ok(url) => url,
      Err(e) => return Fetched::Failed(e),
    };

    let response: ApiOracleResponse = match self.client.get_json(url, Auth::ApiKey).await {
      Fetched::Found(response) => response,
      Fetched::NotFound => return Fetched::NotFound,
      Fetched::Failed(e) => return Fetched::Failed(e),
    };

    // An answer without notes counts as absent
    let Some(encoded) = response.oracle_notes.filter(|n| !n.is_empty()) else {
      return Fetched::NotFound;
    };

    match decode_notes(&encoded) {
      Ok(notes) => Fetched::Found(OracleRecord {
        name: name.to_string(),
        side: classify(&notes),
        notes,
      }),
      Err(e) => Fetched::Failed(e),
    }
  }
}

/// Decode base64 notes into text. Invalid UTF-8 is replaced, not rejected.
pub fn decode_notes(encoded: &str) -> Result<String> {
  let bytes = NOTES_ENGINE
    .decode(encoded.trim())
    .map_err(|e| eyre!("Failed to decode oracle notes: {}", e))?;
  Ok(String::from_utf8_lossy(&bytes).into_owned())
}

/// Light side is checked first, so notes naming both sides read as light.
pub fn classify(notes: &str) -> Option<Side> {
  let lower = notes.to_lowercase();
  if lower.contains("light side") {
    Some(Side::Light)
  } else if lower.contains("dark side") {
    Some(Side::Dark)
  } else {
    None
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::cache::DiskCache;
  use crate::catalog::test_support::spawn_upstream;
  use axum::extract::Query;
  use axum::http::StatusCode;
  use axum::response::IntoResponse;
  use axum::routing::get;
  use axum::{Json, Router};
  use serde_json::json;
  use std::collections::HashMap;
  use std::sync::atomic::{AtomicU32, Ordering};
  use std::sync::Arc;
  use std::time::Duration;

  fn encode(text: &str) -> String {
    base64::engine::general_purpose::STANDARD.encode(text)
  }

  #[test]
  fn test_classify_light_wins() {
    assert_eq!(
      classify("Trained in the Light Side, tempted by the DARK SIDE"),
      Some(Side::Light)
    );
    assert_eq!(classify("Embraced the dark side of the Force"), Some(Side::Dark));
    assert_eq!(classify("A humble moisture farmer"), None);
    assert_eq!(classify("lightside darkside"), None);
  }

  #[test]
  fn test_decode_notes() {
    assert_eq!(decode_notes(&encode("Follows the Light Side")).unwrap(), "Follows the Light Side");
    // Missing padding is tolerated
    assert_eq!(decode_notes("aGk").unwrap(), "hi");
    assert!(decode_notes("not*base64!").is_err());
  }

  async fn oracle_against(router: Router) -> Oracle {
    let base = spawn_upstream(router).await;
    Oracle::new(
      UpstreamClient::new(Some("key".to_string())).unwrap(),
      format!("{}/oracle-rolodex", base),
      CacheLayer::new(DiskCache::in_memory(chrono::Duration::hours(24)), Duration::ZERO),
    )
  }

  #[tokio::test]
  async fn test_lookup_decodes_classifies_and_caches() {
    let hits = Arc::new(AtomicU32::new(0));
    let counter = hits.clone();
    let oracle = oracle_against(Router::new().route(
      "/oracle-rolodex",
      get(move |Query(params): Query<HashMap<String, String>>| {
        let counter = counter.clone();
        async move {
          counter.fetch_add(1, Ordering::SeqCst);
          let notes = format!("{} walks the dark side", params["name"]);
          Json(json!({ "oracle_notes": encode(&notes) }))
        }
      }),
    ))
    .await;

    let record = oracle.lookup("Darth Vader").await.unwrap();
    assert_eq!(record.name, "Darth Vader");
    assert_eq!(record.notes, "Darth Vader walks the dark side");
    assert_eq!(record.side, Some(Side::Dark));

    let again = oracle.lookup("Darth Vader").await.unwrap();
    assert_eq!(again, record);
    assert_eq!(hits.load(Ordering::SeqCst), 1);
    assert_eq!(oracle.cached("Darth Vader").await, Some(record));
  }

  #[tokio::test]
  async fn test_lookup_fails_soft() {
    let oracle = oracle_against(
      Router::new()
        .route(
          "/oracle-rolodex",
          get(|Query(params): Query<HashMap<String, String>>| async move {
            match params["name"].as_str() {
              "Garbled" => Json(json!({ "oracle_notes": "%%%" })).into_response(),
              "Silent" => Json(json!({})).into_response(),
              _ => StatusCode::INTERNAL_SERVER_ERROR.into_response(),
            }
          }),
        ),
    )
    .await;

    assert!(oracle.lookup("Garbled").await.is_none());
    assert!(oracle.lookup("Silent").await.is_none());
    assert!(oracle.lookup("Unlucky").await.is_none());
    assert!(oracle.cached("Garbled").await.is_none());
  }
}
