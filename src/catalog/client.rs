use color_eyre::{eyre::eyre, Result};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use std::time::Duration;
use url::Url;

use crate::cache::Fetched;

/// Header carrying the shared secret
const API_KEY_HEADER: &str = "API-KEY";

/// Whether a request should carry the shared API key
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Auth {
  None,
  ApiKey,
}

/// HTTP client shared by every upstream catalog
#[derive(Clone)]
pub struct UpstreamClient {
  http: reqwest::Client,
  api_key: Option<String>,
}

impl UpstreamClient {
  pub fn new(api_key: Option<String>) -> Result<Self> {
    let http = reqwest::Client::builder()
      .timeout(Duration::from_secs(30))
      .user_agent(concat!("cosmocache/", env!("CARGO_PKG_VERSION")))
      .build()
      .map_err(|e| eyre!("Failed to create HTTP client: {}", e))?;

    Ok(Self { http, api_key })
  }

  /// GET a JSON document.
  ///
  /// A 404 answer is `NotFound`; transport errors, other non-success
  /// statuses and undecodable bodies are `Failed`.
  pub async fn get_json<T: DeserializeOwned>(&self, url: Url, auth: Auth) -> Fetched<T> {
    let mut request = self.http.get(url.clone());
    if auth == Auth::ApiKey {
      if let Some(key) = &self.api_key {
        request = request.header(API_KEY_HEADER, key);
      }
    }

    let response = match request.send().await {
      Ok(response) => response,
      Err(e) => return Fetched::Failed(eyre!("Request to {} failed: {}", url, e)),
    };

    let status = response.status();
    if status == StatusCode::NOT_FOUND {
      return Fetched::NotFound;
    }
    if !status.is_success() {
      return Fetched::Failed(eyre!("{} answered {}", url, status));
    }

    match response.json::<T>().await {
      Ok(body) => Fetched::Found(body),
      Err(e) => Fetched::Failed(eyre!("Failed to parse response from {}: {}", url, e)),
    }
  }
}

/// Append path segments to a base URL.
///
/// A trailing empty segment yields a trailing slash.
pub fn endpoint(base: &str, segments: &[&str]) -> Result<Url> {
  let mut url = Url::parse(base).map_err(|e| eyre!("Invalid base URL {}: {}", base, e))?;
  url
    .path_segments_mut()
    .map_err(|_| eyre!("Base URL cannot have a path: {}", base))?
    .pop_if_empty()
    .extend(segments);
  Ok(url)
}

/// Base URL with one query parameter appended.
pub fn with_query(base: &str, key: &str, value: &str) -> Result<Url> {
  let mut url = Url::parse(base).map_err(|e| eyre!("Invalid base URL {}: {}", base, e))?;
  url.query_pairs_mut().append_pair(key, value);
  Ok(url)
}
