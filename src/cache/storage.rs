//! Write-through JSON file storage for cached records.

use chrono::{DateTime, Duration, TimeZone, Utc};
use color_eyre::{eyre::eyre, Result};
use serde_json::{Map, Value};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use super::traits::Cacheable;

/// Field holding the refresh timestamp (epoch millis) in the cache file.
const LAST_FETCH_FIELD: &str = "lastFetch";

/// Flattened CSV mirror regenerated on every persist.
pub struct CsvExport<T> {
  pub path: PathBuf,
  pub header: &'static str,
  /// Renders one line (without newline) for a key and its record
  pub row: fn(&str, &T) -> String,
}

struct CacheState<T> {
  entries: BTreeMap<String, T>,
  /// When the whole catalog was last refreshed, epoch millis
  last_fetch: Option<i64>,
}

/// Key-value cache mirrored to a JSON file.
///
/// Every mutation rewrites the whole file while the state lock is held, so
/// concurrent writers never interleave and the file is at most one record
/// behind memory. Storage failures are logged and swallowed.
pub struct DiskCache<T: Cacheable> {
  /// `None` keeps the cache in memory only
  path: Option<PathBuf>,
  csv: Option<CsvExport<T>>,
  ttl: Duration,
  state: Mutex<CacheState<T>>,
}

impl<T: Cacheable> DiskCache<T> {
  /// Open the cache backed by `path`, loading whatever is already there.
  pub async fn open(path: impl Into<PathBuf>, ttl: Duration) -> Self {
    let path = path.into();
    let state = match load_file::<T>(&path).await {
      Ok(Some(state)) => {
        info!(
          path = %path.display(),
          entries = state.entries.len(),
          entity = T::entity_type(),
          "Cache loaded from file"
        );
        state
      }
      Ok(None) => {
        debug!(path = %path.display(), "No cache file, starting cold");
        CacheState::empty()
      }
      Err(e) => {
        warn!(path = %path.display(), error = %e, "Failed to load cache, starting empty");
        CacheState::empty()
      }
    };

    Self {
      path: Some(path),
      csv: None,
      ttl,
      state: Mutex::new(state),
    }
  }

  /// Create a cache that never touches the disk.
  #[cfg(test)]
  pub fn in_memory(ttl: Duration) -> Self {
    Self {
      path: None,
      csv: None,
      ttl,
      state: Mutex::new(CacheState::empty()),
    }
  }

  /// Also regenerate a CSV export on every persist.
  pub fn with_csv(mut self, export: CsvExport<T>) -> Self {
    self.csv = Some(export);
    self
  }

  pub async fn get(&self, key: &str) -> Option<T> {
    self.state.lock().await.entries.get(key).cloned()
  }

  /// Insert a record and persist the whole cache before returning.
  pub async fn put(&self, key: impl Into<String>, record: T) {
    let mut state = self.state.lock().await;
    state.entries.insert(key.into(), record);
    self.persist_locked(&state).await;
  }

  /// All records, numeric keys in ascending numeric order first.
  pub async fn values(&self) -> Vec<T> {
    let state = self.state.lock().await;
    let mut entries: Vec<(&String, &T)> = state.entries.iter().collect();
    entries.sort_by(|(a, _), (b, _)| compare_keys(a, b));
    entries.into_iter().map(|(_, v)| v.clone()).collect()
  }

  /// Drop every entry whose key fails `keep`, persisting only if one went.
  pub async fn retain(&self, mut keep: impl FnMut(&str) -> bool) {
    let mut state = self.state.lock().await;
    let before = state.entries.len();
    state.entries.retain(|key, _| keep(key));
    if state.entries.len() != before {
      self.persist_locked(&state).await;
    }
  }

  #[cfg(test)]
  pub async fn len(&self) -> usize {
    self.state.lock().await.entries.len()
  }

  /// True while the last full refresh is younger than the TTL.
  ///
  /// Only gates whole-catalog refreshes; individual `get` calls ignore it.
  pub async fn is_valid(&self) -> bool {
    self.is_valid_at(Utc::now()).await
  }

  pub async fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
    let last_fetch = self.state.lock().await.last_fetch;
    match last_fetch.and_then(|ms| Utc.timestamp_millis_opt(ms).single()) {
      Some(fetched_at) => now - fetched_at < self.ttl,
      None => false,
    }
  }

  /// Record a completed full refresh and persist.
  pub async fn mark_refreshed(&self) {
    self.mark_refreshed_at(Utc::now()).await;
  }

  pub async fn mark_refreshed_at(&self, now: DateTime<Utc>) {
    let mut state = self.state.lock().await;
    state.last_fetch = Some(now.timestamp_millis());
    self.persist_locked(&state).await;
  }

  async fn persist_locked(&self, state: &CacheState<T>) {
    let Some(path) = &self.path else {
      return;
    };

    match write_file(path, state).await {
      Ok(()) => debug!(path = %path.display(), entries = state.entries.len(), "Cache saved to file"),
      Err(e) => warn!(path = %path.display(), error = %e, "Failed to save cache"),
    }

    if let Some(csv) = &self.csv {
      match write_csv(csv, &state.entries).await {
        Ok(()) => debug!(path = %csv.path.display(), "CSV export saved"),
        Err(e) => warn!(path = %csv.path.display(), error = %e, "Failed to save CSV export"),
      }
    }
  }
}

impl<T> CacheState<T> {
  fn empty() -> Self {
    Self {
      entries: BTreeMap::new(),
      last_fetch: None,
    }
  }
}

/// Read a cache file. A missing file yields `Ok(None)`.
async fn load_file<T: Cacheable>(path: &Path) -> Result<Option<CacheState<T>>> {
  let contents = match tokio::fs::read_to_string(path).await {
    Ok(contents) => contents,
    Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
    Err(e) => return Err(eyre!("Failed to read cache file: {}", e)),
  };

  let mut document: Map<String, Value> =
    serde_json::from_str(&contents).map_err(|e| eyre!("Failed to parse cache file: {}", e))?;

  let entries = match document.remove(T::entity_type()) {
    Some(Value::Null) | None => BTreeMap::new(),
    Some(value) => serde_json::from_value(value)
      .map_err(|e| eyre!("Failed to parse {} entries: {}", T::entity_type(), e))?,
  };

  // Written by other tools as a float at times
  let last_fetch = document.get(LAST_FETCH_FIELD).and_then(|v| {
    v.as_i64().or_else(|| v.as_f64().map(|f| f as i64))
  });

  Ok(Some(CacheState {
    entries,
    last_fetch,
  }))
}

async fn write_file<T: Cacheable>(path: &Path, state: &CacheState<T>) -> Result<()> {
  ensure_parent(path).await?;

  let mut document = Map::new();
  document.insert(
    T::entity_type().to_string(),
    serde_json::to_value(&state.entries).map_err(|e| eyre!("Failed to serialize cache: {}", e))?,
  );
  document.insert(
    LAST_FETCH_FIELD.to_string(),
    state.last_fetch.map(Value::from).unwrap_or(Value::Null),
  );

  let data = serde_json::to_vec_pretty(&document)
    .map_err(|e| eyre!("Failed to serialize cache: {}", e))?;

  // Write next to the target and rename so readers never see a torn file
  let tmp = path.with_extension("json.tmp");
  tokio::fs::write(&tmp, data)
    .await
    .map_err(|e| eyre!("Failed to write {}: {}", tmp.display(), e))?;
  tokio::fs::rename(&tmp, path)
    .await
    .map_err(|e| eyre!("Failed to replace {}: {}", path.display(), e))?;

  Ok(())
}

async fn write_csv<T>(export: &CsvExport<T>, entries: &BTreeMap<String, T>) -> Result<()> {
  ensure_parent(&export.path).await?;

  let mut keys: Vec<&String> = entries.keys().collect();
  keys.sort_by(|a, b| compare_keys(a, b));

  let mut content = String::from(export.header);
  content.push('\n');
  for key in keys {
    content.push_str(&(export.row)(key, &entries[key]));
    content.push('\n');
  }

  tokio::fs::write(&export.path, content)
    .await
    .map_err(|e| eyre!("Failed to write {}: {}", export.path.display(), e))
}

async fn ensure_parent(path: &Path) -> Result<()> {
  if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
    tokio::fs::create_dir_all(parent)
      .await
      .map_err(|e| eyre!("Failed to create cache directory: {}", e))?;
  }
  Ok(())
}

/// Numeric keys sort numerically and before any other key.
fn compare_keys(a: &str, b: &str) -> Ordering {
  match (a.parse::<u64>(), b.parse::<u64>()) {
    (Ok(a), Ok(b)) => a.cmp(&b),
    (Ok(_), Err(_)) => Ordering::Less,
    (Err(_), Ok(_)) => Ordering::Greater,
    (Err(_), Err(_)) => a.cmp(b),
  }
}
