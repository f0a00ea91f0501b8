//! Core traits and types for the caching system.

use color_eyre::Report;
use serde::{de::DeserializeOwned, Serialize};

/// Trait for records that can be cached.
pub trait Cacheable: Clone + Send + Sync + Serialize + DeserializeOwned {
  /// Name of the mapping field in the persisted cache file (e.g., "pokemon", "people")
  fn entity_type() -> &'static str;
}

/// Outcome of a single upstream request.
///
/// A not-found answer is a normal end-of-catalog signal, not an error, so it
/// gets its own variant. Any other failure keeps its cause for logging.
#[derive(Debug)]
pub enum Fetched<T> {
  Found(T),
  NotFound,
  Failed(Report),
}

impl<T> Fetched<T> {
  pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Fetched<U> {
    match self {
      Fetched::Found(value) => Fetched::Found(f(value)),
      Fetched::NotFound => Fetched::NotFound,
      Fetched::Failed(e) => Fetched::Failed(e),
    }
  }
}

/// Indicates where returned data came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheSource {
  /// Fresh data from network
  Network,
  /// Served from cache without a remote call
  Cache,
}

/// A record plus where it came from.
#[derive(Debug, Clone)]
pub struct CacheResult<T> {
  pub data: T,
  pub source: CacheSource,
}

impl<T> CacheResult<T> {
  pub fn from_network(data: T) -> Self {
    Self {
      data,
      source: CacheSource::Network,
    }
  }

  pub fn from_cache(data: T) -> Self {
    Self {
      data,
      source: CacheSource::Cache,
    }
  }
}
