//! Generic write-through caching for catalog records.
//!
//! This module provides a catalog-agnostic caching mechanism that:
//! - Keeps records keyed by id or name, mirrored to a JSON file on every write
//! - Tracks one refresh timestamp per cache with a fixed validity window
//! - Walks remote catalogs sequentially (by id, by bounded range, or by page)
//!   consulting the cache before every request

mod layer;
mod storage;
mod traits;

pub use layer::CacheLayer;
pub use storage::{CsvExport, DiskCache};
pub use traits::{Cacheable, Fetched};
