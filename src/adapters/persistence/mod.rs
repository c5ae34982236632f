//! Result cache adapters. Implement CachePort.
//!
//! `SqliteCache` persists across restarts; `MemoryCache` is process-local.

pub mod memory_cache;
pub mod sqlite_cache;

pub use memory_cache::MemoryCache;
pub use sqlite_cache::SqliteCache;

use chrono::{DateTime, Utc};
use std::time::Duration;

/// An entry is live while its age is strictly below `max_age`.
/// Timestamps in the future (clock skew) count as age zero.
pub(crate) fn is_live(stored_at: DateTime<Utc>, max_age: Duration) -> bool {
    let age = (Utc::now() - stored_at).to_std().unwrap_or_default();
    age < max_age
}
