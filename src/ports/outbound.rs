//! Outbound ports. Application calls into infrastructure.
//!
//! Implemented by adapters.

use crate::domain::{AppCandidate, DetailFetchError, DomainError, StoreId};
use chrono::{DateTime, Utc};
use std::time::Duration;

/// One call to the storefront search endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchRequest {
    pub term: String,
    /// Region code the search runs in.
    pub region: String,
    /// `entity` filter; `None` searches all software.
    pub entity: Option<&'static str>,
    pub limit: u32,
}

/// Storefront gateway: search endpoint, id lookup, per-region detail pages.
#[async_trait::async_trait]
pub trait StorefrontPort: Send + Sync {
    /// Raw search hits in search-engine order. No platform filtering.
    async fn search(&self, request: &SearchRequest) -> Result<Vec<AppCandidate>, DomainError>;

    /// Detail page HTML of `store_id` in `region`.
    async fn fetch_detail_page(
        &self,
        store_id: StoreId,
        region: &str,
    ) -> Result<String, DetailFetchError>;

    /// Resolve a store id. `Ok(None)` when the storefront does not know it.
    async fn lookup_by_id(
        &self,
        store_id: StoreId,
        region: &str,
    ) -> Result<Option<AppCandidate>, DomainError>;
}

/// A cache hit together with the time it was written.
#[derive(Debug, Clone, PartialEq)]
pub struct CachedValue {
    pub value: serde_json::Value,
    pub stored_at: DateTime<Utc>,
}

/// Key → JSON value store with TTL and namespaces. TTL is enforced by the cache.
#[async_trait::async_trait]
pub trait CachePort: Send + Sync {
    /// Value under `key` if it is younger than `max_age`.
    async fn load(
        &self,
        key: &str,
        max_age: Duration,
        namespace: &str,
    ) -> Result<Option<CachedValue>, DomainError>;

    /// Write `value` under `key`, replacing any previous entry wholesale.
    async fn save(
        &self,
        key: &str,
        value: &serde_json::Value,
        namespace: &str,
    ) -> Result<(), DomainError>;

    /// Remove entries matching `prefix` and/or `namespace` (both `None` clears
    /// everything). Returns the number of removed entries.
    async fn clear(&self, prefix: Option<&str>, namespace: Option<&str>)
    -> Result<usize, DomainError>;
}

/// Currency converter backed by a refreshable rate table.
#[async_trait::async_trait]
pub trait RatePort: Send + Sync {
    /// Convert `amount` from one ISO currency to another. `None` when no rate
    /// is available. `from == to` is identity.
    async fn convert(&self, amount: f64, from: &str, to: &str) -> Option<f64>;

    /// Load or refresh rates ahead of a batch of conversions.
    async fn prepare(&self) {}
}

/// Administrative permission checks.
#[async_trait::async_trait]
pub trait AdminPort: Send + Sync {
    async fn can_manage_cache(&self, user_id: i64) -> Result<bool, DomainError>;
}
