//! Process-local result cache. Used when no data directory is writable, and
//! in tests.

use super::is_live;
use crate::domain::DomainError;
use crate::ports::{CachePort, CachedValue};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::RwLock;

type Entries = HashMap<(String, String), (serde_json::Value, DateTime<Utc>)>;

#[derive(Default)]
pub struct MemoryCache {
    entries: RwLock<Entries>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn entry_count(&self) -> usize {
        self.entries.read().await.len()
    }
}

#[async_trait::async_trait]
impl CachePort for MemoryCache {
    async fn load(
        &self,
        key: &str,
        max_age: Duration,
        namespace: &str,
    ) -> Result<Option<CachedValue>, DomainError> {
        let entries = self.entries.read().await;
        Ok(entries
            .get(&(namespace.to_string(), key.to_string()))
            .filter(|(_, stored_at)| is_live(*stored_at, max_age))
            .map(|(value, stored_at)| CachedValue {
                value: value.clone(),
                stored_at: *stored_at,
            }))
    }

    async fn save(
        &self,
        key: &str,
        value: &serde_json::Value,
        namespace: &str,
    ) -> Result<(), DomainError> {
        self.entries.write().await.insert(
            (namespace.to_string(), key.to_string()),
            (value.clone(), Utc::now()),
        );
        Ok(())
    }

    async fn clear(
        &self,
        prefix: Option<&str>,
        namespace: Option<&str>,
    ) -> Result<usize, DomainError> {
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|(ns, key), _| {
            let ns_match = namespace.is_none_or(|n| n == ns);
            let prefix_match = prefix.is_none_or(|p| key.starts_with(p));
            !(ns_match && prefix_match)
        });
        Ok(before - entries.len())
    }
}
