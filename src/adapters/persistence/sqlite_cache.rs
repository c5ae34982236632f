//! SQLite-backed result cache via libsql.
//!
//! Single `cache_entries` table keyed by (namespace, key). Values are JSON
//! text; `stored_at` is Unix milliseconds. Saves overwrite wholesale.

use super::is_live;
use crate::domain::DomainError;
use crate::ports::{CachePort, CachedValue};
use chrono::{DateTime, Utc};
use libsql::{Database, params};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

const CACHE_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS cache_entries (
    namespace TEXT NOT NULL,
    key TEXT NOT NULL,
    value_json TEXT NOT NULL,
    stored_at INTEGER NOT NULL,
    PRIMARY KEY (namespace, key)
)"#;

fn cache_err(e: impl std::fmt::Display) -> DomainError {
    DomainError::Cache(e.to_string())
}

pub struct SqliteCache {
    db: Database,
    db_path: PathBuf,
}

impl SqliteCache {
    /// Connect to (or create) `cache.db` under `base_dir` and ensure the schema.
    /// Call once at startup; share the result via Arc.
    pub async fn connect(base_dir: impl AsRef<Path>) -> Result<Self, DomainError> {
        let base = base_dir.as_ref();
        std::fs::create_dir_all(base).map_err(cache_err)?;
        let db_path = base.join("cache.db");
        let path_str = db_path.to_string_lossy();
        let db = libsql::Builder::new_local(path_str.as_ref())
            .build()
            .await
            .map_err(cache_err)?;
        let conn = db.connect().map_err(cache_err)?;

        // PRAGMA returns a row; consume it (execute fails when rows are returned).
        let mut wal_rows = conn
            .query("PRAGMA journal_mode=WAL", ())
            .await
            .map_err(|e| DomainError::Cache(format!("WAL pragma failed: {}", e)))?;
        while wal_rows.next().await.map_err(cache_err)?.is_some() {}

        conn.execute(CACHE_TABLE, ()).await.map_err(cache_err)?;

        info!(path = %db_path.display(), "price cache connected");
        Ok(Self { db, db_path })
    }

    pub fn path(&self) -> &Path {
        &self.db_path
    }
}

#[async_trait::async_trait]
impl CachePort for SqliteCache {
    async fn load(
        &self,
        key: &str,
        max_age: Duration,
        namespace: &str,
    ) -> Result<Option<CachedValue>, DomainError> {
        let conn = self.db.connect().map_err(cache_err)?;
        let mut rows = conn
            .query(
                "SELECT value_json, stored_at FROM cache_entries WHERE namespace = ?1 AND key = ?2",
                params![namespace, key],
            )
            .await
            .map_err(cache_err)?;
        let Some(row) = rows.next().await.map_err(cache_err)? else {
            return Ok(None);
        };
        let value_json: String = row.get(0).map_err(cache_err)?;
        let stored_ms: i64 = row.get(1).map_err(cache_err)?;
        let Some(stored_at) = DateTime::<Utc>::from_timestamp_millis(stored_ms) else {
            return Ok(None);
        };
        if !is_live(stored_at, max_age) {
            debug!(key, namespace, "cache entry expired");
            return Ok(None);
        }
        let value = serde_json::from_str(&value_json).map_err(cache_err)?;
        Ok(Some(CachedValue { value, stored_at }))
    }

    async fn save(
        &self,
        key: &str,
        value: &serde_json::Value,
        namespace: &str,
    ) -> Result<(), DomainError> {
        let conn = self.db.connect().map_err(cache_err)?;
        let value_json = serde_json::to_string(value).map_err(cache_err)?;
        let now = Utc::now().timestamp_millis();
        conn.execute(
            r#"
            INSERT INTO cache_entries (namespace, key, value_json, stored_at)
            VALUES (?1, ?2, ?3, ?4)
            ON CONFLICT (namespace, key) DO UPDATE SET
                value_json = excluded.value_json,
                stored_at = excluded.stored_at
            "#,
            params![namespace, key, value_json, now],
        )
        .await
        .map_err(cache_err)?;
        Ok(())
    }

    async fn clear(
        &self,
        prefix: Option<&str>,
        namespace: Option<&str>,
    ) -> Result<usize, DomainError> {
        let conn = self.db.connect().map_err(cache_err)?;
        let removed = match (prefix, namespace) {
            (Some(prefix), Some(namespace)) => {
                conn.execute(
                    "DELETE FROM cache_entries WHERE namespace = ?1 AND substr(key, 1, length(?2)) = ?2",
                    params![namespace, prefix],
                )
                .await
            }
            (Some(prefix), None) => {
                conn.execute(
                    "DELETE FROM cache_entries WHERE substr(key, 1, length(?1)) = ?1",
                    params![prefix],
                )
                .await
            }
            (None, Some(namespace)) => {
                conn.execute(
                    "DELETE FROM cache_entries WHERE namespace = ?1",
                    params![namespace],
                )
                .await
            }
            (None, None) => conn.execute("DELETE FROM cache_entries", ()).await,
        }
        .map_err(cache_err)?;
        info!(?prefix, ?namespace, removed, "cache cleared");
        Ok(removed as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const TTL: Duration = Duration::from_secs(3600);

    #[tokio::test]
    async fn test_round_trip_and_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let cache = SqliteCache::connect(dir.path()).await.unwrap();
        assert!(cache.path().ends_with("cache.db"));

        cache.save("k1", &json!({"a": 1}), "ns").await.unwrap();
        let hit = cache.load("k1", TTL, "ns").await.unwrap().unwrap();
        assert_eq!(hit.value, json!({"a": 1}));

        cache.save("k1", &json!({"a": 2}), "ns").await.unwrap();
        let hit = cache.load("k1", TTL, "ns").await.unwrap().unwrap();
        assert_eq!(hit.value, json!({"a": 2}));

        // Namespaces are separate.
        assert!(cache.load("k1", TTL, "other").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_expired_entry_is_absent() {
        let dir = tempfile::tempdir().unwrap();
        let cache = SqliteCache::connect(dir.path()).await.unwrap();
        cache.save("k", &json!(1), "ns").await.unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(
            cache
                .load("k", Duration::from_millis(5), "ns")
                .await
                .unwrap()
                .is_none()
        );
        assert!(cache.load("k", TTL, "ns").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_clear_by_prefix_and_namespace() {
        let dir = tempfile::tempdir().unwrap();
        let cache = SqliteCache::connect(dir.path()).await.unwrap();
        cache.save("app_prices_1_US_software", &json!(1), "app_store").await.unwrap();
        cache.save("app_prices_1_TR_software", &json!(2), "app_store").await.unwrap();
        cache.save("other_key", &json!(3), "app_store").await.unwrap();
        cache.save("app_prices_9_US_software", &json!(4), "elsewhere").await.unwrap();

        let removed = cache
            .clear(Some("app_prices"), Some("app_store"))
            .await
            .unwrap();
        assert_eq!(removed, 2);
        assert!(cache.load("other_key", TTL, "app_store").await.unwrap().is_some());
        assert!(
            cache
                .load("app_prices_9_US_software", TTL, "elsewhere")
                .await
                .unwrap()
                .is_some()
        );

        assert_eq!(cache.clear(None, None).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_prefix_is_literal() {
        let dir = tempfile::tempdir().unwrap();
        let cache = SqliteCache::connect(dir.path()).await.unwrap();
        cache.save("a_b", &json!(1), "ns").await.unwrap();
        cache.save("axb", &json!(2), "ns").await.unwrap();
        assert_eq!(cache.clear(Some("a_"), None).await.unwrap(), 1);
        assert!(cache.load("axb", TTL, "ns").await.unwrap().is_some());
    }
}
