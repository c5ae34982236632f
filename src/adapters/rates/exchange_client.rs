//! HTTP exchange-rate client with a TTL-refreshed rate table.
//!
//! Endpoint shape: `GET {api_url}/{BASE}` →
//! `{"result": "success", "rates": {"USD": 0.14, ...}}`.

use super::RateTable;
use crate::domain::DomainError;
use crate::ports::RatePort;
use reqwest::Client;
use serde::Deserialize;
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};

/// Pause between refresh attempts after one failed.
const RETRY_BACKOFF: Duration = Duration::from_secs(60);

struct CachedTable {
    table: RateTable,
    fetched_at: Instant,
}

pub struct ExchangeRateClient {
    http: Client,
    api_url: String,
    base: String,
    ttl: Duration,
    table: RwLock<Option<CachedTable>>,
    /// When the last refresh failed. Lookups skip the network until the
    /// backoff has passed.
    failed_at: RwLock<Option<Instant>>,
    retry_backoff: Duration,
    /// Serializes refreshes so concurrent region tasks trigger one fetch.
    refresh_gate: Mutex<()>,
}

#[derive(Deserialize)]
struct RatesResponse {
    result: String,
    #[serde(default)]
    rates: HashMap<String, f64>,
    #[serde(default, rename = "error-type")]
    error_type: Option<String>,
}

impl ExchangeRateClient {
    pub fn new(
        api_url: &str,
        base: &str,
        ttl: Duration,
        timeout: Duration,
    ) -> Result<Self, DomainError> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| DomainError::Config(format!("building rates HTTP client: {}", e)))?;
        Ok(Self {
            http,
            api_url: api_url.trim_end_matches('/').to_string(),
            base: base.to_uppercase(),
            ttl,
            table: RwLock::new(None),
            failed_at: RwLock::new(None),
            retry_backoff: RETRY_BACKOFF,
            refresh_gate: Mutex::new(()),
        })
    }

    pub fn with_retry_backoff(mut self, backoff: Duration) -> Self {
        self.retry_backoff = backoff;
        self
    }

    async fn fetch_table(&self) -> Result<RateTable, DomainError> {
        let url = format!("{}/{}", self.api_url, self.base);
        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| DomainError::Rates(format!("request failed: {}", e)))?;
        if !response.status().is_success() {
            return Err(DomainError::Rates(format!(
                "HTTP {}",
                response.status().as_u16()
            )));
        }
        let body: RatesResponse = response
            .json()
            .await
            .map_err(|e| DomainError::Rates(format!("decoding rates: {}", e)))?;
        if body.result != "success" {
            return Err(DomainError::Rates(
                body.error_type.unwrap_or_else(|| body.result.clone()),
            ));
        }
        Ok(RateTable::new(&self.base, body.rates))
    }

    fn is_fresh(&self, cached: &Option<CachedTable>) -> bool {
        cached
            .as_ref()
            .is_some_and(|c| c.fetched_at.elapsed() < self.ttl)
    }

    async fn backing_off(&self) -> bool {
        self.failed_at
            .read()
            .await
            .is_some_and(|at| at.elapsed() < self.retry_backoff)
    }

    async fn needs_refresh(&self) -> bool {
        let fresh = self.is_fresh(&*self.table.read().await);
        !fresh && !self.backing_off().await
    }

    /// Refresh the table when stale. A failed refresh keeps the stale table
    /// and suppresses further attempts for `retry_backoff`.
    async fn ensure_fresh(&self) {
        if !self.needs_refresh().await {
            return;
        }
        let _gate = self.refresh_gate.lock().await;
        // Another task may have refreshed, or failed to, while we waited.
        if !self.needs_refresh().await {
            return;
        }
        match self.fetch_table().await {
            Ok(table) => {
                info!(base = %self.base, currencies = table.rates.len(), "exchange rates refreshed");
                *self.table.write().await = Some(CachedTable {
                    table,
                    fetched_at: Instant::now(),
                });
                *self.failed_at.write().await = None;
            }
            Err(e) => {
                warn!(
                    base = %self.base,
                    error = %e,
                    retry_in_secs = self.retry_backoff.as_secs(),
                    "exchange rate refresh failed"
                );
                *self.failed_at.write().await = Some(Instant::now());
            }
        }
    }
}

#[async_trait::async_trait]
impl RatePort for ExchangeRateClient {
    async fn convert(&self, amount: f64, from: &str, to: &str) -> Option<f64> {
        if from.eq_ignore_ascii_case(to) {
            return Some(amount);
        }
        self.ensure_fresh().await;
        let guard = self.table.read().await;
        let converted = guard.as_ref()?.table.convert(amount, from, to);
        if converted.is_none() {
            debug!(from, to, "no exchange rate available");
        }
        converted
    }

    async fn prepare(&self) {
        self.ensure_fresh().await;
    }
}
