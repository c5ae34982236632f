//! In-process fakes for tests. Network only to loopback servers started here.

use crate::adapters::rates::RateTable;
use crate::domain::{AppCandidate, AppKind, DetailFetchError, DomainError, StoreId};
use crate::ports::{AdminPort, RatePort, SearchRequest, StorefrontPort};
use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

/// Scripted response of a detail page fetch.
#[derive(Debug, Clone)]
pub enum FakePage {
    Html(String),
    NotFound,
    Transient(String),
    /// Never answers within any sane timeout.
    Hang,
}

/// Storefront with canned search hits, lookups and detail pages per region.
#[derive(Default)]
pub struct FakeStorefront {
    /// Keyed by `entity` (`None` = broadened search).
    pub search_hits: HashMap<Option<&'static str>, Vec<AppCandidate>>,
    pub search_error: Option<String>,
    pub lookups: HashMap<StoreId, AppCandidate>,
    pub pages: HashMap<String, FakePage>,
    pub search_calls: Mutex<Vec<SearchRequest>>,
    pub detail_calls: AtomicUsize,
}

impl FakeStorefront {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_page(mut self, region: &str, page: FakePage) -> Self {
        self.pages.insert(region.to_string(), page);
        self
    }

    pub fn with_hits(mut self, entity: Option<&'static str>, hits: Vec<AppCandidate>) -> Self {
        self.search_hits.insert(entity, hits);
        self
    }

    pub fn with_lookup(mut self, app: AppCandidate) -> Self {
        self.lookups.insert(app.store_id, app);
        self
    }

    pub fn detail_calls(&self) -> usize {
        self.detail_calls.load(Ordering::SeqCst)
    }

    pub fn searches(&self) -> Vec<SearchRequest> {
        self.search_calls.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl StorefrontPort for FakeStorefront {
    async fn search(&self, request: &SearchRequest) -> Result<Vec<AppCandidate>, DomainError> {
        self.search_calls.lock().unwrap().push(request.clone());
        if let Some(e) = &self.search_error {
            return Err(DomainError::Network(e.clone()));
        }
        Ok(self
            .search_hits
            .get(&request.entity)
            .cloned()
            .unwrap_or_default())
    }

    async fn fetch_detail_page(
        &self,
        _store_id: StoreId,
        region: &str,
    ) -> Result<String, DetailFetchError> {
        self.detail_calls.fetch_add(1, Ordering::SeqCst);
        match self.pages.get(region) {
            Some(FakePage::Html(html)) => Ok(html.clone()),
            Some(FakePage::NotFound) | None => Err(DetailFetchError::NotListed),
            Some(FakePage::Transient(msg)) => Err(DetailFetchError::Transient(msg.clone())),
            Some(FakePage::Hang) => {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Err(DetailFetchError::Transient("hung".into()))
            }
        }
    }

    async fn lookup_by_id(
        &self,
        store_id: StoreId,
        _region: &str,
    ) -> Result<Option<AppCandidate>, DomainError> {
        Ok(self.lookups.get(&store_id).cloned())
    }
}

/// Fixed rate table.
pub struct StaticRates {
    table: RateTable,
}

impl StaticRates {
    /// `rates`: units of each currency per one unit of `base`.
    pub fn new(base: &str, rates: &[(&str, f64)]) -> Self {
        let rates: HashMap<String, f64> = rates
            .iter()
            .map(|(code, rate)| (code.to_string(), *rate))
            .collect();
        Self {
            table: RateTable::new(base, rates),
        }
    }
}

#[async_trait::async_trait]
impl RatePort for StaticRates {
    async fn convert(&self, amount: f64, from: &str, to: &str) -> Option<f64> {
        self.table.convert(amount, from, to)
    }
}

/// Loopback HTTP server answering each request by path. `None` accepts the
/// connection and never replies. Returns the base URL.
pub async fn http_server(route: fn(&str) -> Option<(u16, String)>) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let mut parked = Vec::new();
        while let Ok((mut socket, _)) = listener.accept().await {
            let mut buf = vec![0u8; 8192];
            let n = socket.read(&mut buf).await.unwrap_or(0);
            let request = String::from_utf8_lossy(&buf[..n]);
            let path = request.split_whitespace().nth(1).unwrap_or("/").to_string();
            match route(&path) {
                Some((status, body)) => {
                    let response = format!(
                        "HTTP/1.1 {} Status\r\nContent-Type: text/html; charset=utf-8\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                        status,
                        body.len(),
                        body
                    );
                    let _ = socket.write_all(response.as_bytes()).await;
                    let _ = socket.shutdown().await;
                }
                None => parked.push(socket),
            }
        }
    });
    format!("http://{}", addr)
}

pub struct FixedAdmins(pub Vec<i64>);

#[async_trait::async_trait]
impl AdminPort for FixedAdmins {
    async fn can_manage_cache(&self, user_id: i64) -> Result<bool, DomainError> {
        Ok(self.0.contains(&user_id))
    }
}

pub fn app(id: StoreId, name: &str) -> AppCandidate {
    AppCandidate {
        store_id: id,
        name: name.to_string(),
        kind: AppKind::Software,
        supported_devices: vec!["iPhone15-iPhone15".into(), "iPadAir5-iPadAir5".into()],
        developer: None,
        formatted_price: None,
    }
}

pub fn mac_app(id: StoreId, name: &str) -> AppCandidate {
    AppCandidate {
        kind: AppKind::MacSoftware,
        supported_devices: vec![],
        ..app(id, name)
    }
}

/// Detail page with an offer block and IAP rows.
pub fn detail_html(price: f64, currency: &str, iaps: &[(&str, &str)]) -> String {
    let mut html = format!(
        r#"<html><script type="application/ld+json">{{"@type":"SoftwareApplication","offers":{{"price":{},"priceCurrency":"{}","category":"{}"}}}}</script><ol>"#,
        price,
        currency,
        if price > 0.0 { "paid" } else { "free" }
    );
    for (name, price_text) in iaps {
        html.push_str(&format!(
            r#"<li class="list-with-numbers__item"><span class="truncate-single-line truncate-single-line--block">{}</span><span class="list-with-numbers__item__price medium-show-tablecell">{}</span></li>"#,
            name, price_text
        ));
    }
    html.push_str("</ol></html>");
    html
}
