//! Implements StorefrontPort against the public iTunes Search API and the
//! per-country App Store web pages.

use crate::domain::{AppCandidate, AppKind, DetailFetchError, DomainError, StoreId};
use crate::ports::{SearchRequest, StorefrontPort};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, info, warn};

pub const DEFAULT_API_BASE: &str = "https://itunes.apple.com";
pub const DEFAULT_WEB_BASE: &str = "https://apps.apple.com";

/// HTTP gateway to the storefront.
pub struct ItunesStorefront {
    client: Client,
    api_base: String,
    web_base: String,
    search_timeout: Duration,
    page_timeout: Duration,
}

impl ItunesStorefront {
    /// Create a gateway against the public endpoints.
    ///
    /// # Arguments
    /// * `user_agent` - sent with every request
    /// * `search_timeout` - per-request timeout for search and lookup calls
    /// * `page_timeout` - per-request timeout for detail pages
    pub fn new(
        user_agent: &str,
        search_timeout: Duration,
        page_timeout: Duration,
    ) -> Result<Self, DomainError> {
        Self::with_base_urls(
            user_agent,
            search_timeout,
            page_timeout,
            DEFAULT_API_BASE,
            DEFAULT_WEB_BASE,
        )
    }

    pub fn with_base_urls(
        user_agent: &str,
        search_timeout: Duration,
        page_timeout: Duration,
        api_base: &str,
        web_base: &str,
    ) -> Result<Self, DomainError> {
        let client = Client::builder()
            .user_agent(user_agent)
            .build()
            .map_err(|e| DomainError::Config(format!("building HTTP client: {}", e)))?;
        Ok(Self {
            client,
            api_base: api_base.trim_end_matches('/').to_string(),
            web_base: web_base.trim_end_matches('/').to_string(),
            search_timeout,
            page_timeout,
        })
    }

    fn detail_url(&self, store_id: StoreId, region: &str) -> String {
        format!(
            "{}/{}/app/id{}",
            self.web_base,
            region.to_lowercase(),
            store_id
        )
    }

    async fn get_json<T: for<'de> Deserialize<'de>>(
        &self,
        url: &str,
        query: &[(&str, String)],
    ) -> Result<T, DomainError> {
        let response = self
            .client
            .get(url)
            .query(query)
            .header("Accept", "application/json, text/plain, */*")
            .timeout(self.search_timeout)
            .send()
            .await
            .map_err(|e| DomainError::Network(describe_request_error(&e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            warn!(status = %status, url, "storefront API returned error");
            return Err(DomainError::Network(format!(
                "HTTP {}: {}",
                status.as_u16(),
                text.chars().take(200).collect::<String>()
            )));
        }

        response
            .json()
            .await
            .map_err(|e| DomainError::Parse(format!("storefront API response: {}", e)))
    }
}

/// Search/lookup response envelope.
#[derive(Deserialize)]
struct ResultsEnvelope {
    #[serde(default)]
    results: Vec<WireApp>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireApp {
    track_id: Option<StoreId>,
    track_name: Option<String>,
    #[serde(default)]
    kind: String,
    #[serde(default)]
    supported_devices: Vec<String>,
    artist_name: Option<String>,
    formatted_price: Option<String>,
}

impl WireApp {
    /// Hits without an id cannot be priced and are dropped.
    fn into_candidate(self) -> Option<AppCandidate> {
        Some(AppCandidate {
            store_id: self.track_id?,
            name: self.track_name.unwrap_or_else(|| "Unknown app".to_string()),
            kind: AppKind::from_wire(&self.kind),
            supported_devices: self.supported_devices,
            developer: self.artist_name,
            formatted_price: self.formatted_price,
        })
    }
}

fn describe_request_error(e: &reqwest::Error) -> String {
    if e.is_timeout() {
        "timed out".to_string()
    } else if e.is_connect() {
        format!("connection failed: {}", e)
    } else {
        format!("network error: {}", e)
    }
}

#[async_trait::async_trait]
impl StorefrontPort for ItunesStorefront {
    async fn search(&self, request: &SearchRequest) -> Result<Vec<AppCandidate>, DomainError> {
        let mut query = vec![
            ("term", request.term.clone()),
            ("country", request.region.to_lowercase()),
            ("media", "software".to_string()),
            ("limit", request.limit.to_string()),
        ];
        match request.entity {
            Some(entity) => query.push(("entity", entity.to_string())),
            None => query.push(("explicit", "Yes".to_string())),
        }

        let url = format!("{}/search", self.api_base);
        let envelope: ResultsEnvelope = self.get_json(&url, &query).await?;
        let candidates: Vec<AppCandidate> = envelope
            .results
            .into_iter()
            .filter_map(WireApp::into_candidate)
            .collect();
        debug!(
            term = %request.term,
            region = %request.region,
            entity = request.entity.unwrap_or("*"),
            hits = candidates.len(),
            "storefront search"
        );
        Ok(candidates)
    }

    async fn fetch_detail_page(
        &self,
        store_id: StoreId,
        region: &str,
    ) -> Result<String, DetailFetchError> {
        let url = self.detail_url(store_id, region);
        let response = self
            .client
            .get(&url)
            .timeout(self.page_timeout)
            .send()
            .await
            .map_err(|e| DetailFetchError::Transient(describe_request_error(&e)))?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            info!(app_id = store_id, region, "app not listed (404)");
            return Err(DetailFetchError::NotListed);
        }
        if !status.is_success() {
            warn!(app_id = store_id, region, status = %status, "detail page HTTP error");
            return Err(DetailFetchError::Transient(format!("HTTP {}", status.as_u16())));
        }

        response
            .text()
            .await
            .map_err(|e| DetailFetchError::ParseUnavailable(e.to_string()))
    }

    async fn lookup_by_id(
        &self,
        store_id: StoreId,
        region: &str,
    ) -> Result<Option<AppCandidate>, DomainError> {
        let url = format!("{}/lookup", self.api_base);
        let query = [
            ("id", store_id.to_string()),
            ("country", region.to_lowercase()),
        ];
        let envelope: ResultsEnvelope = self.get_json(&url, &query).await?;
        Ok(envelope
            .results
            .into_iter()
            .find_map(WireApp::into_candidate))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::usecases::test_support::http_server;

    fn route(path: &str) -> Option<(u16, String)> {
        match path {
            "/us/app/id1" => Some((200, "<html>ok</html>".to_string())),
            "/tr/app/id1" => Some((404, "not found".to_string())),
            "/in/app/id1" => Some((503, "busy".to_string())),
            p if p.starts_with("/search?") && p.contains("entity=macSoftware") => Some((
                200,
                r#"{"resultCount":1,"results":[{"trackId":9,"trackName":"Mac Tool","kind":"mac-software"}]}"#
                    .to_string(),
            )),
            p if p.starts_with("/search?") => Some((500, "boom".to_string())),
            // Anything else (e.g. /jp/...) stalls.
            _ => None,
        }
    }

    async fn local_client() -> ItunesStorefront {
        let base = http_server(route).await;
        ItunesStorefront::with_base_urls(
            "test",
            Duration::from_secs(2),
            Duration::from_millis(300),
            &base,
            &base,
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_detail_page_status_mapping() {
        let client = local_client().await;
        assert_eq!(
            client.fetch_detail_page(1, "US").await.unwrap(),
            "<html>ok</html>"
        );
        assert!(matches!(
            client.fetch_detail_page(1, "TR").await,
            Err(DetailFetchError::NotListed)
        ));
        match client.fetch_detail_page(1, "IN").await {
            Err(DetailFetchError::Transient(msg)) => assert_eq!(msg, "HTTP 503"),
            other => panic!("expected transient HTTP error, got {:?}", other),
        }
        match client.fetch_detail_page(1, "JP").await {
            Err(DetailFetchError::Transient(msg)) => assert_eq!(msg, "timed out"),
            other => panic!("expected timeout, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_search_over_http() {
        let client = local_client().await;
        let hits = client
            .search(&SearchRequest {
                term: "tool".into(),
                region: "US".into(),
                entity: Some("macSoftware"),
                limit: 200,
            })
            .await
            .unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].kind, AppKind::MacSoftware);

        let err = client
            .search(&SearchRequest {
                term: "tool".into(),
                region: "US".into(),
                entity: None,
                limit: 200,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::Network(msg) if msg.starts_with("HTTP 500")));
    }

    #[test]
    fn test_wire_app_mapping() {
        let json = r#"{"results":[
            {"trackId":310633997,"trackName":"WhatsApp Messenger","kind":"software",
             "supportedDevices":["iPhone15-iPhone15","iPadAir5-iPadAir5"],
             "artistName":"WhatsApp Inc.","formattedPrice":"Free"},
            {"trackName":"No id"},
            {"trackId":1,"kind":"mac-software"}
        ]}"#;
        let envelope: ResultsEnvelope = serde_json::from_str(json).unwrap();
        let apps: Vec<AppCandidate> = envelope
            .results
            .into_iter()
            .filter_map(WireApp::into_candidate)
            .collect();
        assert_eq!(apps.len(), 2);
        assert_eq!(apps[0].store_id, 310633997);
        assert_eq!(apps[0].supported_devices.len(), 2);
        assert_eq!(apps[0].developer.as_deref(), Some("WhatsApp Inc."));
        assert_eq!(apps[1].kind, AppKind::MacSoftware);
        assert_eq!(apps[1].name, "Unknown app");
    }

    #[test]
    fn test_detail_url() {
        let client = ItunesStorefront::with_base_urls(
            "test",
            Duration::from_secs(1),
            Duration::from_secs(1),
            "http://api.local/",
            "http://web.local/",
        )
        .unwrap();
        assert_eq!(client.detail_url(42, "TR"), "http://web.local/tr/app/id42");
    }
}
