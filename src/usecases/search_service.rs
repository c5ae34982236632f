//! Free-text search with the one-shot broadening fallback and platform
//! post-filtering.

use crate::domain::platform::filter_candidates;
use crate::domain::{AppCandidate, DomainError, PlatformFilter, StoreId};
use crate::ports::{SearchRequest, StorefrontPort};
use std::sync::Arc;
use tracing::{info, warn};

/// Candidates of one search run. A failed request yields no candidates and
/// an error message instead of an `Err`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchOutcome {
    pub candidates: Vec<AppCandidate>,
    pub error: Option<String>,
}

pub struct SearchService {
    storefront: Arc<dyn StorefrontPort>,
    limit: u32,
}

impl SearchService {
    pub fn new(storefront: Arc<dyn StorefrontPort>, limit: u32) -> Self {
        Self { storefront, limit }
    }

    /// Search `term` in `region` for `platform`. Never fails.
    ///
    /// A non-default platform that finds nothing is retried once without the
    /// entity filter; the broadened hits still go through platform filtering.
    pub async fn search(&self, term: &str, region: &str, platform: PlatformFilter) -> SearchOutcome {
        match self.search_with_fallback(term, region, platform).await {
            Ok(raw) => {
                let raw_count = raw.len();
                let candidates = filter_candidates(raw, platform);
                info!(
                    term,
                    region,
                    platform = platform.entity(),
                    raw = raw_count,
                    kept = candidates.len(),
                    "search finished"
                );
                SearchOutcome {
                    candidates,
                    error: None,
                }
            }
            Err(e) => {
                warn!(term, region, error = %e, "search failed");
                SearchOutcome {
                    candidates: Vec::new(),
                    error: Some(e.to_string()),
                }
            }
        }
    }

    async fn search_with_fallback(
        &self,
        term: &str,
        region: &str,
        platform: PlatformFilter,
    ) -> Result<Vec<AppCandidate>, DomainError> {
        let mut request = SearchRequest {
            term: term.to_string(),
            region: region.to_string(),
            entity: Some(platform.entity()),
            limit: self.limit,
        };
        let hits = self.storefront.search(&request).await?;
        if !hits.is_empty() || platform == PlatformFilter::Default {
            return Ok(hits);
        }

        info!(term, region, platform = platform.entity(), "no hits, broadening search");
        request.entity = None;
        self.storefront.search(&request).await
    }

    /// Resolve a store id. `Ok(None)` when unknown.
    pub async fn lookup(
        &self,
        store_id: StoreId,
        region: &str,
    ) -> Result<Option<AppCandidate>, DomainError> {
        self.storefront.lookup_by_id(store_id, region).await
    }
}
