//! Multi-region price aggregation.
//!
//! One task per region, all polled concurrently and joined: cache read-through,
//! detail page fetch, extraction, currency conversion, cache write. Every
//! failure is folded into that region's record; nothing here returns `Err`.
//!
//! Rates are prepared once before the regions start, so a slow rate source
//! never counts against a region's timeout.

use crate::adapters::rates::round_cents;
use crate::adapters::storefront::{PageExtraction, extract, parse_price_text};
use crate::domain::plans::{find_common_plan, rank_records};
use crate::domain::{
    AppCandidate, BasePrice, DetailFetchError, InAppPurchase, PlatformFilter, PriceReport,
    PriceSource, RegionPriceRecord, RegionPrices, StoreId, regions,
};
use crate::ports::{CachePort, RatePort, StorefrontPort};
use futures::future::join_all;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Cache namespace of price records.
pub const PRICE_NAMESPACE: &str = "app_store";
/// Key prefix shared by all price records.
pub const PRICE_KEY_PREFIX: &str = "app_prices";

/// Fallback when neither the page nor the region table names a currency.
const FALLBACK_CURRENCY: &str = "USD";

/// Cache key of one `(app, region, platform)` record.
pub fn price_cache_key(store_id: StoreId, region: &str, platform: PlatformFilter) -> String {
    format!(
        "{}_{}_{}_{}",
        PRICE_KEY_PREFIX,
        store_id,
        region.to_uppercase(),
        platform.entity()
    )
}

#[derive(Debug, Clone)]
pub struct AggregatorSettings {
    /// Currency all prices are converted into.
    pub reference_currency: String,
    /// Region whose prices already are in the reference currency.
    pub reference_region: String,
    pub cache_ttl: Duration,
    /// Guard around the whole per-region procedure.
    pub region_timeout: Duration,
}

impl Default for AggregatorSettings {
    fn default() -> Self {
        Self {
            reference_currency: "CNY".to_string(),
            reference_region: "CN".to_string(),
            cache_ttl: Duration::from_secs(86_400),
            region_timeout: Duration::from_secs(20),
        }
    }
}

pub struct RegionAggregator {
    storefront: Arc<dyn StorefrontPort>,
    cache: Arc<dyn CachePort>,
    rates: Arc<dyn RatePort>,
    settings: AggregatorSettings,
}

impl RegionAggregator {
    pub fn new(
        storefront: Arc<dyn StorefrontPort>,
        cache: Arc<dyn CachePort>,
        rates: Arc<dyn RatePort>,
        settings: AggregatorSettings,
    ) -> Self {
        Self {
            storefront,
            cache,
            rates,
            settings,
        }
    }

    pub fn reference_currency(&self) -> &str {
        &self.settings.reference_currency
    }

    /// One record per region, in input order, whatever fails.
    pub async fn aggregate(
        &self,
        store_id: StoreId,
        platform: PlatformFilter,
        regions: &[String],
    ) -> Vec<RegionPriceRecord> {
        self.rates.prepare().await;
        let tasks = regions
            .iter()
            .map(|region| self.resolve_region(store_id, platform, region));
        let records = join_all(tasks).await;
        info!(
            app_id = store_id,
            regions = records.len(),
            ok = records.iter().filter(|r| r.is_ok()).count(),
            cached = records.iter().filter(|r| r.is_cached()).count(),
            "aggregation finished"
        );
        records
    }

    /// Aggregate, pick the common plan and rank.
    pub async fn build_report(
        &self,
        app: AppCandidate,
        platform: PlatformFilter,
        regions: &[String],
    ) -> PriceReport {
        let records = self.aggregate(app.store_id, platform, regions).await;
        let common_plan = find_common_plan(&records);
        let records = rank_records(records, common_plan.as_deref());
        PriceReport {
            app,
            platform,
            reference_currency: self.settings.reference_currency.clone(),
            common_plan,
            records,
        }
    }

    async fn resolve_region(
        &self,
        store_id: StoreId,
        platform: PlatformFilter,
        region: &str,
    ) -> RegionPriceRecord {
        let code = region.to_uppercase();
        let name = regions::display_name(&code);
        let guarded = tokio::time::timeout(
            self.settings.region_timeout,
            self.fetch_region_record(store_id, platform, &code, &name),
        )
        .await;
        match guarded {
            Ok(record) => record,
            Err(_) => {
                warn!(app_id = store_id, region = %code, "region timed out");
                RegionPriceRecord::error(code, name, "timed out")
            }
        }
    }

    async fn fetch_region_record(
        &self,
        store_id: StoreId,
        platform: PlatformFilter,
        code: &str,
        name: &str,
    ) -> RegionPriceRecord {
        let key = price_cache_key(store_id, code, platform);

        match self
            .cache
            .load(&key, self.settings.cache_ttl, PRICE_NAMESPACE)
            .await
        {
            Ok(Some(hit)) => match serde_json::from_value::<RegionPrices>(hit.value) {
                Ok(prices) => {
                    debug!(app_id = store_id, region = %code, "price cache hit");
                    return RegionPriceRecord::ok(
                        code,
                        name,
                        prices,
                        PriceSource::Cached {
                            stored_at: hit.stored_at,
                        },
                    );
                }
                Err(e) => warn!(key = %key, error = %e, "ignoring undecodable cache entry"),
            },
            Ok(None) => {}
            Err(e) => warn!(key = %key, error = %e, "cache read failed, fetching live"),
        }

        let html = match self.storefront.fetch_detail_page(store_id, code).await {
            Ok(html) => html,
            Err(DetailFetchError::NotListed) => return RegionPriceRecord::not_listed(code, name),
            Err(e) => {
                warn!(app_id = store_id, region = %code, error = %e, "detail page fetch failed");
                return RegionPriceRecord::error(code, name, e.to_string());
            }
        };

        let page = extract(&html);
        for warning in &page.warnings {
            debug!(app_id = store_id, region = %code, %warning, "extraction step skipped");
        }
        let (prices, rates_missing) = self.price_page(&page, code).await;

        if rates_missing {
            // Would sort last for a whole TTL; retry on the next request instead.
            debug!(app_id = store_id, region = %code, "not caching record without conversions");
            return RegionPriceRecord::ok(code, name, prices, PriceSource::Live);
        }
        match serde_json::to_value(&prices) {
            Ok(value) => {
                if let Err(e) = self.cache.save(&key, &value, PRICE_NAMESPACE).await {
                    warn!(key = %key, error = %e, "cache write failed");
                }
            }
            Err(e) => warn!(key = %key, error = %e, "price record not serializable"),
        }

        RegionPriceRecord::ok(code, name, prices, PriceSource::Live)
    }

    /// Turn an extraction into prices in the reference currency. The flag is
    /// set when some parsed price found no exchange rate.
    async fn price_page(&self, page: &PageExtraction, region: &str) -> (RegionPrices, bool) {
        let mut rates_missing = false;
        let is_reference = region.eq_ignore_ascii_case(&self.settings.reference_region);
        let authoritative = page.authoritative_currency();
        let page_currency = authoritative
            .or_else(|| regions::local_currency(region))
            .unwrap_or(FALLBACK_CURRENCY);

        let base = match page.offer.as_ref().filter(|o| !o.is_free) {
            None => BasePrice::free(page_currency),
            Some(offer) => {
                let converted = if is_reference {
                    Some(offer.price)
                } else {
                    let converted = self.to_reference(offer.price, page_currency).await;
                    rates_missing |= converted.is_none();
                    converted
                };
                BasePrice {
                    amount: offer.price,
                    currency: page_currency.to_string(),
                    converted,
                }
            }
        };

        let mut in_app_purchases = Vec::with_capacity(page.in_app_purchases.len());
        for raw in &page.in_app_purchases {
            let converted_price = match parse_price_text(&raw.price_text, region) {
                Ok(parsed) if is_reference => Some(parsed.amount),
                Ok(parsed) => {
                    // The page's declared currency beats the text-based guess.
                    let currency = authoritative.unwrap_or(parsed.currency.as_str());
                    let converted = self.to_reference(parsed.amount, currency).await;
                    rates_missing |= converted.is_none();
                    converted
                }
                Err(e) => {
                    debug!(region, item = %raw.name, error = %e, "in-app price not parsed");
                    None
                }
            };
            in_app_purchases.push(InAppPurchase {
                name: raw.name.clone(),
                price_text: raw.price_text.clone(),
                converted_price,
            });
        }

        (
            RegionPrices {
                base,
                in_app_purchases,
            },
            rates_missing,
        )
    }

    async fn to_reference(&self, amount: f64, currency: &str) -> Option<f64> {
        self.rates
            .convert(amount, currency, &self.settings.reference_currency)
            .await
            .map(round_cents)
    }
}
