//! Domain entities. Pure data structures for the core business.
//!
//! No HTTP/HTML types here; adapters map storefront payloads into these.

use crate::domain::platform::PlatformFilter;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Numeric storefront identifier of an app (`trackId`).
pub type StoreId = u64;

/// Storefront `kind` of a search hit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AppKind {
    Software,
    MacSoftware,
    #[serde(other)]
    Other,
}

impl AppKind {
    pub fn from_wire(kind: &str) -> Self {
        match kind {
            "software" => AppKind::Software,
            "mac-software" => AppKind::MacSoftware,
            _ => AppKind::Other,
        }
    }

    pub fn is_mac_only(self) -> bool {
        self == AppKind::MacSoftware
    }
}

/// A single search hit. Immutable once fetched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppCandidate {
    pub store_id: StoreId,
    pub name: String,
    pub kind: AppKind,
    /// Declared device list. Empty means the storefront did not declare one.
    #[serde(default)]
    pub supported_devices: Vec<String>,
    #[serde(default)]
    pub developer: Option<String>,
    #[serde(default)]
    pub formatted_price: Option<String>,
}

/// A secondary purchasable item listed on the detail page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InAppPurchase {
    pub name: String,
    /// Price exactly as shown on the page (e.g. "₺129,99").
    pub price_text: String,
    /// Price in the reporting currency; `None` when conversion was unavailable.
    pub converted_price: Option<f64>,
}

/// Base price of the app itself.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BasePrice {
    pub amount: f64,
    pub currency: String,
    /// Price in the reporting currency; `None` when conversion was unavailable.
    pub converted: Option<f64>,
}

impl BasePrice {
    pub fn free(currency: impl Into<String>) -> Self {
        Self {
            amount: 0.0,
            currency: currency.into(),
            converted: Some(0.0),
        }
    }

    pub fn is_free(&self) -> bool {
        self.amount <= 0.0
    }
}

/// Prices found in one region. This is what the price cache stores.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegionPrices {
    pub base: BasePrice,
    pub in_app_purchases: Vec<InAppPurchase>,
}

/// Where an `ok` record came from.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum PriceSource {
    Live,
    Cached { stored_at: DateTime<Utc> },
}

/// Outcome of aggregating one region. Each tag carries only its valid fields,
/// so a non-ok record cannot hold prices.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RegionOutcome {
    Ok {
        prices: RegionPrices,
        source: PriceSource,
    },
    NotListed,
    Error {
        message: String,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegionPriceRecord {
    pub region_code: String,
    pub region_name: String,
    pub outcome: RegionOutcome,
}

impl RegionPriceRecord {
    pub fn ok(
        region_code: impl Into<String>,
        region_name: impl Into<String>,
        prices: RegionPrices,
        source: PriceSource,
    ) -> Self {
        Self {
            region_code: region_code.into(),
            region_name: region_name.into(),
            outcome: RegionOutcome::Ok { prices, source },
        }
    }

    pub fn not_listed(region_code: impl Into<String>, region_name: impl Into<String>) -> Self {
        Self {
            region_code: region_code.into(),
            region_name: region_name.into(),
            outcome: RegionOutcome::NotListed,
        }
    }

    pub fn error(
        region_code: impl Into<String>,
        region_name: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            region_code: region_code.into(),
            region_name: region_name.into(),
            outcome: RegionOutcome::Error {
                message: message.into(),
            },
        }
    }

    pub fn is_ok(&self) -> bool {
        matches!(self.outcome, RegionOutcome::Ok { .. })
    }

    pub fn prices(&self) -> Option<&RegionPrices> {
        match &self.outcome {
            RegionOutcome::Ok { prices, .. } => Some(prices),
            _ => None,
        }
    }

    pub fn is_cached(&self) -> bool {
        matches!(
            self.outcome,
            RegionOutcome::Ok {
                source: PriceSource::Cached { .. },
                ..
            }
        )
    }

    /// Short status line for regions without prices.
    pub fn status_line(&self) -> Option<String> {
        match &self.outcome {
            RegionOutcome::Ok { .. } => None,
            RegionOutcome::NotListed => Some("not listed".to_string()),
            RegionOutcome::Error { message } => Some(format!("failed ({})", message)),
        }
    }
}

/// Ranked price report for one app, handed to the presentation layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceReport {
    pub app: AppCandidate,
    pub platform: PlatformFilter,
    pub reference_currency: String,
    pub common_plan: Option<String>,
    /// All requested regions, cheapest first; non-ok records last.
    pub records: Vec<RegionPriceRecord>,
}

impl PriceReport {
    pub fn priced(&self) -> impl Iterator<Item = &RegionPriceRecord> {
        self.records.iter().filter(|r| r.is_ok())
    }

    pub fn unavailable(&self) -> impl Iterator<Item = &RegionPriceRecord> {
        self.records.iter().filter(|r| !r.is_ok())
    }
}
