//! Application configuration. Regions, currencies, timeouts, paths.

use serde::Deserialize;

/// Regions priced when a query names none.
pub const DEFAULT_REGIONS: &[&str] = &["CN", "NG", "TR", "IN", "MY", "US"];

/// Desktop browser identity; the storefront serves trimmed pages to unknown agents.
pub const STOREFRONT_USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) \
AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.0 Safari/605.1.15";

#[derive(Debug, Deserialize, Default)]
pub struct AppConfig {
    /// Comma list of region codes or aliases. Read from PRICE_BOT_DEFAULT_REGIONS.
    #[serde(default)]
    pub default_regions: Option<String>,

    #[serde(default)]
    pub reference_currency: Option<String>,

    /// Region whose prices need no conversion.
    #[serde(default)]
    pub reference_region: Option<String>,

    /// Price cache TTL in seconds.
    #[serde(default)]
    pub cache_ttl_secs: Option<u64>,

    #[serde(default)]
    pub search_limit: Option<u32>,

    #[serde(default)]
    pub per_page: Option<usize>,

    #[serde(default)]
    pub max_pages: Option<usize>,

    /// Detail page request timeout.
    #[serde(default)]
    pub http_timeout_secs: Option<u64>,

    #[serde(default)]
    pub search_timeout_secs: Option<u64>,

    /// Guard around one region's fetch, parse and convert.
    #[serde(default)]
    pub region_timeout_secs: Option<u64>,

    // ─────────────────────────────────────────────────────────────────────────
    // Exchange rates
    // ─────────────────────────────────────────────────────────────────────────
    #[serde(default)]
    pub rates_api_url: Option<String>,

    #[serde(default)]
    pub rates_ttl_secs: Option<u64>,

    // ─────────────────────────────────────────────────────────────────────────
    // Sessions, storage, access
    // ─────────────────────────────────────────────────────────────────────────
    /// Idle sessions older than this are swept.
    #[serde(default)]
    pub session_ttl_secs: Option<u64>,

    #[serde(default)]
    pub data_dir: Option<String>,

    /// Comma list of user ids allowed to clear the cache. Read from PRICE_BOT_ADMIN_IDS.
    #[serde(default)]
    pub admin_ids: Option<String>,

    /// Identity of the local terminal operator.
    #[serde(default)]
    pub user_id: Option<i64>,
}

fn comma_list(raw: &str) -> impl Iterator<Item = &str> {
    raw.split(',').map(str::trim).filter(|s| !s.is_empty())
}

impl AppConfig {
    pub fn load() -> Result<Self, config::ConfigError> {
        dotenv::dotenv().ok();
        let mut c = config::Config::builder();
        if let Ok(path) = std::env::var("PRICE_BOT_CONFIG") {
            c = c.add_source(config::File::with_name(&path));
        }
        c = c.add_source(config::Environment::with_prefix("PRICE_BOT"));
        c.build()?.try_deserialize()
    }

    /// Uppercased region tokens as configured, or `DEFAULT_REGIONS`. Aliases
    /// are resolved by the caller.
    pub fn default_regions_or_default(&self) -> Vec<String> {
        let configured: Vec<String> = self
            .default_regions
            .as_deref()
            .map(|raw| comma_list(raw).map(str::to_uppercase).collect())
            .unwrap_or_default();
        if configured.is_empty() {
            DEFAULT_REGIONS.iter().map(|c| c.to_string()).collect()
        } else {
            configured
        }
    }

    pub fn reference_currency_or_default(&self) -> String {
        self.reference_currency
            .as_deref()
            .map(str::to_uppercase)
            .unwrap_or_else(|| "CNY".to_string())
    }

    pub fn reference_region_or_default(&self) -> String {
        self.reference_region
            .as_deref()
            .map(str::to_uppercase)
            .unwrap_or_else(|| "CN".to_string())
    }

    pub fn cache_ttl_secs_or_default(&self) -> u64 {
        self.cache_ttl_secs.unwrap_or(86_400)
    }

    pub fn search_limit_or_default(&self) -> u32 {
        self.search_limit.unwrap_or(200)
    }

    pub fn per_page_or_default(&self) -> usize {
        self.per_page.filter(|n| *n > 0).unwrap_or(5)
    }

    pub fn max_pages_or_default(&self) -> usize {
        self.max_pages.filter(|n| *n > 0).unwrap_or(10)
    }

    pub fn http_timeout_secs_or_default(&self) -> u64 {
        self.http_timeout_secs.unwrap_or(12)
    }

    pub fn search_timeout_secs_or_default(&self) -> u64 {
        self.search_timeout_secs.unwrap_or(15)
    }

    pub fn region_timeout_secs_or_default(&self) -> u64 {
        self.region_timeout_secs.unwrap_or(20)
    }

    pub fn rates_api_url_or_default(&self) -> String {
        self.rates_api_url
            .clone()
            .unwrap_or_else(|| "https://open.er-api.com/v6/latest".to_string())
    }

    pub fn rates_ttl_secs_or_default(&self) -> u64 {
        self.rates_ttl_secs.unwrap_or(3600)
    }

    pub fn session_ttl_secs_or_default(&self) -> u64 {
        self.session_ttl_secs.unwrap_or(1800)
    }

    pub fn data_dir_or_default(&self) -> String {
        self.data_dir.clone().unwrap_or_else(|| "./data".to_string())
    }

    /// Parsed admin ids; malformed entries are skipped.
    pub fn admin_ids(&self) -> Vec<i64> {
        self.admin_ids
            .as_deref()
            .map(|raw| comma_list(raw).filter_map(|s| s.parse().ok()).collect())
            .unwrap_or_default()
    }

    pub fn user_id_or_default(&self) -> i64 {
        self.user_id.unwrap_or(0)
    }
}
