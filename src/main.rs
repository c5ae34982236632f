//! Wiring & DI. Entry point: bootstrap adapters, inject into services, run UI.
//! No business logic here.

use dotenv::dotenv;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use store_price_bot::adapters::access::ConfigAdmins;
use store_price_bot::adapters::persistence::{MemoryCache, SqliteCache};
use store_price_bot::adapters::rates::ExchangeRateClient;
use store_price_bot::adapters::storefront::ItunesStorefront;
use store_price_bot::adapters::ui::tui::TuiInputPort;
use store_price_bot::domain::PageLimits;
use store_price_bot::domain::regions;
use store_price_bot::ports::{AdminPort, CachePort, InputPort, RatePort, StorefrontPort};
use store_price_bot::shared::config::{AppConfig, STOREFRONT_USER_AGENT};
use store_price_bot::usecases::{
    AggregatorSettings, CacheAdminService, RegionAggregator, SearchService, SessionService,
    SessionSettings, SessionStore,
};
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// How often idle sessions are swept.
const SWEEP_INTERVAL: Duration = Duration::from_secs(60);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    let env_loaded = dotenv();
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    match &env_loaded {
        Ok(path) => info!(path = %path.display(), "loaded .env"),
        Err(_) => info!(cwd = %cwd.display(), "no .env found (check CWD)"),
    }

    let cfg = AppConfig::load().map_err(|e| anyhow::anyhow!("config: {}", e))?;
    let reference_currency = cfg.reference_currency_or_default();
    store_price_bot::adapters::ui::init_ui(&reference_currency);

    let mut default_regions = Vec::new();
    for token in cfg.default_regions_or_default() {
        match regions::resolve_token(&token) {
            Some(code) if !default_regions.iter().any(|c| c == code) => {
                default_regions.push(code.to_string())
            }
            Some(_) => {}
            None => warn!(token = %token, "unsupported default region dropped"),
        }
    }
    if default_regions.is_empty() {
        anyhow::bail!("PRICE_BOT_DEFAULT_REGIONS names no supported region");
    }
    info!(regions = ?default_regions, currency = %reference_currency, "pricing setup");

    let data_path = PathBuf::from(cfg.data_dir_or_default());
    let data_dir_abs = data_path
        .canonicalize()
        .unwrap_or_else(|_| data_path.clone());
    info!(path = %data_dir_abs.display(), "data directory");

    // --- Outbound adapters ---
    let cache: Arc<dyn CachePort> = match SqliteCache::connect(&data_path).await {
        Ok(sqlite) => Arc::new(sqlite),
        Err(e) => {
            warn!(error = %e, "SQLite cache unavailable, using in-memory cache");
            Arc::new(MemoryCache::new())
        }
    };

    let rates: Arc<dyn RatePort> = Arc::new(
        ExchangeRateClient::new(
            &cfg.rates_api_url_or_default(),
            &reference_currency,
            Duration::from_secs(cfg.rates_ttl_secs_or_default()),
            Duration::from_secs(cfg.http_timeout_secs_or_default()),
        )
        .map_err(|e| anyhow::anyhow!("{}", e))?,
    );

    let storefront: Arc<dyn StorefrontPort> = Arc::new(
        ItunesStorefront::new(
            STOREFRONT_USER_AGENT,
            Duration::from_secs(cfg.search_timeout_secs_or_default()),
            Duration::from_secs(cfg.http_timeout_secs_or_default()),
        )
        .map_err(|e| anyhow::anyhow!("{}", e))?,
    );

    let admin_ids = cfg.admin_ids();
    if admin_ids.is_empty() {
        info!("PRICE_BOT_ADMIN_IDS not set, cache clearing disabled");
    }
    let admins: Arc<dyn AdminPort> = Arc::new(ConfigAdmins::new(admin_ids));

    // --- Services ---
    let search = Arc::new(SearchService::new(
        Arc::clone(&storefront),
        cfg.search_limit_or_default(),
    ));
    let aggregator = Arc::new(RegionAggregator::new(
        Arc::clone(&storefront),
        Arc::clone(&cache),
        Arc::clone(&rates),
        AggregatorSettings {
            reference_currency: reference_currency.clone(),
            reference_region: cfg.reference_region_or_default(),
            cache_ttl: Duration::from_secs(cfg.cache_ttl_secs_or_default()),
            region_timeout: Duration::from_secs(cfg.region_timeout_secs_or_default()),
        },
    ));
    let sessions = Arc::new(SessionService::new(
        search,
        aggregator,
        Arc::new(SessionStore::new()),
        SessionSettings {
            default_regions,
            limits: PageLimits {
                per_page: cfg.per_page_or_default(),
                max_pages: cfg.max_pages_or_default(),
            },
        },
    ));
    let cache_admin = Arc::new(CacheAdminService::new(Arc::clone(&cache), admins));

    // --- Idle-session sweeper ---
    let session_ttl = Duration::from_secs(cfg.session_ttl_secs_or_default());
    let sweeper = Arc::clone(&sessions);
    tokio::spawn(async move {
        let mut tick = tokio::time::interval(SWEEP_INTERVAL);
        loop {
            tick.tick().await;
            sweeper.expire_idle(session_ttl).await;
        }
    });

    let input_port: Arc<dyn InputPort> = Arc::new(TuiInputPort::new(
        sessions,
        cache_admin,
        cfg.user_id_or_default(),
        data_path.join("reports"),
    ));

    // --- Run (main menu -> price lookup / cache admin) ---
    input_port
        .run()
        .await
        .map_err(|e| anyhow::anyhow!("{}", e))?;

    Ok(())
}
