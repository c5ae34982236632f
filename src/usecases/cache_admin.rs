//! Administrative cache maintenance.

use crate::domain::DomainError;
use crate::ports::{AdminPort, CachePort};
use crate::usecases::region_aggregator::{PRICE_KEY_PREFIX, PRICE_NAMESPACE};
use std::sync::Arc;
use tracing::{info, warn};

pub struct CacheAdminService {
    cache: Arc<dyn CachePort>,
    admins: Arc<dyn AdminPort>,
}

impl CacheAdminService {
    pub fn new(cache: Arc<dyn CachePort>, admins: Arc<dyn AdminPort>) -> Self {
        Self { cache, admins }
    }

    /// Drop every cached price record. Returns the number of removed entries.
    pub async fn clear_price_cache(&self, user_id: i64) -> Result<usize, DomainError> {
        if !self.admins.can_manage_cache(user_id).await? {
            warn!(user_id, "cache clear denied");
            return Err(DomainError::Permission(
                "clearing the price cache requires cache-management rights".into(),
            ));
        }
        let removed = self
            .cache
            .clear(Some(PRICE_KEY_PREFIX), Some(PRICE_NAMESPACE))
            .await?;
        info!(user_id, removed, "price cache cleared");
        Ok(removed)
    }
}
