//! Application use cases. Orchestrate domain logic via ports.

pub mod cache_admin;
pub mod region_aggregator;
pub mod search_service;
pub mod session_service;

#[cfg(test)]
pub(crate) mod test_support;

pub use cache_admin::CacheAdminService;
pub use region_aggregator::{AggregatorSettings, RegionAggregator};
pub use search_service::{SearchOutcome, SearchService};
pub use session_service::{
    ActionOutcome, ResultsPage, SessionService, SessionSettings, SessionStore, StartOutcome,
};
