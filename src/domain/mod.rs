//! Core domain layer. No external I/O dependencies.
//!
//! Entities and business rules live here. Dependencies flow inward.

pub mod entities;
pub mod errors;
pub mod plans;
pub mod platform;
pub mod query;
pub mod regions;
pub mod session;

pub use entities::{
    AppCandidate, AppKind, BasePrice, InAppPurchase, PriceReport, PriceSource, RegionOutcome,
    RegionPriceRecord, RegionPrices, StoreId,
};
pub use errors::{DetailFetchError, DomainError, SessionError};
pub use platform::PlatformFilter;
pub use query::ParsedQuery;
pub use session::{
    ActionRequest, PageLimits, SearchResults, SearchSession, SessionAction, SessionId,
    SessionState,
};
