//! Domain errors. Used by ports and use cases.
//!
//! Adapters map infrastructure errors into these. Per-region failures never
//! surface here: they are folded into the region's `RegionPriceRecord`.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum DomainError {
    /// Request failed or timed out.
    #[error("Network error: {0}")]
    Network(String),

    /// Remote confirms the app is absent in this region. Not a failure.
    #[error("Not listed in region {0}")]
    NotListed(String),

    #[error("Parse error: {0}")]
    Parse(String),

    /// Malformed user input: empty query, unresolvable tokens.
    #[error("Invalid input: {0}")]
    Validation(String),

    #[error(transparent)]
    Session(#[from] SessionError),

    #[error("Permission denied: {0}")]
    Permission(String),

    #[error("Cache error: {0}")]
    Cache(String),

    #[error("Exchange rate error: {0}")]
    Rates(String),

    #[error("Configuration error: {0}")]
    Config(String),

    /// Terminal prompt or file export failed.
    #[error("UI error: {0}")]
    Ui(String),
}

/// Session precondition failures. All of them reject the action and leave the
/// session untouched.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    #[error("session {0} is expired or does not exist; start a new search")]
    NotFound(String),

    #[error("session {session_id} belongs to another user")]
    NotOwner { session_id: String },

    #[error("page {requested} is out of range (1..={total})")]
    PageOutOfRange { requested: usize, total: usize },

    #[error("no result at position {index} on this page ({len} shown)")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("action '{action}' is not allowed while {state}")]
    InvalidTransition {
        action: &'static str,
        state: &'static str,
    },
}

/// Failure of a single detail-page fetch.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DetailFetchError {
    /// The storefront answered 404 for this id in this region.
    #[error("not listed")]
    NotListed,

    /// Network failure, timeout, or non-404 HTTP error.
    #[error("{0}")]
    Transient(String),

    /// Page was received but its body could not be decoded.
    #[error("page unavailable: {0}")]
    ParseUnavailable(String),
}
