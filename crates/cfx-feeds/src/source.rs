//! Feed boundary: the source trait and its error type.
//!
//! No concrete HTTP logic, no per-record interpretation and no storage belong
//! here.

use std::fmt;

use async_trait::async_trait;
use serde_json::Value;

use crate::rates::RateTable;

// ---------------------------------------------------------------------------
// Feed identity
// ---------------------------------------------------------------------------

/// Which upstream a fetch targeted. Carried in errors so callers can report
/// the failing source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FeedKind {
    Countries,
    ExchangeRates,
}

impl FeedKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FeedKind::Countries => "countries",
            FeedKind::ExchangeRates => "exchange_rates",
        }
    }

    /// Human label used in API error details.
    pub fn label(&self) -> &'static str {
        match self {
            FeedKind::Countries => "Countries API",
            FeedKind::ExchangeRates => "Exchange Rates API",
        }
    }
}

impl fmt::Display for FeedKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

/// A failed feed fetch. Either variant aborts a whole refresh.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedError {
    /// The fixed per-fetch deadline elapsed.
    Timeout { feed: FeedKind },
    /// Connection failure, non-success status, or an undecodable body.
    Unavailable { feed: FeedKind, detail: String },
}

impl FeedError {
    pub fn feed(&self) -> FeedKind {
        match self {
            FeedError::Timeout { feed } | FeedError::Unavailable { feed, .. } => *feed,
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, FeedError::Timeout { .. })
    }
}

impl fmt::Display for FeedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FeedError::Timeout { feed } => write!(f, "{feed} feed timed out"),
            FeedError::Unavailable { feed, detail } => {
                write!(f, "{feed} feed unavailable: {detail}")
            }
        }
    }
}

impl std::error::Error for FeedError {}

// ---------------------------------------------------------------------------
// Source trait
// ---------------------------------------------------------------------------

/// Upstream data contract used by the reconciliation engine.
///
/// Object safe so the engine can hold an `Arc<dyn FeedSource>`; tests swap in
/// canned payloads.
#[async_trait]
pub trait FeedSource: Send + Sync {
    /// Fetch the country list. Entries stay opaque; see
    /// [`RawCountry::from_value`](crate::RawCountry::from_value).
    async fn fetch_countries(&self) -> Result<Vec<Value>, FeedError>;

    /// Fetch the currency-code → rate mapping.
    async fn fetch_exchange_rates(&self) -> Result<RateTable, FeedError>;
}
