use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

use super::source::SourceProvider;
use super::symbol::Symbol;

/// Provider-independent live quote.
///
/// Percent fields are on a 0-100 scale and `volume`/`market_cap` are raw
/// units. Build real quotes through [`QuoteParts`](crate::normalize::QuoteParts)
/// so `percent_change` stays consistent with `absolute_change`.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CanonicalQuote {
    pub symbol: Symbol,

    pub display_name: String,

    /// Last traded price (positive for real quotes)
    pub price: Decimal,

    /// Change against the previous close
    pub absolute_change: Decimal,

    /// Change against the previous close, in percent
    pub percent_change: f64,

    pub volume: u64,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub market_cap: Option<f64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub high52: Option<Decimal>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub low52: Option<Decimal>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub pe_ratio: Option<f64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub dividend_per_share: Option<Decimal>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub dividend_yield_percent: Option<f64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub sector: Option<String>,

    pub source_provider: SourceProvider,

    pub retrieved_at: DateTime<Utc>,
}

impl CanonicalQuote {
    pub fn is_synthetic(&self) -> bool {
        self.source_provider.is_synthetic()
    }
}
