use chrono::{DateTime, Utc};
use serde::Serialize;

use super::quote::CanonicalQuote;
use super::source::SourceProvider;
use super::symbol::Symbol;

/// Company reference data, independent of price.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompanyFacts {
    pub symbol: Symbol,
    pub legal_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sector: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub industry: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exchange: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub employee_count: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub market_cap: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub website_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dividend_yield_percent: Option<f64>,
    pub source_provider: SourceProvider,
    pub retrieved_at: DateTime<Utc>,
}

impl CompanyFacts {
    /// Facts with only the mandatory fields set.
    pub fn named(symbol: Symbol, legal_name: impl Into<String>, source: SourceProvider) -> Self {
        Self {
            symbol,
            legal_name: legal_name.into(),
            sector: None,
            industry: None,
            exchange: None,
            employee_count: None,
            market_cap: None,
            website_url: None,
            description: None,
            dividend_yield_percent: None,
            source_provider: source,
            retrieved_at: Utc::now(),
        }
    }
}

/// Facts and a live quote shown together on the stock detail view.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StockDetail {
    pub quote: CanonicalQuote,
    pub facts: CompanyFacts,
    /// `FACTS+PRICE` when the two halves came from different sources
    pub source_provider: SourceProvider,
}

impl StockDetail {
    pub fn new(quote: CanonicalQuote, facts: CompanyFacts) -> Self {
        let source_provider = SourceProvider::combine(&facts.source_provider, &quote.source_provider);
        Self {
            quote,
            facts,
            source_provider,
        }
    }
}
