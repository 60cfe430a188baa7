//! Market data provider trait definitions.
//!
//! This module defines the core `MarketDataProvider` trait that every
//! adapter implements.

use async_trait::async_trait;

use crate::errors::MarketDataError;
use crate::models::{CanonicalQuote, CompanyFacts, HistoryRequest, HistorySeries, Symbol};

use super::capabilities::ProviderCapabilities;

/// Trait for market data providers.
///
/// Implement this trait to add support for a new market data source.
/// The registry uses the provider's capabilities, configuration state and
/// priority to decide when to call it. Nothing else has to change.
///
/// Each fetch performs exactly one outbound call and never retries;
/// retries happen by advancing the registry's fallback chain.
///
/// # Example
///
/// ```ignore
/// use async_trait::async_trait;
/// use tradesim_market_data::provider::{MarketDataProvider, ProviderCapabilities};
///
/// struct MyProvider {
///     api_key: Option<String>,
/// }
///
/// #[async_trait]
/// impl MarketDataProvider for MyProvider {
///     fn id(&self) -> &'static str {
///         "MY_PROVIDER"
///     }
///
///     fn capabilities(&self) -> ProviderCapabilities {
///         ProviderCapabilities {
///             supports_quote: true,
///             supports_history: false,
///             supports_facts: false,
///         }
///     }
///
///     fn is_configured(&self) -> bool {
///         self.api_key.is_some()
///     }
///
///     // ... implement fetch_quote
/// }
/// ```
#[async_trait]
pub trait MarketDataProvider: Send + Sync {
    /// Unique identifier for this provider.
    ///
    /// Should be a constant string like "YAHOO", "ALPHA_VANTAGE", etc.
    /// Used for logging, priority overrides and the source label.
    fn id(&self) -> &'static str;

    /// Provider priority for ordering.
    ///
    /// Lower values = higher priority. Default is 10.
    /// Configured priority overrides take precedence.
    fn priority(&self) -> u8 {
        10
    }

    /// Describes which request kinds this provider serves.
    fn capabilities(&self) -> ProviderCapabilities;

    /// Whether credentials and feature flags allow calling this provider.
    ///
    /// Unconfigured providers are excluded from the priority table at
    /// startup, so they cost nothing at request time.
    fn is_configured(&self) -> bool {
        true
    }

    /// Fetch the latest quote for a symbol.
    async fn fetch_quote(&self, symbol: &Symbol) -> Result<CanonicalQuote, MarketDataError> {
        let _ = symbol;
        Err(MarketDataError::NotSupported {
            operation: "fetch_quote".to_string(),
            provider: self.id().to_string(),
        })
    }

    /// Fetch bars for a symbol over an already-validated window.
    ///
    /// Implementations may return points in any order; the series
    /// constructor sorts and de-duplicates them.
    async fn fetch_history(
        &self,
        symbol: &Symbol,
        request: &HistoryRequest,
    ) -> Result<HistorySeries, MarketDataError> {
        let _ = (symbol, request);
        Err(MarketDataError::NotSupported {
            operation: "fetch_history".to_string(),
            provider: self.id().to_string(),
        })
    }

    /// Fetch company facts for a symbol.
    async fn fetch_facts(&self, symbol: &Symbol) -> Result<CompanyFacts, MarketDataError> {
        let _ = symbol;
        Err(MarketDataError::NotSupported {
            operation: "fetch_facts".to_string(),
            provider: self.id().to_string(),
        })
    }
}
