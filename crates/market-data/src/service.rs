//! Query interface consumed by the dashboard.
//!
//! Every operation validates caller input, runs the matching fallback chain
//! and degrades to synthetic data when the chain is exhausted. Provider
//! failures never reach the caller; the only error is [`InputError`].

use std::sync::Arc;

use async_trait::async_trait;
use log::{debug, warn};
use tokio_util::sync::CancellationToken;

use crate::config::MarketDataConfig;
use crate::errors::InputError;
use crate::models::{
    CanonicalQuote, CompanyFacts, HistoryRequest, HistorySeries, RequestKind, StockDetail, Symbol,
    Timeframe,
};
use crate::provider::{build_providers, MarketDataProvider};
use crate::registry::{AttemptLog, ProviderRegistry, ProviderTable};
use crate::synthetic::SyntheticGenerator;

/// Largest batch accepted by [`MarketDataServiceTrait::get_market_overview`].
pub const MAX_BATCH_SYMBOLS: usize = 50;

/// Market data queries.
#[async_trait]
pub trait MarketDataServiceTrait: Send + Sync {
    // =========================================================================
    // Single-symbol queries
    // =========================================================================

    async fn get_quote(&self, symbol: &str) -> Result<CanonicalQuote, InputError> {
        self.get_quote_with_cancel(symbol, &CancellationToken::new())
            .await
    }

    async fn get_quote_with_cancel(
        &self,
        symbol: &str,
        cancel: &CancellationToken,
    ) -> Result<CanonicalQuote, InputError>;

    /// `timeframe` is one of `1D`, `1W`, `1M`, `3M`, `1Y`, `5Y`.
    async fn get_history(&self, symbol: &str, timeframe: &str) -> Result<HistorySeries, InputError> {
        self.get_history_with_cancel(symbol, timeframe, &CancellationToken::new())
            .await
    }

    async fn get_history_with_cancel(
        &self,
        symbol: &str,
        timeframe: &str,
        cancel: &CancellationToken,
    ) -> Result<HistorySeries, InputError>;

    async fn get_facts(&self, symbol: &str) -> Result<CompanyFacts, InputError> {
        self.get_facts_with_cancel(symbol, &CancellationToken::new())
            .await
    }

    async fn get_facts_with_cancel(
        &self,
        symbol: &str,
        cancel: &CancellationToken,
    ) -> Result<CompanyFacts, InputError>;

    /// Facts and quote fetched concurrently.
    async fn get_stock_detail(&self, symbol: &str) -> Result<StockDetail, InputError> {
        self.get_stock_detail_with_cancel(symbol, &CancellationToken::new())
            .await
    }

    async fn get_stock_detail_with_cancel(
        &self,
        symbol: &str,
        cancel: &CancellationToken,
    ) -> Result<StockDetail, InputError>;

    // =========================================================================
    // Batch queries
    // =========================================================================

    /// Quotes for every symbol, in input order.
    async fn get_market_overview(&self, symbols: &[String]) -> Result<Vec<CanonicalQuote>, InputError> {
        self.get_market_overview_with_cancel(symbols, &CancellationToken::new())
            .await
    }

    async fn get_market_overview_with_cancel(
        &self,
        symbols: &[String],
        cancel: &CancellationToken,
    ) -> Result<Vec<CanonicalQuote>, InputError>;

    // =========================================================================
    // Diagnostics
    // =========================================================================

    fn provider_table(&self) -> &ProviderTable;

    fn config(&self) -> &MarketDataConfig;
}

/// Default [`MarketDataServiceTrait`] implementation backed by a
/// [`ProviderRegistry`].
pub struct MarketDataService {
    registry: ProviderRegistry,
    synthetic: SyntheticGenerator,
}

impl MarketDataService {
    /// Builds the four standard adapters from `config`.
    pub fn new(config: Arc<MarketDataConfig>) -> Self {
        let providers = build_providers(&config);
        Self::with_providers(providers, config)
    }

    pub fn with_providers(
        providers: Vec<Arc<dyn MarketDataProvider>>,
        config: Arc<MarketDataConfig>,
    ) -> Self {
        Self {
            registry: ProviderRegistry::new(providers, config),
            synthetic: SyntheticGenerator::new(),
        }
    }

    pub fn registry(&self) -> &ProviderRegistry {
        &self.registry
    }

    fn degrade(kind: RequestKind, symbol: &Symbol, attempts: &AttemptLog) {
        warn!(
            "All providers exhausted for {} {}; serving synthetic data. Attempts: {}",
            kind,
            symbol,
            attempts.summary()
        );
    }

    async fn quote_for(&self, symbol: &Symbol, cancel: &CancellationToken) -> CanonicalQuote {
        let outcome = self.registry.fetch_quote(symbol, cancel).await;
        match outcome.value {
            Some(quote) => quote,
            None => {
                Self::degrade(RequestKind::Quote, symbol, &outcome.attempts);
                self.synthetic.quote(symbol)
            }
        }
    }

    async fn facts_for(&self, symbol: &Symbol, cancel: &CancellationToken) -> CompanyFacts {
        let outcome = self.registry.fetch_facts(symbol, cancel).await;
        match outcome.value {
            Some(facts) => facts,
            None => {
                Self::degrade(RequestKind::Facts, symbol, &outcome.attempts);
                self.synthetic.facts(symbol)
            }
        }
    }
}

#[async_trait]
impl MarketDataServiceTrait for MarketDataService {
    async fn get_quote_with_cancel(
        &self,
        symbol: &str,
        cancel: &CancellationToken,
    ) -> Result<CanonicalQuote, InputError> {
        let symbol = Symbol::parse(symbol)?;
        Ok(self.quote_for(&symbol, cancel).await)
    }

    async fn get_history_with_cancel(
        &self,
        symbol: &str,
        timeframe: &str,
        cancel: &CancellationToken,
    ) -> Result<HistorySeries, InputError> {
        let symbol = Symbol::parse(symbol)?;
        let timeframe = Timeframe::parse(timeframe)?;
        let request = HistoryRequest::new(timeframe);

        let outcome = self.registry.fetch_history(&symbol, &request, cancel).await;
        Ok(match outcome.value {
            Some(series) => series,
            None => {
                Self::degrade(RequestKind::History, &symbol, &outcome.attempts);
                self.synthetic.history(&symbol, &request)
            }
        })
    }

    async fn get_facts_with_cancel(
        &self,
        symbol: &str,
        cancel: &CancellationToken,
    ) -> Result<CompanyFacts, InputError> {
        let symbol = Symbol::parse(symbol)?;
        Ok(self.facts_for(&symbol, cancel).await)
    }

    async fn get_stock_detail_with_cancel(
        &self,
        symbol: &str,
        cancel: &CancellationToken,
    ) -> Result<StockDetail, InputError> {
        let symbol = Symbol::parse(symbol)?;
        let (facts, quote) = futures::join!(
            self.facts_for(&symbol, cancel),
            self.quote_for(&symbol, cancel)
        );
        let detail = StockDetail::new(quote, facts);
        debug!("Stock detail for {} from {}", symbol, detail.source_provider);
        Ok(detail)
    }

    async fn get_market_overview_with_cancel(
        &self,
        symbols: &[String],
        cancel: &CancellationToken,
    ) -> Result<Vec<CanonicalQuote>, InputError> {
        if symbols.is_empty() {
            return Err(InputError::EmptyBatch);
        }
        if symbols.len() > MAX_BATCH_SYMBOLS {
            return Err(InputError::BatchTooLarge {
                count: symbols.len(),
                max: MAX_BATCH_SYMBOLS,
            });
        }
        let parsed = symbols
            .iter()
            .map(|s| Symbol::parse(s))
            .collect::<Result<Vec<_>, _>>()?;

        let outcomes = self.registry.fetch_quotes_batch(&parsed, cancel).await;
        Ok(parsed
            .iter()
            .zip(outcomes)
            .map(|(symbol, outcome)| match outcome.value {
                Some(quote) => quote,
                None => {
                    Self::degrade(RequestKind::Quote, symbol, &outcome.attempts);
                    self.synthetic.quote(symbol)
                }
            })
            .collect())
    }

    fn provider_table(&self) -> &ProviderTable {
        self.registry.table()
    }

    fn config(&self) -> &MarketDataConfig {
        self.registry.config()
    }
}
