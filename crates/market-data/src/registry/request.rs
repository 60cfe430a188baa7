//! Request kinds driven through the fallback chain.
//!
//! Each kind knows how to call an adapter and how to accept what comes back.
//! The chain itself is identical for all of them.

use async_trait::async_trait;

use super::validator::QuoteValidator;
use crate::errors::MarketDataError;
use crate::models::{
    CanonicalQuote, CompanyFacts, HistoryRequest, HistorySeries, RequestKind, SourceProvider,
    Symbol,
};
use crate::provider::MarketDataProvider;

#[async_trait]
pub(crate) trait ChainRequest: Send + Sync {
    type Output: Send;

    fn kind(&self) -> RequestKind;

    fn symbol(&self) -> &Symbol;

    /// One adapter call.
    async fn fetch(&self, provider: &dyn MarketDataProvider)
        -> Result<Self::Output, MarketDataError>;

    /// Validates the adapter output and stamps the satisfying provider.
    fn accept(
        &self,
        output: Self::Output,
        provider_id: &'static str,
        validator: &QuoteValidator,
    ) -> Result<Self::Output, MarketDataError>;
}

pub(crate) struct QuoteFetch<'a> {
    pub symbol: &'a Symbol,
}

#[async_trait]
impl<'a> ChainRequest for QuoteFetch<'a> {
    type Output = CanonicalQuote;

    fn kind(&self) -> RequestKind {
        RequestKind::Quote
    }

    fn symbol(&self) -> &Symbol {
        self.symbol
    }

    async fn fetch(&self, provider: &dyn MarketDataProvider) -> Result<CanonicalQuote, MarketDataError> {
        provider.fetch_quote(self.symbol).await
    }

    fn accept(
        &self,
        mut quote: CanonicalQuote,
        provider_id: &'static str,
        validator: &QuoteValidator,
    ) -> Result<CanonicalQuote, MarketDataError> {
        quote.source_provider = SourceProvider::provider(provider_id);
        validator.validate_quote(&quote)?;
        Ok(quote)
    }
}

pub(crate) struct HistoryFetch<'a> {
    pub symbol: &'a Symbol,
    pub request: &'a HistoryRequest,
}

#[async_trait]
impl<'a> ChainRequest for HistoryFetch<'a> {
    type Output = HistorySeries;

    fn kind(&self) -> RequestKind {
        RequestKind::History
    }

    fn symbol(&self) -> &Symbol {
        self.symbol
    }

    async fn fetch(&self, provider: &dyn MarketDataProvider) -> Result<HistorySeries, MarketDataError> {
        provider.fetch_history(self.symbol, self.request).await
    }

    fn accept(
        &self,
        mut series: HistorySeries,
        provider_id: &'static str,
        validator: &QuoteValidator,
    ) -> Result<HistorySeries, MarketDataError> {
        series.source_provider = SourceProvider::provider(provider_id);
        validator.validate_series(series)
    }
}

pub(crate) struct FactsFetch<'a> {
    pub symbol: &'a Symbol,
}

#[async_trait]
impl<'a> ChainRequest for FactsFetch<'a> {
    type Output = CompanyFacts;

    fn kind(&self) -> RequestKind {
        RequestKind::Facts
    }

    fn symbol(&self) -> &Symbol {
        self.symbol
    }

    async fn fetch(&self, provider: &dyn MarketDataProvider) -> Result<CompanyFacts, MarketDataError> {
        provider.fetch_facts(self.symbol).await
    }

    fn accept(
        &self,
        mut facts: CompanyFacts,
        provider_id: &'static str,
        _validator: &QuoteValidator,
    ) -> Result<CompanyFacts, MarketDataError> {
        if facts.legal_name.trim().is_empty() {
            return Err(MarketDataError::empty(provider_id, self.symbol.as_str()));
        }
        facts.source_provider = SourceProvider::provider(provider_id);
        Ok(facts)
    }
}
