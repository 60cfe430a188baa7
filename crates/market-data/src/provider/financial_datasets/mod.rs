//! Financial Datasets market data provider implementation.
//!
//! This module provides market data from the Financial Datasets API:
//! - Live quotes via `/prices/snapshot`
//! - Historical bars via `/prices/`
//! - Company facts via `/company/facts`
//!
//! Tickers without a snapshot are served by [`FinancialDatasetsBarsProvider`],
//! a separate candidate that derives the quote from the last week of daily
//! bars. Keeping it separate holds every invocation to one HTTP call.
//!
//! Authentication uses the `X-API-KEY` header.

use async_trait::async_trait;
use chrono::{Duration, NaiveDate, Utc};
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

use crate::errors::MarketDataError;
use crate::models::{
    CanonicalQuote, CompanyFacts, HistoryPoint, HistoryRequest, HistorySeries, Interval,
    SourceProvider, Symbol,
};
use crate::normalize::{parse_day, to_price, to_volume, PercentScale, QuoteParts};
use crate::provider::http::{build_client, parse_json, send};
use crate::provider::{MarketDataProvider, ProviderCapabilities};

const BASE_URL: &str = "https://api.financialdatasets.ai";
const PROVIDER_ID: &str = "FINANCIAL_DATASETS";
const BARS_PROVIDER_ID: &str = "FINANCIAL_DATASETS_BARS";

/// Calendar days of daily bars used to derive a quote.
const RECENT_BARS_DAYS: i64 = 7;

/// Native convention of `day_change_percent`.
const CHANGE_PERCENT_SCALE: PercentScale = PercentScale::Percent;

/// Financial Datasets provider for quotes, history and company facts.
pub struct FinancialDatasetsProvider {
    client: Client,
    api_key: Option<String>,
    base_url: String,
}

// ============================================================================
// Response structures for Financial Datasets API
// ============================================================================

#[derive(Debug, Deserialize)]
struct SnapshotResponse {
    snapshot: Option<Snapshot>,
}

#[derive(Debug, Deserialize)]
struct Snapshot {
    price: Option<f64>,
    day_change: Option<f64>,
    day_change_percent: Option<f64>,
    market_cap: Option<f64>,
    volume: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct PricesResponse {
    #[serde(default)]
    prices: Vec<PriceBar>,
}

#[derive(Debug, Deserialize)]
struct PriceBar {
    open: Option<f64>,
    high: Option<f64>,
    low: Option<f64>,
    close: Option<f64>,
    volume: Option<f64>,
    time: String,
}

#[derive(Debug, Deserialize)]
struct CompanyFactsResponse {
    company_facts: Option<RawCompanyFacts>,
}

#[derive(Debug, Deserialize)]
struct RawCompanyFacts {
    name: Option<String>,
    sector: Option<String>,
    industry: Option<String>,
    exchange: Option<String>,
    number_of_employees: Option<f64>,
    market_cap: Option<f64>,
    website_url: Option<String>,
}

// ============================================================================
// FinancialDatasetsProvider implementation
// ============================================================================

impl FinancialDatasetsProvider {
    /// Create a provider. Without a key it reports itself unconfigured.
    pub fn new(api_key: Option<String>) -> Self {
        Self::with_base_url(api_key, BASE_URL)
    }

    pub fn with_base_url(api_key: Option<String>, base_url: impl Into<String>) -> Self {
        Self {
            client: build_client(),
            api_key: api_key.filter(|k| !k.trim().is_empty()),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    fn api_key(&self, provider: &'static str) -> Result<&str, MarketDataError> {
        self.api_key
            .as_deref()
            .ok_or_else(|| MarketDataError::NotConfigured {
                provider: provider.to_string(),
            })
    }

    /// Make a request to the Financial Datasets API on behalf of `provider`.
    async fn fetch(
        &self,
        provider: &'static str,
        symbol: &Symbol,
        path: &str,
        params: &[(&str, String)],
    ) -> Result<String, MarketDataError> {
        let api_key = self.api_key(provider)?;
        let url = format!("{}{}", self.base_url, path);
        debug!("Financial Datasets request: {} {:?}", url, params);

        let request = self
            .client
            .get(&url)
            .header("X-API-KEY", api_key)
            .query(params);
        send(provider, symbol, request).await
    }

    fn prices_params(
        symbol: &Symbol,
        interval: Interval,
        start: NaiveDate,
        end: NaiveDate,
    ) -> [(&'static str, String); 5] {
        [
            ("ticker", symbol.to_string()),
            ("interval", Self::interval_param(interval).to_string()),
            ("interval_multiplier", "1".to_string()),
            ("start_date", start.format("%Y-%m-%d").to_string()),
            ("end_date", end.format("%Y-%m-%d").to_string()),
        ]
    }

    fn interval_param(interval: Interval) -> &'static str {
        match interval {
            Interval::Daily => "day",
            Interval::Weekly => "week",
            Interval::Monthly => "month",
        }
    }

    fn parse_snapshot(body: &str, symbol: &Symbol) -> Result<CanonicalQuote, MarketDataError> {
        let response: SnapshotResponse = parse_json(PROVIDER_ID, body, "snapshot")?;
        let snapshot = response
            .snapshot
            .ok_or_else(|| MarketDataError::empty(PROVIDER_ID, symbol.as_str()))?;
        let price = snapshot
            .price
            .ok_or_else(|| MarketDataError::empty(PROVIDER_ID, symbol.as_str()))?;

        QuoteParts {
            change: snapshot.day_change,
            reported_percent: snapshot
                .day_change_percent
                .map(|p| CHANGE_PERCENT_SCALE.to_percent(p)),
            volume: snapshot.volume.and_then(to_volume),
            market_cap: snapshot.market_cap,
            ..QuoteParts::new(price)
        }
        .into_quote(PROVIDER_ID, symbol)
    }

    fn parse_prices(
        body: &str,
        symbol: &Symbol,
        request: &HistoryRequest,
    ) -> Result<HistorySeries, MarketDataError> {
        let response: PricesResponse = parse_json(PROVIDER_ID, body, "prices")?;

        let points: Vec<HistoryPoint> = response
            .prices
            .iter()
            .filter_map(|bar| {
                let date = parse_day(&bar.time)?;
                let close = to_price(bar.close?)?;
                let open = bar.open.and_then(to_price).unwrap_or(close);
                let high = bar.high.and_then(to_price).unwrap_or(close.max(open));
                let low = bar.low.and_then(to_price).unwrap_or(close.min(open));
                Some(HistoryPoint {
                    date,
                    open,
                    high,
                    low,
                    close,
                    volume: bar.volume.and_then(to_volume),
                })
            })
            .collect();

        if points.is_empty() {
            return Err(MarketDataError::empty(PROVIDER_ID, symbol.as_str()));
        }

        Ok(HistorySeries::from_points(
            symbol.clone(),
            request.timeframe,
            SourceProvider::provider(PROVIDER_ID),
            points,
        ))
    }

    fn parse_company_facts(body: &str, symbol: &Symbol) -> Result<CompanyFacts, MarketDataError> {
        let response: CompanyFactsResponse = parse_json(PROVIDER_ID, body, "company facts")?;
        let raw = response
            .company_facts
            .ok_or_else(|| MarketDataError::empty(PROVIDER_ID, symbol.as_str()))?;
        let name = raw
            .name
            .filter(|n| !n.trim().is_empty())
            .ok_or_else(|| MarketDataError::empty(PROVIDER_ID, symbol.as_str()))?;

        let mut facts =
            CompanyFacts::named(symbol.clone(), name, SourceProvider::provider(PROVIDER_ID));
        facts.sector = raw.sector;
        facts.industry = raw.industry;
        facts.exchange = raw.exchange;
        facts.employee_count = raw.number_of_employees.and_then(to_volume);
        facts.market_cap = raw.market_cap.filter(|m| *m > 0.0);
        facts.website_url = raw.website_url;
        Ok(facts)
    }
}

#[async_trait]
impl MarketDataProvider for FinancialDatasetsProvider {
    fn id(&self) -> &'static str {
        PROVIDER_ID
    }

    fn priority(&self) -> u8 {
        1
    }

    fn capabilities(&self) -> ProviderCapabilities {
        ProviderCapabilities::ALL
    }

    fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    async fn fetch_quote(&self, symbol: &Symbol) -> Result<CanonicalQuote, MarketDataError> {
        let body = self
            .fetch(
                PROVIDER_ID,
                symbol,
                "/prices/snapshot",
                &[("ticker", symbol.to_string())],
            )
            .await?;
        Self::parse_snapshot(&body, symbol)
    }

    async fn fetch_history(
        &self,
        symbol: &Symbol,
        request: &HistoryRequest,
    ) -> Result<HistorySeries, MarketDataError> {
        let params =
            Self::prices_params(symbol, request.interval, request.start, request.end);
        let body = self.fetch(PROVIDER_ID, symbol, "/prices/", &params).await?;
        Self::parse_prices(&body, symbol, request)
    }

    async fn fetch_facts(&self, symbol: &Symbol) -> Result<CompanyFacts, MarketDataError> {
        let body = self
            .fetch(
                PROVIDER_ID,
                symbol,
                "/company/facts",
                &[("ticker", symbol.to_string())],
            )
            .await?;
        Self::parse_company_facts(&body, symbol)
    }
}

// ============================================================================
// FinancialDatasetsBarsProvider implementation
// ============================================================================

/// Quote candidate built from recent daily bars.
///
/// Price is the latest close; change and percent are measured against the
/// close of the bar before it. A single bar yields a zero change.
pub struct FinancialDatasetsBarsProvider {
    inner: FinancialDatasetsProvider,
}

impl FinancialDatasetsBarsProvider {
    pub fn new(api_key: Option<String>) -> Self {
        Self::with_base_url(api_key, BASE_URL)
    }

    pub fn with_base_url(api_key: Option<String>, base_url: impl Into<String>) -> Self {
        Self {
            inner: FinancialDatasetsProvider::with_base_url(api_key, base_url),
        }
    }

    fn parse_recent_bars(body: &str, symbol: &Symbol) -> Result<CanonicalQuote, MarketDataError> {
        let response: PricesResponse = parse_json(BARS_PROVIDER_ID, body, "prices")?;

        let mut closes: Vec<(NaiveDate, f64)> = response
            .prices
            .iter()
            .filter_map(|bar| {
                let close = bar.close.filter(|c| c.is_finite() && *c > 0.0)?;
                Some((parse_day(&bar.time)?, close))
            })
            .collect();
        closes.sort_by_key(|(date, _)| *date);

        let (latest_date, price) = *closes
            .last()
            .ok_or_else(|| MarketDataError::empty(BARS_PROVIDER_ID, symbol.as_str()))?;
        let previous_close = closes
            .iter()
            .rev()
            .find(|(date, _)| *date < latest_date)
            .map(|(_, close)| *close);

        QuoteParts {
            previous_close,
            change: Some(previous_close.map_or(0.0, |prev| price - prev)),
            ..QuoteParts::new(price)
        }
        .into_quote(BARS_PROVIDER_ID, symbol)
    }
}

#[async_trait]
impl MarketDataProvider for FinancialDatasetsBarsProvider {
    fn id(&self) -> &'static str {
        BARS_PROVIDER_ID
    }

    /// Shares the snapshot's priority; registration order puts it second.
    fn priority(&self) -> u8 {
        1
    }

    fn capabilities(&self) -> ProviderCapabilities {
        ProviderCapabilities {
            supports_quote: true,
            supports_history: false,
            supports_facts: false,
        }
    }

    fn is_configured(&self) -> bool {
        self.inner.is_configured()
    }

    async fn fetch_quote(&self, symbol: &Symbol) -> Result<CanonicalQuote, MarketDataError> {
        let end = Utc::now().date_naive();
        let start = end - Duration::days(RECENT_BARS_DAYS);
        let params =
            FinancialDatasetsProvider::prices_params(symbol, Interval::Daily, start, end);
        let body = self
            .inner
            .fetch(BARS_PROVIDER_ID, symbol, "/prices/", &params)
            .await?;
        Self::parse_recent_bars(&body, symbol)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Timeframe;
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;

    fn symbol() -> Symbol {
        Symbol::parse("AAPL").unwrap()
    }

    #[test]
    fn test_parse_snapshot() {
        let body = r#"{
            "snapshot": {
                "price": 189.84,
                "ticker": "AAPL",
                "day_change": 2.6,
                "day_change_percent": 1.3885,
                "market_cap": 2950000000000,
                "volume": 52341000,
                "time": "2024-06-28T20:00:00Z"
            }
        }"#;
        let quote = FinancialDatasetsProvider::parse_snapshot(body, &symbol()).unwrap();
        assert_eq!(quote.price, dec!(189.84));
        assert_eq!(quote.absolute_change, dec!(2.6));
        assert!((quote.percent_change - 1.3886).abs() < 1e-3);
        assert_eq!(quote.volume, 52_341_000);
        assert_eq!(quote.market_cap, Some(2.95e12));
        assert_eq!(quote.source_provider.to_string(), PROVIDER_ID);
    }

    #[test]
    fn test_parse_snapshot_missing_is_empty() {
        let err = FinancialDatasetsProvider::parse_snapshot(r#"{"snapshot": null}"#, &symbol())
            .unwrap_err();
        assert!(matches!(err, MarketDataError::EmptyResult { .. }));
    }

    #[test]
    fn test_parse_snapshot_wrong_shape_is_malformed() {
        let err = FinancialDatasetsProvider::parse_snapshot(r#"{"snapshot": "n/a"}"#, &symbol())
            .unwrap_err();
        assert!(matches!(err, MarketDataError::MalformedResponse { .. }));
    }

    #[test]
    fn test_parse_prices_sorted_and_deduped() {
        let body = r#"{
            "ticker": "AAPL",
            "prices": [
                {"open": 3, "high": 3.5, "low": 2.5, "close": 3.2, "volume": 100, "time": "2024-01-04T05:00:00Z"},
                {"open": 1, "high": 1.5, "low": 0.5, "close": 1.2, "volume": 100, "time": "2024-01-02T05:00:00Z"},
                {"open": 2, "high": 2.5, "low": 1.5, "close": 2.2, "volume": 100, "time": "2024-01-03T05:00:00Z"},
                {"open": 2, "high": 2.6, "low": 1.5, "close": 2.4, "volume": 120, "time": "2024-01-03T21:00:00Z"}
            ]
        }"#;
        let request = HistoryRequest::ending_on(
            Timeframe::OneMonth,
            NaiveDate::from_ymd_opt(2024, 1, 31).unwrap(),
        );
        let series = FinancialDatasetsProvider::parse_prices(body, &symbol(), &request).unwrap();
        let closes: Vec<_> = series.points().iter().map(|p| p.close).collect();
        assert_eq!(closes, vec![dec!(1.2), dec!(2.4), dec!(3.2)]);
    }

    #[test]
    fn test_parse_prices_empty() {
        let request = HistoryRequest::new(Timeframe::OneMonth);
        let err =
            FinancialDatasetsProvider::parse_prices(r#"{"prices": []}"#, &symbol(), &request)
                .unwrap_err();
        assert!(matches!(err, MarketDataError::EmptyResult { .. }));
    }

    #[test]
    fn test_parse_company_facts() {
        let body = r#"{
            "company_facts": {
                "ticker": "AAPL",
                "name": "Apple Inc",
                "cik": "0000320193",
                "industry": "Consumer Electronics",
                "sector": "Technology",
                "exchange": "NASDAQ",
                "is_active": true,
                "market_cap": 2950000000000,
                "number_of_employees": 161000,
                "website_url": "https://www.apple.com"
            }
        }"#;
        let facts = FinancialDatasetsProvider::parse_company_facts(body, &symbol()).unwrap();
        assert_eq!(facts.legal_name, "Apple Inc");
        assert_eq!(facts.sector.as_deref(), Some("Technology"));
        assert_eq!(facts.employee_count, Some(161_000));
        assert_eq!(facts.website_url.as_deref(), Some("https://www.apple.com"));
    }

    #[test]
    fn test_recent_bars_quote_uses_previous_close() {
        let body = r#"{
            "ticker": "AAPL",
            "prices": [
                {"open": 190, "high": 192, "low": 189, "close": 191.0, "volume": 100, "time": "2024-06-27T04:00:00Z"},
                {"open": 188, "high": 190, "low": 187, "close": 189.0, "volume": 100, "time": "2024-06-26T04:00:00Z"},
                {"open": 191, "high": 196, "low": 190, "close": 195.0, "volume": 100, "time": "2024-06-28T04:00:00Z"}
            ]
        }"#;
        let quote = FinancialDatasetsBarsProvider::parse_recent_bars(body, &symbol()).unwrap();
        assert_eq!(quote.price, dec!(195));
        assert_eq!(quote.absolute_change, dec!(4));
        assert!((quote.percent_change - 2.0942).abs() < 1e-3);
        assert_eq!(quote.source_provider.to_string(), BARS_PROVIDER_ID);
    }

    #[test]
    fn test_recent_bars_single_bar_has_no_change() {
        let body = r#"{"prices": [{"close": 50.0, "time": "2024-06-28"}]}"#;
        let quote = FinancialDatasetsBarsProvider::parse_recent_bars(body, &symbol()).unwrap();
        assert_eq!(quote.price, dec!(50));
        assert_eq!(quote.absolute_change, dec!(0));
        assert_eq!(quote.percent_change, 0.0);
    }

    #[test]
    fn test_recent_bars_without_closes_is_empty() {
        let body = r#"{"prices": [{"open": 1.0, "time": "2024-06-28"}]}"#;
        let err = FinancialDatasetsBarsProvider::parse_recent_bars(body, &symbol()).unwrap_err();
        assert!(matches!(err, MarketDataError::EmptyResult { .. }));
    }

    #[tokio::test]
    async fn test_bars_provider_is_quote_only() {
        let provider = FinancialDatasetsBarsProvider::new(Some("key-123456".to_string()));
        assert!(provider.is_configured());
        assert!(provider.capabilities().supports_quote);
        assert!(!provider.capabilities().supports_history);
        assert!(!provider.capabilities().supports_facts);
        let err = provider
            .fetch_facts(&symbol())
            .await
            .unwrap_err();
        assert!(matches!(err, MarketDataError::NotSupported { .. }));
    }

    #[tokio::test]
    async fn test_unconfigured_fails_fast() {
        let provider = FinancialDatasetsProvider::new(None);
        assert!(!provider.is_configured());
        let err = provider.fetch_quote(&symbol()).await.unwrap_err();
        assert!(matches!(err, MarketDataError::NotConfigured { .. }));
    }
}
