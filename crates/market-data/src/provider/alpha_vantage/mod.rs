//! Alpha Vantage market data provider implementation.
//!
//! This module provides market data from Alpha Vantage API:
//! - Live quotes via GLOBAL_QUOTE
//! - Bars via TIME_SERIES_DAILY / TIME_SERIES_WEEKLY / TIME_SERIES_MONTHLY
//! - Company facts via OVERVIEW
//!
//! Note: Alpha Vantage free tier is limited to 5 API calls per minute, and
//! quota exhaustion is reported in a 200 body rather than with HTTP 429.

use async_trait::async_trait;
use log::warn;
use reqwest::Client;
use serde::Deserialize;
use std::collections::HashMap;
use tracing::debug;

use crate::errors::MarketDataError;
use crate::models::{
    CanonicalQuote, CompanyFacts, HistoryPoint, HistoryRequest, HistorySeries, Interval,
    SourceProvider, Symbol,
};
use crate::normalize::{
    parse_day, parse_number, parse_percent, to_price, to_volume, PercentScale, QuoteParts,
};
use crate::provider::http::{build_client, parse_json, send};
use crate::provider::{MarketDataProvider, ProviderCapabilities};

const BASE_URL: &str = "https://www.alphavantage.co/query";
const PROVIDER_ID: &str = "ALPHA_VANTAGE";

/// OVERVIEW reports `DividendYield` as a fraction ("0.0053").
const DIVIDEND_YIELD_SCALE: PercentScale = PercentScale::Fraction;

/// Alpha Vantage provider for quotes, history and company facts.
pub struct AlphaVantageProvider {
    client: Client,
    api_key: Option<String>,
    base_url: String,
}

// ============================================================================
// Response structures for Alpha Vantage API
// ============================================================================

/// Messages Alpha Vantage embeds in otherwise successful responses
#[derive(Debug, Default, Deserialize)]
struct ApiMessages {
    #[serde(rename = "Error Message")]
    error_message: Option<String>,
    #[serde(rename = "Note")]
    note: Option<String>,
    #[serde(rename = "Information")]
    information: Option<String>,
}

/// GLOBAL_QUOTE response
#[derive(Debug, Deserialize)]
struct GlobalQuoteResponse {
    #[serde(rename = "Global Quote")]
    global_quote: Option<GlobalQuote>,
    #[serde(flatten)]
    messages: ApiMessages,
}

#[derive(Debug, Deserialize)]
struct GlobalQuote {
    #[serde(rename = "05. price")]
    price: Option<String>,
    #[serde(rename = "06. volume")]
    volume: Option<String>,
    #[serde(rename = "08. previous close")]
    previous_close: Option<String>,
    #[serde(rename = "09. change")]
    change: Option<String>,
    #[serde(rename = "10. change percent")]
    change_percent: Option<String>,
}

/// TIME_SERIES_* response. The series key depends on the function called.
#[derive(Debug, Deserialize)]
struct TimeSeriesResponse {
    #[serde(
        rename = "Time Series (Daily)",
        alias = "Weekly Time Series",
        alias = "Monthly Time Series"
    )]
    time_series: Option<HashMap<String, SeriesBar>>,
    #[serde(flatten)]
    messages: ApiMessages,
}

#[derive(Debug, Deserialize)]
struct SeriesBar {
    #[serde(rename = "1. open")]
    open: String,
    #[serde(rename = "2. high")]
    high: String,
    #[serde(rename = "3. low")]
    low: String,
    #[serde(rename = "4. close")]
    close: String,
    #[serde(rename = "5. volume")]
    volume: Option<String>,
}

/// OVERVIEW response for company fundamentals
/// Only includes fields that map to CompanyFacts; API returns many more fields.
#[derive(Debug, Deserialize)]
struct CompanyOverviewResponse {
    #[serde(rename = "Name")]
    name: Option<String>,
    #[serde(rename = "Description")]
    description: Option<String>,
    #[serde(rename = "Exchange")]
    exchange: Option<String>,
    #[serde(rename = "Sector")]
    sector: Option<String>,
    #[serde(rename = "Industry")]
    industry: Option<String>,
    #[serde(rename = "OfficialSite")]
    official_site: Option<String>,
    #[serde(rename = "FullTimeEmployees")]
    full_time_employees: Option<String>,
    #[serde(rename = "MarketCapitalization")]
    market_capitalization: Option<String>,
    #[serde(rename = "DividendYield")]
    dividend_yield: Option<String>,
    #[serde(flatten)]
    messages: ApiMessages,
}

/// Keeps real text, dropping Alpha Vantage's "None"/"-" placeholders.
fn text(value: Option<String>) -> Option<String> {
    value.filter(|v| {
        let t = v.trim();
        !t.is_empty() && t != "None" && t != "-"
    })
}

// ============================================================================
// AlphaVantageProvider implementation
// ============================================================================

impl AlphaVantageProvider {
    /// Create a provider. Without a key it reports itself unconfigured.
    pub fn new(api_key: Option<String>) -> Self {
        Self::with_base_url(api_key, BASE_URL)
    }

    pub fn with_base_url(api_key: Option<String>, base_url: impl Into<String>) -> Self {
        Self {
            client: build_client(),
            api_key: api_key.filter(|k| !k.trim().is_empty()),
            base_url: base_url.into(),
        }
    }

    /// Make a request to the Alpha Vantage API.
    async fn fetch(
        &self,
        symbol: &Symbol,
        params: &[(&str, &str)],
    ) -> Result<String, MarketDataError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| MarketDataError::NotConfigured {
                provider: PROVIDER_ID.to_string(),
            })?;

        let mut all_params: Vec<(&str, &str)> = params.to_vec();
        all_params.push(("apikey", api_key));

        let url = reqwest::Url::parse_with_params(&self.base_url, &all_params).map_err(|e| {
            MarketDataError::Transport {
                provider: PROVIDER_ID.to_string(),
                message: format!("Failed to build URL: {}", e),
                status: None,
            }
        })?;

        debug!(
            "Alpha Vantage request: {}",
            url.as_str().replace(api_key, "***")
        );

        send(PROVIDER_ID, symbol, self.client.get(url)).await
    }

    /// Check for API-level errors in the response.
    fn check_api_error(messages: &ApiMessages, symbol: &Symbol) -> Result<(), MarketDataError> {
        if let Some(ref msg) = messages.error_message {
            // Unknown tickers come back as "Invalid API call"
            if msg.contains("Invalid API call") || msg.contains("not found") {
                return Err(MarketDataError::empty(PROVIDER_ID, symbol.as_str()));
            }
            return Err(MarketDataError::Transport {
                provider: PROVIDER_ID.to_string(),
                message: msg.clone(),
                status: None,
            });
        }

        for msg in [&messages.note, &messages.information].into_iter().flatten() {
            if msg.contains("API call frequency")
                || msg.contains("rate limit")
                || msg.contains("requests per day")
            {
                return Err(MarketDataError::RateLimited {
                    provider: PROVIDER_ID.to_string(),
                });
            }
            warn!("Alpha Vantage message: {}", msg);
        }

        Ok(())
    }

    fn series_function(interval: Interval) -> &'static str {
        match interval {
            Interval::Daily => "TIME_SERIES_DAILY",
            Interval::Weekly => "TIME_SERIES_WEEKLY",
            Interval::Monthly => "TIME_SERIES_MONTHLY",
        }
    }

    fn parse_global_quote(body: &str, symbol: &Symbol) -> Result<CanonicalQuote, MarketDataError> {
        let response: GlobalQuoteResponse = parse_json(PROVIDER_ID, body, "GLOBAL_QUOTE")?;
        Self::check_api_error(&response.messages, symbol)?;

        // Unknown symbols yield `"Global Quote": {}`.
        let quote = response
            .global_quote
            .ok_or_else(|| MarketDataError::empty(PROVIDER_ID, symbol.as_str()))?;
        let price = quote
            .price
            .as_deref()
            .and_then(parse_number)
            .ok_or_else(|| MarketDataError::empty(PROVIDER_ID, symbol.as_str()))?;

        QuoteParts {
            previous_close: quote.previous_close.as_deref().and_then(parse_number),
            change: quote.change.as_deref().and_then(parse_number),
            reported_percent: quote
                .change_percent
                .as_deref()
                .and_then(|p| parse_percent(p, PercentScale::Percent)),
            volume: quote
                .volume
                .as_deref()
                .and_then(parse_number)
                .and_then(to_volume),
            ..QuoteParts::new(price)
        }
        .into_quote(PROVIDER_ID, symbol)
    }

    fn parse_time_series(
        body: &str,
        symbol: &Symbol,
        request: &HistoryRequest,
    ) -> Result<HistorySeries, MarketDataError> {
        let response: TimeSeriesResponse = parse_json(PROVIDER_ID, body, "TIME_SERIES")?;
        Self::check_api_error(&response.messages, symbol)?;

        let series = response
            .time_series
            .ok_or_else(|| MarketDataError::malformed(PROVIDER_ID, "missing time series", body))?;

        let points: Vec<HistoryPoint> = series
            .iter()
            .filter_map(|(date_str, bar)| {
                let date = parse_day(date_str)?;
                if !request.contains(date) {
                    return None;
                }
                let price = |s: &str| parse_number(s).and_then(to_price);
                Some(HistoryPoint {
                    date,
                    open: price(bar.open.as_str())?,
                    high: price(bar.high.as_str())?,
                    low: price(bar.low.as_str())?,
                    close: price(bar.close.as_str())?,
                    volume: bar
                        .volume
                        .as_deref()
                        .and_then(parse_number)
                        .and_then(to_volume),
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

    fn parse_overview(body: &str, symbol: &Symbol) -> Result<CompanyFacts, MarketDataError> {
        let response: CompanyOverviewResponse = parse_json(PROVIDER_ID, body, "OVERVIEW")?;
        Self::check_api_error(&response.messages, symbol)?;

        // Unknown symbols yield `{}`.
        let name = text(response.name)
            .ok_or_else(|| MarketDataError::empty(PROVIDER_ID, symbol.as_str()))?;

        let mut facts =
            CompanyFacts::named(symbol.clone(), name, SourceProvider::provider(PROVIDER_ID));
        facts.sector = text(response.sector);
        facts.industry = text(response.industry);
        facts.exchange = text(response.exchange);
        facts.description = text(response.description);
        facts.website_url = text(response.official_site);
        facts.employee_count = response
            .full_time_employees
            .as_deref()
            .and_then(parse_number)
            .and_then(to_volume);
        facts.market_cap = response
            .market_capitalization
            .as_deref()
            .and_then(parse_number)
            .filter(|m| *m > 0.0);
        facts.dividend_yield_percent = response
            .dividend_yield
            .as_deref()
            .and_then(|y| parse_percent(y, DIVIDEND_YIELD_SCALE));
        Ok(facts)
    }
}

#[async_trait]
impl MarketDataProvider for AlphaVantageProvider {
    fn id(&self) -> &'static str {
        PROVIDER_ID
    }

    fn priority(&self) -> u8 {
        3
    }

    fn capabilities(&self) -> ProviderCapabilities {
        ProviderCapabilities::ALL
    }

    fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    async fn fetch_quote(&self, symbol: &Symbol) -> Result<CanonicalQuote, MarketDataError> {
        let params = [("function", "GLOBAL_QUOTE"), ("symbol", symbol.as_str())];
        let body = self.fetch(symbol, &params).await?;
        Self::parse_global_quote(&body, symbol)
    }

    async fn fetch_history(
        &self,
        symbol: &Symbol,
        request: &HistoryRequest,
    ) -> Result<HistorySeries, MarketDataError> {
        // Compact daily output covers ~100 sessions, enough for 3M.
        let params = [
            ("function", Self::series_function(request.interval)),
            ("symbol", symbol.as_str()),
            ("outputsize", "compact"),
        ];
        let body = self.fetch(symbol, &params).await?;
        Self::parse_time_series(&body, symbol, request)
    }

    async fn fetch_facts(&self, symbol: &Symbol) -> Result<CompanyFacts, MarketDataError> {
        let params = [("function", "OVERVIEW"), ("symbol", symbol.as_str())];
        let body = self.fetch(symbol, &params).await?;
        Self::parse_overview(&body, symbol)
    }
}
