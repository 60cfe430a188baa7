//! Simulation backend provider.
//!
//! The trading-simulation service exposes stock endpoints of its own. It is
//! the lowest-priority fallback for every request kind:
//! - `GET /api/stocks/{symbol}` for the quote and facts
//! - `GET /api/stocks/{symbol}/history?timeframe=` for `[{date, price}]` bars
//!
//! The backend is inconsistent about percent scale (`changePercent` and
//! `yield` are percents for some symbols and fractions for others), so both
//! are derived from change, price and dividend instead of trusted.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

use crate::errors::MarketDataError;
use crate::models::{
    CanonicalQuote, CompanyFacts, HistoryPoint, HistoryRequest, HistorySeries, SourceProvider,
    Symbol,
};
use crate::normalize::{parse_day, parse_number, to_price, to_volume, PercentScale, QuoteParts};
use crate::provider::http::{build_client, parse_json, send};
use crate::provider::{MarketDataProvider, ProviderCapabilities};

const PROVIDER_ID: &str = "BACKEND";

/// Used only when neither change nor previous close is present.
const CHANGE_PERCENT_SCALE: PercentScale = PercentScale::Percent;

/// Provider backed by the simulation service's stock endpoints.
pub struct BackendProvider {
    client: Client,
    base_url: Option<String>,
}

// ============================================================================
// Response structures for the simulation backend
// ============================================================================

/// Numbers sometimes arrive pre-formatted ("2.8T").
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Amount {
    Number(f64),
    Text(String),
}

impl Amount {
    fn value(&self) -> Option<f64> {
        match self {
            Amount::Number(n) => Some(*n).filter(|v| v.is_finite()),
            Amount::Text(s) => parse_number(s),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StockDetails {
    name: Option<String>,
    price: Option<Amount>,
    change: Option<Amount>,
    change_percent: Option<Amount>,
    market_cap: Option<Amount>,
    volume: Option<Amount>,
    sector: Option<String>,
    high52: Option<Amount>,
    low52: Option<Amount>,
    pe: Option<Amount>,
    dividend: Option<Amount>,
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct HistoryRow {
    date: String,
    price: Amount,
}

fn amount(value: &Option<Amount>) -> Option<f64> {
    value.as_ref().and_then(Amount::value)
}

// ============================================================================
// BackendProvider implementation
// ============================================================================

impl BackendProvider {
    /// Create a provider. `None` or an empty URL disables it.
    pub fn new(base_url: Option<String>) -> Self {
        Self {
            client: build_client(),
            base_url: base_url
                .map(|u| u.trim().trim_end_matches('/').to_string())
                .filter(|u| !u.is_empty()),
        }
    }

    async fn fetch(
        &self,
        symbol: &Symbol,
        suffix: &str,
        params: &[(&str, &str)],
    ) -> Result<String, MarketDataError> {
        let base_url = self
            .base_url
            .as_deref()
            .ok_or_else(|| MarketDataError::NotConfigured {
                provider: PROVIDER_ID.to_string(),
            })?;
        let url = format!(
            "{}/api/stocks/{}{}",
            base_url,
            urlencoding::encode(symbol.as_str()),
            suffix
        );
        debug!("Backend request: {} {:?}", url, params);
        send(PROVIDER_ID, symbol, self.client.get(&url).query(params)).await
    }

    fn parse_details(body: &str) -> Result<StockDetails, MarketDataError> {
        parse_json(PROVIDER_ID, body, "stock details")
    }

    fn parse_quote(body: &str, symbol: &Symbol) -> Result<CanonicalQuote, MarketDataError> {
        let details = Self::parse_details(body)?;
        let price = amount(&details.price)
            .ok_or_else(|| MarketDataError::empty(PROVIDER_ID, symbol.as_str()))?;

        QuoteParts {
            display_name: details.name,
            change: amount(&details.change),
            reported_percent: amount(&details.change_percent)
                .map(|p| CHANGE_PERCENT_SCALE.to_percent(p)),
            volume: amount(&details.volume).and_then(to_volume),
            market_cap: amount(&details.market_cap),
            high52: amount(&details.high52),
            low52: amount(&details.low52),
            pe_ratio: amount(&details.pe).filter(|pe| *pe > 0.0),
            dividend_per_share: amount(&details.dividend),
            sector: details.sector,
            ..QuoteParts::new(price)
        }
        .into_quote(PROVIDER_ID, symbol)
    }

    fn parse_facts(body: &str, symbol: &Symbol) -> Result<CompanyFacts, MarketDataError> {
        let details = Self::parse_details(body)?;
        let name = details
            .name
            .filter(|n| !n.trim().is_empty())
            .ok_or_else(|| MarketDataError::empty(PROVIDER_ID, symbol.as_str()))?;

        let mut facts =
            CompanyFacts::named(symbol.clone(), name, SourceProvider::provider(PROVIDER_ID));
        facts.sector = details.sector;
        facts.market_cap = amount(&details.market_cap).filter(|m| *m > 0.0);
        facts.description = details.description;
        Ok(facts)
    }

    fn parse_history(
        body: &str,
        symbol: &Symbol,
        request: &HistoryRequest,
    ) -> Result<HistorySeries, MarketDataError> {
        let rows: Vec<HistoryRow> = parse_json(PROVIDER_ID, body, "history")?;
        let points: Vec<HistoryPoint> = rows
            .iter()
            .filter_map(|row| {
                let date = parse_day(&row.date)?;
                let price = row.price.value().and_then(to_price)?;
                Some(HistoryPoint::flat(date, price))
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
}

#[async_trait]
impl MarketDataProvider for BackendProvider {
    fn id(&self) -> &'static str {
        PROVIDER_ID
    }

    fn priority(&self) -> u8 {
        50
    }

    fn capabilities(&self) -> ProviderCapabilities {
        ProviderCapabilities::ALL
    }

    fn is_configured(&self) -> bool {
        self.base_url.is_some()
    }

    async fn fetch_quote(&self, symbol: &Symbol) -> Result<CanonicalQuote, MarketDataError> {
        let body = self.fetch(symbol, "", &[]).await?;
        Self::parse_quote(&body, symbol)
    }

    async fn fetch_history(
        &self,
        symbol: &Symbol,
        request: &HistoryRequest,
    ) -> Result<HistorySeries, MarketDataError> {
        let params = [("timeframe", request.timeframe.as_str())];
        let body = self.fetch(symbol, "/history", &params).await?;
        Self::parse_history(&body, symbol, request)
    }

    async fn fetch_facts(&self, symbol: &Symbol) -> Result<CompanyFacts, MarketDataError> {
        let body = self.fetch(symbol, "", &[]).await?;
        Self::parse_facts(&body, symbol)
    }
}
