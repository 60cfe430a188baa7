//! Yahoo Finance market data provider implementation.
//!
//! Quotes and history both come from the v8 chart endpoint. Yahoo has no
//! official API, so the provider is opt-in through a feature flag.

mod models;

use async_trait::async_trait;
use chrono::{DateTime, Duration, NaiveDate};
use reqwest::Client;
use tracing::debug;

use crate::errors::MarketDataError;
use crate::models::{
    CanonicalQuote, HistoryPoint, HistoryRequest, HistorySeries, Interval, SourceProvider, Symbol,
};
use crate::normalize::{to_price, to_volume, QuoteParts};
use crate::provider::http::{build_client, parse_json, send};
use crate::provider::{MarketDataProvider, ProviderCapabilities};

use models::{YahooChartResponse, YahooChartResult, YahooIndicatorQuote};

const BASE_URL: &str = "https://query1.finance.yahoo.com";
const PROVIDER_ID: &str = "YAHOO";

/// Yahoo Finance provider for quotes and history.
pub struct YahooProvider {
    client: Client,
    enabled: bool,
    base_url: String,
}

impl YahooProvider {
    pub fn new(enabled: bool) -> Self {
        Self::with_base_url(enabled, BASE_URL)
    }

    pub fn with_base_url(enabled: bool, base_url: impl Into<String>) -> Self {
        Self {
            client: build_client(),
            enabled,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    async fn fetch_chart(
        &self,
        symbol: &Symbol,
        params: &[(&str, String)],
    ) -> Result<String, MarketDataError> {
        if !self.enabled {
            return Err(MarketDataError::NotConfigured {
                provider: PROVIDER_ID.to_string(),
            });
        }
        let url = format!(
            "{}/v8/finance/chart/{}",
            self.base_url,
            urlencoding::encode(symbol.as_str())
        );
        debug!("Yahoo chart request: {} {:?}", url, params);
        send(PROVIDER_ID, symbol, self.client.get(&url).query(params)).await
    }

    fn interval_param(interval: Interval) -> &'static str {
        match interval {
            Interval::Daily => "1d",
            Interval::Weekly => "1wk",
            Interval::Monthly => "1mo",
        }
    }

    /// Unwraps the single chart result, mapping Yahoo's error envelope.
    fn chart_result(body: &str, symbol: &Symbol) -> Result<YahooChartResult, MarketDataError> {
        let response: YahooChartResponse = parse_json(PROVIDER_ID, body, "chart")?;
        if let Some(error) = response.chart.error {
            debug!(
                "Yahoo chart error for {}: {:?} {:?}",
                symbol, error.code, error.description
            );
            return Err(MarketDataError::empty(PROVIDER_ID, symbol.as_str()));
        }
        response
            .chart
            .result
            .and_then(|results| results.into_iter().next())
            .ok_or_else(|| MarketDataError::empty(PROVIDER_ID, symbol.as_str()))
    }

    fn parse_quote(body: &str, symbol: &Symbol) -> Result<CanonicalQuote, MarketDataError> {
        let meta = Self::chart_result(body, symbol)?.meta;
        let price = meta
            .regular_market_price
            .ok_or_else(|| MarketDataError::empty(PROVIDER_ID, symbol.as_str()))?;

        QuoteParts {
            display_name: meta.long_name.or(meta.short_name),
            previous_close: meta.previous_close.or(meta.chart_previous_close),
            volume: meta.regular_market_volume.and_then(to_volume),
            high52: meta.fifty_two_week_high,
            low52: meta.fifty_two_week_low,
            ..QuoteParts::new(price)
        }
        .into_quote(PROVIDER_ID, symbol)
    }

    fn parse_history(
        body: &str,
        symbol: &Symbol,
        request: &HistoryRequest,
    ) -> Result<HistorySeries, MarketDataError> {
        let result = Self::chart_result(body, symbol)?;
        let offset = result.meta.gmtoffset.unwrap_or(0);
        let empty = YahooIndicatorQuote::default();
        let bars = result
            .indicators
            .as_ref()
            .and_then(|i| i.quote.first())
            .unwrap_or(&empty);

        let points: Vec<HistoryPoint> = result
            .timestamp
            .iter()
            .enumerate()
            .filter_map(|(idx, ts)| {
                let date = exchange_date(*ts, offset)?;
                if !request.contains(date) {
                    return None;
                }
                let close = to_price(at(&bars.close, idx)?)?;
                let open = at(&bars.open, idx).and_then(to_price).unwrap_or(close);
                Some(HistoryPoint {
                    date,
                    open,
                    high: at(&bars.high, idx)
                        .and_then(to_price)
                        .unwrap_or(close.max(open)),
                    low: at(&bars.low, idx)
                        .and_then(to_price)
                        .unwrap_or(close.min(open)),
                    close,
                    volume: at(&bars.volume, idx).and_then(to_volume),
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
}

fn at(values: &[Option<f64>], idx: usize) -> Option<f64> {
    values.get(idx).copied().flatten()
}

/// Calendar day of a bar in the exchange's own time zone.
fn exchange_date(timestamp: i64, gmtoffset: i64) -> Option<NaiveDate> {
    DateTime::from_timestamp(timestamp.checked_add(gmtoffset)?, 0).map(|dt| dt.date_naive())
}

fn unix_seconds(date: NaiveDate) -> i64 {
    date.and_hms_opt(0, 0, 0)
        .map(|dt| dt.and_utc().timestamp())
        .unwrap_or_default()
}

#[async_trait]
impl MarketDataProvider for YahooProvider {
    fn id(&self) -> &'static str {
        PROVIDER_ID
    }

    fn priority(&self) -> u8 {
        2
    }

    fn capabilities(&self) -> ProviderCapabilities {
        ProviderCapabilities {
            supports_quote: true,
            supports_history: true,
            supports_facts: false,
        }
    }

    fn is_configured(&self) -> bool {
        self.enabled
    }

    async fn fetch_quote(&self, symbol: &Symbol) -> Result<CanonicalQuote, MarketDataError> {
        let params = [("range", "1d".to_string()), ("interval", "1d".to_string())];
        let body = self.fetch_chart(symbol, &params).await?;
        Self::parse_quote(&body, symbol)
    }

    async fn fetch_history(
        &self,
        symbol: &Symbol,
        request: &HistoryRequest,
    ) -> Result<HistorySeries, MarketDataError> {
        // period2 is exclusive on Yahoo's side.
        let params = [
            ("period1", unix_seconds(request.start).to_string()),
            (
                "period2",
                unix_seconds(request.end + Duration::days(1)).to_string(),
            ),
            (
                "interval",
                Self::interval_param(request.interval).to_string(),
            ),
            ("events", "history".to_string()),
        ];
        let body = self.fetch_chart(symbol, &params).await?;
        Self::parse_history(&body, symbol, request)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Timeframe;
    use rust_decimal_macros::dec;

    fn symbol() -> Symbol {
        Symbol::parse("MSFT").unwrap()
    }

    const QUOTE_BODY: &str = r#"{
        "chart": {
            "result": [{
                "meta": {
                    "currency": "USD",
                    "symbol": "MSFT",
                    "exchangeName": "NMS",
                    "longName": "Microsoft Corporation",
                    "shortName": "Microsoft",
                    "regularMarketPrice": 420.0,
                    "chartPreviousClose": 400.0,
                    "regularMarketVolume": 18000000,
                    "fiftyTwoWeekHigh": 468.35,
                    "fiftyTwoWeekLow": 309.45,
                    "gmtoffset": -14400
                },
                "timestamp": [1719581400],
                "indicators": {"quote": [{"open": [410.0], "high": [421.0], "low": [409.0], "close": [420.0], "volume": [18000000]}]}
            }],
            "error": null
        }
    }"#;

    #[test]
    fn test_parse_quote_from_meta() {
        let quote = YahooProvider::parse_quote(QUOTE_BODY, &symbol()).unwrap();
        assert_eq!(quote.display_name, "Microsoft Corporation");
        assert_eq!(quote.price, dec!(420));
        assert_eq!(quote.absolute_change, dec!(20));
        assert_eq!(quote.percent_change, 5.0);
        assert_eq!(quote.volume, 18_000_000);
        assert_eq!(quote.high52, Some(dec!(468.35)));
    }

    #[test]
    fn test_parse_quote_error_envelope_is_empty() {
        let body = r#"{"chart": {"result": null, "error": {"code": "Not Found", "description": "No data found, symbol may be delisted"}}}"#;
        let err = YahooProvider::parse_quote(body, &symbol()).unwrap_err();
        assert!(matches!(err, MarketDataError::EmptyResult { .. }));
    }

    #[test]
    fn test_parse_history_uses_exchange_dates_and_skips_gaps() {
        // 2024-06-26/27/28 13:30 UTC market opens; the middle bar has a null close.
        let body = r#"{
            "chart": {
                "result": [{
                    "meta": {"symbol": "MSFT", "regularMarketPrice": 420.0, "gmtoffset": -14400},
                    "timestamp": [1719408600, 1719495000, 1719581400, 1719581400],
                    "indicators": {"quote": [{
                        "open":   [450.0, 452.0, 451.0, 451.0],
                        "high":   [453.0, 455.0, 454.0, 456.0],
                        "low":    [449.0, 450.0, 447.0, 447.0],
                        "close":  [452.5, null, 446.9, 447.2],
                        "volume": [16000000, 15000000, 30000000, 31000000]
                    }]}
                }],
                "error": null
            }
        }"#;
        let request = HistoryRequest::ending_on(
            Timeframe::OneWeek,
            NaiveDate::from_ymd_opt(2024, 6, 28).unwrap(),
        );
        let series = YahooProvider::parse_history(body, &symbol(), &request).unwrap();
        let dates: Vec<_> = series.points().iter().map(|p| p.date).collect();
        assert_eq!(
            dates,
            vec![
                NaiveDate::from_ymd_opt(2024, 6, 26).unwrap(),
                NaiveDate::from_ymd_opt(2024, 6, 28).unwrap(),
            ]
        );
        assert_eq!(series.last().unwrap().close, dec!(447.2));
    }

    #[test]
    fn test_exchange_date_applies_offset() {
        // 2024-06-29 02:00 UTC is still the 28th in New York.
        let date = exchange_date(1719626400, -14400).unwrap();
        assert_eq!(date, NaiveDate::from_ymd_opt(2024, 6, 28).unwrap());
    }

    #[test]
    fn test_out_of_range_timestamp_drops_bar() {
        assert_eq!(exchange_date(i64::MAX, 3600), None);

        let body = r#"{
            "chart": {
                "result": [{
                    "meta": {"symbol": "MSFT", "regularMarketPrice": 420.0, "gmtoffset": 3600},
                    "timestamp": [9223372036854775807, 1719581400],
                    "indicators": {"quote": [{
                        "open":   [450.0, 451.0],
                        "high":   [453.0, 454.0],
                        "low":    [449.0, 447.0],
                        "close":  [452.5, 446.9],
                        "volume": [16000000, 30000000]
                    }]}
                }],
                "error": null
            }
        }"#;
        let request = HistoryRequest::ending_on(
            Timeframe::OneWeek,
            NaiveDate::from_ymd_opt(2024, 6, 28).unwrap(),
        );
        let series = YahooProvider::parse_history(body, &symbol(), &request).unwrap();
        assert_eq!(series.points().len(), 1);
        assert_eq!(series.last().unwrap().close, dec!(446.9));
    }

    #[tokio::test]
    async fn test_disabled_fails_fast() {
        let provider = YahooProvider::new(false);
        assert!(!provider.is_configured());
        let err = provider.fetch_quote(&symbol()).await.unwrap_err();
        assert!(matches!(err, MarketDataError::NotConfigured { .. }));
    }

    #[test]
    fn test_capabilities() {
        let caps = YahooProvider::new(true).capabilities();
        assert!(caps.supports_quote);
        assert!(caps.supports_history);
        assert!(!caps.supports_facts);
    }
}
