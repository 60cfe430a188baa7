//! Yahoo Finance API response models.
//!
//! These models parse the v8 chart API, which serves both the live quote
//! (via `meta`) and historical bars without a crumb/cookie handshake.

use serde::Deserialize;

/// Main response wrapper for the chart API
#[derive(Debug, Deserialize)]
pub struct YahooChartResponse {
    pub chart: YahooChart,
}

/// Chart container. Exactly one of `result`/`error` is normally set.
#[derive(Debug, Deserialize)]
pub struct YahooChart {
    pub result: Option<Vec<YahooChartResult>>,
    pub error: Option<YahooChartError>,
}

#[derive(Debug, Deserialize)]
pub struct YahooChartError {
    pub code: Option<String>,
    pub description: Option<String>,
}

/// Individual result from the chart API
#[derive(Debug, Deserialize)]
pub struct YahooChartResult {
    pub meta: YahooChartMeta,
    #[serde(default)]
    pub timestamp: Vec<i64>,
    pub indicators: Option<YahooIndicators>,
}

/// Instrument metadata, including the current regular-session price
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct YahooChartMeta {
    pub symbol: Option<String>,
    pub long_name: Option<String>,
    pub short_name: Option<String>,
    pub regular_market_price: Option<f64>,
    pub previous_close: Option<f64>,
    pub chart_previous_close: Option<f64>,
    pub regular_market_volume: Option<f64>,
    pub fifty_two_week_high: Option<f64>,
    pub fifty_two_week_low: Option<f64>,
    /// Exchange offset from UTC in seconds
    pub gmtoffset: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct YahooIndicators {
    #[serde(default)]
    pub quote: Vec<YahooIndicatorQuote>,
}

/// Parallel OHLCV arrays aligned with `timestamp`. Gaps are `null`.
#[derive(Debug, Default, Deserialize)]
pub struct YahooIndicatorQuote {
    #[serde(default)]
    pub open: Vec<Option<f64>>,
    #[serde(default)]
    pub high: Vec<Option<f64>>,
    #[serde(default)]
    pub low: Vec<Option<f64>>,
    #[serde(default)]
    pub close: Vec<Option<f64>>,
    #[serde(default)]
    pub volume: Vec<Option<f64>>,
}
