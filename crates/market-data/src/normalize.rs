//! Normalization rules shared by every adapter.
//!
//! Providers disagree on percent scale, number formatting and date formats.
//! Adapters declare their native convention and funnel values through these
//! helpers so canonical records always carry 0-100 percents, raw-unit
//! volumes and market caps, and calendar-day dates.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use num_traits::FromPrimitive;
use rust_decimal::Decimal;

use crate::errors::MarketDataError;
use crate::models::{CanonicalQuote, SourceProvider, Symbol};

/// Decimal places kept on canonical prices.
const PRICE_DP: u32 = 4;

/// How a provider expresses percentages natively.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PercentScale {
    /// `0.0139` means 1.39%
    Fraction,
    /// `1.39` means 1.39%
    Percent,
}

impl PercentScale {
    /// Converts a native value to the canonical 0-100 scale.
    pub fn to_percent(self, value: f64) -> f64 {
        match self {
            PercentScale::Fraction => round_percent(value * 100.0),
            PercentScale::Percent => round_percent(value),
        }
    }
}

/// Rounds to 4 decimals, removing float noise like `1.3900000000000001`.
pub fn round_percent(value: f64) -> f64 {
    (value * 10_000.0).round() / 10_000.0
}

/// Parses a provider number string into raw units.
///
/// Accepts thousands separators and the abbreviated suffixes `K`, `M`, `B`
/// and `T` (`"2.8T"` becomes `2.8e12`). Placeholder strings such as
/// `"None"`, `"-"` or `"N/A"` yield `None`.
pub fn parse_number(raw: &str) -> Option<f64> {
    let trimmed = raw.trim();
    if trimmed.is_empty()
        || trimmed == "-"
        || trimmed.eq_ignore_ascii_case("none")
        || trimmed.eq_ignore_ascii_case("n/a")
        || trimmed.eq_ignore_ascii_case("null")
    {
        return None;
    }

    let cleaned: String = trimmed
        .chars()
        .filter(|c| *c != ',' && *c != '$')
        .collect();

    let (digits, multiplier) = match cleaned.chars().last() {
        Some('K') | Some('k') => (&cleaned[..cleaned.len() - 1], 1e3),
        Some('M') | Some('m') => (&cleaned[..cleaned.len() - 1], 1e6),
        Some('B') | Some('b') => (&cleaned[..cleaned.len() - 1], 1e9),
        Some('T') | Some('t') => (&cleaned[..cleaned.len() - 1], 1e12),
        _ => (cleaned.as_str(), 1.0),
    };

    digits
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .map(|v| v * multiplier)
}

/// Parses a percent string. A trailing `%` always means the percent scale,
/// otherwise the provider's declared `scale` applies.
pub fn parse_percent(raw: &str, scale: PercentScale) -> Option<f64> {
    let trimmed = raw.trim();
    match trimmed.strip_suffix('%') {
        Some(number) => parse_number(number).map(|v| PercentScale::Percent.to_percent(v)),
        None => parse_number(trimmed).map(|v| scale.to_percent(v)),
    }
}

/// Extracts the calendar day from the date formats providers emit:
/// `2024-01-02`, `2024-01-02T05:00:00Z` or `2024-01-02 16:00:01`.
pub fn parse_day(raw: &str) -> Option<NaiveDate> {
    let trimmed = raw.trim();
    if let Ok(date) = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
        return Some(date);
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(dt.date_naive());
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%d %H:%M:%S") {
        return Some(dt.date());
    }
    trimmed
        .get(..10)
        .and_then(|prefix| NaiveDate::parse_from_str(prefix, "%Y-%m-%d").ok())
}

/// Converts to a canonical price, rounded to 4 decimals.
pub fn to_price(value: f64) -> Option<Decimal> {
    if !value.is_finite() {
        return None;
    }
    Decimal::from_f64(value).map(|d| d.round_dp(PRICE_DP))
}

/// Converts a raw volume, dropping negatives and non-finite values.
pub fn to_volume(value: f64) -> Option<u64> {
    if value.is_finite() && value >= 0.0 {
        Some(value.round() as u64)
    } else {
        None
    }
}

/// Raw quote values collected by an adapter before normalization.
///
/// `reported_percent` must already be on the 0-100 scale (see
/// [`PercentScale`]). It is only used when the change cannot be derived
/// from price and previous close.
#[derive(Clone, Debug, Default)]
pub struct QuoteParts {
    pub display_name: Option<String>,
    pub price: f64,
    pub previous_close: Option<f64>,
    pub change: Option<f64>,
    pub reported_percent: Option<f64>,
    pub volume: Option<u64>,
    pub market_cap: Option<f64>,
    pub high52: Option<f64>,
    pub low52: Option<f64>,
    pub pe_ratio: Option<f64>,
    pub dividend_per_share: Option<f64>,
    pub dividend_yield_percent: Option<f64>,
    pub sector: Option<String>,
}

impl QuoteParts {
    pub fn new(price: f64) -> Self {
        Self {
            price,
            ..Default::default()
        }
    }

    /// Builds the canonical quote.
    ///
    /// A missing or non-positive price means the provider had nothing for
    /// the symbol and yields [`MarketDataError::EmptyResult`].
    pub fn into_quote(
        self,
        provider: &str,
        symbol: &Symbol,
    ) -> Result<CanonicalQuote, MarketDataError> {
        let price = self.price;
        if !(price.is_finite() && price > 0.0) {
            return Err(MarketDataError::empty(provider, symbol.as_str()));
        }

        let positive = |v: &f64| v.is_finite() && *v > 0.0;
        let finite = |v: &f64| v.is_finite();

        let mut previous = self
            .previous_close
            .filter(positive)
            .or_else(|| self.change.filter(finite).map(|c| price - c))
            .filter(positive);
        if previous.is_none() {
            previous = self
                .reported_percent
                .filter(|p| p.is_finite() && *p > -100.0)
                .map(|p| price / (1.0 + p / 100.0))
                .filter(positive);
        }

        let change = self
            .change
            .filter(finite)
            .or_else(|| previous.map(|p| price - p))
            .unwrap_or(0.0);

        let percent_change = match previous {
            Some(prev) => round_percent(change / prev * 100.0),
            None => self.reported_percent.filter(finite).map(round_percent).unwrap_or(0.0),
        };

        let dividend_yield_percent = self
            .dividend_yield_percent
            .filter(finite)
            .map(round_percent)
            .or_else(|| {
                self.dividend_per_share
                    .filter(positive)
                    .map(|d| round_percent(d / price * 100.0))
            });

        let to_price_checked = |value: f64, field: &str| {
            to_price(value).ok_or_else(|| {
                MarketDataError::malformed(provider, format!("{field} out of range"), "")
            })
        };

        Ok(CanonicalQuote {
            symbol: symbol.clone(),
            display_name: self
                .display_name
                .filter(|n| !n.trim().is_empty())
                .unwrap_or_else(|| symbol.to_string()),
            price: to_price_checked(price, "price")?,
            absolute_change: to_price_checked(change, "change")?,
            percent_change,
            volume: self.volume.unwrap_or(0),
            market_cap: self.market_cap.filter(positive),
            high52: self.high52.filter(positive).and_then(to_price),
            low52: self.low52.filter(positive).and_then(to_price),
            pe_ratio: self.pe_ratio.filter(finite),
            dividend_per_share: self.dividend_per_share.filter(positive).and_then(to_price),
            dividend_yield_percent,
            sector: self.sector.filter(|s| !s.trim().is_empty()),
            source_provider: SourceProvider::provider(provider.to_string()),
            retrieved_at: Utc::now(),
        })
    }
}
