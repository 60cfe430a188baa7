//! Canonical data validation.
//!
//! Adapters map payloads; the validator checks the mapped values before a
//! chain accepts them:
//! - Quote: positive price, finite percent change, sane 52-week range
//! - History: positive close, high >= low, open/close inside high/low

use log::warn;
use rust_decimal::Decimal;

use crate::errors::MarketDataError;
use crate::models::{CanonicalQuote, HistoryPoint, HistorySeries};

/// Shape recorded on validation failures, which have no payload of their own.
const VALIDATION_SHAPE: &str = "<validation>";

/// Validation severity levels.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ValidationSeverity {
    /// Hard failure - reject the value.
    Hard,
    /// Soft warning - accept the value but log it.
    Soft,
}

/// Validation result details.
#[derive(Clone, Debug)]
pub struct ValidationIssue {
    /// Severity of the issue.
    pub severity: ValidationSeverity,
    /// Description of the issue.
    pub message: String,
}

/// Quote and history validator.
///
/// Hard issues on a quote reject it. Hard issues on a history point drop
/// that point; the series is rejected only when every point was dropped.
#[derive(Clone, Debug, Default)]
pub struct QuoteValidator;

impl QuoteValidator {
    pub fn new() -> Self {
        Self
    }

    /// Validate a quote.
    ///
    /// Returns Ok(()) if the quote is usable. Warnings are logged but do
    /// not cause rejection.
    pub fn validate_quote(&self, quote: &CanonicalQuote) -> Result<(), MarketDataError> {
        let mut issues: Vec<ValidationIssue> = Vec::new();

        if quote.price <= Decimal::ZERO {
            issues.push(hard(format!("Non-positive price: {}", quote.price)));
        }

        if !quote.percent_change.is_finite() {
            issues.push(hard("Non-finite percent change"));
        }

        if let (Some(high), Some(low)) = (quote.high52, quote.low52) {
            if high < low {
                issues.push(soft(format!("52-week high ({}) is below low ({})", high, low)));
            }
        }

        let provider = quote.source_provider.label();
        reject_or_warn(&provider, quote.symbol.as_str(), issues)
    }

    /// Validate a history series, dropping unusable points.
    ///
    /// Returns [`MarketDataError::EmptyResult`] for a series that arrives
    /// empty and [`MarketDataError::MalformedResponse`] when every point
    /// failed validation.
    pub fn validate_series(&self, mut series: HistorySeries) -> Result<HistorySeries, MarketDataError> {
        let provider = series.source_provider.label();
        let symbol = series.symbol.to_string();

        if series.is_empty() {
            return Err(MarketDataError::empty(&provider, &symbol));
        }

        let original_count = series.len();
        series.retain_points(|point| {
            let issues = point_issues(point);
            match reject_or_warn(&provider, &symbol, issues) {
                Ok(()) => true,
                Err(e) => {
                    warn!("Dropping {} bar {} from {}: {}", symbol, point.date, provider, e);
                    false
                }
            }
        });

        if series.is_empty() {
            warn!(
                "All {} bars from '{}' for {} failed validation",
                original_count, provider, symbol
            );
            return Err(validation_error(&provider, "All bars failed validation"));
        }

        Ok(series)
    }
}

fn point_issues(point: &HistoryPoint) -> Vec<ValidationIssue> {
    let mut issues = Vec::new();

    if point.close <= Decimal::ZERO {
        issues.push(hard(format!("Non-positive close: {}", point.close)));
    }

    if point.high < point.low {
        issues.push(hard(format!(
            "High ({}) is less than Low ({})",
            point.high, point.low
        )));
        return issues;
    }

    if point.open < point.low || point.open > point.high {
        issues.push(soft(format!(
            "Open ({}) is outside High/Low range ({}-{})",
            point.open, point.low, point.high
        )));
    }

    if point.close < point.low || point.close > point.high {
        issues.push(soft(format!(
            "Close ({}) is outside High/Low range ({}-{})",
            point.close, point.low, point.high
        )));
    }

    issues
}

fn hard(message: impl Into<String>) -> ValidationIssue {
    ValidationIssue {
        severity: ValidationSeverity::Hard,
        message: message.into(),
    }
}

fn soft(message: impl Into<String>) -> ValidationIssue {
    ValidationIssue {
        severity: ValidationSeverity::Soft,
        message: message.into(),
    }
}

fn reject_or_warn(
    provider: &str,
    symbol: &str,
    issues: Vec<ValidationIssue>,
) -> Result<(), MarketDataError> {
    let errors: Vec<&str> = issues
        .iter()
        .filter(|i| i.severity == ValidationSeverity::Hard)
        .map(|i| i.message.as_str())
        .collect();

    if !errors.is_empty() {
        return Err(validation_error(provider, &errors.join("; ")));
    }

    for issue in issues.iter().filter(|i| i.severity == ValidationSeverity::Soft) {
        warn!("Validation warning for {} from {}: {}", symbol, provider, issue.message);
    }

    Ok(())
}

fn validation_error(provider: &str, message: &str) -> MarketDataError {
    MarketDataError::MalformedResponse {
        provider: provider.to_string(),
        message: format!("Validation failed: {}", message),
        shape: VALIDATION_SHAPE.to_string(),
        sample: message.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{SourceProvider, Symbol, Timeframe};
    use crate::normalize::QuoteParts;
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;

    fn symbol() -> Symbol {
        Symbol::parse("AAPL").unwrap()
    }

    fn quote(price: f64) -> CanonicalQuote {
        QuoteParts {
            previous_close: Some(price - 1.0),
            ..QuoteParts::new(price)
        }
        .into_quote("TEST", &symbol())
        .unwrap()
    }

    fn bar(day: u32, open: Decimal, high: Decimal, low: Decimal, close: Decimal) -> HistoryPoint {
        HistoryPoint {
            date: NaiveDate::from_ymd_opt(2024, 3, day).unwrap(),
            open,
            high,
            low,
            close,
            volume: Some(1000),
        }
    }

    fn series(points: Vec<HistoryPoint>) -> HistorySeries {
        HistorySeries::from_points(
            symbol(),
            Timeframe::OneMonth,
            SourceProvider::provider("TEST"),
            points,
        )
    }

    #[test]
    fn test_valid_quote() {
        assert!(QuoteValidator::new().validate_quote(&quote(100.0)).is_ok());
    }

    #[test]
    fn test_non_positive_price_rejected() {
        let mut q = quote(100.0);
        q.price = dec!(0);

        let result = QuoteValidator::new().validate_quote(&q);
        match result {
            Err(MarketDataError::MalformedResponse { message, shape, .. }) => {
                assert!(message.contains("Non-positive price"));
                assert_eq!(shape, VALIDATION_SHAPE);
            }
            other => panic!("expected validation failure, got {:?}", other),
        }
    }

    #[test]
    fn test_inverted_52_week_range_is_soft() {
        let mut q = quote(100.0);
        q.high52 = Some(dec!(90));
        q.low52 = Some(dec!(110));

        assert!(QuoteValidator::new().validate_quote(&q).is_ok());
    }

    #[test]
    fn test_valid_series() {
        let s = series(vec![
            bar(1, dec!(100), dec!(110), dec!(95), dec!(105)),
            bar(4, dec!(105), dec!(108), dec!(101), dec!(102)),
        ]);
        let validated = QuoteValidator::new().validate_series(s).unwrap();
        assert_eq!(validated.len(), 2);
    }

    #[test]
    fn test_high_less_than_low_dropped() {
        let s = series(vec![
            bar(1, dec!(100), dec!(90), dec!(95), dec!(100)),
            bar(4, dec!(105), dec!(108), dec!(101), dec!(102)),
        ]);
        let validated = QuoteValidator::new().validate_series(s).unwrap();
        assert_eq!(validated.len(), 1);
        assert_eq!(validated.points()[0].close, dec!(102));
    }

    #[test]
    fn test_close_outside_envelope_kept() {
        let s = series(vec![bar(1, dec!(100), dec!(105), dec!(95), dec!(107))]);
        let validated = QuoteValidator::new().validate_series(s).unwrap();
        assert_eq!(validated.len(), 1);
    }

    #[test]
    fn test_all_bars_invalid_is_malformed() {
        let s = series(vec![
            bar(1, dec!(0), dec!(0), dec!(0), dec!(0)),
            bar(4, dec!(-1), dec!(-1), dec!(-1), dec!(-1)),
        ]);
        let err = QuoteValidator::new().validate_series(s).unwrap_err();
        assert!(matches!(err, MarketDataError::MalformedResponse { .. }));
    }

    #[test]
    fn test_empty_series_is_empty_result() {
        let err = QuoteValidator::new().validate_series(series(vec![])).unwrap_err();
        assert!(matches!(err, MarketDataError::EmptyResult { .. }));
    }
}
