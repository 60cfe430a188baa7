//! Deterministic placeholder data for exhausted fallback chains.
//!
//! Values are drawn from an RNG seeded by the symbol, so a degraded symbol
//! shows the same numbers on every call instead of jumping around. Every
//! record is tagged [`SourceProvider::Synthetic`].

use chrono::{Datelike, Utc, Weekday};
use num_traits::ToPrimitive;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rust_decimal::Decimal;

use crate::models::{
    CanonicalQuote, CompanyFacts, HistoryPoint, HistoryRequest, HistorySeries, Interval,
    SourceProvider, Symbol,
};
use crate::normalize::round_percent;

/// Builds synthetic quotes, history and facts. Never fails.
#[derive(Clone, Copy, Debug, Default)]
pub struct SyntheticGenerator;

impl SyntheticGenerator {
    pub fn new() -> Self {
        Self
    }

    pub fn quote(&self, symbol: &Symbol) -> CanonicalQuote {
        let mut rng = rng_for(symbol.as_str());

        let price = Decimal::new(rng.gen_range(2_000..52_000), 2);
        // Change in basis points of the previous close.
        let change_bps: i64 = rng.gen_range(-500..=500);
        let absolute_change =
            (price * Decimal::from(change_bps) / Decimal::from(10_000 + change_bps)).round_dp(4);
        let previous = price - absolute_change;
        let percent_change = (absolute_change / previous * Decimal::ONE_HUNDRED)
            .to_f64()
            .map(round_percent)
            .unwrap_or(0.0);

        let volume = rng.gen_range(1_000_000..80_000_000u64);
        let shares = rng.gen_range(50_000_000..5_000_000_000u64);
        let market_cap = price.to_f64().map(|p| (p * shares as f64).round());

        let high52 = (price * Decimal::new(rng.gen_range(105..160), 2)).round_dp(2);
        let low52 = (price * Decimal::new(rng.gen_range(50..95), 2)).round_dp(2);

        let pe_tenths: u32 = rng.gen_range(80..450);
        let pe_ratio = rng.gen_bool(0.8).then(|| f64::from(pe_tenths) / 10.0);

        let dividend_bps: i64 = rng.gen_range(50..300);
        let dividend_per_share = rng
            .gen_bool(0.5)
            .then(|| (price * Decimal::new(dividend_bps, 4)).round_dp(2))
            .filter(|d| *d > Decimal::ZERO);
        let dividend_yield_percent = dividend_per_share
            .and_then(|d| (d / price * Decimal::ONE_HUNDRED).to_f64())
            .map(round_percent);

        CanonicalQuote {
            symbol: symbol.clone(),
            display_name: format!("{} (simulated)", symbol),
            price,
            absolute_change,
            percent_change,
            volume,
            market_cap,
            high52: Some(high52),
            low52: Some(low52),
            pe_ratio,
            dividend_per_share,
            dividend_yield_percent,
            sector: None,
            source_provider: SourceProvider::Synthetic,
            retrieved_at: Utc::now(),
        }
    }

    /// A seeded random walk over the request window that ends at the
    /// synthetic quote's price.
    pub fn history(&self, symbol: &Symbol, request: &HistoryRequest) -> HistorySeries {
        let last_close = self.quote(symbol).price;
        let mut rng = rng_for(&format!("{}:{}", symbol, request.timeframe));

        // Walk dates backwards from the window end, snapping to a weekday
        // for daily bars.
        let mut dates = Vec::new();
        let mut cursor = match request.end.weekday() {
            Weekday::Sat | Weekday::Sun if request.interval == Interval::Daily => {
                request.interval.previous_bar(request.end)
            }
            _ => Some(request.end),
        };
        while let Some(date) = cursor {
            if date < request.start {
                break;
            }
            dates.push(date);
            cursor = request.interval.previous_bar(date);
        }

        let mut points = Vec::with_capacity(dates.len());
        let mut close = last_close;
        for date in dates {
            // Per-bar move within +/-2%, intraday range within 1.5%.
            let open = (close * Decimal::new(10_000 + rng.gen_range(-200..=200), 4)).round_dp(2);
            let spread = Decimal::new(10_000 + rng.gen_range(0..=150), 4);
            let high = (open.max(close) * spread).round_dp(2);
            let low = (open.min(close) / spread).round_dp(2);
            points.push(HistoryPoint {
                date,
                open,
                high,
                low,
                close,
                volume: Some(rng.gen_range(500_000..60_000_000u64)),
            });
            // The previous bar closed where this one opened.
            close = open;
        }

        HistorySeries::from_points(
            symbol.clone(),
            request.timeframe,
            SourceProvider::Synthetic,
            points,
        )
    }

    pub fn facts(&self, symbol: &Symbol) -> CompanyFacts {
        CompanyFacts::named(
            symbol.clone(),
            format!("{} Corporation", symbol),
            SourceProvider::Synthetic,
        )
    }
}

/// Seeds from the first 8 bytes of the key's MD5 digest.
fn rng_for(key: &str) -> StdRng {
    let digest = md5::compute(key.as_bytes());
    let mut seed = [0u8; 8];
    seed.copy_from_slice(&digest.0[..8]);
    StdRng::seed_from_u64(u64::from_le_bytes(seed))
}
