use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;

use super::source::SourceProvider;
use super::symbol::Symbol;
use super::timeframe::Timeframe;

/// One bar of a history series, keyed by calendar day.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct HistoryPoint {
    pub date: NaiveDate,
    pub open: Decimal,
    pub high: Decimal,
    pub low: Decimal,
    pub close: Decimal,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub volume: Option<u64>,
}

impl HistoryPoint {
    /// A bar where only one price is known (line-chart sources).
    pub fn flat(date: NaiveDate, price: Decimal) -> Self {
        Self {
            date,
            open: price,
            high: price,
            low: price,
            close: price,
            volume: None,
        }
    }
}

/// Date-ordered bars for one symbol from one source.
///
/// Points are strictly increasing by date; there is no way to build a
/// series that violates this.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HistorySeries {
    pub symbol: Symbol,
    pub timeframe: Timeframe,
    pub source_provider: SourceProvider,
    points: Vec<HistoryPoint>,
}

impl HistorySeries {
    /// Sorts `points` by date and drops duplicate dates.
    ///
    /// For a repeated date the point appearing later in the input wins,
    /// which matches providers that append a live bar to a daily series.
    pub fn from_points(
        symbol: Symbol,
        timeframe: Timeframe,
        source_provider: SourceProvider,
        mut points: Vec<HistoryPoint>,
    ) -> Self {
        // Stable sort keeps input order within a date.
        points.sort_by_key(|p| p.date);

        let mut deduped: Vec<HistoryPoint> = Vec::with_capacity(points.len());
        for point in points {
            match deduped.last_mut() {
                Some(last) if last.date == point.date => *last = point,
                _ => deduped.push(point),
            }
        }

        Self {
            symbol,
            timeframe,
            source_provider,
            points: deduped,
        }
    }

    pub fn points(&self) -> &[HistoryPoint] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn last(&self) -> Option<&HistoryPoint> {
        self.points.last()
    }

    /// Drops points failing `keep`. Order is preserved.
    pub(crate) fn retain_points<F>(&mut self, keep: F)
    where
        F: FnMut(&HistoryPoint) -> bool,
    {
        self.points.retain(keep);
    }
}
