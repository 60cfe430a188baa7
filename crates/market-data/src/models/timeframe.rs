use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, Duration, Months, NaiveDate, Utc, Weekday};
use serde::Serialize;

use crate::errors::InputError;

/// Chart timeframe tokens accepted from the UI.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Hash, Serialize)]
pub enum Timeframe {
    #[serde(rename = "1D")]
    OneDay,
    #[serde(rename = "1W")]
    OneWeek,
    #[serde(rename = "1M")]
    OneMonth,
    #[default]
    #[serde(rename = "3M")]
    ThreeMonths,
    #[serde(rename = "1Y")]
    OneYear,
    #[serde(rename = "5Y")]
    FiveYears,
}

/// Canonical bar size. Adapters translate it into their own vocabulary.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Interval {
    Daily,
    Weekly,
    Monthly,
}

impl Timeframe {
    pub const ALL: [Timeframe; 6] = [
        Timeframe::OneDay,
        Timeframe::OneWeek,
        Timeframe::OneMonth,
        Timeframe::ThreeMonths,
        Timeframe::OneYear,
        Timeframe::FiveYears,
    ];

    pub fn parse(token: &str) -> Result<Self, InputError> {
        match token.trim().to_ascii_uppercase().as_str() {
            "1D" => Ok(Self::OneDay),
            "1W" => Ok(Self::OneWeek),
            "1M" => Ok(Self::OneMonth),
            "3M" => Ok(Self::ThreeMonths),
            "1Y" => Ok(Self::OneYear),
            "5Y" => Ok(Self::FiveYears),
            _ => Err(InputError::InvalidTimeframe {
                value: token.to_string(),
            }),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OneDay => "1D",
            Self::OneWeek => "1W",
            Self::OneMonth => "1M",
            Self::ThreeMonths => "3M",
            Self::OneYear => "1Y",
            Self::FiveYears => "5Y",
        }
    }

    /// Calendar days covered by the window ending today.
    ///
    /// `1D` looks back five days so a weekend or holiday still leaves at
    /// least one completed session.
    pub fn lookback_days(&self) -> i64 {
        match self {
            Self::OneDay => 5,
            Self::OneWeek => 7,
            Self::OneMonth => 30,
            Self::ThreeMonths => 90,
            Self::OneYear => 365,
            Self::FiveYears => 5 * 365,
        }
    }

    pub fn interval(&self) -> Interval {
        match self {
            Self::OneDay | Self::OneWeek | Self::OneMonth | Self::ThreeMonths => Interval::Daily,
            Self::OneYear => Interval::Weekly,
            Self::FiveYears => Interval::Monthly,
        }
    }
}

impl FromStr for Timeframe {
    type Err = InputError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for Timeframe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Interval {
    /// Next bar date after `date`. Daily bars skip weekends.
    pub fn next_bar(&self, date: NaiveDate) -> Option<NaiveDate> {
        match self {
            Interval::Daily => {
                let mut next = date.checked_add_signed(Duration::days(1))?;
                while is_weekend(next) {
                    next = next.checked_add_signed(Duration::days(1))?;
                }
                Some(next)
            }
            Interval::Weekly => date.checked_add_signed(Duration::days(7)),
            Interval::Monthly => date.checked_add_months(Months::new(1)),
        }
    }

    /// Previous bar date before `date`. Daily bars skip weekends.
    pub fn previous_bar(&self, date: NaiveDate) -> Option<NaiveDate> {
        match self {
            Interval::Daily => {
                let mut prev = date.checked_sub_signed(Duration::days(1))?;
                while is_weekend(prev) {
                    prev = prev.checked_sub_signed(Duration::days(1))?;
                }
                Some(prev)
            }
            Interval::Weekly => date.checked_sub_signed(Duration::days(7)),
            Interval::Monthly => date.checked_sub_months(Months::new(1)),
        }
    }
}

fn is_weekend(date: NaiveDate) -> bool {
    matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
}

/// A validated history window handed to adapters.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HistoryRequest {
    pub timeframe: Timeframe,
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub interval: Interval,
}

impl HistoryRequest {
    /// Window for `timeframe` ending today (UTC).
    pub fn new(timeframe: Timeframe) -> Self {
        Self::ending_on(timeframe, Utc::now().date_naive())
    }

    pub fn ending_on(timeframe: Timeframe, end: NaiveDate) -> Self {
        let start = end - Duration::days(timeframe.lookback_days());
        Self {
            timeframe,
            start,
            end,
            interval: timeframe.interval(),
        }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start && date <= self.end
    }
}
