use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use crate::errors::InputError;

/// Longest ticker accepted from callers.
pub const MAX_SYMBOL_LEN: usize = 6;

/// A validated, upper-cased ticker symbol.
///
/// Adapters only ever receive a `Symbol`, so they never re-check the format.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct Symbol(String);

impl Symbol {
    /// Trims and upper-cases `raw`, then checks it is 1-6 ASCII alphanumerics.
    pub fn parse(raw: &str) -> Result<Self, InputError> {
        let normalized = raw.trim().to_ascii_uppercase();
        let invalid = |reason: &str| InputError::InvalidSymbol {
            value: raw.to_string(),
            reason: reason.to_string(),
        };

        if normalized.is_empty() {
            return Err(invalid("symbol is empty"));
        }
        if normalized.len() > MAX_SYMBOL_LEN {
            return Err(invalid("symbol is longer than 6 characters"));
        }
        if !normalized.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(invalid("symbol must be alphanumeric"));
        }
        Ok(Self(normalized))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for Symbol {
    type Err = InputError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl AsRef<str> for Symbol {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
