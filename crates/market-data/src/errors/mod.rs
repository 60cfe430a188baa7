//! Error types and attempt classification for the market data crate.
//!
//! This module provides:
//! - [`MarketDataError`]: the failure a single provider attempt can report
//! - [`AttemptOutcome`]: how an attempt is recorded in the fallback log
//! - [`InputError`]: caller-input validation, the only error that reaches the UI

mod outcome;

pub use outcome::AttemptOutcome;

use thiserror::Error;

/// Longest payload excerpt kept on a [`MarketDataError::MalformedResponse`].
pub const MALFORMED_SAMPLE_LEN: usize = 200;

/// Errors a provider adapter can report for one invocation.
///
/// None of these cross the query-service boundary. The registry advances the
/// fallback chain on every variant, and each variant is classified into an
/// [`AttemptOutcome`] via [`outcome`](Self::outcome).
#[derive(Error, Debug)]
pub enum MarketDataError {
    /// Credentials or feature flag missing. Fails fast without network I/O.
    #[error("Provider not configured: {provider}")]
    NotConfigured {
        /// The provider missing configuration
        provider: String,
    },

    /// DNS, connection or 5xx failure.
    #[error("Transport error: {provider} - {message}")]
    Transport {
        /// The provider that failed
        provider: String,
        /// Description of the failure
        message: String,
        /// HTTP status when the server answered
        status: Option<u16>,
    },

    /// The provider rate limited the request (HTTP 429 or quota body).
    #[error("Rate limited: {provider}")]
    RateLimited {
        /// The provider that rate limited the request
        provider: String,
    },

    /// The provider answered successfully but had nothing usable.
    /// Expected for delisted or unknown symbols.
    #[error("No data: {provider} returned nothing usable for {symbol}")]
    EmptyResult {
        /// The provider that returned nothing
        provider: String,
        /// The symbol requested
        symbol: String,
    },

    /// The payload did not match the expected schema.
    #[error("Malformed response from {provider}: {message}")]
    MalformedResponse {
        /// The provider that sent the payload
        provider: String,
        /// What failed to parse or validate
        message: String,
        /// Top-level structure fingerprint used to de-duplicate drift logs
        shape: String,
        /// Truncated excerpt of the offending payload
        sample: String,
    },

    /// The attempt exceeded its deadline.
    #[error("Timeout: {provider}")]
    Timeout {
        /// The provider that timed out
        provider: String,
    },

    /// The request-scoped cancellation signal fired mid-attempt.
    #[error("Cancelled: {provider}")]
    Cancelled {
        /// The provider whose call was abandoned
        provider: String,
    },

    /// The adapter panicked while handling the call.
    #[error("Adapter panicked: {provider}")]
    Panicked {
        /// The provider whose adapter panicked
        provider: String,
    },

    /// The operation is not implemented by this provider.
    /// Reaching this is a wiring bug since capabilities gate every call.
    #[error("Operation not supported: {operation} by {provider}")]
    NotSupported {
        /// The operation that was attempted
        operation: String,
        /// The provider that doesn't support it
        provider: String,
    },
}

impl MarketDataError {
    /// Builds a [`MalformedResponse`](Self::MalformedResponse) from the raw body,
    /// keeping a bounded sample and a structural fingerprint of it.
    pub fn malformed(provider: &str, message: impl Into<String>, body: &str) -> Self {
        Self::MalformedResponse {
            provider: provider.to_string(),
            message: message.into(),
            shape: shape_signature(body),
            sample: truncate(body, MALFORMED_SAMPLE_LEN),
        }
    }

    /// Shorthand for an [`EmptyResult`](Self::EmptyResult).
    pub fn empty(provider: &str, symbol: &str) -> Self {
        Self::EmptyResult {
            provider: provider.to_string(),
            symbol: symbol.to_string(),
        }
    }

    /// Returns how this failure is recorded in the fallback attempt log.
    ///
    /// # Examples
    ///
    /// ```
    /// use tradesim_market_data::errors::{AttemptOutcome, MarketDataError};
    ///
    /// let error = MarketDataError::RateLimited { provider: "YAHOO".to_string() };
    /// assert_eq!(error.outcome(), AttemptOutcome::TransportError);
    ///
    /// let error = MarketDataError::empty("YAHOO", "ZZZZ");
    /// assert_eq!(error.outcome(), AttemptOutcome::EmptyResult);
    /// ```
    pub fn outcome(&self) -> AttemptOutcome {
        match self {
            Self::NotConfigured { .. } | Self::NotSupported { .. } => AttemptOutcome::Disabled,

            Self::Transport { .. } | Self::RateLimited { .. } | Self::Panicked { .. } => {
                AttemptOutcome::TransportError
            }

            Self::EmptyResult { .. } => AttemptOutcome::EmptyResult,
            Self::MalformedResponse { .. } => AttemptOutcome::MalformedResponse,
            Self::Timeout { .. } => AttemptOutcome::Timeout,
            Self::Cancelled { .. } => AttemptOutcome::Cancelled,
        }
    }

    /// Returns true when the request-scoped cancellation ended this attempt.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled { .. })
    }
}

impl MarketDataError {
    /// Maps a reqwest failure into the adapter taxonomy.
    pub fn from_reqwest(provider: &str, err: reqwest::Error) -> Self {
        if err.is_timeout() {
            return Self::Timeout {
                provider: provider.to_string(),
            };
        }
        Self::Transport {
            provider: provider.to_string(),
            message: err.to_string(),
            status: err.status().map(|s| s.as_u16()),
        }
    }
}

/// Caller-input validation errors. A 400-class condition at the HTTP layer.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InputError {
    #[error("Invalid symbol '{value}': {reason}")]
    InvalidSymbol { value: String, reason: String },

    #[error("Invalid timeframe '{value}': expected one of 1D, 1W, 1M, 3M, 1Y, 5Y")]
    InvalidTimeframe { value: String },

    #[error("At least one symbol is required")]
    EmptyBatch,

    #[error("Too many symbols: {count} (max {max})")]
    BatchTooLarge { count: usize, max: usize },
}

/// Fingerprints a payload by its top-level JSON structure.
///
/// Objects produce their sorted keys, so two payloads with the same fields
/// but different values share a signature.
fn shape_signature(body: &str) -> String {
    match serde_json::from_str::<serde_json::Value>(body) {
        Ok(serde_json::Value::Object(map)) => {
            let mut keys: Vec<&str> = map.keys().map(String::as_str).collect();
            keys.sort_unstable();
            format!("{{{}}}", keys.join(","))
        }
        Ok(serde_json::Value::Array(items)) => match items.first() {
            Some(serde_json::Value::Object(first)) => {
                let mut keys: Vec<&str> = first.keys().map(String::as_str).collect();
                keys.sort_unstable();
                format!("[{{{}}}]", keys.join(","))
            }
            Some(_) => "[scalar]".to_string(),
            None => "[]".to_string(),
        },
        Ok(_) => "<scalar>".to_string(),
        Err(_) => "<non-json>".to_string(),
    }
}

fn truncate(body: &str, max: usize) -> String {
    if body.len() <= max {
        return body.to_string();
    }
    let mut end = max;
    while !body.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &body[..end])
}
