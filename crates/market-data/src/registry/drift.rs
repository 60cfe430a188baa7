//! Schema-drift logging for malformed provider payloads.

use std::collections::HashSet;
use std::sync::Mutex;

use log::{debug, warn};

use crate::errors::MarketDataError;
use crate::models::RequestKind;

/// Logs a payload sample the first time each `(provider, kind, shape)` fails
/// to parse, and only a one-line debug record afterwards.
///
/// The dedup set is observability state; chain behavior never depends on it.
#[derive(Debug, Default)]
pub struct SchemaDriftLog {
    seen: Mutex<HashSet<(String, RequestKind, String)>>,
}

impl SchemaDriftLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a malformed response. Returns true when the sample was logged.
    pub fn record(&self, kind: RequestKind, symbol: &str, error: &MarketDataError) -> bool {
        let MarketDataError::MalformedResponse {
            provider,
            message,
            shape,
            sample,
        } = error
        else {
            return false;
        };

        let first = self
            .seen
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .insert((provider.clone(), kind, shape.clone()));

        if first {
            warn!(
                "Schema drift from {} ({} {}): {} | shape={} sample={}",
                provider, kind, symbol, message, shape, sample
            );
        } else {
            debug!(
                "Repeated malformed {} response from {} for {} (shape={})",
                kind, provider, symbol, shape
            );
        }
        first
    }
}
