//! Per-attempt records for fallback chain diagnostics.

use serde::Serialize;

use crate::errors::AttemptOutcome;
use crate::models::{ProviderId, RequestKind, Symbol};

/// One provider invocation inside a fallback chain.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FallbackAttempt {
    pub kind: RequestKind,
    pub provider_id: ProviderId,
    pub symbol: Symbol,
    pub outcome: AttemptOutcome,
    pub elapsed_ms: u64,
}

/// Ordered attempts made for one symbol and request kind.
#[derive(Clone, Debug, Default, Serialize)]
pub struct AttemptLog {
    attempts: Vec<FallbackAttempt>,
}

impl AttemptLog {
    pub fn new() -> Self {
        Self {
            attempts: Vec::new(),
        }
    }

    pub fn record(&mut self, attempt: FallbackAttempt) {
        self.attempts.push(attempt);
    }

    pub fn attempts(&self) -> &[FallbackAttempt] {
        &self.attempts
    }

    pub fn len(&self) -> usize {
        self.attempts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.attempts.is_empty()
    }

    /// `(provider, outcome)` pairs in attempt order. Handy in assertions.
    pub fn outcomes(&self) -> Vec<(&str, AttemptOutcome)> {
        self.attempts
            .iter()
            .map(|a| (a.provider_id.as_ref(), a.outcome))
            .collect()
    }

    pub fn has_success(&self) -> bool {
        self.attempts.iter().any(|a| a.outcome.is_success())
    }

    /// Summary for logging, e.g. `FINANCIAL_DATASETS:Timeout -> YAHOO:Success`.
    pub fn summary(&self) -> String {
        if self.attempts.is_empty() {
            return "no candidates".to_string();
        }
        self.attempts
            .iter()
            .map(|a| format!("{}:{}", a.provider_id, a.outcome))
            .collect::<Vec<_>>()
            .join(" -> ")
    }
}
