//! Deadline- and cancellation-bounded adapter invocation.

use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::time::Duration;

use futures::FutureExt;
use tokio::time::{timeout, Instant};
use tokio_util::sync::CancellationToken;

use super::attempt::FallbackAttempt;
use crate::errors::{AttemptOutcome, MarketDataError};
use crate::models::{ProviderId, RequestKind, Symbol};

/// Runs one adapter call under a deadline and a cancellation token.
///
/// The wrapped future is dropped before this returns, whichever way the
/// race ends, so an abandoned HTTP call never outlives its attempt.
/// Exactly one [`FallbackAttempt`] is produced per invocation.
pub struct BoundedInvoker<'a> {
    kind: RequestKind,
    symbol: &'a Symbol,
    cancel: &'a CancellationToken,
}

impl<'a> BoundedInvoker<'a> {
    pub fn new(kind: RequestKind, symbol: &'a Symbol, cancel: &'a CancellationToken) -> Self {
        Self {
            kind,
            symbol,
            cancel,
        }
    }

    pub async fn invoke<T, F>(
        &self,
        provider_id: ProviderId,
        deadline: Duration,
        call: F,
    ) -> (Result<T, MarketDataError>, FallbackAttempt)
    where
        F: Future<Output = Result<T, MarketDataError>>,
    {
        let started = Instant::now();
        let provider = provider_id.to_string();

        // Cancellation is polled first so a token that fired while the call
        // was completing still wins.
        let result = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(MarketDataError::Cancelled { provider }),
            finished = timeout(deadline, AssertUnwindSafe(call).catch_unwind()) => match finished {
                Err(_elapsed) => Err(MarketDataError::Timeout { provider }),
                Ok(Err(_panic)) => Err(MarketDataError::Panicked { provider }),
                Ok(Ok(result)) => result,
            },
        };

        let outcome = match &result {
            Ok(_) => AttemptOutcome::Success,
            Err(e) => e.outcome(),
        };

        let attempt = FallbackAttempt {
            kind: self.kind,
            provider_id,
            symbol: self.symbol.clone(),
            outcome,
            elapsed_ms: started.elapsed().as_millis() as u64,
        };

        (result, attempt)
    }
}
