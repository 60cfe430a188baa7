//! Provider registry for orchestrating market data providers.
//!
//! The registry runs one fallback chain per symbol and request kind:
//! - Candidates come from the priority table resolved at construction
//! - Each candidate is invoked under a deadline and the request's
//!   cancellation token
//! - Output is validated and stamped with the satisfying provider
//! - The first accepted result wins; any failure advances the chain
//!
//! Batches fan symbols out concurrently while every symbol's own chain stays
//! sequential. A batch deadline starts with the batch, so symbols still
//! queued behind `max_in_flight` cannot stretch it past `batch_ceiling`.

use std::sync::Arc;

use futures::stream::{self, StreamExt};
use log::{debug, error, info, warn};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use super::attempt::AttemptLog;
use super::drift::SchemaDriftLog;
use super::invoker::BoundedInvoker;
use super::request::{ChainRequest, FactsFetch, HistoryFetch, QuoteFetch};
use super::resolver::ProviderTable;
use super::validator::QuoteValidator;
use crate::config::MarketDataConfig;
use crate::errors::MarketDataError;
use crate::models::{
    CanonicalQuote, CompanyFacts, HistoryRequest, HistorySeries, ProviderId, RequestKind, Symbol,
};
use crate::provider::MarketDataProvider;

/// Fallback chain state for one symbol and request kind.
///
/// `Pending -> Trying(0) -> Trying(1) -> ... -> Succeeded | Exhausted`
#[derive(Debug)]
pub enum ChainState<T> {
    Pending,
    /// Invoking the candidate at this index.
    Trying(usize),
    Succeeded { value: T, provider_id: ProviderId },
    Exhausted,
}

/// Terminal result of a chain plus every attempt it made.
#[derive(Debug)]
pub struct ChainOutcome<T> {
    pub value: Option<T>,
    pub provider_id: Option<ProviderId>,
    pub attempts: AttemptLog,
}

impl<T> ChainOutcome<T> {
    pub fn is_exhausted(&self) -> bool {
        self.value.is_none()
    }
}

/// Provider registry for orchestrating market data fetching.
pub struct ProviderRegistry {
    table: ProviderTable,
    config: Arc<MarketDataConfig>,
    validator: QuoteValidator,
    drift: SchemaDriftLog,
}

impl ProviderRegistry {
    /// Create a registry, resolving the per-kind priority table once.
    pub fn new(providers: Vec<Arc<dyn MarketDataProvider>>, config: Arc<MarketDataConfig>) -> Self {
        let table = ProviderTable::resolve(&providers, &config);
        Self {
            table,
            config,
            validator: QuoteValidator::new(),
            drift: SchemaDriftLog::new(),
        }
    }

    pub fn table(&self) -> &ProviderTable {
        &self.table
    }

    pub fn config(&self) -> &MarketDataConfig {
        &self.config
    }

    pub async fn fetch_quote(
        &self,
        symbol: &Symbol,
        cancel: &CancellationToken,
    ) -> ChainOutcome<CanonicalQuote> {
        self.run_chain(&QuoteFetch { symbol }, cancel, None).await
    }

    pub async fn fetch_history(
        &self,
        symbol: &Symbol,
        request: &HistoryRequest,
        cancel: &CancellationToken,
    ) -> ChainOutcome<HistorySeries> {
        self.run_chain(&HistoryFetch { symbol, request }, cancel, None)
            .await
    }

    pub async fn fetch_facts(
        &self,
        symbol: &Symbol,
        cancel: &CancellationToken,
    ) -> ChainOutcome<CompanyFacts> {
        self.run_chain(&FactsFetch { symbol }, cancel, None).await
    }

    /// Fetch quotes for many symbols.
    ///
    /// At most `max_in_flight` chains run at once. Results come back in
    /// input order regardless of completion order, and one symbol's
    /// exhaustion never affects the others.
    ///
    /// Every chain is also bounded by `batch_ceiling` from the moment the
    /// batch starts. Chains still queued when it passes exhaust without an
    /// attempt.
    pub async fn fetch_quotes_batch(
        &self,
        symbols: &[Symbol],
        cancel: &CancellationToken,
    ) -> Vec<ChainOutcome<CanonicalQuote>> {
        let registry = self;
        let batch_deadline = Instant::now() + self.config.batch_ceiling;
        let tasks = symbols.iter().cloned().enumerate().map(|(index, symbol)| {
            let cancel = cancel.clone();
            async move {
                let outcome = registry
                    .run_chain(&QuoteFetch { symbol: &symbol }, &cancel, Some(batch_deadline))
                    .await;
                (index, outcome)
            }
        });

        let mut results: Vec<(usize, ChainOutcome<CanonicalQuote>)> = stream::iter(tasks)
            .buffer_unordered(self.config.max_in_flight.max(1))
            .collect()
            .await;

        results.sort_by_key(|(index, _)| *index);
        results.into_iter().map(|(_, outcome)| outcome).collect()
    }

    async fn run_chain<R: ChainRequest>(
        &self,
        request: &R,
        cancel: &CancellationToken,
        batch_deadline: Option<Instant>,
    ) -> ChainOutcome<R::Output> {
        let kind = request.kind();
        let symbol = request.symbol();
        let candidates = self.table.candidates(kind);
        let invoker = BoundedInvoker::new(kind, symbol, cancel);
        let symbol_deadline = Instant::now() + self.config.symbol_ceiling;
        let ceiling_at = batch_deadline.map_or(symbol_deadline, |d| d.min(symbol_deadline));
        let mut attempts = AttemptLog::new();
        let mut state = ChainState::Pending;

        let terminal = loop {
            state = match state {
                ChainState::Pending => ChainState::Trying(0),
                ChainState::Trying(index) => {
                    let Some(provider) = candidates.get(index) else {
                        break ChainState::Exhausted;
                    };
                    if cancel.is_cancelled() {
                        debug!("{} chain for {} cancelled before {}", kind, symbol, provider.id());
                        break ChainState::Exhausted;
                    }
                    let remaining = ceiling_at.saturating_duration_since(Instant::now());
                    if remaining.is_zero() {
                        info!(
                            "{} chain for {} ran out of time before {}",
                            kind,
                            symbol,
                            provider.id()
                        );
                        break ChainState::Exhausted;
                    }

                    let provider_id = provider.id();
                    let deadline = self.config.deadline_for(kind).min(remaining);
                    debug!(
                        "Fetching {} for {} from '{}' (deadline {:?})",
                        kind, symbol, provider_id, deadline
                    );

                    let (result, attempt) = invoker
                        .invoke(ProviderId::Borrowed(provider_id), deadline, async {
                            let output = request.fetch(&**provider).await?;
                            request.accept(output, provider_id, &self.validator)
                        })
                        .await;
                    attempts.record(attempt);

                    match result {
                        Ok(value) => ChainState::Succeeded {
                            value,
                            provider_id: ProviderId::Borrowed(provider_id),
                        },
                        Err(e) => {
                            self.report_failure(kind, symbol, provider_id, &e);
                            if e.is_cancelled() {
                                ChainState::Exhausted
                            } else {
                                ChainState::Trying(index + 1)
                            }
                        }
                    }
                }
                terminal @ (ChainState::Succeeded { .. } | ChainState::Exhausted) => break terminal,
            };
        };

        match terminal {
            ChainState::Succeeded { value, provider_id } => {
                debug!(
                    "{} for {} served by '{}'. Attempts: {}",
                    kind,
                    symbol,
                    provider_id,
                    attempts.summary()
                );
                ChainOutcome {
                    value: Some(value),
                    provider_id: Some(provider_id),
                    attempts,
                }
            }
            _ => ChainOutcome {
                value: None,
                provider_id: None,
                attempts,
            },
        }
    }

    fn report_failure(
        &self,
        kind: RequestKind,
        symbol: &Symbol,
        provider_id: &str,
        error: &MarketDataError,
    ) {
        match error {
            MarketDataError::NotSupported { .. } => {
                error!(
                    "'{}' listed for {} but does not implement it: {}",
                    provider_id, kind, error
                );
            }
            MarketDataError::MalformedResponse { .. } => {
                self.drift.record(kind, symbol.as_str(), error);
            }
            MarketDataError::Cancelled { .. } => {
                debug!("{} for {} cancelled during '{}'", kind, symbol, provider_id);
            }
            _ => {
                warn!(
                    "Provider '{}' failed {} for {} with {}: {}, trying next provider",
                    provider_id,
                    kind,
                    symbol,
                    error.outcome(),
                    error
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::AttemptOutcome;
    use crate::normalize::QuoteParts;
    use crate::provider::ProviderCapabilities;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[derive(Clone, Copy)]
    enum Behavior {
        Succeed(f64),
        Empty,
        Fail,
        Malformed,
        Hang,
    }

    struct MockProvider {
        id: &'static str,
        priority: u8,
        behavior: Behavior,
        call_count: AtomicUsize,
    }

    impl MockProvider {
        fn new(id: &'static str, priority: u8, behavior: Behavior) -> Arc<Self> {
            Arc::new(Self {
                id,
                priority,
                behavior,
                call_count: AtomicUsize::new(0),
            })
        }

        fn calls(&self) -> usize {
            self.call_count.load(Ordering::SeqCst)
        }
    }

    #[async_trait::async_trait]
    impl MarketDataProvider for MockProvider {
        fn id(&self) -> &'static str {
            self.id
        }

        fn priority(&self) -> u8 {
            self.priority
        }

        fn capabilities(&self) -> ProviderCapabilities {
            ProviderCapabilities {
                supports_quote: true,
                supports_history: false,
                supports_facts: true,
            }
        }

        async fn fetch_quote(&self, symbol: &Symbol) -> Result<CanonicalQuote, MarketDataError> {
            self.call_count.fetch_add(1, Ordering::SeqCst);
            match self.behavior {
                Behavior::Succeed(price) => QuoteParts {
                    change: Some(1.0),
                    ..QuoteParts::new(price)
                }
                .into_quote(self.id, symbol),
                Behavior::Empty => Err(MarketDataError::empty(self.id, symbol.as_str())),
                Behavior::Fail => Err(MarketDataError::Transport {
                    provider: self.id.to_string(),
                    message: "HTTP 500".to_string(),
                    status: Some(500),
                }),
                Behavior::Malformed => Err(MarketDataError::malformed(self.id, "bad", "<html>")),
                Behavior::Hang => {
                    tokio::time::sleep(Duration::from_secs(3600)).await;
                    Err(MarketDataError::empty(self.id, symbol.as_str()))
                }
            }
        }

        async fn fetch_facts(&self, symbol: &Symbol) -> Result<CompanyFacts, MarketDataError> {
            self.call_count.fetch_add(1, Ordering::SeqCst);
            match self.behavior {
                Behavior::Succeed(_) => Ok(CompanyFacts::named(
                    symbol.clone(),
                    "Acme Corp",
                    crate::models::SourceProvider::provider(self.id),
                )),
                _ => Err(MarketDataError::empty(self.id, symbol.as_str())),
            }
        }
    }

    fn registry(providers: Vec<Arc<dyn MarketDataProvider>>) -> ProviderRegistry {
        ProviderRegistry::new(providers, Arc::new(MarketDataConfig::offline()))
    }

    fn symbol(s: &str) -> Symbol {
        Symbol::parse(s).unwrap()
    }

    #[tokio::test]
    async fn test_first_success_stops_chain() {
        let a = MockProvider::new("A", 1, Behavior::Succeed(100.0));
        let b = MockProvider::new("B", 2, Behavior::Succeed(200.0));
        let registry = registry(vec![a.clone(), b.clone()]);

        let outcome = registry
            .fetch_quote(&symbol("AAPL"), &CancellationToken::new())
            .await;

        assert_eq!(outcome.provider_id.as_deref(), Some("A"));
        assert_eq!(a.calls(), 1);
        assert_eq!(b.calls(), 0);
        assert_eq!(outcome.attempts.len(), 1);
    }

    #[tokio::test]
    async fn test_empty_result_advances() {
        let a = MockProvider::new("A", 1, Behavior::Empty);
        let b = MockProvider::new("B", 2, Behavior::Succeed(200.0));
        let registry = registry(vec![a.clone(), b.clone()]);

        let outcome = registry
            .fetch_quote(&symbol("AAPL"), &CancellationToken::new())
            .await;

        let quote = outcome.value.unwrap();
        assert_eq!(quote.source_provider.label(), "B");
        assert_eq!(
            outcome.attempts.outcomes(),
            vec![("A", AttemptOutcome::EmptyResult), ("B", AttemptOutcome::Success)]
        );
    }

    #[tokio::test]
    async fn test_all_failures_exhaust() {
        let registry = registry(vec![
            MockProvider::new("A", 1, Behavior::Fail),
            MockProvider::new("B", 2, Behavior::Malformed),
        ]);

        let outcome = registry
            .fetch_quote(&symbol("AAPL"), &CancellationToken::new())
            .await;

        assert!(outcome.is_exhausted());
        assert_eq!(
            outcome.attempts.outcomes(),
            vec![
                ("A", AttemptOutcome::TransportError),
                ("B", AttemptOutcome::MalformedResponse)
            ]
        );
    }

    #[tokio::test]
    async fn test_invalid_output_is_rejected() {
        // A zero price fails validation and the chain moves on.
        let a = MockProvider::new("A", 1, Behavior::Succeed(0.0));
        let b = MockProvider::new("B", 2, Behavior::Succeed(50.0));
        let registry = registry(vec![a, b]);

        let outcome = registry
            .fetch_quote(&symbol("AAPL"), &CancellationToken::new())
            .await;

        assert_eq!(outcome.provider_id.as_deref(), Some("B"));
        assert_eq!(outcome.attempts.attempts()[0].outcome, AttemptOutcome::EmptyResult);
    }

    #[tokio::test]
    async fn test_no_candidates_is_exhausted_without_attempts() {
        let registry = registry(vec![]);
        let outcome = registry
            .fetch_facts(&symbol("AAPL"), &CancellationToken::new())
            .await;
        assert!(outcome.is_exhausted());
        assert!(outcome.attempts.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_advances() {
        let slow = MockProvider::new("SLOW", 1, Behavior::Hang);
        let fast = MockProvider::new("FAST", 2, Behavior::Succeed(10.0));
        let registry = registry(vec![slow, fast]);

        let outcome = registry
            .fetch_quote(&symbol("AAPL"), &CancellationToken::new())
            .await;

        assert_eq!(outcome.provider_id.as_deref(), Some("FAST"));
        assert_eq!(outcome.attempts.attempts()[0].outcome, AttemptOutcome::Timeout);
    }

    #[tokio::test(start_paused = true)]
    async fn test_ceiling_bounds_chain() {
        let providers: Vec<Arc<dyn MarketDataProvider>> = vec![
            MockProvider::new("S1", 1, Behavior::Hang),
            MockProvider::new("S2", 2, Behavior::Hang),
            MockProvider::new("S3", 3, Behavior::Hang),
            MockProvider::new("S4", 4, Behavior::Hang),
        ];
        let config = MarketDataConfig {
            quote_timeout: Duration::from_secs(5),
            symbol_ceiling: Duration::from_secs(12),
            ..MarketDataConfig::offline()
        };
        let registry = ProviderRegistry::new(providers, Arc::new(config));

        let started = Instant::now();
        let outcome = registry
            .fetch_quote(&symbol("AAPL"), &CancellationToken::new())
            .await;

        assert!(outcome.is_exhausted());
        assert!(started.elapsed() < Duration::from_secs(13));
        // 5s + 5s + the 2s left of the ceiling, then no fourth attempt.
        assert_eq!(outcome.attempts.len(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancellation_stops_chain() {
        let slow = MockProvider::new("SLOW", 1, Behavior::Hang);
        let next = MockProvider::new("NEXT", 2, Behavior::Succeed(10.0));
        let registry = registry(vec![slow, next.clone()]);
        let cancel = CancellationToken::new();

        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(500)).await;
            trigger.cancel();
        });

        let outcome = registry.fetch_quote(&symbol("AAPL"), &cancel).await;

        assert!(outcome.is_exhausted());
        assert_eq!(outcome.attempts.outcomes(), vec![("SLOW", AttemptOutcome::Cancelled)]);
        assert_eq!(next.calls(), 0);
    }

    #[tokio::test]
    async fn test_batch_preserves_input_order() {
        let registry = registry(vec![MockProvider::new("A", 1, Behavior::Succeed(10.0))]);
        let symbols: Vec<Symbol> = ["MSFT", "AAPL", "NVDA", "TSLA", "META", "AMZN"]
            .iter()
            .map(|s| symbol(s))
            .collect();

        let outcomes = registry
            .fetch_quotes_batch(&symbols, &CancellationToken::new())
            .await;

        let returned: Vec<_> = outcomes
            .iter()
            .map(|o| o.value.as_ref().unwrap().symbol.clone())
            .collect();
        assert_eq!(returned, symbols);
    }

    #[tokio::test(start_paused = true)]
    async fn test_batch_deadline_bounds_queued_symbols() {
        let providers: Vec<Arc<dyn MarketDataProvider>> = vec![
            MockProvider::new("S1", 1, Behavior::Hang),
            MockProvider::new("S2", 2, Behavior::Hang),
        ];
        let config = MarketDataConfig {
            quote_timeout: Duration::from_secs(5),
            symbol_ceiling: Duration::from_secs(12),
            batch_ceiling: Duration::from_secs(8),
            max_in_flight: 2,
            ..MarketDataConfig::offline()
        };
        let registry = ProviderRegistry::new(providers, Arc::new(config));
        let symbols: Vec<Symbol> = ["AAPL", "MSFT", "NVDA", "TSLA", "META", "AMZN", "GOOGL", "IBM"]
            .iter()
            .map(|s| symbol(s))
            .collect();

        let started = Instant::now();
        let outcomes = registry
            .fetch_quotes_batch(&symbols, &CancellationToken::new())
            .await;

        // Four waves of 10s each without the batch deadline.
        assert!(started.elapsed() <= Duration::from_secs(9));
        assert_eq!(outcomes.len(), symbols.len());
        assert!(outcomes.iter().all(|o| o.is_exhausted()));
        // The first wave spends 5s on S1 and the remaining 3s on S2.
        assert_eq!(outcomes[0].attempts.len(), 2);
        assert!(outcomes[2..].iter().all(|o| o.attempts.is_empty()));
    }

    #[tokio::test]
    async fn test_facts_chain_stamps_provider() {
        let registry = registry(vec![
            MockProvider::new("A", 1, Behavior::Empty),
            MockProvider::new("B", 2, Behavior::Succeed(1.0)),
        ]);

        let outcome = registry
            .fetch_facts(&symbol("AAPL"), &CancellationToken::new())
            .await;

        let facts = outcome.value.unwrap();
        assert_eq!(facts.source_provider.label(), "B");
        assert_eq!(facts.legal_name, "Acme Corp");
    }
}
