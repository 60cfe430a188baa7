//! Tradesim Market Data Crate
//!
//! This crate fetches live quotes, price history and company facts for the
//! tradesim dashboard from several unreliable external providers.
//!
//! # Overview
//!
//! The market data crate supports:
//! - Multiple providers: Financial Datasets, Yahoo chart, Alpha Vantage and
//!   the simulation backend
//! - One canonical schema regardless of provider response shape
//! - Per-attempt deadlines, a per-symbol ceiling and request cancellation
//! - Deterministic synthetic data when every provider fails
//!
//! # Architecture
//!
//! ```text
//! +--------------------+
//! | MarketDataService  |  (input validation, synthetic fallback)
//! +--------------------+
//!           |
//!           v
//! +--------------------+     +------------------+
//! | ProviderRegistry   | --> |  ProviderTable   |  (per-kind priority)
//! +--------------------+     +------------------+
//!           |
//!           v
//! +--------------------+
//! |  BoundedInvoker    |  (deadline, cancellation, panic isolation)
//! +--------------------+
//!           |
//!           v
//! +--------------------+
//! |     Provider       |  (Financial Datasets, Yahoo, Alpha Vantage, ...)
//! +--------------------+
//!           |
//!           v
//! +--------------------+
//! |  CanonicalQuote    |  (tagged with the satisfying provider)
//! +--------------------+
//! ```
//!
//! # Core Types
//!
//! - [`Symbol`] - Validated ticker
//! - [`CanonicalQuote`] - Provider-independent live quote
//! - [`HistorySeries`] - Date-ordered OHLCV bars
//! - [`CompanyFacts`] - Company reference data
//! - [`SourceProvider`] - Which provider satisfied a request, or `SYNTHETIC`
//! - [`MarketDataConfig`] - Immutable configuration built once at startup

pub mod config;
pub mod errors;
pub mod models;
pub mod normalize;
pub mod provider;
pub mod registry;
pub mod service;
pub mod synthetic;

// Re-export configuration
pub use config::{Credentials, MarketDataConfig};

// Re-export error types
pub use errors::{AttemptOutcome, InputError, MarketDataError};

// Re-export all public types from models
pub use models::{
    CanonicalQuote, CompanyFacts, HistoryPoint, HistoryRequest, HistorySeries, Interval,
    ProviderId, RequestKind, SourceProvider, StockDetail, Symbol, Timeframe, SYNTHETIC_LABEL,
};

// Re-export provider types
pub use provider::alpha_vantage::AlphaVantageProvider;
pub use provider::backend::BackendProvider;
pub use provider::financial_datasets::{FinancialDatasetsBarsProvider, FinancialDatasetsProvider};
pub use provider::yahoo::YahooProvider;
pub use provider::{build_providers, mask_secret, MarketDataProvider, ProviderCapabilities};

// Re-export registry types
pub use registry::{
    AttemptLog, ChainOutcome, FallbackAttempt, KindSummary, ProviderRegistry, ProviderTable,
    QuoteValidator, SkipReason, SkippedProvider, ValidationSeverity,
};

// Re-export the query interface
pub use service::{MarketDataService, MarketDataServiceTrait, MAX_BATCH_SYMBOLS};
pub use synthetic::SyntheticGenerator;

// Re-export so callers can build cancellation tokens without a direct dependency
pub use tokio_util::sync::CancellationToken;
