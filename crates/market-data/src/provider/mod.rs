//! Market data provider abstractions and implementations.
//!
//! This module contains:
//! - The `MarketDataProvider` trait that all providers implement
//! - Provider capability declarations
//! - Concrete adapters (Financial Datasets snapshot and recent bars, Yahoo,
//!   Alpha Vantage, the simulation backend)
//!
//! Adapters know how to talk to one provider and how to map its payloads
//! into the canonical schema. Ordering, deadlines and fallback live in the
//! registry, so adding a provider means implementing the trait and listing
//! it in [`build_providers`].

use std::sync::Arc;

mod capabilities;
pub(crate) mod http;
mod traits;

pub mod alpha_vantage;
pub mod backend;
pub mod financial_datasets;
pub mod yahoo;

pub use capabilities::ProviderCapabilities;
pub use http::mask_secret;
pub use traits::MarketDataProvider;

use crate::config::MarketDataConfig;

/// Instantiates every built-in adapter from the configuration.
///
/// Unconfigured adapters are still returned; the priority table records
/// them as skipped so diagnostics can say why.
pub fn build_providers(config: &MarketDataConfig) -> Vec<Arc<dyn MarketDataProvider>> {
    vec![
        Arc::new(financial_datasets::FinancialDatasetsProvider::new(
            config.credentials.financial_datasets_api_key.clone(),
        )),
        Arc::new(financial_datasets::FinancialDatasetsBarsProvider::new(
            config.credentials.financial_datasets_api_key.clone(),
        )),
        Arc::new(yahoo::YahooProvider::new(config.yahoo_enabled)),
        Arc::new(alpha_vantage::AlphaVantageProvider::new(
            config.credentials.alpha_vantage_api_key.clone(),
        )),
        Arc::new(backend::BackendProvider::new(
            config.backend_base_url.clone(),
        )),
    ]
}
