use std::sync::Arc;
use std::time::Duration;

use crate::config::Config;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};
use tradesim_market_data::{MarketDataService, MarketDataServiceTrait};

pub struct AppState {
    pub market_data_service: Arc<dyn MarketDataServiceTrait>,
    /// Time a batch may run before its remaining symbols degrade.
    pub batch_budget: Duration,
}

pub fn init_tracing() {
    let log_format = std::env::var("TS_LOG_FORMAT").unwrap_or_else(|_| "text".to_string());
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(filter);

    // `init` also installs the `log` bridge, so library `log` records land here.
    if log_format.eq_ignore_ascii_case("json") {
        registry
            .with(fmt::layer().json().with_current_span(false))
            .init();
    } else {
        registry
            .with(fmt::layer().with_target(true).with_line_number(true))
            .init();
    }
}

pub async fn build_state(config: &Config) -> anyhow::Result<Arc<AppState>> {
    let market_data = config.market_data.clone();
    for (name, masked) in market_data.masked_credentials() {
        match masked {
            Some(value) => tracing::info!("{} configured ({})", name, value),
            None => tracing::info!("{} not set", name),
        }
    }

    let service = MarketDataService::new(market_data);
    for kind in service.provider_table().summary() {
        tracing::info!(
            kind = %kind.kind,
            candidates = ?kind.candidates,
            "Market data providers resolved"
        );
    }

    Ok(Arc::new(AppState {
        market_data_service: Arc::new(service),
        batch_budget: config.batch_budget(),
    }))
}
