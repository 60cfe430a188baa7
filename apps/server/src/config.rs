use std::{net::SocketAddr, sync::Arc, time::Duration};

use anyhow::Context;
use tradesim_market_data::MarketDataConfig;

const DEFAULT_LISTEN_ADDR: &str = "0.0.0.0:8080";
const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 45_000;
/// Share of the request timeout a batch may use, in percent. The rest is
/// left for synthesizing and serializing the degraded symbols.
const BATCH_BUDGET_PERCENT: u32 = 80;

pub struct Config {
    pub listen_addr: SocketAddr,
    pub cors_allow: Vec<String>,
    pub request_timeout: Duration,
    pub market_data: Arc<MarketDataConfig>,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        let listen_addr: SocketAddr = std::env::var("TS_LISTEN_ADDR")
            .unwrap_or_else(|_| DEFAULT_LISTEN_ADDR.to_string())
            .parse()
            .context("Invalid TS_LISTEN_ADDR")?;
        let cors_allow = std::env::var("TS_CORS_ALLOW_ORIGINS")
            .unwrap_or_else(|_| "*".into())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();
        let timeout_ms: u64 = std::env::var("TS_REQUEST_TIMEOUT_MS")
            .unwrap_or_else(|_| DEFAULT_REQUEST_TIMEOUT_MS.to_string())
            .parse()
            .unwrap_or(DEFAULT_REQUEST_TIMEOUT_MS);
        Ok(Self {
            listen_addr,
            cors_allow,
            request_timeout: Duration::from_millis(timeout_ms),
            market_data: Arc::new(MarketDataConfig::from_env()),
        })
    }

    /// Deadline for batch queries, kept inside the request timeout.
    pub fn batch_budget(&self) -> Duration {
        (self.request_timeout * BATCH_BUDGET_PERCENT / 100).min(self.market_data.batch_ceiling)
    }

    /// Defaults for everything except the market data settings.
    pub fn with_market_data(market_data: MarketDataConfig) -> Self {
        Self {
            listen_addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
            cors_allow: vec!["*".to_string()],
            request_timeout: Duration::from_millis(DEFAULT_REQUEST_TIMEOUT_MS),
            market_data: Arc::new(market_data),
        }
    }
}
