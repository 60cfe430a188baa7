//! Immutable market data configuration.
//!
//! Built once at process start and shared behind an `Arc`. Nothing in the
//! crate reads the environment after construction.

use std::collections::HashMap;
use std::time::Duration;

use log::warn;

use crate::models::RequestKind;
use crate::provider::mask_secret;

pub const DEFAULT_BACKEND_BASE_URL: &str = "http://127.0.0.1:8000";
pub const DEFAULT_QUOTE_TIMEOUT_MS: u64 = 5_000;
pub const DEFAULT_HISTORY_TIMEOUT_MS: u64 = 10_000;
pub const DEFAULT_FACTS_TIMEOUT_MS: u64 = 8_000;
pub const DEFAULT_TIMEOUT_MS: u64 = 10_000;
pub const DEFAULT_MAX_IN_FLIGHT: usize = 4;
pub const DEFAULT_BATCH_CEILING_MS: u64 = 30_000;

/// Per-symbol ceiling as a multiple of the single-provider default deadline.
const CEILING_MULTIPLIER: u32 = 3;

/// Provider credentials. Absent keys leave the provider unconfigured.
#[derive(Clone, Default)]
pub struct Credentials {
    pub financial_datasets_api_key: Option<String>,
    pub alpha_vantage_api_key: Option<String>,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field(
                "financial_datasets_api_key",
                &self.financial_datasets_api_key.as_deref().map(mask_secret),
            )
            .field(
                "alpha_vantage_api_key",
                &self.alpha_vantage_api_key.as_deref().map(mask_secret),
            )
            .finish()
    }
}

#[derive(Clone, Debug)]
pub struct MarketDataConfig {
    pub credentials: Credentials,
    pub yahoo_enabled: bool,
    /// `None` disables the simulation backend.
    pub backend_base_url: Option<String>,
    pub quote_timeout: Duration,
    pub history_timeout: Duration,
    pub facts_timeout: Duration,
    /// Single-provider default deadline.
    pub default_timeout: Duration,
    /// Total time budget for one symbol's fallback chain.
    pub symbol_ceiling: Duration,
    /// Total time budget for a whole batch, measured from its start.
    pub batch_ceiling: Duration,
    /// Concurrent symbol chains in a batch.
    pub max_in_flight: usize,
    /// Provider ids listed ahead of built-in priorities, per kind.
    pub priority_overrides: HashMap<RequestKind, Vec<String>>,
}

impl Default for MarketDataConfig {
    fn default() -> Self {
        let default_timeout = Duration::from_millis(DEFAULT_TIMEOUT_MS);
        Self {
            credentials: Credentials::default(),
            yahoo_enabled: false,
            backend_base_url: Some(DEFAULT_BACKEND_BASE_URL.to_string()),
            quote_timeout: Duration::from_millis(DEFAULT_QUOTE_TIMEOUT_MS),
            history_timeout: Duration::from_millis(DEFAULT_HISTORY_TIMEOUT_MS),
            facts_timeout: Duration::from_millis(DEFAULT_FACTS_TIMEOUT_MS),
            default_timeout,
            symbol_ceiling: default_timeout * CEILING_MULTIPLIER,
            batch_ceiling: Duration::from_millis(DEFAULT_BATCH_CEILING_MS),
            max_in_flight: DEFAULT_MAX_IN_FLIGHT,
            priority_overrides: HashMap::new(),
        }
    }
}

impl MarketDataConfig {
    /// Reads the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary key lookup.
    ///
    /// Blank values count as unset. Unparseable numbers fall back to their
    /// defaults with a warning.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string());
        let non_empty = |key: &str| get(key).filter(|v| !v.is_empty());
        let first_of = |keys: &[&str]| keys.iter().find_map(|k| non_empty(*k));

        let millis = |key: &str, default: u64| -> Duration {
            let value = match non_empty(key) {
                Some(raw) => match raw.parse::<u64>() {
                    Ok(ms) if ms > 0 => ms,
                    _ => {
                        warn!("Ignoring invalid {}='{}', using {}ms", key, raw, default);
                        default
                    }
                },
                None => default,
            };
            Duration::from_millis(value)
        };

        let default_timeout = millis("MARKET_DATA_DEFAULT_TIMEOUT_MS", DEFAULT_TIMEOUT_MS);
        let ceiling_default = default_timeout * CEILING_MULTIPLIER;
        let symbol_ceiling = millis(
            "MARKET_DATA_SYMBOL_CEILING_MS",
            ceiling_default.as_millis() as u64,
        );

        let max_in_flight = match non_empty("MARKET_DATA_MAX_IN_FLIGHT") {
            Some(raw) => match raw.parse::<usize>() {
                Ok(n) if n > 0 => n,
                _ => {
                    warn!(
                        "Ignoring invalid MARKET_DATA_MAX_IN_FLIGHT='{}', using {}",
                        raw, DEFAULT_MAX_IN_FLIGHT
                    );
                    DEFAULT_MAX_IN_FLIGHT
                }
            },
            None => DEFAULT_MAX_IN_FLIGHT,
        };

        // An explicitly empty backend URL disables the backend, so this one
        // distinguishes "unset" from "blank".
        let backend_base_url = match get("BACKEND_API_BASE_URL")
            .or_else(|| get("NEXT_PUBLIC_API_BASE_URL"))
        {
            Some(url) if url.is_empty() => None,
            Some(url) => Some(url),
            None => Some(DEFAULT_BACKEND_BASE_URL.to_string()),
        };

        let mut priority_overrides = HashMap::new();
        for kind in RequestKind::ALL {
            let key = format!("MARKET_DATA_PRIORITY_{}", kind.as_str().to_ascii_uppercase());
            if let Some(list) = non_empty(&key) {
                let ids: Vec<String> = list
                    .split(',')
                    .map(|id| id.trim().to_ascii_uppercase())
                    .filter(|id| !id.is_empty())
                    .collect();
                if !ids.is_empty() {
                    priority_overrides.insert(kind, ids);
                }
            }
        }

        Self {
            credentials: Credentials {
                financial_datasets_api_key: first_of(&[
                    "FINANCIAL_DATASETS_API_KEY",
                    "NEXT_PUBLIC_FINANCIAL_DATASETS_API_KEY",
                ]),
                alpha_vantage_api_key: non_empty("ALPHA_VANTAGE_API_KEY"),
            },
            yahoo_enabled: first_of(&["USE_YAHOO_FINANCE", "NEXT_PUBLIC_USE_YAHOO_FINANCE"])
                .map(|v| is_truthy(&v))
                .unwrap_or(false),
            backend_base_url,
            quote_timeout: millis("MARKET_DATA_QUOTE_TIMEOUT_MS", DEFAULT_QUOTE_TIMEOUT_MS),
            history_timeout: millis("MARKET_DATA_HISTORY_TIMEOUT_MS", DEFAULT_HISTORY_TIMEOUT_MS),
            facts_timeout: millis("MARKET_DATA_FACTS_TIMEOUT_MS", DEFAULT_FACTS_TIMEOUT_MS),
            default_timeout,
            symbol_ceiling,
            batch_ceiling: millis("MARKET_DATA_BATCH_CEILING_MS", DEFAULT_BATCH_CEILING_MS),
            max_in_flight,
            priority_overrides,
        }
    }

    /// A configuration with every real provider switched off.
    pub fn offline() -> Self {
        Self {
            backend_base_url: None,
            ..Self::default()
        }
    }

    pub fn deadline_for(&self, kind: RequestKind) -> Duration {
        match kind {
            RequestKind::Quote => self.quote_timeout,
            RequestKind::History => self.history_timeout,
            RequestKind::Facts => self.facts_timeout,
        }
    }

    pub fn priority_override(&self, kind: RequestKind) -> &[String] {
        self.priority_overrides
            .get(&kind)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Credentials for display, masked.
    pub fn masked_credentials(&self) -> Vec<(&'static str, Option<String>)> {
        vec![
            (
                "FINANCIAL_DATASETS",
                self.credentials
                    .financial_datasets_api_key
                    .as_deref()
                    .map(mask_secret),
            ),
            (
                "ALPHA_VANTAGE",
                self.credentials
                    .alpha_vantage_api_key
                    .as_deref()
                    .map(mask_secret),
            ),
        ]
    }
}

fn is_truthy(value: &str) -> bool {
    matches!(
        value.to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(pairs: &[(&str, &str)]) -> MarketDataConfig {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        MarketDataConfig::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let cfg = config(&[]);
        assert!(cfg.credentials.financial_datasets_api_key.is_none());
        assert!(!cfg.yahoo_enabled);
        assert_eq!(cfg.backend_base_url.as_deref(), Some(DEFAULT_BACKEND_BASE_URL));
        assert_eq!(cfg.deadline_for(RequestKind::Quote), Duration::from_secs(5));
        assert_eq!(cfg.deadline_for(RequestKind::History), Duration::from_secs(10));
        assert_eq!(cfg.deadline_for(RequestKind::Facts), Duration::from_secs(8));
        assert_eq!(cfg.symbol_ceiling, Duration::from_secs(30));
        assert_eq!(cfg.batch_ceiling, Duration::from_secs(30));
        assert_eq!(cfg.max_in_flight, 4);
    }

    #[test]
    fn test_public_fallback_keys() {
        let cfg = config(&[
            ("NEXT_PUBLIC_FINANCIAL_DATASETS_API_KEY", "fd-key-123456"),
            ("NEXT_PUBLIC_USE_YAHOO_FINANCE", "true"),
            ("NEXT_PUBLIC_API_BASE_URL", "http://sim:9000"),
        ]);
        assert_eq!(
            cfg.credentials.financial_datasets_api_key.as_deref(),
            Some("fd-key-123456")
        );
        assert!(cfg.yahoo_enabled);
        assert_eq!(cfg.backend_base_url.as_deref(), Some("http://sim:9000"));
    }

    #[test]
    fn test_primary_key_wins_over_public() {
        let cfg = config(&[
            ("USE_YAHOO_FINANCE", "off"),
            ("NEXT_PUBLIC_USE_YAHOO_FINANCE", "true"),
        ]);
        assert!(!cfg.yahoo_enabled);
    }

    #[test]
    fn test_empty_backend_url_disables() {
        let cfg = config(&[("BACKEND_API_BASE_URL", "")]);
        assert!(cfg.backend_base_url.is_none());
    }

    #[test]
    fn test_ceiling_follows_default_timeout() {
        let cfg = config(&[("MARKET_DATA_DEFAULT_TIMEOUT_MS", "2000")]);
        assert_eq!(cfg.symbol_ceiling, Duration::from_secs(6));

        let cfg = config(&[
            ("MARKET_DATA_DEFAULT_TIMEOUT_MS", "2000"),
            ("MARKET_DATA_SYMBOL_CEILING_MS", "1500"),
        ]);
        assert_eq!(cfg.symbol_ceiling, Duration::from_millis(1500));

        let cfg = config(&[("MARKET_DATA_BATCH_CEILING_MS", "4000")]);
        assert_eq!(cfg.batch_ceiling, Duration::from_secs(4));
    }

    #[test]
    fn test_invalid_numbers_fall_back() {
        let cfg = config(&[
            ("MARKET_DATA_QUOTE_TIMEOUT_MS", "soon"),
            ("MARKET_DATA_MAX_IN_FLIGHT", "0"),
        ]);
        assert_eq!(cfg.quote_timeout, Duration::from_secs(5));
        assert_eq!(cfg.max_in_flight, DEFAULT_MAX_IN_FLIGHT);
    }

    #[test]
    fn test_priority_overrides() {
        let cfg = config(&[("MARKET_DATA_PRIORITY_QUOTE", " yahoo, backend ,")]);
        assert_eq!(
            cfg.priority_override(RequestKind::Quote),
            &["YAHOO".to_string(), "BACKEND".to_string()]
        );
        assert!(cfg.priority_override(RequestKind::Facts).is_empty());
    }

    #[test]
    fn test_debug_masks_credentials() {
        let cfg = config(&[("ALPHA_VANTAGE_API_KEY", "ABCDEFGHIJKLMNOP")]);
        let rendered = format!("{:?}", cfg);
        assert!(!rendered.contains("ABCDEFGHIJKLMNOP"));
        assert!(rendered.contains("ABCDE...NOP"));
    }
}
