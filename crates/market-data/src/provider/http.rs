//! HTTP plumbing shared by the REST adapters.

use std::time::Duration;

use reqwest::{Client, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;

use crate::errors::MarketDataError;
use crate::models::Symbol;

/// Upper bound on any single call. The invoker's per-kind deadline is
/// normally much shorter.
const CLIENT_TIMEOUT: Duration = Duration::from_secs(30);

const USER_AGENT: &str = concat!("tradesim-market-data/", env!("CARGO_PKG_VERSION"));

/// Longest body excerpt copied into transport error messages.
const ERROR_BODY_LEN: usize = 160;

pub(crate) fn build_client() -> Client {
    Client::builder()
        .timeout(CLIENT_TIMEOUT)
        .user_agent(USER_AGENT)
        .build()
        .unwrap_or_else(|_| Client::new())
}

/// Sends `request` and returns the body of a successful response.
///
/// Status mapping:
/// - 404 -> `EmptyResult` (unknown symbol)
/// - 429 -> `RateLimited`
/// - 401/403 -> `Transport` with an API key hint
/// - any other non-2xx -> `Transport` carrying the status
pub(crate) async fn send(
    provider: &'static str,
    symbol: &Symbol,
    request: RequestBuilder,
) -> Result<String, MarketDataError> {
    let response = request
        .send()
        .await
        .map_err(|e| MarketDataError::from_reqwest(provider, e))?;

    let status = response.status();
    match status {
        StatusCode::NOT_FOUND => return Err(MarketDataError::empty(provider, symbol.as_str())),
        StatusCode::TOO_MANY_REQUESTS => {
            return Err(MarketDataError::RateLimited {
                provider: provider.to_string(),
            })
        }
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            return Err(MarketDataError::Transport {
                provider: provider.to_string(),
                message: "Invalid or missing API key".to_string(),
                status: Some(status.as_u16()),
            })
        }
        _ => {}
    }

    let body = response
        .text()
        .await
        .map_err(|e| MarketDataError::from_reqwest(provider, e))?;

    if !status.is_success() {
        let excerpt: String = body.chars().take(ERROR_BODY_LEN).collect();
        return Err(MarketDataError::Transport {
            provider: provider.to_string(),
            message: format!("HTTP {} - {}", status, excerpt),
            status: Some(status.as_u16()),
        });
    }

    Ok(body)
}

/// Deserializes `body`, reporting schema mismatches as malformed responses.
pub(crate) fn parse_json<T: DeserializeOwned>(
    provider: &'static str,
    body: &str,
    what: &str,
) -> Result<T, MarketDataError> {
    serde_json::from_str(body).map_err(|e| {
        MarketDataError::malformed(provider, format!("Failed to parse {what} response: {e}"), body)
    })
}

/// Masks a credential for logs and diagnostics: first 5 + `...` + last 3.
pub fn mask_secret(secret: &str) -> String {
    let chars: Vec<char> = secret.chars().collect();
    if chars.len() <= 8 {
        return "***".to_string();
    }
    let head: String = chars[..5].iter().collect();
    let tail: String = chars[chars.len() - 3..].iter().collect();
    format!("{head}...{tail}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mask_secret() {
        assert_eq!(mask_secret("abcdef1234567890"), "abcde...890");
        assert_eq!(mask_secret("short"), "***");
    }

    #[test]
    fn test_parse_json_reports_malformed() {
        #[derive(Debug, serde::Deserialize)]
        #[allow(dead_code)]
        struct Payload {
            price: f64,
        }
        let err = parse_json::<Payload>("BACKEND", r#"{"cost":1}"#, "stock").unwrap_err();
        match err {
            MarketDataError::MalformedResponse { shape, .. } => assert_eq!(shape, "{cost}"),
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
