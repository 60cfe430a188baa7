use std::sync::Arc;

use axum::{extract::State, routing::get, Json, Router};
use serde::Serialize;
use tradesim_market_data::KindSummary;

use crate::main_lib::AppState;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CredentialStatus {
    provider: &'static str,
    configured: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    masked_key: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ProviderDiagnostics {
    kinds: Vec<KindSummary>,
    credentials: Vec<CredentialStatus>,
    yahoo_enabled: bool,
    backend_base_url: Option<String>,
    quote_timeout_ms: u128,
    history_timeout_ms: u128,
    facts_timeout_ms: u128,
    symbol_ceiling_ms: u128,
    max_in_flight: usize,
}

/// Resolved priority table plus the configuration that produced it.
async fn get_providers(State(state): State<Arc<AppState>>) -> Json<ProviderDiagnostics> {
    let service = &state.market_data_service;
    let config = service.config();

    let credentials = config
        .masked_credentials()
        .into_iter()
        .map(|(provider, masked_key)| CredentialStatus {
            provider,
            configured: masked_key.is_some(),
            masked_key,
        })
        .collect();

    Json(ProviderDiagnostics {
        kinds: service.provider_table().summary(),
        credentials,
        yahoo_enabled: config.yahoo_enabled,
        backend_base_url: config.backend_base_url.clone(),
        quote_timeout_ms: config.quote_timeout.as_millis(),
        history_timeout_ms: config.history_timeout.as_millis(),
        facts_timeout_ms: config.facts_timeout.as_millis(),
        symbol_ceiling_ms: config.symbol_ceiling.as_millis(),
        max_in_flight: config.max_in_flight,
    })
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/providers", get(get_providers))
}
