use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use tradesim_market_data::{
    CancellationToken, CanonicalQuote, CompanyFacts, HistorySeries, StockDetail, Timeframe,
};

use crate::{error::ApiResult, main_lib::AppState};

/// Symbols shown on the market overview when the caller names none.
const DEFAULT_WATCHLIST: [&str; 7] = ["AAPL", "MSFT", "GOOGL", "AMZN", "NVDA", "META", "TSLA"];

async fn get_quote(
    Path(symbol): Path<String>,
    State(state): State<Arc<AppState>>,
) -> ApiResult<Json<CanonicalQuote>> {
    let quote = state.market_data_service.get_quote(&symbol).await?;
    Ok(Json(quote))
}

#[derive(Deserialize)]
struct HistoryQuery {
    timeframe: Option<String>,
}

async fn get_history(
    Path(symbol): Path<String>,
    Query(query): Query<HistoryQuery>,
    State(state): State<Arc<AppState>>,
) -> ApiResult<Json<HistorySeries>> {
    let timeframe = query
        .timeframe
        .unwrap_or_else(|| Timeframe::default().as_str().to_string());
    let series = state
        .market_data_service
        .get_history(&symbol, &timeframe)
        .await?;
    Ok(Json(series))
}

async fn get_facts(
    Path(symbol): Path<String>,
    State(state): State<Arc<AppState>>,
) -> ApiResult<Json<CompanyFacts>> {
    let facts = state.market_data_service.get_facts(&symbol).await?;
    Ok(Json(facts))
}

async fn get_stock_detail(
    Path(symbol): Path<String>,
    State(state): State<Arc<AppState>>,
) -> ApiResult<Json<StockDetail>> {
    let detail = state.market_data_service.get_stock_detail(&symbol).await?;
    Ok(Json(detail))
}

#[derive(Deserialize)]
struct OverviewQuery {
    symbols: Option<String>,
}

async fn get_market_overview(
    Query(query): Query<OverviewQuery>,
    State(state): State<Arc<AppState>>,
) -> ApiResult<Json<Vec<CanonicalQuote>>> {
    let symbols: Vec<String> = match query.symbols {
        Some(list) => list
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect(),
        None => DEFAULT_WATCHLIST.iter().map(|s| s.to_string()).collect(),
    };

    // Symbols not settled within the budget degrade instead of letting the
    // request time out.
    let cancel = CancellationToken::new();
    let timer = tokio::spawn({
        let cancel = cancel.clone();
        let budget = state.batch_budget;
        async move {
            tokio::time::sleep(budget).await;
            cancel.cancel();
        }
    });
    let result = state
        .market_data_service
        .get_market_overview_with_cancel(&symbols, &cancel)
        .await;
    timer.abort();

    Ok(Json(result?))
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/stocks/{symbol}", get(get_quote))
        .route("/stocks/{symbol}/history", get(get_history))
        .route("/stocks/{symbol}/facts", get(get_facts))
        .route("/stocks/{symbol}/detail", get(get_stock_detail))
        .route("/market-overview", get(get_market_overview))
}
