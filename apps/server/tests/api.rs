use std::time::{Duration, Instant};

use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    routing::get,
    Router,
};
use tokio::net::TcpListener;
use tower::ServiceExt;
use tradesim_market_data::MarketDataConfig;
use tradesim_server::{api::app_router, build_state, config::Config};

async fn build_test_router(market_data: MarketDataConfig) -> Router {
    let config = Config::with_market_data(market_data);
    let state = build_state(&config).await.unwrap();
    app_router(state, &config)
}

async fn get_json(app: Router, uri: &str) -> (u16, serde_json::Value) {
    let response = app
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status().as_u16();
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json = serde_json::from_slice(&body).unwrap_or(serde_json::Value::Null);
    (status, json)
}

#[tokio::test]
async fn healthz_works() {
    let app = build_test_router(MarketDataConfig::offline()).await;
    let (status, json) = get_json(app, "/api/v1/healthz").await;

    assert_eq!(status, 200);
    assert_eq!(json["status"], "ok");
    assert!(json["timestamp"].is_string());
    assert!(json["version"].is_string());
}

#[tokio::test]
async fn invalid_symbol_is_bad_request() {
    let app = build_test_router(MarketDataConfig::offline()).await;
    let (status, json) = get_json(app, "/api/v1/stocks/TOOLONGSYM").await;

    assert_eq!(status, 400);
    assert_eq!(json["code"], 400);
    assert!(json["message"].as_str().unwrap().contains("TOOLONGSYM"));
}

#[tokio::test]
async fn invalid_timeframe_is_bad_request() {
    let app = build_test_router(MarketDataConfig::offline()).await;
    let (status, json) = get_json(app, "/api/v1/stocks/AAPL/history?timeframe=2W").await;

    assert_eq!(status, 400);
    assert_eq!(json["code"], 400);
}

#[tokio::test]
async fn offline_quote_is_synthetic() {
    let app = build_test_router(MarketDataConfig::offline()).await;
    let (status, json) = get_json(app, "/api/v1/stocks/aapl").await;

    assert_eq!(status, 200);
    assert_eq!(json["symbol"], "AAPL");
    assert_eq!(json["sourceProvider"], "SYNTHETIC");
    assert!(json["price"].as_f64().unwrap() > 0.0);
}

#[tokio::test]
async fn history_defaults_to_three_months() {
    let app = build_test_router(MarketDataConfig::offline()).await;
    let (status, json) = get_json(app, "/api/v1/stocks/MSFT/history").await;

    assert_eq!(status, 200);
    assert_eq!(json["timeframe"], "3M");
    assert!(!json["points"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn facts_and_detail_are_served() {
    let app = build_test_router(MarketDataConfig::offline()).await;

    let (status, facts) = get_json(app.clone(), "/api/v1/stocks/NVDA/facts").await;
    assert_eq!(status, 200);
    assert_eq!(facts["legalName"], "NVDA Corporation");

    let (status, detail) = get_json(app, "/api/v1/stocks/NVDA/detail").await;
    assert_eq!(status, 200);
    assert_eq!(detail["sourceProvider"], "SYNTHETIC");
    assert_eq!(detail["quote"]["symbol"], "NVDA");
}

#[tokio::test]
async fn market_overview_uses_default_watchlist() {
    let app = build_test_router(MarketDataConfig::offline()).await;

    let (status, json) = get_json(app.clone(), "/api/v1/market-overview").await;
    assert_eq!(status, 200);
    let quotes = json.as_array().unwrap();
    assert_eq!(quotes.len(), 7);
    assert_eq!(quotes[0]["symbol"], "AAPL");
    assert_eq!(quotes[6]["symbol"], "TSLA");

    let (status, json) = get_json(app.clone(), "/api/v1/market-overview?symbols=MSFT,%20aapl").await;
    assert_eq!(status, 200);
    assert_eq!(json[0]["symbol"], "MSFT");
    assert_eq!(json[1]["symbol"], "AAPL");

    let (status, _) = get_json(app, "/api/v1/market-overview?symbols=").await;
    assert_eq!(status, 400);
}

#[tokio::test]
async fn providers_reports_table_and_masked_keys() {
    let mut market_data = MarketDataConfig::offline();
    market_data.credentials.financial_datasets_api_key = Some("fdkey1234567890".to_string());
    let app = build_test_router(market_data).await;

    let (status, json) = get_json(app, "/api/v1/providers").await;
    assert_eq!(status, 200);

    assert_eq!(json["kinds"][0]["kind"], "quote");
    assert_eq!(json["kinds"][0]["candidates"][0], "FINANCIAL_DATASETS");
    let skipped = json["kinds"][0]["skipped"].as_array().unwrap();
    assert!(skipped
        .iter()
        .any(|s| s["providerId"] == "YAHOO" && s["reason"] == "unconfigured"));

    assert_eq!(json["credentials"][0]["provider"], "FINANCIAL_DATASETS");
    assert_eq!(json["credentials"][0]["maskedKey"], "fdkey...890");
    assert_eq!(json["credentials"][1]["configured"], false);
    assert!(!json.to_string().contains("fdkey1234567890"));
}

#[tokio::test]
async fn unknown_route_is_not_found() {
    let app = build_test_router(MarketDataConfig::offline()).await;
    let (status, json) = get_json(app, "/api/v1/nope").await;

    assert_eq!(status, 404);
    assert_eq!(json["code"], 404);
}

async fn hang() -> StatusCode {
    tokio::time::sleep(Duration::from_secs(60)).await;
    StatusCode::OK
}

#[tokio::test]
async fn market_overview_degrades_before_request_timeout() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let base = format!("http://{}", listener.local_addr().unwrap());
    let stub = Router::new().route("/api/stocks/{symbol}", get(hang));
    tokio::spawn(async move {
        axum::serve(listener, stub).await.unwrap();
    });

    let mut market_data = MarketDataConfig::offline();
    market_data.backend_base_url = Some(base);
    market_data.quote_timeout = Duration::from_millis(200);
    market_data.symbol_ceiling = Duration::from_millis(300);
    let mut config = Config::with_market_data(market_data);
    config.request_timeout = Duration::from_millis(1000);
    let state = build_state(&config).await.unwrap();
    let app = app_router(state, &config);

    // Ten waves of four symbols would need two seconds.
    let symbols: Vec<String> = (0..40).map(|i| format!("SYM{}", i)).collect();
    let uri = format!("/api/v1/market-overview?symbols={}", symbols.join(","));

    let started = Instant::now();
    let (status, json) = get_json(app, &uri).await;

    assert_eq!(status, 200);
    assert!(started.elapsed() < Duration::from_millis(1000));
    let quotes = json.as_array().unwrap();
    assert_eq!(quotes.len(), 40);
    assert_eq!(quotes[0]["symbol"], "SYM0");
    assert_eq!(quotes[39]["symbol"], "SYM39");
    assert!(quotes.iter().all(|q| q["sourceProvider"] == "SYNTHETIC"));
}
