//! In-process scenario tests for cfx-daemon HTTP endpoints.
//!
//! The router is driven via `tower::ServiceExt::oneshot` against stub feeds,
//! the memory store and a PNG sink in a temp dir. No network I/O.

use std::sync::Arc;

use async_trait::async_trait;
use axum::http::{header, Request, StatusCode};
use cfx_daemon::{routes, state::AppState};
use cfx_db::MemoryCountryStore;
use cfx_feeds::{FeedError, FeedKind, FeedSource, RateTable};
use cfx_report::PngSummarySink;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt; // oneshot

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

struct StubFeeds {
    countries: Result<Vec<Value>, FeedError>,
}

#[async_trait]
impl FeedSource for StubFeeds {
    async fn fetch_countries(&self) -> Result<Vec<Value>, FeedError> {
        self.countries.clone()
    }

    async fn fetch_exchange_rates(&self) -> Result<RateTable, FeedError> {
        Ok([("NGN".to_string(), 1_600.0), ("GHS".to_string(), 15.0)]
            .into_iter()
            .collect())
    }
}

fn feed() -> Vec<Value> {
    vec![
        json!({"name": "Nigeria", "capital": "Abuja", "region": "Africa", "population": 206_139_589,
               "flag": "https://flagcdn.com/ng.svg", "currencies": [{"code": "NGN"}]}),
        json!({"name": "Ghana", "capital": "Accra", "region": "Africa", "population": 31_072_940,
               "currencies": [{"code": "GHS"}]}),
        json!({"name": "Iceland", "capital": "Reykjavik", "region": "Europe", "population": 366_425,
               "currencies": [{"code": "ISK"}]}),
        json!({"name": "Nowhere", "population": 0}),
    ]
}

/// Fresh state; the temp dir must outlive the test.
fn make_state(countries: Result<Vec<Value>, FeedError>) -> (Arc<AppState>, tempfile::TempDir) {
    let dir = tempfile::tempdir().expect("tempdir");
    let st = AppState::new(
        Arc::new(StubFeeds { countries }),
        Arc::new(MemoryCountryStore::new()),
        Arc::new(PngSummarySink::new(dir.path().join("cache"))),
    );
    (Arc::new(st), dir)
}

fn req(method: &str, uri: &str) -> Request<axum::body::Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .body(axum::body::Body::empty())
        .unwrap()
}

fn json_req(method: &str, uri: &str, body: Value) -> Request<axum::body::Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(axum::body::Body::from(body.to_string()))
        .unwrap()
}

/// Drive a fresh router over `st` with one request; returns (status, content-type, body).
async fn call(st: &Arc<AppState>, req: Request<axum::body::Body>) -> (StatusCode, Option<String>, bytes::Bytes) {
    let resp = routes::build_router(Arc::clone(st))
        .oneshot(req)
        .await
        .expect("oneshot failed");
    let status = resp.status();
    let ctype = resp
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    let body = resp
        .into_body()
        .collect()
        .await
        .expect("body collect failed")
        .to_bytes();
    (status, ctype, body)
}

fn parse_json(b: bytes::Bytes) -> Value {
    serde_json::from_slice(&b).expect("body is not valid JSON")
}

// ---------------------------------------------------------------------------
// GET /health
// ---------------------------------------------------------------------------

#[tokio::test]
async fn health_returns_200_ok_true() {
    let (st, _dir) = make_state(Ok(feed()));
    let (status, _, body) = call(&st, req("GET", "/health")).await;
    assert_eq!(status, StatusCode::OK);

    let json = parse_json(body);
    assert_eq!(json["ok"], true);
    assert_eq!(json["service"], "cfx-daemon");
}

// ---------------------------------------------------------------------------
// Refresh → read → delete
// ---------------------------------------------------------------------------

#[tokio::test]
async fn refresh_then_query_then_delete() {
    let (st, _dir) = make_state(Ok(feed()));

    let (status, _, body) = call(&st, req("POST", "/countries/refresh")).await;
    assert_eq!(status, StatusCode::OK);
    let out = parse_json(body);
    assert_eq!(out["created"], 3);
    assert_eq!(out["skipped"], 1);
    assert_eq!(out["skipped_countries"][0], "Nowhere (invalid population)");
    assert_eq!(out["message"], "Created 3 and updated 0 countries. Skipped 1.");

    // Default listing: name ascending.
    let (status, _, body) = call(&st, req("GET", "/countries")).await;
    assert_eq!(status, StatusCode::OK);
    let names: Vec<String> = parse_json(body)
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["name"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(names, vec!["Ghana", "Iceland", "Nigeria"]);

    // ISK is not in the rate feed.
    let (status, _, body) = call(&st, req("GET", "/countries/iceland")).await;
    assert_eq!(status, StatusCode::OK);
    let ice = parse_json(body);
    assert_eq!(ice["name"], "Iceland");
    assert_eq!(ice["currency_code"], Value::Null);
    assert_eq!(ice["exchange_rate"], Value::Null);
    assert_eq!(ice["estimated_gdp"], 0.0);

    let (status, _, body) = call(&st, req("GET", "/countries/status")).await;
    assert_eq!(status, StatusCode::OK);
    let s = parse_json(body);
    assert_eq!(s["total_countries"], 3);
    assert_eq!(s["last_refreshed_at"], out["last_refreshed_at"]);

    let (status, _, body) = call(&st, req("DELETE", "/countries/Ghana")).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert!(body.is_empty());

    let (status, _, body) = call(&st, req("GET", "/countries/Ghana")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(parse_json(body)["error"], "Country not found");

    let (status, _, _) = call(&st, req("DELETE", "/countries/Ghana")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn name_lookup_is_exact_apart_from_case() {
    let (st, _dir) = make_state(Ok(feed()));
    call(&st, req("POST", "/countries/refresh")).await;

    let (status, _, _) = call(&st, req("GET", "/countries/GHANA")).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _, body) = call(&st, req("GET", "/countries/%20Ghana%20")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(parse_json(body)["error"], "Country not found");

    let (status, _, _) = call(&st, req("DELETE", "/countries/Ghana%20")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn list_filters_and_sort_compose() {
    let (st, _dir) = make_state(Ok(feed()));
    call(&st, req("POST", "/countries/refresh")).await;

    let (status, _, body) = call(&st, req("GET", "/countries?region=afr&sort=population_desc")).await;
    assert_eq!(status, StatusCode::OK);
    let rows = parse_json(body);
    let names: Vec<&str> = rows
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["Nigeria", "Ghana"]);

    let (_, _, body) = call(&st, req("GET", "/countries?currency=ghs")).await;
    let rows = parse_json(body);
    assert_eq!(rows.as_array().unwrap().len(), 1);
    assert_eq!(rows[0]["name"], "Ghana");

    // Unknown sort key falls back to name ascending.
    let (status, _, body) = call(&st, req("GET", "/countries?sort=bogus&region=")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(parse_json(body)[0]["name"], "Ghana");
}

// ---------------------------------------------------------------------------
// GET /countries/image
// ---------------------------------------------------------------------------

#[tokio::test]
async fn image_is_404_until_first_refresh() {
    let (st, _dir) = make_state(Ok(feed()));

    let (status, _, body) = call(&st, req("GET", "/countries/image")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(parse_json(body)["error"], "Summary image not found");

    call(&st, req("POST", "/countries/refresh")).await;

    let (status, ctype, body) = call(&st, req("GET", "/countries/image")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(ctype.as_deref(), Some("image/png"));
    assert_eq!(&body[..8], b"\x89PNG\r\n\x1a\n");
}

// ---------------------------------------------------------------------------
// Upstream failure
// ---------------------------------------------------------------------------

#[tokio::test]
async fn refresh_upstream_failure_is_503_and_stores_nothing() {
    let (st, _dir) = make_state(Err(FeedError::Unavailable {
        feed: FeedKind::Countries,
        detail: "http status 502".to_string(),
    }));

    let (status, _, body) = call(&st, req("POST", "/countries/refresh")).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    let json = parse_json(body);
    assert_eq!(json["error"], "External data source unavailable");
    assert_eq!(json["details"], "Could not fetch data from Countries API");

    let (_, _, body) = call(&st, req("GET", "/countries/status")).await;
    let s = parse_json(body);
    assert_eq!(s["total_countries"], 0);
    assert_eq!(s["last_refreshed_at"], Value::Null);
}

// ---------------------------------------------------------------------------
// POST /countries
// ---------------------------------------------------------------------------

#[tokio::test]
async fn create_validation_conflict_and_not_found() {
    let (st, _dir) = make_state(Ok(feed()));

    let (status, _, body) = call(&st, json_req("POST", "/countries", json!({"name": "Ghana"}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let json = parse_json(body);
    assert_eq!(json["error"], "Validation failed");
    assert_eq!(json["details"]["currency_code"], "is required");
    assert_eq!(json["details"]["population"], "must be positive");

    let good = json!({"name": "Ghana", "population": 1, "currency_code": "GHS"});
    let (status, _, body) = call(&st, json_req("POST", "/countries", good.clone())).await;
    assert_eq!(status, StatusCode::CREATED);
    let rec = parse_json(body);
    assert_eq!(rec["name"], "Ghana");
    assert_eq!(rec["exchange_rate"], 15.0);

    let (status, _, _) = call(&st, json_req("POST", "/countries", good)).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _, body) = call(
        &st,
        json_req("POST", "/countries", json!({"name": "Atlantis", "population": 9, "currency_code": "ATL"})),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(parse_json(body)["error"], "Country not found");
}

#[tokio::test]
async fn create_with_unparseable_body_is_400() {
    let (st, _dir) = make_state(Ok(feed()));

    let bad = Request::builder()
        .method("POST")
        .uri("/countries")
        .header(header::CONTENT_TYPE, "application/json")
        .body(axum::body::Body::from("{not json"))
        .unwrap();
    let (status, _, body) = call(&st, bad).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(parse_json(body)["error"], "Validation failed");
}
