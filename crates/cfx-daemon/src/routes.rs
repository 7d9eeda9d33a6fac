//! Axum router and HTTP handlers for cfx-daemon.
//!
//! `build_router` is the single entry point; `main.rs` calls it and attaches
//! middleware layers so tests can drive the bare router.

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use cfx_db::QueryError;
use cfx_reconcile::{CreateCountryRequest, CreateError, RefreshError};
use cfx_schemas::ListQuery;
use serde_json::json;
use tracing::{error, info, warn};

use crate::{
    api_types::{ErrorResponse, HealthResponse, ListParams},
    state::AppState,
};

// ---------------------------------------------------------------------------
// Router
// ---------------------------------------------------------------------------

/// Build the complete application router wired to the given shared state.
///
/// Static segments (`status`, `image`, `refresh`) win over `:name`.
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/countries", get(list_countries).post(create_country))
        .route("/countries/refresh", post(refresh))
        .route("/countries/status", get(status_handler))
        .route("/countries/image", get(summary_image))
        .route("/countries/:name", get(get_country).delete(delete_country))
        .with_state(state)
}

fn error_response(status: StatusCode, body: ErrorResponse) -> Response {
    (status, Json(body)).into_response()
}

fn internal_error() -> Response {
    error_response(
        StatusCode::INTERNAL_SERVER_ERROR,
        ErrorResponse::new("Internal server error"),
    )
}

fn country_not_found() -> Response {
    error_response(StatusCode::NOT_FOUND, ErrorResponse::new("Country not found"))
}

fn upstream_unavailable(e: &cfx_feeds::FeedError) -> Response {
    warn!(error = %e, "upstream feed failed");
    error_response(
        StatusCode::SERVICE_UNAVAILABLE,
        ErrorResponse::with_details(
            "External data source unavailable",
            json!(format!("Could not fetch data from {}", e.feed().label())),
        ),
    )
}

fn query_error(e: QueryError) -> Response {
    match e {
        QueryError::NotFound { .. } => country_not_found(),
        QueryError::Storage(e) => {
            error!(error = %format!("{e:#}"), "query failed");
            internal_error()
        }
    }
}

// ---------------------------------------------------------------------------
// GET /health
// ---------------------------------------------------------------------------

pub(crate) async fn health(State(st): State<Arc<AppState>>) -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(HealthResponse {
            ok: true,
            service: st.build.service.to_string(),
            version: st.build.version.to_string(),
        }),
    )
}

// ---------------------------------------------------------------------------
// POST /countries/refresh
// ---------------------------------------------------------------------------

pub(crate) async fn refresh(State(st): State<Arc<AppState>>) -> Response {
    match st.reconciler.reconcile().await {
        Ok(out) => {
            info!(created = out.created, updated = out.updated, skipped = out.skipped, "countries/refresh");
            (StatusCode::OK, Json(out)).into_response()
        }
        Err(RefreshError::Upstream(e)) => upstream_unavailable(&e),
        Err(RefreshError::Storage(e)) => {
            error!(error = %format!("{e:#}"), "refresh storage failure");
            internal_error()
        }
    }
}

// ---------------------------------------------------------------------------
// POST /countries
// ---------------------------------------------------------------------------

pub(crate) async fn create_country(
    State(st): State<Arc<AppState>>,
    body: Result<Json<CreateCountryRequest>, JsonRejection>,
) -> Response {
    let Json(req) = match body {
        Ok(b) => b,
        Err(rej) => {
            return error_response(
                StatusCode::BAD_REQUEST,
                ErrorResponse::with_details("Validation failed", json!({ "body": rej.body_text() })),
            );
        }
    };

    match st.reconciler.create_from_feeds(req).await {
        Ok(rec) => (StatusCode::CREATED, Json(rec)).into_response(),
        Err(CreateError::Validation(v)) => error_response(
            StatusCode::BAD_REQUEST,
            ErrorResponse::with_details("Validation failed", json!(v.fields)),
        ),
        Err(CreateError::Upstream(e)) => upstream_unavailable(&e),
        Err(e @ CreateError::NotFound { .. }) => error_response(
            StatusCode::NOT_FOUND,
            ErrorResponse::with_details("Country not found", json!(e.to_string())),
        ),
        Err(CreateError::Conflict { name }) => error_response(
            StatusCode::CONFLICT,
            ErrorResponse::with_details("Country already exists", json!(name)),
        ),
        Err(CreateError::Storage(e)) => {
            error!(error = %format!("{e:#}"), "create storage failure");
            internal_error()
        }
    }
}

// ---------------------------------------------------------------------------
// GET /countries
// ---------------------------------------------------------------------------

pub(crate) async fn list_countries(
    State(st): State<Arc<AppState>>,
    Query(p): Query<ListParams>,
) -> Response {
    let query = ListQuery::from_params(p.region.as_deref(), p.currency.as_deref(), p.sort.as_deref());
    match st.query.list(&query).await {
        Ok(rows) => (StatusCode::OK, Json(rows)).into_response(),
        Err(e) => query_error(e),
    }
}

// ---------------------------------------------------------------------------
// GET /countries/status
// ---------------------------------------------------------------------------

pub(crate) async fn status_handler(State(st): State<Arc<AppState>>) -> Response {
    match st.query.status().await {
        Ok(s) => (StatusCode::OK, Json(s)).into_response(),
        Err(e) => query_error(e),
    }
}

// ---------------------------------------------------------------------------
// GET /countries/image
// ---------------------------------------------------------------------------

pub(crate) async fn summary_image(State(st): State<Arc<AppState>>) -> Response {
    let missing = || error_response(StatusCode::NOT_FOUND, ErrorResponse::new("Summary image not found"));

    let Some(path) = st.sink.path_of() else {
        return missing();
    };
    match tokio::fs::read(&path).await {
        Ok(bytes) => (StatusCode::OK, [(header::CONTENT_TYPE, "image/png")], bytes).into_response(),
        // Removed between the existence check and the read.
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => missing(),
        Err(e) => {
            error!(error = %e, path = %path.display(), "summary image read failed");
            internal_error()
        }
    }
}

// ---------------------------------------------------------------------------
// GET /countries/:name   DELETE /countries/:name
// ---------------------------------------------------------------------------

pub(crate) async fn get_country(State(st): State<Arc<AppState>>, Path(name): Path<String>) -> Response {
    match st.query.get_by_name(&name).await {
        Ok(rec) => (StatusCode::OK, Json(rec)).into_response(),
        Err(e) => query_error(e),
    }
}

pub(crate) async fn delete_country(State(st): State<Arc<AppState>>, Path(name): Path<String>) -> Response {
    match st.query.delete_by_name(&name).await {
        Ok(_) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => query_error(e),
    }
}
