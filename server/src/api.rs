//! # REST API
//!
//! The explorer's HTTP surface. All handlers share [`AppState`] through
//! axum's `State` extractor.
//!
//! ## Endpoints
//!
//! | Method | Path            | Description                                 |
//! |--------|-----------------|---------------------------------------------|
//! | GET    | `/health`       | Liveness probe                              |
//! | GET    | `/status`       | Version, tip height, listing settings       |
//! | GET    | `/txs`          | Transaction listing by range/block/address  |
//! | GET    | `/tx/:txid`     | Single transaction with confirmations       |
//! | GET    | `/rawtx/:txid`  | Raw transaction hex from the upstream node  |
//! | POST   | `/tx/send`      | Broadcast a raw transaction via the node    |
//!
//! ## Listing responses
//!
//! `GET /txs` takes `from` and `to` (a block-height range, `to` exclusive),
//! `block` (height or hash), `address`, and `pageNum` (zero-indexed). A
//! complete range wins over `block`, which wins over `address`. Range
//! responses are `{"txs": [...]}`; block and address responses add
//! `pagesTotal`.
//!
//! A 200 listing may contain stub entries of the form `{"txid": "..."}`
//! when a transaction's details could not be loaded. Clients must accept
//! both shapes. Scope-level failures return an error status with an
//! `{"error": "..."}` body: 400 for an unusable range, 404 for an unknown
//! block or invalid address, 500 for index failures. A query string or
//! request body that does not parse is a 400 with the same body.

use axum::{
    extract::rejection::{JsonRejection, QueryRejection},
    extract::{Path, Query, State},
    http::{Method, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use chainsight_explorer::config::PAGE_LENGTH;
use chainsight_explorer::error::{ErrorKind, ListingError};
use chainsight_explorer::rpc::{describe_send_failure, NodeRpc, RpcError};
use chainsight_explorer::types::{Scope, ScopeParams};
use chainsight_explorer::Explorer;

use crate::metrics::SharedMetrics;

// ---------------------------------------------------------------------------
// Application State
// ---------------------------------------------------------------------------

/// Shared handler state. Cheap to clone.
#[derive(Clone)]
pub struct AppState {
    pub version: String,
    pub explorer: Explorer,
    pub rpc: Arc<dyn NodeRpc>,
    pub metrics: SharedMetrics,
    /// Upper bound on a single request's handling time.
    pub request_timeout: Duration,
}

// ---------------------------------------------------------------------------
// Router Construction
// ---------------------------------------------------------------------------

/// Builds the API router with CORS, request tracing and the request
/// timeout.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any);

    let middleware = ServiceBuilder::new()
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(state.request_timeout))
        .layer(cors);

    Router::new()
        .route("/health", get(health_handler))
        .route("/status", get(status_handler))
        .route("/txs", get(list_transactions_handler))
        .route("/tx/send", post(send_transaction_handler))
        .route("/tx/:txid", get(transaction_handler))
        .route("/rawtx/:txid", get(raw_transaction_handler))
        .layer(middleware)
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Request / Response Types
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusResponse {
    pub version: String,
    /// `None` while the index is empty.
    pub tip_height: Option<u64>,
    pub page_length: usize,
    pub fanout_concurrency: usize,
    pub max_range_width: u64,
    /// RFC 3339 time of the response.
    pub timestamp: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RawTransactionResponse {
    pub rawtx: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SendTransactionRequest {
    pub rawtx: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SendTransactionResponse {
    pub txid: String,
}

/// Error body for every failed request.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    (
        status,
        Json(ErrorResponse {
            error: message.into(),
        }),
    )
        .into_response()
}

fn listing_error_response(err: &ListingError) -> Response {
    let status = match err.kind() {
        ErrorKind::BadRequest => StatusCode::BAD_REQUEST,
        ErrorKind::NotFound => StatusCode::NOT_FOUND,
        ErrorKind::Internal => {
            tracing::error!(error = %err, "listing failed on index error");
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };
    error_response(status, err.to_string())
}

fn rpc_unavailable(err: &RpcError) -> Response {
    tracing::warn!(error = %err, "upstream node call failed");
    error_response(StatusCode::SERVICE_UNAVAILABLE, err.to_string())
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// `GET /health`
async fn health_handler() -> impl IntoResponse {
    (StatusCode::OK, Json(serde_json::json!({ "status": "ok" })))
}

/// `GET /status`
async fn status_handler(State(state): State<AppState>) -> Response {
    let tip_height = match state.explorer.tip_height().await {
        Ok(tip) => tip,
        Err(e) => return listing_error_response(&e),
    };
    if let Some(tip) = tip_height {
        state.metrics.tip_height.set(tip as i64);
    }

    let config = state.explorer.config();
    Json(StatusResponse {
        version: state.version.clone(),
        tip_height,
        page_length: PAGE_LENGTH,
        fanout_concurrency: config.fanout_concurrency,
        max_range_width: config.max_range_width,
        timestamp: chrono::Utc::now().to_rfc3339(),
    })
    .into_response()
}

/// `GET /txs`
async fn list_transactions_handler(
    State(state): State<AppState>,
    query: Result<Query<ScopeParams>, QueryRejection>,
) -> Response {
    let Query(params) = match query {
        Ok(query) => query,
        Err(rejection) => return error_response(StatusCode::BAD_REQUEST, rejection.body_text()),
    };
    let scope = Scope::classify(&params).kind();
    state
        .metrics
        .listing_requests_total
        .with_label_values(&[scope.as_str()])
        .inc();
    let _timer = state.metrics.listing_latency_seconds.start_timer();

    match state.explorer.list_transactions(&params).await {
        Ok(listing) => Json(listing).into_response(),
        Err(e) => listing_error_response(&e),
    }
}

/// `GET /tx/:txid`
async fn transaction_handler(
    State(state): State<AppState>,
    Path(txid): Path<String>,
) -> Response {
    match state.explorer.transaction(&txid).await {
        Ok(info) => Json(info).into_response(),
        Err(e) => listing_error_response(&e),
    }
}

/// `GET /rawtx/:txid`
async fn raw_transaction_handler(
    State(state): State<AppState>,
    Path(txid): Path<String>,
) -> Response {
    match state.rpc.get_raw_transaction(&txid).await {
        Ok(Some(rawtx)) => Json(RawTransactionResponse { rawtx }).into_response(),
        Ok(None) => error_response(StatusCode::NOT_FOUND, "Not found"),
        Err(e @ RpcError::Node { .. }) => error_response(StatusCode::BAD_REQUEST, e.to_string()),
        Err(e) => rpc_unavailable(&e),
    }
}

/// `POST /tx/send`
async fn send_transaction_handler(
    State(state): State<AppState>,
    body: Result<Json<SendTransactionRequest>, JsonRejection>,
) -> Response {
    let Json(req) = match body {
        Ok(body) => body,
        Err(rejection) => return error_response(StatusCode::BAD_REQUEST, rejection.body_text()),
    };
    match state.rpc.send_raw_transaction(&req.rawtx).await {
        Ok(txid) => {
            tracing::info!(%txid, "transaction broadcast");
            Json(SendTransactionResponse { txid }).into_response()
        }
        Err(e @ RpcError::Node { .. }) => {
            error_response(StatusCode::BAD_REQUEST, describe_send_failure(&e))
        }
        Err(e) => rpc_unavailable(&e),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
