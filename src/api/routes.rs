use axum::{
    extract::State,
    http::StatusCode,
    middleware,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use serde::Serialize;
use serde_json::json;
use std::sync::Arc;

use crate::middleware::log_requests;
use crate::models::{StatisticsResponse, TransactionRequest};
use crate::service::{StatisticsService, TransactionStatus};
use crate::window::MetricsSnapshot;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<StatisticsService>,
}

/// Create the API router
pub fn create_router(service: Arc<StatisticsService>) -> Router {
    let state = AppState { service };

    Router::new()
        .route("/health", get(health_check))
        .route("/transactions", post(create_transaction))
        .route("/statistics", get(get_statistics))
        .layer(middleware::from_fn(log_requests))
        .with_state(state)
}

// ===== Route Handlers =====

async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let counters = state.service.metrics();
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
        active_events: state.service.statistics().count,
        counters,
    })
}

/// Admit a transaction into the window.
///
/// 201 when it enters the window, 204 when it is already too old to count,
/// 400 when its timestamp is in the future or its amount is out of range.
async fn create_transaction(
    State(state): State<AppState>,
    Json(request): Json<TransactionRequest>,
) -> Result<StatusCode, ApiError> {
    let status = state
        .service
        .create_transaction(request.amount, request.timestamp)
        .await?;

    match status {
        TransactionStatus::Created => Ok(StatusCode::CREATED),
        TransactionStatus::RejectedOld => Ok(StatusCode::NO_CONTENT),
        TransactionStatus::RejectedFuture => Err(ApiError::BadRequest(
            "Cannot create transaction in the future.".to_string(),
        )),
        TransactionStatus::RejectedOutOfRange => Err(ApiError::BadRequest(
            "Transaction amount is out of range.".to_string(),
        )),
    }
}

async fn get_statistics(State(state): State<AppState>) -> Json<StatisticsResponse> {
    Json(StatisticsResponse::from(state.service.statistics().as_ref()))
}

// ===== Response Types =====

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
    active_events: u64,
    #[serde(flatten)]
    counters: MetricsSnapshot,
}

// ===== Error Handling =====

#[derive(Debug)]
enum ApiError {
    Engine(anyhow::Error),
    BadRequest(String),
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        ApiError::Engine(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            ApiError::Engine(err) => {
                tracing::error!("Engine error: {:#}", err);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error".to_string())
            }
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
        };

        let body = Json(json!({
            "error": message,
        }));

        (status, body).into_response()
    }
}
