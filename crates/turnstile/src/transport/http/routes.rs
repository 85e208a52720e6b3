//! HTTP route handlers.

use std::sync::Arc;

use axum::{
    Router,
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
};
use serde::Deserialize;

use crate::activity::EventCategory;
use crate::config::SimulationConfig;
use crate::service::{SessionError, TicketingService, UpdateConfigError};

pub fn routes(service: Arc<TicketingService>) -> Router {
    Router::new()
        .route("/health-check", get(health_check))
        .route("/session/start", post(start_session))
        .route("/session/stop", post(stop_session))
        .route("/pool", get(pool_count))
        .route("/pool/reset", post(reset_pool))
        .route("/logs", get(recent_logs))
        .route("/config", get(get_config).put(put_config))
        .route("/shutdown", post(shutdown))
        .with_state(service)
}

fn conflict(error: SessionError) -> Response {
    (
        StatusCode::CONFLICT,
        Json(serde_json::json!({ "error": error.to_string() })),
    )
        .into_response()
}

async fn health_check(State(service): State<Arc<TicketingService>>) -> Response {
    Json(service.status().await).into_response()
}

async fn start_session(State(service): State<Arc<TicketingService>>) -> Response {
    match service.start_session().await {
        Ok(id) => Json(serde_json::json!({ "sessionId": id })).into_response(),
        Err(error) => conflict(error),
    }
}

async fn stop_session(State(service): State<Arc<TicketingService>>) -> Response {
    match service.stop_session().await {
        Ok(()) => Json(serde_json::json!({ "status": "stopped" })).into_response(),
        Err(error) => conflict(error),
    }
}

async fn pool_count(State(service): State<Arc<TicketingService>>) -> Response {
    Json(serde_json::json!({ "available": service.available().await })).into_response()
}

async fn reset_pool(State(service): State<Arc<TicketingService>>) -> Response {
    match service.reset().await {
        Ok(()) => Json(serde_json::json!({ "status": "reset" })).into_response(),
        Err(error) => conflict(error),
    }
}

#[derive(Debug, Deserialize)]
struct LogsQuery {
    category: Option<EventCategory>,
}

async fn recent_logs(
    State(service): State<Arc<TicketingService>>,
    Query(query): Query<LogsQuery>,
) -> Response {
    Json(service.recent_logs(query.category).await).into_response()
}

async fn get_config(State(service): State<Arc<TicketingService>>) -> Response {
    Json(service.config().await).into_response()
}

async fn put_config(
    State(service): State<Arc<TicketingService>>,
    Json(config): Json<SimulationConfig>,
) -> Response {
    match service.update_config(config).await {
        Ok(()) => Json(service.config().await).into_response(),
        Err(UpdateConfigError::Session(error)) => conflict(error),
        Err(UpdateConfigError::Invalid(error)) => (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(serde_json::json!({ "error": error.to_string() })),
        )
            .into_response(),
    }
}

async fn shutdown(State(service): State<Arc<TicketingService>>) -> Response {
    service.trigger_shutdown();
    Json(serde_json::json!({ "status": "shutting down" })).into_response()
}
