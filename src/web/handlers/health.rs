//! Health check handler.

use std::sync::Arc;

use axum::{extract::State, Json};
use chrono::{SecondsFormat, Utc};

use super::AppState;
use crate::web::dto::HealthResponse;

/// GET /health - Liveness probe.
#[utoipa::path(
    get,
    path = "/health",
    tag = "health",
    responses(
        (status = 200, description = "Server is up", body = HealthResponse)
    )
)]
pub async fn health_check(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "OK".to_string(),
        timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
        environment: state.environment.clone(),
    })
}
