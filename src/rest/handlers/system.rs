//! Liveness handler.

use axum::Json;

use crate::rest::types::HealthResponse;

/// GET /health - Liveness check.
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
    })
}
