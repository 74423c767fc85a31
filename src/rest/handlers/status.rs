//! Probe handler.

use std::sync::Arc;

use axum::{
    Json,
    extract::{Query, State},
    http::StatusCode,
};

use super::{HandlerError, bad_request};
use crate::probe::{ProbeError, Status};
use crate::rest::{
    state::ApiState,
    types::{ApiError, StatusQuery},
};

/// GET /status - Probe the endpoint named by `queryUrl`.
///
/// Classified outcomes, including unreachable ones, are 200. A missing or
/// malformed address is 400; anything the probes could not classify is 500.
pub async fn get_status(
    State(state): State<Arc<ApiState>>,
    Query(query): Query<StatusQuery>,
) -> Result<Json<Status>, HandlerError> {
    let query_url = query
        .query_url
        .filter(|url| !url.trim().is_empty())
        .ok_or_else(|| bad_request("queryUrl is required", "missing_query_url"))?;

    match state.dispatcher.probe(query_url.trim()).await {
        Ok(status) => Ok(Json(status)),
        Err(ProbeError::InvalidAddress(e)) => Err(bad_request(e.to_string(), "invalid_address")),
        Err(e @ ProbeError::Unexpected(_)) => {
            tracing::error!(query_url = %query_url, error = %e, "status request failed");
            Err((
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ApiError::with_code(e.to_string(), "probe_failed")),
            ))
        }
    }
}
