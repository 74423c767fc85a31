//! REST API request handlers.

pub mod import;
pub mod status;
pub mod system;

use axum::{Json, http::StatusCode};

use super::types::ApiError;

/// Error half of every handler result.
pub type HandlerError = (StatusCode, Json<ApiError>);

pub(crate) fn bad_request(error: impl Into<String>, code: &str) -> HandlerError {
    (
        StatusCode::BAD_REQUEST,
        Json(ApiError::with_code(error, code)),
    )
}
