//! Request and response types for the REST API.

use serde::{Deserialize, Serialize};

/// Query string for GET /status
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StatusQuery {
    #[serde(rename = "queryUrl")]
    pub query_url: Option<String>,
}

/// Response for GET /health
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
}

/// API error response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiError {
    pub error: String,
    pub code: Option<String>,
}

impl ApiError {
    #[must_use]
    pub fn with_code(error: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            code: Some(code.into()),
        }
    }
}
