//! REST API route definitions.

use std::path::Path;
use std::sync::Arc;

use axum::{
    Router,
    http::{HeaderName, HeaderValue},
    routing::{get, post},
};
use tower_http::{
    cors::{Any, CorsLayer},
    services::{ServeDir, ServeFile},
    set_header::SetResponseHeaderLayer,
    trace::TraceLayer,
};

use super::{handlers, state::ApiState};

/// Headers added to every response that does not already set them.
pub const SECURITY_HEADERS: [(&str, &str); 7] = [
    ("x-content-type-options", "nosniff"),
    ("x-frame-options", "SAMEORIGIN"),
    ("referrer-policy", "no-referrer"),
    ("x-dns-prefetch-control", "off"),
    ("cross-origin-resource-policy", "same-origin"),
    ("x-download-options", "noopen"),
    ("x-permitted-cross-domain-policies", "none"),
];

/// Routes served both at the root and under `/api`.
fn api_routes() -> Router<Arc<ApiState>> {
    Router::new()
        .route("/status", get(handlers::status::get_status))
        .route("/parse", post(handlers::import::parse_file))
        .route("/health", get(handlers::system::health))
}

/// Creates the router with all routes and middleware.
///
/// With `assets`, unmatched paths are served from that directory and fall
/// back to its `index.html`.
pub fn create_router(state: Arc<ApiState>, assets: Option<&Path>) -> Router {
    let mut router = Router::new()
        .merge(api_routes())
        .nest("/api", api_routes())
        .with_state(state);

    if let Some(dir) = assets {
        let index = ServeFile::new(dir.join("index.html"));
        router = router.fallback_service(ServeDir::new(dir).fallback(index));
    }

    let router = SECURITY_HEADERS
        .iter()
        .fold(router, |router, &(name, value)| {
            router.layer(SetResponseHeaderLayer::if_not_present(
                HeaderName::from_static(name),
                HeaderValue::from_static(value),
            ))
        });

    router
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}
