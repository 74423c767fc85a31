//! Integration tests for the HTTP probe.
//!
//! Each test starts a loopback axum server with canned responses and
//! probes it over real sockets.

#![allow(clippy::expect_used, clippy::unwrap_used)]

use std::net::SocketAddr;
use std::time::Duration;

use axum::{Router, http::StatusCode, response::Redirect, routing::get};
use pretty_assertions::assert_eq;
use serde_json::json;

use tine::endpoint::ProbeTarget;
use tine::probe::http::MAX_BODY_BYTES;
use tine::probe::{HttpProbe, Probe, Status, StatusKind};

async fn spawn_server() -> SocketAddr {
    let router = Router::new()
        .route("/", get(|| async { "hello" }))
        .route(
            "/login",
            get(|| async { (StatusCode::UNAUTHORIZED, "credentials required") }),
        )
        .route(
            "/broken",
            get(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "boom") }),
        )
        .route(
            "/huge",
            get(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "x".repeat(200 * 1024)) }),
        )
        .route("/created", get(|| async { StatusCode::CREATED }))
        .route("/moved", get(|| async { Redirect::temporary("/") }))
        .route("/loop", get(|| async { Redirect::temporary("/loop") }))
        .route(
            "/slow",
            get(|| async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                "late"
            }),
        );

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    addr
}

/// Returns a loopback port with nothing listening on it.
fn closed_port() -> u16 {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    listener.local_addr().unwrap().port()
}

fn probe() -> HttpProbe {
    HttpProbe::new(Duration::from_secs(2)).expect("client builds")
}

// ============================================================================
// Response classification
// ============================================================================

#[tokio::test]
async fn test_ok_is_reachable() {
    let addr = spawn_server().await;
    let status = probe().probe_url(&format!("http://{}/", addr)).await.unwrap();
    assert_eq!(status, Status::reachable());
}

#[tokio::test]
async fn test_unauthorized_is_reachable_with_body() {
    let addr = spawn_server().await;
    let status = probe()
        .probe_url(&format!("http://{}/login", addr))
        .await
        .unwrap();

    assert_eq!(
        status,
        Status::reachable_because("Unauthorized", Some(json!("credentials required")))
    );
}

#[tokio::test]
async fn test_server_error_is_unreachable_with_body() {
    let addr = spawn_server().await;
    let status = probe()
        .probe_url(&format!("http://{}/broken", addr))
        .await
        .unwrap();

    assert_eq!(
        status,
        Status::unreachable_with("Internal Server Error", json!("boom"))
    );
}

#[tokio::test]
async fn test_other_success_codes_are_unreachable() {
    let addr = spawn_server().await;
    let status = probe()
        .probe_url(&format!("http://{}/created", addr))
        .await
        .unwrap();

    assert_eq!(status.kind(), StatusKind::Unreachable);
    assert_eq!(status.reason(), Some("Created"));
}

#[tokio::test]
async fn test_redirect_is_followed() {
    let addr = spawn_server().await;
    let status = probe()
        .probe_url(&format!("http://{}/moved", addr))
        .await
        .unwrap();
    assert_eq!(status, Status::reachable());
}

#[tokio::test]
async fn test_redirect_loop_is_unreachable() {
    let addr = spawn_server().await;
    let status = probe()
        .probe_url(&format!("http://{}/loop", addr))
        .await
        .unwrap();
    assert_eq!(status.kind(), StatusKind::Unreachable);
}

// ============================================================================
// Transport failures
// ============================================================================

#[tokio::test]
async fn test_refused_connection_is_unreachable() {
    let port = closed_port();
    let status = probe()
        .probe_url(&format!("http://127.0.0.1:{}", port))
        .await
        .unwrap();

    assert_eq!(status.kind(), StatusKind::Unreachable);
    assert!(!status.reason().unwrap_or_default().is_empty());
    assert!(status.additional_data().is_none());
}

#[tokio::test]
async fn test_timeout_is_unreachable() {
    let addr = spawn_server().await;
    let probe = HttpProbe::new(Duration::from_millis(200)).unwrap();

    let started = std::time::Instant::now();
    let status = probe
        .probe_url(&format!("http://{}/slow", addr))
        .await
        .unwrap();

    assert_eq!(status.kind(), StatusKind::Unreachable);
    assert!(started.elapsed() < Duration::from_secs(3));
}

#[tokio::test]
async fn test_unresolvable_host_is_unreachable() {
    let status = probe().probe_url("http://host.invalid/").await.unwrap();
    assert_eq!(status.kind(), StatusKind::Unreachable);
}

// ============================================================================
// Probe trait
// ============================================================================

#[tokio::test]
async fn test_probe_requests_raw_address() {
    let addr = spawn_server().await;
    let target = ProbeTarget::parse(&format!("HTTP://{}/login", addr)).unwrap();

    let status = probe().probe(&target).await.unwrap();
    assert_eq!(status.reason(), Some("Unauthorized"));
}

#[tokio::test]
async fn test_repeated_probes_agree() {
    let addr = spawn_server().await;
    let probe = probe();
    let url = format!("http://{}/broken", addr);

    let first = probe.probe_url(&url).await.unwrap();
    let second = probe.probe_url(&url).await.unwrap();
    assert_eq!(first, second);
}

#[tokio::test]
async fn test_large_error_body_is_truncated() {
    let addr = spawn_server().await;
    let status = probe()
        .probe_url(&format!("http://{}/huge", addr))
        .await
        .unwrap();

    assert_eq!(status.kind(), StatusKind::Unreachable);
    assert_eq!(status.reason(), Some("Internal Server Error"));
    let body = status
        .additional_data()
        .and_then(|data| data.as_str())
        .unwrap();
    assert_eq!(body.len(), MAX_BODY_BYTES);
}
