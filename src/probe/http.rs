//! HTTP(S) reachability probe.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{StatusCode, redirect::Policy};
use serde_json::Value;
use tracing::debug;

use super::{Probe, ProbeError, Status, error_chain};
use crate::endpoint::ProbeTarget;

/// Redirects followed before giving up.
const MAX_REDIRECTS: usize = 5;

/// Bytes of a non-200 body kept in `additionalData`.
pub const MAX_BODY_BYTES: usize = 64 * 1024;

/// Issues a single GET and classifies the response code.
///
/// No retries. Idle connections are not kept between calls, so one probe
/// never rides on a connection opened by another.
#[derive(Debug, Clone)]
pub struct HttpProbe {
    /// HTTP client.
    client: reqwest::Client,
}

impl HttpProbe {
    /// Creates a probe whose requests give up after `timeout`.
    pub fn new(timeout: Duration) -> Result<Self, ProbeError> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("tine/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .connect_timeout(timeout)
            .redirect(Policy::limited(MAX_REDIRECTS))
            .pool_max_idle_per_host(0)
            .build()
            .map_err(|e| ProbeError::Unexpected(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self { client })
    }

    /// Requests `url` and classifies the outcome.
    ///
    /// The body is never interpreted; non-200 bodies are passed back as
    /// text in `additionalData`, cut at [`MAX_BODY_BYTES`].
    pub async fn probe_url(&self, url: &str) -> Result<Status, ProbeError> {
        let response = match self.client.get(url).send().await {
            Ok(response) => response,
            Err(e) if e.is_builder() => {
                return Err(ProbeError::Unexpected(format!(
                    "could not build request for {}: {}",
                    url, e
                )));
            }
            Err(e) => {
                let reason = error_chain(&e);
                debug!(%url, timeout = e.is_timeout(), error = %reason, "HTTP probe got no response");
                return Ok(Status::unreachable(reason));
            }
        };

        let code = response.status();
        debug!(%url, status = %code, "HTTP probe got response");

        if code == StatusCode::OK {
            return Ok(classify_response(code, None));
        }

        let body = match read_capped(response, MAX_BODY_BYTES).await {
            Ok(body) => Some(body),
            Err(e) => {
                debug!(%url, error = %e, "HTTP probe could not read response body");
                None
            }
        };

        Ok(classify_response(code, body))
    }
}

/// Reads at most `limit` bytes of the body as lossy UTF-8.
///
/// Stops pulling chunks once the limit is reached; the rest of the body is
/// dropped with the response.
async fn read_capped(mut response: reqwest::Response, limit: usize) -> reqwest::Result<String> {
    let mut buf = Vec::new();
    while buf.len() < limit {
        let Some(chunk) = response.chunk().await? else {
            break;
        };
        let take = chunk.len().min(limit - buf.len());
        buf.extend_from_slice(&chunk[..take]);
    }
    Ok(truncate_utf8(&buf))
}

/// Decodes `bytes`, dropping a multi-byte character split by the cap.
fn truncate_utf8(bytes: &[u8]) -> String {
    match std::str::from_utf8(bytes) {
        Ok(text) => text.to_string(),
        Err(e) if e.error_len().is_none() => {
            String::from_utf8_lossy(&bytes[..e.valid_up_to()]).into_owned()
        }
        Err(_) => String::from_utf8_lossy(bytes).into_owned(),
    }
}

/// Maps a received response to a [`Status`].
///
/// 200 is reachable. 401 is also reachable: an auth challenge proves the
/// service is up and speaking HTTP. Anything else is unreachable.
#[must_use]
pub fn classify_response(code: StatusCode, body: Option<String>) -> Status {
    if code == StatusCode::OK {
        return Status::reachable();
    }

    let reason = status_text(code);
    let additional_data = body.map(Value::String);

    if code == StatusCode::UNAUTHORIZED {
        Status::reachable_because(reason, additional_data)
    } else {
        Status::Unreachable {
            reason,
            additional_data,
        }
    }
}

/// Returns the reason phrase for `code`, or the bare number when the code
/// has none.
#[must_use]
pub fn status_text(code: StatusCode) -> String {
    code.canonical_reason()
        .map_or_else(|| code.as_str().to_string(), str::to_string)
}

#[async_trait]
impl Probe for HttpProbe {
    fn name(&self) -> &'static str {
        "http"
    }

    async fn probe(&self, target: &ProbeTarget) -> Result<Status, ProbeError> {
        self.probe_url(target.raw()).await
    }
}
