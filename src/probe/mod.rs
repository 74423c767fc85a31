//! Reachability probing.
//!
//! A probe makes one bounded attempt to talk to an endpoint in its declared
//! protocol and classifies what happened into a [`Status`].
//!
//! # Architecture
//!
//! - **status**: the normalized result type
//! - **http**: single GET request, classified by response code
//! - **ssh**: transport handshake plus a credential exchange
//! - **dispatcher**: parses the address and routes to the matching probe
//!
//! Classified network outcomes (refused, timed out, 500, ...) are returned
//! as `Ok(Status)`. Only [`ProbeError`] values are failures of the call.

pub mod dispatcher;
pub mod http;
pub mod ssh;
pub mod status;

use std::time::Duration;

use async_trait::async_trait;

use crate::endpoint::{ProbeTarget, TargetError};

pub use dispatcher::Dispatcher;
pub use http::HttpProbe;
pub use ssh::{
    Ssh2Transport, SshAuth, SshConnection, SshFailure, SshProbe, SshTransport,
    DEFAULT_SSH_PASSWORD, DEFAULT_SSH_USERNAME,
};
pub use status::{NOT_IMPLEMENTED, Status, StatusKind};

/// Default bound on a single HTTP request.
pub const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(10);

/// Default bound on each SSH connection step.
pub const DEFAULT_SSH_TIMEOUT: Duration = Duration::from_secs(10);

/// Errors that make a probe call itself fail.
#[derive(Debug, thiserror::Error)]
pub enum ProbeError {
    /// The address could not be parsed; nothing was attempted.
    #[error("invalid address: {0}")]
    InvalidAddress(#[from] TargetError),

    /// Something the classification rules do not cover.
    #[error("unexpected probe failure: {0}")]
    Unexpected(String),
}

/// One protocol-specific probe strategy.
#[async_trait]
pub trait Probe: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    /// Probes `target` once, honoring the probe's own timeout.
    async fn probe(&self, target: &ProbeTarget) -> Result<Status, ProbeError>;
}

/// Settings shared by the probes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeConfig {
    /// Bound on an HTTP request, body included.
    pub http_timeout: Duration,
    /// Bound on each of connect, handshake and authentication.
    pub ssh_timeout: Duration,
    /// What the SSH probe does after the handshake.
    pub ssh_auth: SshAuth,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            http_timeout: DEFAULT_HTTP_TIMEOUT,
            ssh_timeout: DEFAULT_SSH_TIMEOUT,
            ssh_auth: SshAuth::default(),
        }
    }
}

/// Renders an error with its source chain, `outer: inner: root`.
pub(crate) fn error_chain(error: &(dyn std::error::Error + 'static)) -> String {
    let mut message = error.to_string();
    let mut source = error.source();
    while let Some(cause) = source {
        let cause_text = cause.to_string();
        if !message.contains(&cause_text) {
            message.push_str(": ");
            message.push_str(&cause_text);
        }
        source = cause.source();
    }
    message
}
