//! Routes a probe address to the probe for its scheme.

use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, error, info};

use super::{HttpProbe, Probe, ProbeConfig, ProbeError, SshProbe, Status};
use crate::endpoint::{ProbeTarget, Scheme};

/// Parses addresses and hands them to the matching [`Probe`].
///
/// Holds no per-call state; one dispatcher can serve any number of
/// concurrent probes.
#[derive(Clone)]
pub struct Dispatcher {
    /// Probe for `http` and `https`.
    http: Arc<dyn Probe>,
    /// Probe for `ssh`.
    ssh: Arc<dyn Probe>,
}

impl Dispatcher {
    /// Creates a dispatcher from explicit probes.
    #[must_use]
    pub fn new(http: Arc<dyn Probe>, ssh: Arc<dyn Probe>) -> Self {
        Self { http, ssh }
    }

    /// Creates a dispatcher with the network probes.
    pub fn from_config(config: &ProbeConfig) -> Result<Self, ProbeError> {
        let http = HttpProbe::new(config.http_timeout)?;
        let ssh = SshProbe::new(config.ssh_auth.clone(), config.ssh_timeout);
        Ok(Self::new(Arc::new(http), Arc::new(ssh)))
    }

    /// Returns the probe for `scheme`, if there is one.
    #[must_use]
    pub fn strategy_for(&self, scheme: &Scheme) -> Option<&Arc<dyn Probe>> {
        match scheme {
            Scheme::Http | Scheme::Https => Some(&self.http),
            Scheme::Ssh => Some(&self.ssh),
            Scheme::Other(_) => None,
        }
    }

    /// Probes `raw_address` (`scheme://host[:port]`).
    ///
    /// Returns `Err(InvalidAddress)` without touching the network if the
    /// address does not parse. Schemes without a probe yield an
    /// `unreachable` / `not_implemented` status, also without I/O.
    pub async fn probe(&self, raw_address: &str) -> Result<Status, ProbeError> {
        let target = ProbeTarget::parse(raw_address)?;

        let Some(strategy) = self.strategy_for(target.scheme()) else {
            debug!(address = %target.raw(), scheme = %target.scheme(), "no probe for scheme");
            return Ok(Status::not_implemented());
        };

        let started = Instant::now();
        match strategy.probe(&target).await {
            Ok(status) => {
                info!(
                    address = %target.raw(),
                    probe = strategy.name(),
                    status = status.kind().as_str(),
                    reason = status.reason().unwrap_or(""),
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "probe finished"
                );
                Ok(status)
            }
            Err(e) => {
                error!(
                    address = %target.raw(),
                    probe = strategy.name(),
                    error = %e,
                    "probe failed unexpectedly"
                );
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;

    struct FixedProbe {
        calls: AtomicUsize,
        status: Status,
    }

    impl FixedProbe {
        fn new(status: Status) -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicUsize::new(0),
                status,
            })
        }
    }

    #[async_trait]
    impl Probe for FixedProbe {
        fn name(&self) -> &'static str {
            "fixed"
        }

        async fn probe(&self, _target: &ProbeTarget) -> Result<Status, ProbeError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.status.clone())
        }
    }

    #[tokio::test]
    async fn test_routes_http_and_https_to_http_probe() {
        let http = FixedProbe::new(Status::reachable());
        let ssh = FixedProbe::new(Status::unreachable("wrong probe"));
        let dispatcher = Dispatcher::new(http.clone(), ssh.clone());

        assert!(dispatcher.probe("http://a.example").await.is_ok());
        assert!(dispatcher.probe("HTTPS://b.example:8443").await.is_ok());

        assert_eq!(http.calls.load(Ordering::SeqCst), 2);
        assert_eq!(ssh.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_routes_ssh_to_ssh_probe() {
        let http = FixedProbe::new(Status::unreachable("wrong probe"));
        let ssh = FixedProbe::new(Status::reachable());
        let dispatcher = Dispatcher::new(http.clone(), ssh.clone());

        let status = dispatcher.probe("ssh://10.0.0.1").await;
        assert!(matches!(status, Ok(ref s) if s.is_reachable()));
        assert_eq!(ssh.calls.load(Ordering::SeqCst), 1);
        assert_eq!(http.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_invalid_address() {
        let http = FixedProbe::new(Status::reachable());
        let ssh = FixedProbe::new(Status::reachable());
        let dispatcher = Dispatcher::new(http.clone(), ssh.clone());

        for raw in ["", "no scheme here", "ssh:missing-slashes"] {
            assert!(matches!(
                dispatcher.probe(raw).await,
                Err(ProbeError::InvalidAddress(_))
            ));
        }
        assert_eq!(http.calls.load(Ordering::SeqCst), 0);
        assert_eq!(ssh.calls.load(Ordering::SeqCst), 0);
    }
}
