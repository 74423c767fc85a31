//! SSH reachability probe.
//!
//! Connects, completes the transport handshake and then (by default) offers
//! a password. Whatever happens, the connection is closed before the result
//! is returned. A server that rejects the password still counts as
//! reachable: it had to speak SSH to reject it.
//!
//! The network side sits behind [`SshTransport`] so the connection
//! lifecycle can be checked without a live server.

use std::net::{SocketAddr, TcpStream, ToSocketAddrs};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use ssh2::{ErrorCode, Session};
use tracing::{debug, warn};

use super::{Probe, ProbeError, Status};
use crate::endpoint::{ProbeTarget, SSH_DEFAULT_PORT};

/// Placeholder user offered when no credential is configured.
pub const DEFAULT_SSH_USERNAME: &str = "admin";

/// Placeholder password offered when no credential is configured.
pub const DEFAULT_SSH_PASSWORD: &str = "test";

/// Each blocking step is bounded by the timeout; connect, handshake and
/// authentication make three.
const DEADLINE_STEPS: u32 = 3;

// libssh2 session error codes.
const LIBSSH2_ERROR_TIMEOUT: i32 = -9;
const LIBSSH2_ERROR_PASSWORD_EXPIRED: i32 = -15;
const LIBSSH2_ERROR_METHOD_NONE: i32 = -17;
const LIBSSH2_ERROR_AUTHENTICATION_FAILED: i32 = -18;
const LIBSSH2_ERROR_METHOD_NOT_SUPPORTED: i32 = -33;

/// What the probe does once the transport handshake is done.
///
/// Probing only needs to know that something speaks SSH. The password
/// mode offers a credential that is expected to be refused; deployments
/// should configure one that is intentionally invalid.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SshAuth {
    /// Offer a username and password.
    Password { username: String, password: String },
    /// Stop after the handshake.
    BannerOnly,
}

impl Default for SshAuth {
    fn default() -> Self {
        Self::Password {
            username: DEFAULT_SSH_USERNAME.to_string(),
            password: DEFAULT_SSH_PASSWORD.to_string(),
        }
    }
}

impl SshAuth {
    /// Returns true when the built-in placeholder credential is in use.
    #[must_use]
    pub fn is_placeholder(&self) -> bool {
        matches!(
            self,
            Self::Password { username, password }
                if username == DEFAULT_SSH_USERNAME && password == DEFAULT_SSH_PASSWORD
        )
    }

    /// Returns the config name of this mode.
    #[must_use]
    pub fn mode_str(&self) -> &'static str {
        match self {
            Self::Password { .. } => "password",
            Self::BannerOnly => "banner",
        }
    }
}

/// Why an SSH attempt did not complete.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SshFailure {
    /// Host name did not resolve.
    #[error("failed to resolve {host}: {reason}")]
    Resolve { host: String, reason: String },

    /// TCP connection failed.
    #[error("connection to {addr} failed: {reason}")]
    Connect { addr: String, reason: String },

    /// A step did not finish in time.
    #[error("{step} timed out after {}s", .after.as_secs_f32())]
    Timeout { step: &'static str, after: Duration },

    /// Transport negotiation failed.
    #[error("SSH handshake failed: {0}")]
    Handshake(String),

    /// The server negotiated and then refused the credential.
    #[error("authentication rejected: {0}")]
    AuthRejected(String),

    /// Authentication broke off for another reason.
    #[error("authentication failed: {0}")]
    Auth(String),
}

impl SshFailure {
    /// Returns true if the server refused the credential.
    #[must_use]
    pub fn is_auth_rejected(&self) -> bool {
        matches!(self, Self::AuthRejected(_))
    }
}

/// An open, handshaken SSH connection.
pub trait SshConnection {
    /// Offers a password.
    fn authenticate_password(&mut self, username: &str, password: &str) -> Result<(), SshFailure>;

    /// Tears the connection down.
    fn close(&mut self);
}

/// Opens SSH connections.
pub trait SshTransport: Send + Sync + 'static {
    /// Connection type produced.
    type Connection: SshConnection;

    /// Connects to `host:port` and completes the transport handshake.
    fn connect(&self, host: &str, port: u16, timeout: Duration)
    -> Result<Self::Connection, SshFailure>;
}

/// Closes the wrapped connection when dropped, on every exit path.
struct ConnectionGuard<C: SshConnection> {
    connection: C,
}

impl<C: SshConnection> Drop for ConnectionGuard<C> {
    fn drop(&mut self) {
        self.connection.close();
    }
}

/// SSH probe over a given transport.
pub struct SshProbe<T: SshTransport = Ssh2Transport> {
    /// Connection factory.
    transport: Arc<T>,
    /// Post-handshake behavior.
    auth: SshAuth,
    /// Per-step timeout.
    timeout: Duration,
}

impl SshProbe<Ssh2Transport> {
    /// Creates a probe using libssh2.
    #[must_use]
    pub fn new(auth: SshAuth, timeout: Duration) -> Self {
        Self::with_transport(Ssh2Transport, auth, timeout)
    }
}

impl<T: SshTransport> SshProbe<T> {
    /// Creates a probe over `transport`.
    #[must_use]
    pub fn with_transport(transport: T, auth: SshAuth, timeout: Duration) -> Self {
        if auth.is_placeholder() {
            warn!(
                "SSH probe is using the placeholder credential {}/{}; configure an intentionally invalid one or use banner mode",
                DEFAULT_SSH_USERNAME, DEFAULT_SSH_PASSWORD
            );
        }
        Self {
            transport: Arc::new(transport),
            auth,
            timeout,
        }
    }

    /// Probes `host:port`.
    ///
    /// The blocking libssh2 work runs on the blocking pool. The call
    /// returns within a few timeouts even if a step hangs; the connection
    /// is still closed once the step returns.
    pub async fn probe_host(&self, host: &str, port: u16) -> Result<Status, ProbeError> {
        let transport = Arc::clone(&self.transport);
        let auth = self.auth.clone();
        let timeout = self.timeout;
        let owned_host = host.to_string();

        let task = tokio::task::spawn_blocking(move || {
            attempt(transport.as_ref(), &owned_host, port, &auth, timeout)
        });

        let deadline = timeout * DEADLINE_STEPS;
        let outcome = match tokio::time::timeout(deadline, task).await {
            Ok(Ok(outcome)) => outcome,
            Ok(Err(join_error)) => {
                return Err(ProbeError::Unexpected(format!(
                    "SSH probe of {}:{} aborted: {}",
                    host, port, join_error
                )));
            }
            Err(_) => Err(SshFailure::Timeout {
                step: "SSH probe",
                after: deadline,
            }),
        };

        Ok(classify_outcome(host, port, outcome))
    }
}

/// Runs one connect/handshake/auth attempt; the connection never outlives it.
fn attempt<T: SshTransport>(
    transport: &T,
    host: &str,
    port: u16,
    auth: &SshAuth,
    timeout: Duration,
) -> Result<(), SshFailure> {
    let mut guard = ConnectionGuard {
        connection: transport.connect(host, port, timeout)?,
    };

    match auth {
        SshAuth::BannerOnly => Ok(()),
        SshAuth::Password { username, password } => {
            guard.connection.authenticate_password(username, password)
        }
    }
}

/// Maps an attempt outcome to a [`Status`].
#[must_use]
pub fn classify_outcome(host: &str, port: u16, outcome: Result<(), SshFailure>) -> Status {
    match outcome {
        Ok(()) => {
            debug!(%host, port, "SSH probe completed");
            Status::reachable()
        }
        Err(failure) if failure.is_auth_rejected() => {
            debug!(%host, port, %failure, "SSH server rejected credential");
            Status::reachable()
        }
        Err(failure) => {
            debug!(%host, port, %failure, "SSH probe failed");
            Status::unreachable(failure.to_string())
        }
    }
}

#[async_trait]
impl<T: SshTransport> Probe for SshProbe<T> {
    fn name(&self) -> &'static str {
        "ssh"
    }

    async fn probe(&self, target: &ProbeTarget) -> Result<Status, ProbeError> {
        let port = target.port().unwrap_or(SSH_DEFAULT_PORT);
        self.probe_host(target.host(), port).await
    }
}

// ============================================================================
// libssh2 transport
// ============================================================================

/// [`SshTransport`] backed by libssh2.
#[derive(Debug, Clone, Copy, Default)]
pub struct Ssh2Transport;

/// A libssh2 session after a successful handshake.
pub struct Ssh2Connection {
    session: Session,
}

impl SshTransport for Ssh2Transport {
    type Connection = Ssh2Connection;

    fn connect(
        &self,
        host: &str,
        port: u16,
        timeout: Duration,
    ) -> Result<Self::Connection, SshFailure> {
        let addrs: Vec<SocketAddr> = (host, port)
            .to_socket_addrs()
            .map_err(|e| SshFailure::Resolve {
                host: host.to_string(),
                reason: e.to_string(),
            })?
            .collect();

        if addrs.is_empty() {
            return Err(SshFailure::Resolve {
                host: host.to_string(),
                reason: "no addresses found".to_string(),
            });
        }

        let stream = connect_any(&addrs, timeout)?;

        // Set read/write timeout
        let _ = stream.set_read_timeout(Some(timeout));
        let _ = stream.set_write_timeout(Some(timeout));

        let mut session =
            Session::new().map_err(|e| SshFailure::Handshake(e.message().to_string()))?;
        session.set_timeout(u32::try_from(timeout.as_millis()).unwrap_or(u32::MAX));
        session.set_tcp_stream(stream);

        session.handshake().map_err(|e| {
            if session_code(&e) == Some(LIBSSH2_ERROR_TIMEOUT) {
                SshFailure::Timeout {
                    step: "SSH handshake",
                    after: timeout,
                }
            } else {
                SshFailure::Handshake(e.message().to_string())
            }
        })?;

        Ok(Ssh2Connection { session })
    }
}

/// Tries each resolved address in turn.
fn connect_any(addrs: &[SocketAddr], timeout: Duration) -> Result<TcpStream, SshFailure> {
    let mut last_failure = None;

    for addr in addrs {
        match TcpStream::connect_timeout(addr, timeout) {
            Ok(stream) => return Ok(stream),
            Err(e) if e.kind() == std::io::ErrorKind::TimedOut => {
                last_failure = Some(SshFailure::Timeout {
                    step: "TCP connect",
                    after: timeout,
                });
            }
            Err(e) => {
                last_failure = Some(SshFailure::Connect {
                    addr: addr.to_string(),
                    reason: e.to_string(),
                });
            }
        }
    }

    Err(last_failure.unwrap_or_else(|| SshFailure::Resolve {
        host: String::new(),
        reason: "no addresses found".to_string(),
    }))
}

fn session_code(error: &ssh2::Error) -> Option<i32> {
    match error.code() {
        ErrorCode::Session(code) => Some(code),
        ErrorCode::SFTP(_) => None,
    }
}

/// Errors meaning the server took part in authentication and said no.
fn is_auth_rejection(code: i32) -> bool {
    matches!(
        code,
        LIBSSH2_ERROR_AUTHENTICATION_FAILED
            | LIBSSH2_ERROR_METHOD_NOT_SUPPORTED
            | LIBSSH2_ERROR_METHOD_NONE
            | LIBSSH2_ERROR_PASSWORD_EXPIRED
    )
}

impl SshConnection for Ssh2Connection {
    fn authenticate_password(&mut self, username: &str, password: &str) -> Result<(), SshFailure> {
        match self.session.userauth_password(username, password) {
            Ok(()) => Ok(()),
            Err(e) => match session_code(&e) {
                Some(code) if is_auth_rejection(code) => {
                    Err(SshFailure::AuthRejected(e.message().to_string()))
                }
                Some(LIBSSH2_ERROR_TIMEOUT) => Err(SshFailure::Timeout {
                    step: "SSH authentication",
                    after: Duration::from_millis(u64::from(self.session.timeout())),
                }),
                _ => Err(SshFailure::Auth(e.message().to_string())),
            },
        }
    }

    fn close(&mut self) {
        let _ = self.session.disconnect(None, "probe complete", None);
    }
}
