//! Parsing of raw probe addresses.

use url::{Host, Url};

use super::descriptor::Scheme;

/// Errors raised while parsing a probe address.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TargetError {
    /// Nothing to parse.
    #[error("address is empty")]
    Empty,

    /// Not a well-formed `scheme://host[:port]` string.
    #[error("malformed address '{address}': {reason}")]
    Malformed { address: String, reason: String },

    /// Well-formed, but a probeable scheme without a host.
    #[error("address '{0}' has no host")]
    MissingHost(String),
}

/// A parsed probe address.
///
/// Keeps the original string (the HTTP probe requests exactly what the
/// caller asked for) next to the pieces the SSH probe needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeTarget {
    raw: String,
    scheme: Scheme,
    host: String,
    port: Option<u16>,
}

impl ProbeTarget {
    /// Parses `raw` as `scheme://host[:port]`.
    ///
    /// The scheme is matched case-insensitively. Unknown schemes parse
    /// successfully; whether they can be probed is decided later.
    pub fn parse(raw: &str) -> Result<Self, TargetError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(TargetError::Empty);
        }

        let url = Url::parse(trimmed).map_err(|e| TargetError::Malformed {
            address: trimmed.to_string(),
            reason: e.to_string(),
        })?;

        let scheme = Scheme::parse(url.scheme());
        let host = match url.host() {
            Some(Host::Domain(domain)) => domain.to_string(),
            Some(Host::Ipv4(addr)) => addr.to_string(),
            Some(Host::Ipv6(addr)) => addr.to_string(),
            None => String::new(),
        };

        if host.is_empty() && scheme.is_supported() {
            return Err(TargetError::MissingHost(trimmed.to_string()));
        }

        let port = scheme.resolve_port(url.port());

        Ok(Self {
            raw: trimmed.to_string(),
            scheme,
            host,
            port,
        })
    }

    /// Returns the address as given by the caller (trimmed).
    #[must_use]
    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// Returns the scheme.
    #[must_use]
    pub fn scheme(&self) -> &Scheme {
        &self.scheme
    }

    /// Returns the host, without IPv6 brackets.
    #[must_use]
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Returns the explicit port, else the scheme default.
    #[must_use]
    pub fn port(&self) -> Option<u16> {
        self.port
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_http() {
        let target = ProbeTarget::parse("https://example.com/health").unwrap();
        assert_eq!(target.scheme(), &Scheme::Https);
        assert_eq!(target.host(), "example.com");
        assert_eq!(target.port(), Some(443));
        assert_eq!(target.raw(), "https://example.com/health");
    }

    #[test]
    fn test_parse_ssh_default_port() {
        let target = ProbeTarget::parse("ssh://10.0.0.5").unwrap();
        assert_eq!(target.scheme(), &Scheme::Ssh);
        assert_eq!(target.host(), "10.0.0.5");
        assert_eq!(target.port(), Some(22));
    }

    #[test]
    fn test_parse_ssh_explicit_port() {
        let target = ProbeTarget::parse("SSH://host.local:2222").unwrap();
        assert_eq!(target.scheme(), &Scheme::Ssh);
        assert_eq!(target.host(), "host.local");
        assert_eq!(target.port(), Some(2222));
    }

    #[test]
    fn test_parse_ipv6_host_unbracketed() {
        let target = ProbeTarget::parse("ssh://[::1]:2200").unwrap();
        assert_eq!(target.host(), "::1");
        assert_eq!(target.port(), Some(2200));
    }

    #[test]
    fn test_parse_unknown_scheme() {
        let target = ProbeTarget::parse("ftp://files.example.com").unwrap();
        assert_eq!(target.scheme(), &Scheme::Other("ftp".to_string()));
        assert_eq!(target.port(), None);
    }

    #[test]
    fn test_parse_errors() {
        assert_eq!(ProbeTarget::parse(""), Err(TargetError::Empty));
        assert_eq!(ProbeTarget::parse("   "), Err(TargetError::Empty));
        assert!(matches!(
            ProbeTarget::parse("not a url"),
            Err(TargetError::Malformed { .. })
        ));
        assert!(matches!(
            ProbeTarget::parse("ssh:nohost"),
            Err(TargetError::MissingHost(_))
        ));
    }
}
