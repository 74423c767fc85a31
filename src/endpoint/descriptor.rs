//! Endpoint descriptor types.
//!
//! An endpoint is what an operator keeps in their list: an optional label,
//! a host, the protocol to speak and an optional port. All scheme to
//! default-port knowledge lives here so probes never have to guess.

use std::fmt;
use std::net::Ipv6Addr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Default port for plain HTTP.
pub const HTTP_DEFAULT_PORT: u16 = 80;

/// Default port for HTTPS.
pub const HTTPS_DEFAULT_PORT: u16 = 443;

/// Default port for SSH.
pub const SSH_DEFAULT_PORT: u16 = 22;

/// Protocol scheme of an endpoint.
///
/// Unrecognized schemes are kept as [`Scheme::Other`] instead of being
/// rejected; probing them yields a `not_implemented` status.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub enum Scheme {
    /// Plain HTTP.
    Http,
    /// HTTP over TLS.
    #[default]
    Https,
    /// Secure shell.
    Ssh,
    /// Anything else, lowercased.
    Other(String),
}

impl Scheme {
    /// Parses a scheme name, case-insensitively.
    ///
    /// A trailing `:` (as in `Url::scheme` style `ssh:`) is tolerated.
    #[must_use]
    pub fn parse(value: &str) -> Self {
        let value = value.trim().trim_end_matches(':').to_lowercase();
        match value.as_str() {
            "http" => Self::Http,
            "https" => Self::Https,
            "ssh" => Self::Ssh,
            _ => Self::Other(value),
        }
    }

    /// Returns the scheme name as it appears in a URL.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Http => "http",
            Self::Https => "https",
            Self::Ssh => "ssh",
            Self::Other(name) => name,
        }
    }

    /// Returns the conventional port for this scheme, if there is one.
    #[must_use]
    pub fn default_port(&self) -> Option<u16> {
        match self {
            Self::Http => Some(HTTP_DEFAULT_PORT),
            Self::Https => Some(HTTPS_DEFAULT_PORT),
            Self::Ssh => Some(SSH_DEFAULT_PORT),
            Self::Other(_) => None,
        }
    }

    /// Returns true for schemes that have a probe.
    #[must_use]
    pub fn is_supported(&self) -> bool {
        !matches!(self, Self::Other(_))
    }

    /// Returns `explicit` if set, else the conventional port.
    #[must_use]
    pub fn resolve_port(&self, explicit: Option<u16>) -> Option<u16> {
        explicit.or_else(|| self.default_port())
    }
}

impl fmt::Display for Scheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for Scheme {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Scheme {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = String::deserialize(deserializer)?;
        Ok(Self::parse(&value))
    }
}

/// Errors raised while validating endpoint input.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DescriptorError {
    /// Address was empty.
    #[error("address must not be empty")]
    MissingAddress,

    /// Port did not parse or was zero.
    #[error("invalid port: {0}")]
    InvalidPort(String),
}

/// An endpoint in the operator's list.
///
/// Field names on the wire match the list format used by the web UI
/// (`ipAddress`, `format`), so lists can move between the two.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct EndpointDescriptor {
    /// Display label, not required to be unique.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Host name or IP address.
    #[serde(rename = "ipAddress", default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    /// Protocol to probe with.
    #[serde(rename = "format", default)]
    pub scheme: Scheme,
    /// Explicit port, if any.
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "deserialize_port"
    )]
    pub port: Option<u16>,
}

impl EndpointDescriptor {
    /// Creates a descriptor for `address` using `scheme` and its default port.
    #[must_use]
    pub fn new(scheme: Scheme, address: impl Into<String>) -> Self {
        Self {
            name: None,
            address: Some(address.into()),
            scheme,
            port: None,
        }
    }

    /// Sets the display name.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Sets an explicit port.
    #[must_use]
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    /// Builds a descriptor from loosely typed text fields, as produced by
    /// an import or a form.
    ///
    /// Blank fields are treated as absent.
    pub fn from_fields(
        name: &str,
        address: &str,
        scheme: &str,
        port: &str,
    ) -> Result<Self, DescriptorError> {
        let address = address.trim();
        if address.is_empty() {
            return Err(DescriptorError::MissingAddress);
        }

        Ok(Self {
            name: non_blank(name),
            address: Some(address.to_string()),
            scheme: Scheme::parse(scheme),
            port: parse_port(port)?,
        })
    }

    /// Returns true when there is enough to probe (an address).
    ///
    /// Descriptors that are still being filled in are idle.
    #[must_use]
    pub fn is_probeable(&self) -> bool {
        self.address.as_deref().is_some_and(|a| !a.trim().is_empty())
    }

    /// Returns the URL handed to the status query, `scheme://address[:port]`.
    ///
    /// The port is only included when explicitly set.
    #[must_use]
    pub fn query_url(&self) -> Option<String> {
        if !self.is_probeable() {
            return None;
        }
        let address = self.address.as_deref().unwrap_or_default().trim();

        // IPv6 literals need brackets to be read back as a host.
        let host = match address.parse::<Ipv6Addr>() {
            Ok(_) => format!("[{}]", address),
            Err(_) => address.to_string(),
        };

        Some(match self.port {
            Some(port) => format!("{}://{}:{}", self.scheme, host, port),
            None => format!("{}://{}", self.scheme, host),
        })
    }

    /// Returns the name to show for this endpoint.
    #[must_use]
    pub fn display_name(&self) -> &str {
        self.name
            .as_deref()
            .filter(|n| !n.is_empty())
            .or(self.address.as_deref())
            .unwrap_or("(unnamed)")
    }
}

fn non_blank(value: &str) -> Option<String> {
    let value = value.trim();
    (!value.is_empty()).then(|| value.to_string())
}

/// Parses a port field; blank means "use the default".
pub fn parse_port(value: &str) -> Result<Option<u16>, DescriptorError> {
    let value = value.trim();
    if value.is_empty() {
        return Ok(None);
    }
    match value.parse::<u16>() {
        Ok(0) | Err(_) => Err(DescriptorError::InvalidPort(value.to_string())),
        Ok(port) => Ok(Some(port)),
    }
}

/// Lists written by the web UI store the port as either a number or a string.
fn deserialize_port<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<u16>, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawPort {
        Number(u16),
        Text(String),
    }

    match Option::<RawPort>::deserialize(deserializer)? {
        None => Ok(None),
        Some(RawPort::Number(0)) => Err(serde::de::Error::custom("port must be non-zero")),
        Some(RawPort::Number(port)) => Ok(Some(port)),
        Some(RawPort::Text(text)) => parse_port(&text).map_err(serde::de::Error::custom),
    }
}
