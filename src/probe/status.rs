//! Normalized probe result.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Reason reported for schemes without a probe.
pub const NOT_IMPLEMENTED: &str = "not_implemented";

/// Result of probing an endpoint, independent of the protocol used.
///
/// Serializes as `{"status": "reachable" | "unreachable" | "actively_blocked", ...}`.
/// `Unreachable` always carries a reason; `Reachable` may.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(
    tag = "status",
    rename_all = "snake_case",
    rename_all_fields = "camelCase"
)]
pub enum Status {
    /// Something answered speaking the expected protocol.
    Reachable {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        reason: Option<String>,
        /// Free-form diagnostics such as a raw response body.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        additional_data: Option<Value>,
    },
    /// Nothing usable answered.
    Unreachable {
        reason: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        additional_data: Option<Value>,
    },
    /// A firewall or reset actively refused the probe.
    ///
    /// No probe produces this yet; consumers still have to handle it.
    ActivelyBlocked,
}

/// Discriminant of a [`Status`], for comparing classifications.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatusKind {
    Reachable,
    Unreachable,
    ActivelyBlocked,
}

impl StatusKind {
    /// Returns the wire name.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Reachable => "reachable",
            Self::Unreachable => "unreachable",
            Self::ActivelyBlocked => "actively_blocked",
        }
    }
}

impl Status {
    /// Reachable with no further detail.
    #[must_use]
    pub fn reachable() -> Self {
        Self::Reachable {
            reason: None,
            additional_data: None,
        }
    }

    /// Reachable, with the reason it was still counted as such.
    #[must_use]
    pub fn reachable_because(reason: impl Into<String>, additional_data: Option<Value>) -> Self {
        Self::Reachable {
            reason: Some(reason.into()),
            additional_data,
        }
    }

    /// Unreachable for `reason`.
    #[must_use]
    pub fn unreachable(reason: impl Into<String>) -> Self {
        Self::Unreachable {
            reason: reason.into(),
            additional_data: None,
        }
    }

    /// Unreachable for `reason`, with diagnostics.
    #[must_use]
    pub fn unreachable_with(reason: impl Into<String>, additional_data: Value) -> Self {
        Self::Unreachable {
            reason: reason.into(),
            additional_data: Some(additional_data),
        }
    }

    /// The status for schemes nothing can probe.
    #[must_use]
    pub fn not_implemented() -> Self {
        Self::unreachable(NOT_IMPLEMENTED)
    }

    /// Returns the discriminant.
    #[must_use]
    pub fn kind(&self) -> StatusKind {
        match self {
            Self::Reachable { .. } => StatusKind::Reachable,
            Self::Unreachable { .. } => StatusKind::Unreachable,
            Self::ActivelyBlocked => StatusKind::ActivelyBlocked,
        }
    }

    /// Returns true if the endpoint answered.
    #[must_use]
    pub fn is_reachable(&self) -> bool {
        self.kind() == StatusKind::Reachable
    }

    /// Returns the reason, if any.
    #[must_use]
    pub fn reason(&self) -> Option<&str> {
        match self {
            Self::Reachable { reason, .. } => reason.as_deref(),
            Self::Unreachable { reason, .. } => Some(reason),
            Self::ActivelyBlocked => None,
        }
    }

    /// Returns the diagnostic payload, if any.
    #[must_use]
    pub fn additional_data(&self) -> Option<&Value> {
        match self {
            Self::Reachable {
                additional_data, ..
            }
            | Self::Unreachable {
                additional_data, ..
            } => additional_data.as_ref(),
            Self::ActivelyBlocked => None,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_reachable_serializes_bare() {
        let value = serde_json::to_value(Status::reachable()).unwrap();
        assert_eq!(value, json!({ "status": "reachable" }));
    }

    #[test]
    fn test_unreachable_serializes_camel_case() {
        let status = Status::unreachable_with("Internal Server Error", json!("boom"));
        let value = serde_json::to_value(status).unwrap();
        assert_eq!(
            value,
            json!({
                "status": "unreachable",
                "reason": "Internal Server Error",
                "additionalData": "boom"
            })
        );
    }

    #[test]
    fn test_actively_blocked_has_no_payload() {
        let value = serde_json::to_value(Status::ActivelyBlocked).unwrap();
        assert_eq!(value, json!({ "status": "actively_blocked" }));
        assert_eq!(Status::ActivelyBlocked.reason(), None);
    }

    #[test]
    fn test_unreachable_requires_reason_on_decode() {
        let result: Result<Status, _> = serde_json::from_value(json!({ "status": "unreachable" }));
        assert!(result.is_err());

        let status: Status = serde_json::from_value(json!({ "status": "reachable" })).unwrap();
        assert_eq!(status, Status::reachable());
    }

    #[test]
    fn test_not_implemented() {
        let status = Status::not_implemented();
        assert_eq!(status.kind(), StatusKind::Unreachable);
        assert_eq!(status.reason(), Some(NOT_IMPLEMENTED));
    }
}
