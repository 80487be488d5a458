//! Classification shared by every error that can reach a tool caller.

use serde::{Deserialize, Serialize};

/// Status code recorded for calls that never produced an HTTP response
/// (connection reset, DNS failure, timeout before headers).
pub const NO_RESPONSE_STATUS: u16 = 0;

/// The failure classes a caller can observe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Missing or malformed credential source. Fatal at startup.
    Configuration,
    /// Refresh or interactive authorization failed; operator action needed.
    Authentication,
    /// Caller-supplied arguments failed shape or format checks.
    Validation,
    /// HTTP 429 or an exhausted quota signal.
    RateLimit,
    /// Non-2xx answer from the remote service.
    Provider,
    /// No response at all.
    Transport,
    /// Anything else (serialization bugs, I/O on local files).
    Internal,
}

impl ErrorKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Configuration => "configuration_error",
            Self::Authentication => "authentication_error",
            Self::Validation => "validation_error",
            Self::RateLimit => "rate_limit_error",
            Self::Provider => "provider_error",
            Self::Transport => "transport_error",
            Self::Internal => "internal_error",
        }
    }

    /// Whether a caller may retry after this kind of failure.
    ///
    /// Provider errors are only retryable for server-class statuses, which
    /// requires the status; use [`ErrorKind::is_retryable_status`] for those.
    #[must_use]
    pub fn is_retryable(self) -> bool {
        matches!(self, Self::RateLimit | Self::Transport)
    }

    #[must_use]
    pub fn is_retryable_status(self, status: Option<u16>) -> bool {
        match self {
            Self::Provider => status.is_some_and(|s| s >= 500),
            other => other.is_retryable(),
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
