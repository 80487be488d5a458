use std::error::Error as StdError;

use meetbridge_common::{Classify, ErrorKind, FromMessage};

use crate::meta::ResponseMeta;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Caller-supplied arguments failed a shape or format check. Raised
    /// before any request is made.
    #[error("{0}")]
    Validation(String),

    #[error("preview features disabled: `{operation}` needs api.enable_preview = true")]
    PreviewDisabled { operation: String },

    #[error("{provider} returned {status}: {message}")]
    Provider {
        provider: String,
        status: u16,
        message: String,
        meta: ResponseMeta,
    },

    #[error("{provider} rate limited the request ({status}): {message}")]
    RateLimited {
        provider: String,
        status: u16,
        message: String,
        meta: ResponseMeta,
        /// Advised wait before retrying.
        retry_after_ms: Option<u64>,
    },

    /// No HTTP response at all.
    #[error("request to {provider} failed: {source}")]
    Transport {
        provider: String,
        #[source]
        source: reqwest::Error,
    },

    #[error(transparent)]
    Auth(#[from] meetbridge_oauth::Error),

    #[error("unexpected response shape for {operation}: {source}")]
    Decode {
        operation: String,
        /// The response whose body did not decode.
        meta: ResponseMeta,
        #[source]
        source: serde_json::Error,
    },

    #[error("{message}")]
    Message { message: String },

    #[error("{context}: {source}")]
    External {
        context: String,
        #[source]
        source: Box<dyn StdError + Send + Sync>,
    },
}

impl Error {
    #[must_use]
    pub fn message(message: impl Into<String>) -> Self {
        Self::Message {
            message: message.into(),
        }
    }

    #[must_use]
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    #[must_use]
    pub fn external<E>(context: impl Into<String>, source: E) -> Self
    where
        E: StdError + Send + Sync + 'static,
    {
        Self::External {
            context: context.into(),
            source: Box::new(source),
        }
    }

    /// HTTP status of the provider response this error came from.
    #[must_use]
    pub fn http_status(&self) -> Option<u16> {
        match self {
            Self::Provider { status, .. } | Self::RateLimited { status, .. } => Some(*status),
            Self::Decode { meta, .. } => Some(meta.status),
            _ => None,
        }
    }

    /// Response headers of interest, when there was a response.
    #[must_use]
    pub fn meta(&self) -> Option<&ResponseMeta> {
        match self {
            Self::Provider { meta, .. }
            | Self::RateLimited { meta, .. }
            | Self::Decode { meta, .. } => Some(meta),
            _ => None,
        }
    }

    /// Whether the request left the process. Local rejections never do.
    #[must_use]
    pub fn reached_network(&self) -> bool {
        !matches!(
            self,
            Self::Validation(_) | Self::PreviewDisabled { .. } | Self::Auth(_)
        )
    }

    /// Attach an advised retry delay to a rate-limit error.
    #[must_use]
    pub fn with_retry_after_ms(self, ms: u64) -> Self {
        match self {
            Self::RateLimited {
                provider,
                status,
                message,
                meta,
                ..
            } => Self::RateLimited {
                provider,
                status,
                message,
                meta,
                retry_after_ms: Some(ms),
            },
            other => other,
        }
    }
}

impl Classify for Error {
    fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation(_) => ErrorKind::Validation,
            Self::PreviewDisabled { .. } => ErrorKind::Configuration,
            Self::Provider { .. } | Self::Decode { .. } => ErrorKind::Provider,
            Self::RateLimited { .. } => ErrorKind::RateLimit,
            Self::Transport { .. } => ErrorKind::Transport,
            Self::Auth(e) => e.kind(),
            Self::Message { .. } | Self::External { .. } => ErrorKind::Internal,
        }
    }

    fn status(&self) -> Option<u16> {
        match self {
            Self::Auth(e) => e.status(),
            other => other.http_status(),
        }
    }

    fn retry_after_ms(&self) -> Option<u64> {
        match self {
            Self::RateLimited { retry_after_ms, .. } => *retry_after_ms,
            _ => None,
        }
    }
}

impl FromMessage for Error {
    fn from_message(message: String) -> Self {
        Self::Message { message }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

meetbridge_common::impl_context!();
