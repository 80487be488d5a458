use std::error::Error as StdError;

use meetbridge_common::{Classify, ErrorKind, FromMessage};

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] meetbridge_config::Error),

    /// The client credential file exists but has no usable client section.
    #[error("invalid credential file {path}: {reason}")]
    CredentialFile { path: String, reason: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Http(#[from] reqwest::Error),

    /// The token endpoint answered with a non-success status.
    #[error("token endpoint returned {status}: {message}")]
    TokenEndpoint { status: u16, message: String },

    #[error("callback port {port} is already in use")]
    PortInUse {
        port: u16,
        #[source]
        source: std::io::Error,
    },

    #[error("authorization callback reported an error: {0}")]
    CallbackRejected(String),

    #[error("no authorization callback within {secs}s")]
    CallbackTimeout { secs: u64 },

    /// Refresh and the interactive flow both failed; an operator has to act.
    #[error("authentication failed, rerun setup (`meetbridge auth`): {reason}")]
    SetupRequired { reason: String },

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
    pub fn external<E>(context: impl Into<String>, source: E) -> Self
    where
        E: StdError + Send + Sync + 'static,
    {
        Self::External {
            context: context.into(),
            source: Box::new(source),
        }
    }

    pub(crate) fn credential_file(path: &std::path::Path, reason: impl Into<String>) -> Self {
        Self::CredentialFile {
            path: path.display().to_string(),
            reason: reason.into(),
        }
    }
}

impl Classify for Error {
    fn kind(&self) -> ErrorKind {
        match self {
            Self::Config(_) | Self::CredentialFile { .. } => ErrorKind::Configuration,
            Self::Http(e) if e.status().is_none() => ErrorKind::Transport,
            Self::Io(_) | Self::Json(_) | Self::Message { .. } | Self::External { .. } => {
                ErrorKind::Internal
            },
            Self::Http(_)
            | Self::TokenEndpoint { .. }
            | Self::PortInUse { .. }
            | Self::CallbackRejected(_)
            | Self::CallbackTimeout { .. }
            | Self::SetupRequired { .. } => ErrorKind::Authentication,
        }
    }

    fn status(&self) -> Option<u16> {
        match self {
            Self::TokenEndpoint { status, .. } => Some(*status),
            Self::Http(e) => e.status().map(|s| s.as_u16()),
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
