use std::error::Error as StdError;

use thiserror::Error;

use crate::ErrorKind;

/// A classified failure, detached from the crate that produced it.
///
/// This is what crosses the tool boundary: the kind, the provider's own text
/// where available, and the retry hints.
#[derive(Error, Debug)]
#[error("{kind}: {message}")]
pub struct Error {
    pub kind: ErrorKind,
    pub message: String,
    pub status: Option<u16>,
    pub retry_after_ms: Option<u64>,
    #[source]
    source: Option<Box<dyn StdError + Send + Sync>>,
}

impl Error {
    #[must_use]
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            status: None,
            retry_after_ms: None,
            source: None,
        }
    }

    #[must_use]
    pub fn message(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Internal, message)
    }

    #[must_use]
    pub fn with_status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }

    #[must_use]
    pub fn with_retry_after_ms(mut self, ms: u64) -> Self {
        self.retry_after_ms = Some(ms);
        self
    }

    #[must_use]
    pub fn with_source(mut self, source: impl StdError + Send + Sync + 'static) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    /// Classify any crate error that implements [`Classify`].
    #[must_use]
    pub fn classify<E: Classify + ?Sized>(err: &E) -> Self {
        Self {
            kind: err.kind(),
            message: err.to_string(),
            status: err.status(),
            retry_after_ms: err.retry_after_ms(),
            source: None,
        }
    }

    #[must_use]
    pub fn is_retryable(&self) -> bool {
        self.kind.is_retryable_status(self.status)
    }

    /// Render for a caller. The source chain is included only in debug mode.
    #[must_use]
    pub fn render(&self, debug: bool) -> String {
        let mut out = format!("{}: {}", self.kind, self.message);
        if let Some(ms) = self.retry_after_ms {
            out.push_str(&format!(" (retry after {ms} ms)"));
        }
        if debug {
            let mut source = StdError::source(self);
            while let Some(s) = source {
                out.push_str(&format!("\n  caused by: {s}"));
                source = s.source();
            }
        }
        out
    }
}

/// Implemented by every crate-level error so callers can classify failures
/// without knowing which crate raised them.
pub trait Classify: StdError {
    fn kind(&self) -> ErrorKind;

    fn status(&self) -> Option<u16> {
        None
    }

    fn retry_after_ms(&self) -> Option<u64> {
        None
    }
}

impl Classify for Error {
    fn kind(&self) -> ErrorKind {
        self.kind
    }

    fn status(&self) -> Option<u16> {
        self.status
    }

    fn retry_after_ms(&self) -> Option<u64> {
        self.retry_after_ms
    }
}

impl FromMessage for Error {
    fn from_message(message: String) -> Self {
        Self::message(message)
    }
}

pub type MeetbridgeError = Error;
pub type Result<T> = std::result::Result<T, Error>;

// ── Shared context trait ────────────────────────────────────────────────────

/// Trait for error types that can be constructed from a plain message string.
///
/// Implement this for your crate's error type, then invoke [`impl_context!`]
/// in your error module to get `.context()` and `.with_context()` on `Result`
/// and `Option`.
pub trait FromMessage: Sized {
    fn from_message(message: String) -> Self;
}

/// Generate a crate-local `Context` trait with `.context()` and `.with_context()`
/// methods on `Result` and `Option`.
///
/// Invoke inside a module that defines `Error: FromMessage` and
/// `type Result<T> = std::result::Result<T, Error>`.
///
/// ```ignore
/// // in crates/foo/src/error.rs
/// meetbridge_common::impl_context!();
/// ```
#[macro_export]
macro_rules! impl_context {
    () => {
        pub trait Context<T> {
            fn context(self, context: impl Into<String>) -> Result<T>;
            fn with_context<C, F>(self, f: F) -> Result<T>
            where
                C: Into<String>,
                F: FnOnce() -> C;
        }

        impl<T, E: std::fmt::Display> Context<T> for std::result::Result<T, E> {
            fn context(self, context: impl Into<String>) -> Result<T> {
                let ctx = context.into();
                self.map_err(|source| {
                    <Error as $crate::FromMessage>::from_message(format!("{ctx}: {source}"))
                })
            }

            fn with_context<C, F>(self, f: F) -> Result<T>
            where
                C: Into<String>,
                F: FnOnce() -> C,
            {
                self.map_err(|source| {
                    let ctx = f().into();
                    <Error as $crate::FromMessage>::from_message(format!("{ctx}: {source}"))
                })
            }
        }

        impl<T> Context<T> for Option<T> {
            fn context(self, context: impl Into<String>) -> Result<T> {
                self.ok_or_else(|| <Error as $crate::FromMessage>::from_message(context.into()))
            }

            fn with_context<C, F>(self, f: F) -> Result<T>
            where
                C: Into<String>,
                F: FnOnce() -> C,
            {
                self.ok_or_else(|| <Error as $crate::FromMessage>::from_message(f().into()))
            }
        }
    };
}
