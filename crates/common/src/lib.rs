//! Shared error taxonomy and helpers used across all meetbridge crates.

pub mod error;
pub mod kind;

pub use {
    error::{Classify, Error, FromMessage, MeetbridgeError, Result},
    kind::{ErrorKind, NO_RESPONSE_STATUS},
};
