//! Error types for stream sessions and the reconnect driver.

use crate::status::Status;

/// Result type for driver operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Failure reported by a transport for a single stream operation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StreamError {
    /// The peer closed the stream in an orderly way.
    #[error("end of stream")]
    EndOfStream,
    #[error("{0}")]
    Status(#[from] Status),
}

impl StreamError {
    pub fn status(&self) -> Option<&Status> {
        match self {
            StreamError::EndOfStream => None,
            StreamError::Status(status) => Some(status),
        }
    }
}

/// The system randomness source could not provide bytes for an identifier.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("entropy source failed: {0}")]
pub struct EntropyError(String);

impl EntropyError {
    pub fn new(reason: impl Into<String>) -> Self {
        Self(reason.into())
    }
}

/// Reasons a driver stops reconnecting and gives up.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    /// The server rejected the credentials. Retrying would fail the same way.
    #[error("unauthorized: {0}")]
    Unauthorized(StreamError),
    /// The final close of a bounded send-only stream failed.
    #[error("final close failed: {0}")]
    Fatal(StreamError),
}
