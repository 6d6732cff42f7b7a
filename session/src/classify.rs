//! Maps stream failures onto the categories the session and driver act on.

use crate::error::StreamError;
use crate::status::Code;
use std::fmt;

/// How a stream failure should be treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Failure {
    /// Orderly close by the peer. The driver reconnects.
    CleanEnd,
    /// Local or remote cancellation. The driver reconnects unless shutting down.
    Cancelled,
    /// Credentials were rejected. The driver stops.
    Unauthorized,
    /// Anything else. The driver reconnects.
    Transient,
}

impl Failure {
    pub fn is_retryable(self) -> bool {
        !matches!(self, Failure::Unauthorized)
    }
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Failure::CleanEnd => "clean-end",
            Failure::Cancelled => "cancelled",
            Failure::Unauthorized => "unauthorized",
            Failure::Transient => "transient",
        })
    }
}

pub fn classify(error: &StreamError) -> Failure {
    let status = match error {
        StreamError::EndOfStream => return Failure::CleanEnd,
        StreamError::Status(status) => status,
    };

    match status.code() {
        Code::Ok => Failure::CleanEnd,
        Code::Cancelled => Failure::Cancelled,
        Code::Unauthenticated | Code::PermissionDenied => Failure::Unauthorized,
        _ => Failure::Transient,
    }
}
