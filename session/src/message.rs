//! Messages exchanged over a stream. Both directions carry a single text
//! value, in practice an [`Identifier`](crate::Identifier).

use std::fmt;

/// A stream payload with a single text value.
pub trait Message: fmt::Debug + Send + 'static {
    fn with_value(value: String) -> Self
    where
        Self: Sized;

    fn value(&self) -> &str;
}

/// Client to server payload.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct Request {
    value: String,
}

impl Request {
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
        }
    }

    pub fn into_value(self) -> String {
        self.value
    }
}

impl Message for Request {
    fn with_value(value: String) -> Self {
        Self { value }
    }

    fn value(&self) -> &str {
        &self.value
    }
}

/// Server to client payload.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct Response {
    value: String,
}

impl Response {
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
        }
    }

    pub fn into_value(self) -> String {
        self.value
    }
}

impl Message for Response {
    fn with_value(value: String) -> Self {
        Self { value }
    }

    fn value(&self) -> &str {
        &self.value
    }
}
