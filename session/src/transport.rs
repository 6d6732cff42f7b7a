//! Transport abstraction for stream sessions.
//!
//! A session never talks to an RPC library directly. It drives an
//! [`Outbound`] half for sending and an [`Inbound`] half for receiving,
//! and a [`Transport`] opens those halves for each stream shape:
//! - duplex: both halves
//! - send-only: an outbound half whose close yields one final response
//! - receive-only: an inbound half opened with one initial request
//! - single call: one request, one response
//!
//! Failures are reported as [`StreamError`] so classification stays
//! independent of the transport.

use crate::error::StreamError;
use crate::message::{Message, Request, Response};
use crate::status::Status;
use std::future::Future;
use std::marker::PhantomData;

/// Metadata key carrying credentials.
pub const AUTHORIZATION: &str = "authorization";

/// The sending half of a stream.
pub trait Outbound: Send + 'static {
    type Message: Message;
    /// Final response delivered when the half is closed, if the stream
    /// shape has one.
    type Ack: Message;

    fn send(
        &mut self,
        message: Self::Message,
    ) -> impl Future<Output = Result<(), StreamError>> + Send;

    /// Half-close the stream. Send-only streams return the peer's final
    /// response here. Calling this more than once is a no-op.
    fn finish(&mut self) -> impl Future<Output = Result<Option<Self::Ack>, StreamError>> + Send;
}

/// The receiving half of a stream.
pub trait Inbound: Send + 'static {
    type Message: Message;

    /// Wait for the next message. An orderly close by the peer is reported
    /// as [`StreamError::EndOfStream`].
    fn receive(&mut self) -> impl Future<Output = Result<Self::Message, StreamError>> + Send;
}

/// Stand-in for the half a stream shape does not have.
///
/// Sending through it fails, closing it succeeds with no response, and
/// receiving from it never completes.
pub struct Absent<M, A = M>(PhantomData<fn() -> (M, A)>);

impl<M, A> Absent<M, A> {
    pub fn new() -> Self {
        Self(PhantomData)
    }
}

impl<M, A> Default for Absent<M, A> {
    fn default() -> Self {
        Self::new()
    }
}

impl<M: Message, A: Message> Outbound for Absent<M, A> {
    type Message = M;
    type Ack = A;

    async fn send(&mut self, _message: M) -> Result<(), StreamError> {
        Err(Status::unimplemented("stream has no sending half").into())
    }

    async fn finish(&mut self) -> Result<Option<A>, StreamError> {
        Ok(None)
    }
}

impl<M: Message, A: Send + 'static> Inbound for Absent<M, A> {
    type Message = M;

    fn receive(&mut self) -> impl Future<Output = Result<M, StreamError>> + Send {
        std::future::pending()
    }
}

/// Metadata attached to every stream open.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuthContext {
    metadata: Vec<(String, String)>,
}

impl AuthContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Credentials in the `<scheme> <token>` form, for example
    /// `bearer secret`.
    pub fn authorization(scheme: &str, token: &str) -> Self {
        Self::new().with(AUTHORIZATION, format!("{scheme} {token}"))
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.push((key.into(), value.into()));
        self
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.metadata
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.metadata.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

/// Produces a fresh [`AuthContext`] for each open attempt.
pub trait AuthProvider: Send + Sync + 'static {
    fn auth_context(&self) -> AuthContext;
}

impl<F> AuthProvider for F
where
    F: Fn() -> AuthContext + Send + Sync + 'static,
{
    fn auth_context(&self) -> AuthContext {
        self()
    }
}

/// Opens streams of every shape against one endpoint.
pub trait Transport: Send + Sync + 'static {
    type DuplexOutbound: Outbound<Message = Request, Ack = Response>;
    type DuplexInbound: Inbound<Message = Response>;
    type SendStream: Outbound<Message = Request, Ack = Response>;
    type ReceiveStream: Inbound<Message = Response>;

    fn open_duplex_stream(
        &self,
        auth: AuthContext,
    ) -> impl Future<Output = Result<(Self::DuplexOutbound, Self::DuplexInbound), StreamError>> + Send;

    fn open_send_stream(
        &self,
        auth: AuthContext,
    ) -> impl Future<Output = Result<Self::SendStream, StreamError>> + Send;

    fn open_receive_stream(
        &self,
        auth: AuthContext,
        initial: Request,
    ) -> impl Future<Output = Result<Self::ReceiveStream, StreamError>> + Send;

    fn call(
        &self,
        auth: AuthContext,
        request: Request,
    ) -> impl Future<Output = Result<Response, StreamError>> + Send;
}
