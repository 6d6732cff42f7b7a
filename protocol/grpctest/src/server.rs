//! Server side stream halves.
//!
//! A handler hands the client's request stream to a session as a
//! [`RequestStream`], and returns the receiving end of a
//! [`response_channel`] as its response stream while the session writes
//! into the [`ResponseSink`].

use crate::convert::stream_error;
use crate::proto;
use grpctest_session::{Inbound, Outbound, Request, Response, Status, StreamError};
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;

/// Response stream type returned from streaming handlers.
pub type ResponseOutput = ReceiverStream<Result<proto::Response, tonic::Status>>;

/// Create a single-slot response channel.
pub fn response_channel() -> (ResponseSink, ResponseOutput) {
    let (responses, stream) = mpsc::channel(1);
    (
        ResponseSink {
            responses: Some(responses),
        },
        ReceiverStream::new(stream),
    )
}

/// Writes responses to a client. Sending fails once the client has gone
/// away and tonic has dropped the response stream.
pub struct ResponseSink {
    responses: Option<mpsc::Sender<Result<proto::Response, tonic::Status>>>,
}

impl ResponseSink {
    /// A handle that can still end the response stream with an error after
    /// the sink itself is finished. The stream stays open until both are
    /// dropped.
    pub fn closer(&self) -> ResponseCloser {
        ResponseCloser {
            responses: self.responses.clone(),
        }
    }
}

/// Ends a response stream with an error status instead of OK.
pub struct ResponseCloser {
    responses: Option<mpsc::Sender<Result<proto::Response, tonic::Status>>>,
}

impl ResponseCloser {
    pub async fn fail(self, status: tonic::Status) {
        if let Some(responses) = self.responses {
            let _ = responses.send(Err(status)).await;
        }
    }
}

impl Outbound for ResponseSink {
    type Message = Response;
    type Ack = Request;

    async fn send(&mut self, message: Response) -> Result<(), StreamError> {
        let Some(responses) = self.responses.as_ref() else {
            return Err(Status::cancelled("response stream already closed").into());
        };
        responses
            .send(Ok(message.into()))
            .await
            .map_err(|_| Status::cancelled("client went away").into())
    }

    async fn finish(&mut self) -> Result<Option<Request>, StreamError> {
        self.responses.take();
        Ok(None)
    }
}

/// The client's request stream.
pub struct RequestStream {
    inner: tonic::Streaming<proto::Request>,
}

impl RequestStream {
    pub fn new(inner: tonic::Streaming<proto::Request>) -> Self {
        Self { inner }
    }
}

impl Inbound for RequestStream {
    type Message = Request;

    async fn receive(&mut self) -> Result<Request, StreamError> {
        match self.inner.message().await {
            Ok(Some(request)) => Ok(request.into()),
            Ok(None) => Err(StreamError::EndOfStream),
            Err(status) => Err(stream_error(&status)),
        }
    }
}
