//! Client side: a [`Transport`] over a lazily connected tonic channel.
//!
//! The channel dials on first use and redials after connection loss, so a
//! failed open is an ordinary retryable error rather than a fatal one.

use crate::auth::authorized;
use crate::convert::stream_error;
use crate::proto;
use crate::proto::grpc_test_client::GrpcTestClient;
use grpctest_session::{
    AuthContext, Inbound, Outbound, Request, Response, Status, StreamError, Transport,
};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_stream::wrappers::ReceiverStream;
use tonic::transport::{Channel, Endpoint};

/// Interval between HTTP/2 pings on an idle connection.
pub const IDLE_PING: Duration = Duration::from_secs(10);

/// How long to wait for a ping acknowledgement before closing.
pub const IDLE_PING_TIMEOUT: Duration = Duration::from_secs(5);

/// HTTP/2 keepalive settings for the channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Keepalive {
    pub interval: Duration,
    pub timeout: Duration,
}

impl Default for Keepalive {
    fn default() -> Self {
        Self {
            interval: IDLE_PING,
            timeout: IDLE_PING_TIMEOUT,
        }
    }
}

#[derive(Debug, Clone)]
pub struct GrpcTransport {
    client: GrpcTestClient<Channel>,
}

impl GrpcTransport {
    pub fn new(channel: Channel) -> Self {
        Self {
            client: GrpcTestClient::new(channel),
        }
    }

    /// Build a transport for `uri` without dialing. Fails only if the URI
    /// is malformed.
    pub fn connect_lazy(uri: String, keepalive: Keepalive) -> Result<Self, tonic::transport::Error> {
        let channel = Endpoint::from_shared(uri)?
            .http2_keep_alive_interval(keepalive.interval)
            .keep_alive_timeout(keepalive.timeout)
            .keep_alive_while_idle(true)
            .connect_lazy();
        Ok(Self::new(channel))
    }
}

impl Transport for GrpcTransport {
    type DuplexOutbound = RequestSender;
    type DuplexInbound = ResponseStream;
    type SendStream = ClientStream;
    type ReceiveStream = ResponseStream;

    async fn open_duplex_stream(
        &self,
        auth: AuthContext,
    ) -> Result<(RequestSender, ResponseStream), StreamError> {
        let (requests, outgoing) = mpsc::channel(1);
        let mut client = self.client.clone();
        let response = client
            .bi_directional_stream(authorized(ReceiverStream::new(outgoing), &auth))
            .await
            .map_err(|status| stream_error(&status))?;
        Ok((
            RequestSender::new(requests),
            ResponseStream::new(response.into_inner()),
        ))
    }

    async fn open_send_stream(&self, auth: AuthContext) -> Result<ClientStream, StreamError> {
        let (requests, outgoing) = mpsc::channel(1);
        let mut client = self.client.clone();
        let request = authorized(ReceiverStream::new(outgoing), &auth);
        let call = tokio::spawn(async move {
            client
                .client_stream(request)
                .await
                .map(tonic::Response::into_inner)
        });
        Ok(ClientStream {
            sender: RequestSender::new(requests),
            call: Some(call),
        })
    }

    async fn open_receive_stream(
        &self,
        auth: AuthContext,
        initial: Request,
    ) -> Result<ResponseStream, StreamError> {
        let mut client = self.client.clone();
        let response = client
            .server_stream(authorized(proto::Request::from(initial), &auth))
            .await
            .map_err(|status| stream_error(&status))?;
        Ok(ResponseStream::new(response.into_inner()))
    }

    async fn call(&self, auth: AuthContext, request: Request) -> Result<Response, StreamError> {
        let mut client = self.client.clone();
        let response = client
            .unary(authorized(proto::Request::from(request), &auth))
            .await
            .map_err(|status| stream_error(&status))?;
        Ok(response.into_inner().into())
    }
}

/// Sending half of a request stream. Finishing drops the channel, which
/// ends the request stream on the wire.
pub struct RequestSender {
    requests: Option<mpsc::Sender<proto::Request>>,
}

impl RequestSender {
    fn new(requests: mpsc::Sender<proto::Request>) -> Self {
        Self {
            requests: Some(requests),
        }
    }
}

impl Outbound for RequestSender {
    type Message = Request;
    type Ack = Response;

    async fn send(&mut self, message: Request) -> Result<(), StreamError> {
        let Some(requests) = self.requests.as_ref() else {
            return Err(Status::unavailable("request stream already closed").into());
        };
        requests
            .send(message.into())
            .await
            .map_err(|_| Status::unavailable("request stream closed by transport").into())
    }

    async fn finish(&mut self) -> Result<Option<Response>, StreamError> {
        self.requests.take();
        Ok(None)
    }
}

/// Receiving half of a response stream.
pub struct ResponseStream {
    inner: tonic::Streaming<proto::Response>,
}

impl ResponseStream {
    fn new(inner: tonic::Streaming<proto::Response>) -> Self {
        Self { inner }
    }
}

impl Inbound for ResponseStream {
    type Message = Response;

    async fn receive(&mut self) -> Result<Response, StreamError> {
        match self.inner.message().await {
            Ok(Some(response)) => Ok(response.into()),
            Ok(None) => Err(StreamError::EndOfStream),
            Err(status) => Err(stream_error(&status)),
        }
    }
}

type PendingCall = JoinHandle<Result<proto::Response, tonic::Status>>;

/// A client-streaming call: requests go out through the sender, and the
/// single response comes back when the request stream is closed.
pub struct ClientStream {
    sender: RequestSender,
    call: Option<PendingCall>,
}

impl ClientStream {
    /// Wait for the call to complete and report how it ended.
    async fn outcome(&mut self) -> Result<Option<Response>, StreamError> {
        let Some(call) = self.call.take() else {
            return Ok(None);
        };
        match call.await {
            Ok(Ok(response)) => Ok(Some(response.into())),
            Ok(Err(status)) => Err(stream_error(&status)),
            Err(e) => Err(Status::internal(e.to_string()).into()),
        }
    }
}

impl Outbound for ClientStream {
    type Message = Request;
    type Ack = Response;

    async fn send(&mut self, message: Request) -> Result<(), StreamError> {
        match self.sender.send(message).await {
            Ok(()) => Ok(()),
            // the call ended early, its status says why
            Err(closed) => match self.outcome().await {
                Ok(_) => Err(closed),
                Err(error) => Err(error),
            },
        }
    }

    async fn finish(&mut self) -> Result<Option<Response>, StreamError> {
        self.sender.finish().await?;
        self.outcome().await
    }
}

impl Drop for ClientStream {
    fn drop(&mut self) {
        if let Some(call) = self.call.take() {
            call.abort();
        }
    }
}
