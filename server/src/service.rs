//! `grpctest.GrpcTest` handlers.
//!
//! Streaming handlers run a session in the server role: responses are
//! ticked on the configured interval and requests are observed as they
//! arrive. Each session gets a child of the shutdown token.

use crate::metrics::{CALLS, ENTROPY_FAILURES, REQUESTS_RECEIVED, RESPONSES_SENT};
use grpctest_session::{IdGenerator, Inbound, Observer, Outbound, Session, Shape, Termination};
use protocol_grpctest::convert::status_to_tonic;
use protocol_grpctest::proto;
use protocol_grpctest::{
    GrpcTest, RequestStream, ResponseCloser, ResponseOutput, response_channel,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tonic::{Request, Response, Status, Streaming};
use tracing::debug;

#[derive(Clone)]
pub struct GrpcTestService {
    interval: Duration,
    observer: Arc<dyn Observer>,
    shutdown: CancellationToken,
}

impl GrpcTestService {
    pub fn new(interval: Duration, observer: Arc<dyn Observer>, shutdown: CancellationToken) -> Self {
        Self {
            interval,
            observer,
            shutdown,
        }
    }

    fn response(&self) -> Result<proto::Response, Status> {
        let id = IdGenerator::new().now().map_err(|e| {
            ENTROPY_FAILURES.increment();
            Status::internal(e.to_string())
        })?;
        RESPONSES_SENT.increment();
        Ok(proto::Response {
            value: id.to_string(),
        })
    }
}

#[tonic::async_trait]
impl GrpcTest for GrpcTestService {
    async fn unary(
        &self,
        request: Request<proto::Request>,
    ) -> Result<Response<proto::Response>, Status> {
        CALLS.increment();
        REQUESTS_RECEIVED.increment();
        let request = request.into_inner();
        debug!(value = %request.value, "received request");

        Ok(Response::new(self.response()?))
    }

    async fn client_stream(
        &self,
        request: Request<Streaming<proto::Request>>,
    ) -> Result<Response<proto::Response>, Status> {
        CALLS.increment();
        let requests = RequestStream::new(request.into_inner());

        let summary = Session::receive_only(requests, None)
            .with_shape(Shape::ClientStream)
            .with_observer(self.observer.clone())
            .with_cancellation(self.shutdown.child_token())
            .run()
            .await;

        match summary.termination {
            Termination::CleanEnd => Ok(Response::new(self.response()?)),
            termination => Err(termination_status(&termination)),
        }
    }

    type ServerStreamStream = ResponseOutput;

    async fn server_stream(
        &self,
        request: Request<proto::Request>,
    ) -> Result<Response<Self::ServerStreamStream>, Status> {
        CALLS.increment();
        REQUESTS_RECEIVED.increment();
        let request = request.into_inner();
        debug!(value = %request.value, "received initial request");

        let (sink, output) = response_channel();
        let closer = sink.closer();
        let session = Session::send_only(sink, self.interval, None)
            .with_shape(Shape::ServerStream)
            .with_observer(self.observer.clone())
            .with_cancellation(self.shutdown.child_token());
        spawn_session(session, closer);

        Ok(Response::new(output))
    }

    type BiDirectionalStreamStream = ResponseOutput;

    async fn bi_directional_stream(
        &self,
        request: Request<Streaming<proto::Request>>,
    ) -> Result<Response<Self::BiDirectionalStreamStream>, Status> {
        CALLS.increment();
        let requests = RequestStream::new(request.into_inner());

        let (sink, output) = response_channel();
        let closer = sink.closer();
        let session = Session::duplex(sink, requests, self.interval)
            .with_observer(self.observer.clone())
            .with_cancellation(self.shutdown.child_token());
        spawn_session(session, closer);

        Ok(Response::new(output))
    }
}

/// Run a streaming session in the background. A session that fails ends
/// the response stream with its status; clean ends and cancellation close
/// it with OK.
fn spawn_session<O, I>(session: Session<O, I>, closer: ResponseCloser) -> JoinHandle<()>
where
    O: Outbound,
    I: Inbound,
{
    tokio::spawn(async move {
        let summary = session.run().await;
        match &summary.termination {
            Termination::CleanEnd | Termination::Cancelled | Termination::BoundReached => {}
            termination => closer.fail(termination_status(termination)).await,
        }
    })
}

/// Status returned to a client stream caller whose session did not end
/// with the client closing its half.
fn termination_status(termination: &Termination) -> Status {
    match termination {
        Termination::Cancelled => Status::cancelled("server shutting down"),
        Termination::Entropy(error) => Status::internal(error.to_string()),
        Termination::Unauthorized(error)
        | Termination::Transient(error)
        | Termination::Fatal(error) => match error.status() {
            Some(status) => status_to_tonic(status),
            None => Status::unknown(error.to_string()),
        },
        Termination::CleanEnd | Termination::BoundReached => {
            Status::internal("session ended without a result")
        }
    }
}
