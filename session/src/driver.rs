//! Reconnect supervision.
//!
//! A [`Driver`] repeatedly opens a stream, runs a [`Session`] over it and,
//! once the session ends, waits a fixed delay before opening the next one.
//! It gives up only when credentials are rejected, when a bounded variant
//! reaches its limit, when the final close of a bounded send-only stream
//! fails, or when the shutdown token is cancelled.
//!
//! The reconnect delay is a plain sleep. Shutdown is checked before and
//! after it, never during.

use crate::classify::classify;
use crate::error::{EntropyError, Error, Result, StreamError};
use crate::id::{Entropy, IdGenerator, OsEntropy};
use crate::message::{Message, Request};
use crate::observer::{Observer, Role, TracingObserver};
use crate::policy::ReconnectPolicy;
use crate::session::{Session, Shape, Termination};
use crate::transport::{AuthContext, AuthProvider, Inbound, Outbound, Transport};
use std::future::Future;
use std::sync::Arc;
use std::time::SystemTime;
use tokio::time::{self, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

type EntropyFactory = dyn Fn() -> Box<dyn Entropy> + Send + Sync;

/// Why a driver returned successfully.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Exit {
    BoundReached,
    Shutdown,
}

/// Totals across every session a driver ran.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Report {
    pub exit: Exit,
    /// Open attempts, including failed ones.
    pub opens: u64,
    /// Sessions that reached the active state.
    pub sessions: u64,
    pub sent: u64,
    pub received: u64,
}

#[derive(Debug, Default)]
struct Totals {
    opens: u64,
    sessions: u64,
    sent: u64,
    received: u64,
}

impl Totals {
    fn report(&self, exit: Exit) -> Report {
        Report {
            exit,
            opens: self.opens,
            sessions: self.sessions,
            sent: self.sent,
            received: self.received,
        }
    }
}

enum OpenError {
    Stream(StreamError),
    Entropy(EntropyError),
}

impl From<StreamError> for OpenError {
    fn from(error: StreamError) -> Self {
        OpenError::Stream(error)
    }
}

impl From<EntropyError> for OpenError {
    fn from(error: EntropyError) -> Self {
        OpenError::Entropy(error)
    }
}

pub struct Driver<T: Transport> {
    transport: T,
    auth: Arc<dyn AuthProvider>,
    policy: ReconnectPolicy,
    observer: Arc<dyn Observer>,
    shutdown: CancellationToken,
    entropy: Arc<EntropyFactory>,
}

impl<T: Transport> Driver<T> {
    pub fn new(transport: T, auth: impl AuthProvider, policy: ReconnectPolicy) -> Self {
        Self {
            transport,
            auth: Arc::new(auth),
            policy,
            observer: Arc::new(TracingObserver::new(Role::Client)),
            shutdown: CancellationToken::new(),
            entropy: Arc::new(|| Box::new(OsEntropy)),
        }
    }

    pub fn with_observer(mut self, observer: Arc<dyn Observer>) -> Self {
        self.observer = observer;
        self
    }

    /// Cancelling `token` stops the driver. Running sessions get a child
    /// token and end as cancelled.
    pub fn with_shutdown(mut self, token: CancellationToken) -> Self {
        self.shutdown = token;
        self
    }

    /// Replace the entropy source handed to each session.
    pub fn with_entropy<F>(mut self, factory: F) -> Self
    where
        F: Fn() -> Box<dyn Entropy> + Send + Sync + 'static,
    {
        self.entropy = Arc::new(factory);
        self
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Keep a duplex session running, reconnecting whenever it ends.
    pub async fn run_duplex(&self) -> Result<Report> {
        let interval = self.policy.send_interval;
        self.supervise(Shape::Duplex, move |auth| async move {
            let (outbound, inbound) = self.transport.open_duplex_stream(auth).await?;
            Ok(Session::duplex(outbound, inbound, interval))
        })
        .await
    }

    /// Send the bounded number of requests on a send-only stream, then
    /// close it and take the final response.
    pub async fn run_client_stream(&self) -> Result<Report> {
        let interval = self.policy.send_interval;
        let bound = self.policy.effective_bound();
        self.supervise(Shape::ClientStream, move |auth| async move {
            let outbound = self.transport.open_send_stream(auth).await?;
            Ok(Session::send_only(outbound, interval, Some(bound)))
        })
        .await
    }

    /// Open a receive-only stream with one initial request and observe the
    /// bounded number of responses.
    pub async fn run_server_stream(&self) -> Result<Report> {
        let bound = self.policy.effective_bound();
        self.supervise(Shape::ServerStream, move |auth| async move {
            let id = IdGenerator::with_entropy((self.entropy)()).now()?;
            let value = id.to_string();
            let initial = Request::new(value.clone());
            let inbound = self.transport.open_receive_stream(auth, initial).await?;
            self.observer.sent(Shape::ServerStream, &value, 1);
            Ok(Session::receive_only(inbound, Some(bound)).already_sent(1))
        })
        .await
    }

    /// Issue one call per interval until the bounded number of responses
    /// has been received.
    pub async fn run_calls(&self) -> Result<Report> {
        let shape = Shape::Call;
        let bound = self.policy.effective_bound();
        let period = self.policy.send_interval;
        let mut ids = IdGenerator::with_entropy((self.entropy)());
        let mut totals = Totals::default();

        let mut ticker = time::interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {}
                _ = self.shutdown.cancelled() => return Ok(totals.report(Exit::Shutdown)),
            }

            let request = match ids.generate(SystemTime::now()) {
                Ok(id) => Request::new(id.to_string()),
                Err(error) => {
                    self.observer.entropy_failed(shape, &error);
                    continue;
                }
            };

            totals.opens += 1;
            self.observer.opening(shape, totals.opens);
            let value = request.value().to_owned();

            match self.transport.call(self.auth.auth_context(), request).await {
                Ok(response) => {
                    totals.sessions += 1;
                    totals.sent += 1;
                    totals.received += 1;
                    self.observer.sent(shape, &value, totals.sent);
                    self.observer
                        .received(shape, response.value(), totals.received);
                    if totals.received >= bound {
                        return Ok(totals.report(Exit::BoundReached));
                    }
                }
                Err(error) => {
                    self.observer.open_failed(shape, &error);
                    if !classify(&error).is_retryable() {
                        return Err(Error::Unauthorized(error));
                    }
                    if self.shutdown.is_cancelled() {
                        return Ok(totals.report(Exit::Shutdown));
                    }
                    self.observer
                        .reconnecting(shape, self.policy.reconnect_delay);
                    time::sleep(self.policy.reconnect_delay).await;
                    ticker.reset();
                }
            }
        }
    }

    async fn supervise<O, I, F, Fut>(&self, shape: Shape, mut open: F) -> Result<Report>
    where
        O: Outbound,
        I: Inbound,
        F: FnMut(AuthContext) -> Fut,
        Fut: Future<Output = std::result::Result<Session<O, I>, OpenError>>,
    {
        let mut totals = Totals::default();

        loop {
            if self.shutdown.is_cancelled() {
                return Ok(totals.report(Exit::Shutdown));
            }

            totals.opens += 1;
            self.observer.opening(shape, totals.opens);

            match open(self.auth.auth_context()).await {
                Ok(session) => {
                    totals.sessions += 1;
                    let summary = session
                        .with_shape(shape)
                        .with_observer(self.observer.clone())
                        .with_cancellation(self.shutdown.child_token())
                        .with_entropy((self.entropy)())
                        .run()
                        .await;
                    totals.sent += summary.sent;
                    totals.received += summary.received;

                    let termination = summary.termination;
                    if !termination.is_retryable() {
                        return match termination {
                            Termination::Unauthorized(error) => Err(Error::Unauthorized(error)),
                            Termination::Fatal(error) => Err(Error::Fatal(error)),
                            _ => Ok(totals.report(Exit::BoundReached)),
                        };
                    }
                }
                Err(OpenError::Stream(error)) => {
                    self.observer.open_failed(shape, &error);
                    if !classify(&error).is_retryable() {
                        return Err(Error::Unauthorized(error));
                    }
                }
                Err(OpenError::Entropy(error)) => {
                    self.observer.entropy_failed(shape, &error);
                }
            }

            if self.shutdown.is_cancelled() {
                return Ok(totals.report(Exit::Shutdown));
            }
            self.observer
                .reconnecting(shape, self.policy.reconnect_delay);
            time::sleep(self.policy.reconnect_delay).await;
        }
    }
}
