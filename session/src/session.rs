//! A single stream session.
//!
//! A session owns the halves of one open stream and runs until the stream
//! ends, fails, hits its message limit or is cancelled. It moves through
//! [`State::Connecting`], [`State::Active`], [`State::Draining`] and
//! [`State::Closed`], and reports a [`Summary`] carrying the first cause of
//! termination.
//!
//! While active, two activities run concurrently:
//! - dispatch, which sends one freshly generated identifier per tick and
//!   observes received messages in arrival order
//! - the receiver task, which pulls from the inbound half and hands
//!   messages to dispatch through a single-slot queue
//!
//! Either side can end the session. Receiver-initiated endings close the
//! queue and cancel the session token; dispatch then observes anything
//! already queued and takes the receiver's cause. Dispatch-initiated
//! endings (send failure, message limit, entropy failure) win over
//! whatever the receiver reports afterwards.

use crate::classify::{Failure, classify};
use crate::error::{EntropyError, StreamError};
use crate::id::{Entropy, IdGenerator, OsEntropy};
use crate::message::Message;
use crate::observer::{Observer, Role, TracingObserver};
use crate::receiver::receive_loop;
use crate::status::Status;
use crate::transport::{Absent, Inbound, Outbound};
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use tokio::sync::mpsc;
use tokio::time::{self, Instant, Interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum State {
    Connecting,
    Active,
    Draining,
    Closed,
}

/// The shape of the stream a session runs over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Shape {
    Duplex,
    ClientStream,
    ServerStream,
    Call,
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Shape::Duplex => "bidi",
            Shape::ClientStream => "client-stream",
            Shape::ServerStream => "server-stream",
            Shape::Call => "call",
        })
    }
}

/// Why a session ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Termination {
    /// The peer closed the stream.
    CleanEnd,
    Cancelled,
    /// The configured message limit was reached.
    BoundReached,
    Unauthorized(StreamError),
    Transient(StreamError),
    /// No identifier could be generated for the next message.
    Entropy(EntropyError),
    /// The final close of a bounded send-only stream failed.
    Fatal(StreamError),
}

impl Termination {
    pub fn from_stream_error(error: StreamError) -> Self {
        match classify(&error) {
            Failure::CleanEnd => Termination::CleanEnd,
            Failure::Cancelled => Termination::Cancelled,
            Failure::Unauthorized => Termination::Unauthorized(error),
            Failure::Transient => Termination::Transient(error),
        }
    }

    /// Whether a driver should open a new session after this one.
    pub fn is_retryable(&self) -> bool {
        !matches!(
            self,
            Termination::BoundReached | Termination::Unauthorized(_) | Termination::Fatal(_)
        )
    }
}

impl fmt::Display for Termination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Termination::CleanEnd => write!(f, "stream closed by peer"),
            Termination::Cancelled => write!(f, "cancelled"),
            Termination::BoundReached => write!(f, "message limit reached"),
            Termination::Unauthorized(e) => write!(f, "unauthorized: {e}"),
            Termination::Transient(e) => write!(f, "stream failed: {e}"),
            Termination::Entropy(e) => write!(f, "{e}"),
            Termination::Fatal(e) => write!(f, "final close failed: {e}"),
        }
    }
}

/// Result of a completed session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Summary {
    pub shape: Shape,
    pub termination: Termination,
    pub sent: u64,
    pub received: u64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionConfig {
    /// Tick period. No ticks are scheduled without one.
    pub send_interval: Option<Duration>,
    /// After this many sends the outbound half is closed and its final
    /// response awaited.
    pub max_sends: Option<u64>,
    /// The session ends after observing this many messages.
    pub max_receives: Option<u64>,
}

pub struct Session<O: Outbound, I: Inbound> {
    shape: Shape,
    config: SessionConfig,
    outbound: Option<O>,
    inbound: Option<I>,
    cancel: CancellationToken,
    ids: IdGenerator<Box<dyn Entropy>>,
    observer: Arc<dyn Observer>,
    state: State,
    sent: u64,
    received: u64,
}

impl<O: Outbound, I: Inbound> Session<O, I> {
    pub fn new(
        shape: Shape,
        config: SessionConfig,
        outbound: Option<O>,
        inbound: Option<I>,
    ) -> Self {
        Self {
            shape,
            config,
            outbound,
            inbound,
            cancel: CancellationToken::new(),
            ids: IdGenerator::with_entropy(Box::new(OsEntropy)),
            observer: Arc::new(TracingObserver::new(Role::Client)),
            state: State::Connecting,
            sent: 0,
            received: 0,
        }
    }

    /// Duplex session: ticks on `outbound`, observes `inbound`, no limits.
    pub fn duplex(outbound: O, inbound: I, interval: Duration) -> Self
    where
        I: Inbound<Message = O::Ack>,
    {
        let config = SessionConfig {
            send_interval: Some(interval),
            ..Default::default()
        };
        Self::new(Shape::Duplex, config, Some(outbound), Some(inbound))
    }

    pub fn with_shape(mut self, shape: Shape) -> Self {
        self.shape = shape;
        self
    }

    pub fn with_observer(mut self, observer: Arc<dyn Observer>) -> Self {
        self.observer = observer;
        self
    }

    /// Cancelling `token` ends the session. The session also cancels it
    /// itself when it terminates, so pass a child token when sharing.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn with_entropy(mut self, entropy: Box<dyn Entropy>) -> Self {
        self.ids = IdGenerator::with_entropy(entropy);
        self
    }

    /// Count messages that went out with the open request.
    pub(crate) fn already_sent(mut self, sent: u64) -> Self {
        self.sent = sent;
        self
    }

    pub fn state(&self) -> State {
        self.state
    }

    pub fn shape(&self) -> Shape {
        self.shape
    }

    /// Run the session to completion.
    pub async fn run(mut self) -> Summary {
        self.transition(State::Active);

        let (queue, mut delivered) = mpsc::channel(1);
        let limit = self.config.max_receives;
        let cancel = self.cancel.clone();
        let mut receiver = self
            .inbound
            .take()
            .map(|inbound| tokio::spawn(receive_loop(inbound, queue, cancel, limit)));
        let listening = receiver.is_some();

        let mut ticker = match (self.config.send_interval, self.outbound.is_some()) {
            (Some(period), true) => {
                let mut ticker = time::interval_at(Instant::now() + period, period);
                ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
                Some(ticker)
            }
            _ => None,
        };

        // None means the receiver or an external cancel ended the session
        let cause = loop {
            tokio::select! {
                _ = next_tick(&mut ticker) => {
                    if let Err(termination) = self.send_tick().await {
                        break Some(termination);
                    }
                    if self.config.max_sends.is_some_and(|max| self.sent >= max) {
                        break Some(self.finish_bounded().await);
                    }
                }
                message = delivered.recv(), if listening => match message {
                    Some(message) => {
                        if self.observe(message) {
                            break Some(Termination::BoundReached);
                        }
                    }
                    None => break None,
                },
                _ = self.cancel.cancelled() => break None,
            }
        };

        self.transition(State::Draining);
        self.cancel.cancel();

        let mut termination = cause;
        if termination.is_none() {
            while let Some(message) = delivered.recv().await {
                if self.observe(message) {
                    termination = Some(Termination::BoundReached);
                    break;
                }
            }
        }
        drop(delivered);

        let received_cause = match receiver.take() {
            Some(task) => task.await.unwrap_or_else(|e| {
                Termination::Transient(Status::internal(e.to_string()).into())
            }),
            None => Termination::Cancelled,
        };
        let termination = termination.unwrap_or(received_cause);

        if let Some(mut outbound) = self.outbound.take()
            && let Err(error) = outbound.finish().await
        {
            tracing::debug!(shape = %self.shape, %error, "half-close failed");
        }

        self.transition(State::Closed);

        let summary = Summary {
            shape: self.shape,
            termination,
            sent: self.sent,
            received: self.received,
        };
        self.observer.closed(self.shape, &summary);
        summary
    }

    fn transition(&mut self, to: State) {
        let from = self.state;
        self.state = to;
        self.observer.transition(self.shape, from, to);
    }

    /// Records a delivered message. Returns true once the receive limit is
    /// reached.
    fn observe(&mut self, message: I::Message) -> bool {
        self.received += 1;
        self.observer
            .received(self.shape, message.value(), self.received);
        self.config
            .max_receives
            .is_some_and(|max| self.received >= max)
    }

    async fn send_tick(&mut self) -> Result<(), Termination> {
        let id = match self.ids.generate(SystemTime::now()) {
            Ok(id) => id,
            Err(error) => {
                self.observer.entropy_failed(self.shape, &error);
                return Err(Termination::Entropy(error));
            }
        };

        let Some(outbound) = self.outbound.as_mut() else {
            return Ok(());
        };

        let message = O::Message::with_value(id.to_string());
        let value = message.value().to_owned();

        // a cancel here is picked up by the dispatch loop on its next turn
        tokio::select! {
            sent = outbound.send(message) => {
                sent.map_err(Termination::from_stream_error)?;
            }
            _ = self.cancel.cancelled() => return Ok(()),
        }

        self.sent += 1;
        self.observer.sent(self.shape, &value, self.sent);
        Ok(())
    }

    /// Close the sending half after the last bounded send and wait for the
    /// final response.
    async fn finish_bounded(&mut self) -> Termination {
        let Some(mut outbound) = self.outbound.take() else {
            return Termination::BoundReached;
        };

        match outbound.finish().await {
            Ok(ack) => {
                if let Some(ack) = ack {
                    self.observer.acknowledged(self.shape, ack.value());
                }
                Termination::BoundReached
            }
            Err(StreamError::EndOfStream) => Termination::BoundReached,
            Err(error) if classify(&error) == Failure::Unauthorized => {
                Termination::Unauthorized(error)
            }
            Err(error) => Termination::Fatal(error),
        }
    }
}

impl<O: Outbound> Session<O, Absent<O::Ack>> {
    /// Send-only session. With a `bound`, the outbound half is closed after
    /// exactly that many sends and its final response awaited.
    pub fn send_only(outbound: O, interval: Duration, bound: Option<u64>) -> Self {
        let config = SessionConfig {
            send_interval: Some(interval),
            max_sends: bound,
            max_receives: None,
        };
        Self::new(Shape::ClientStream, config, Some(outbound), None)
    }
}

impl<I: Inbound> Session<Absent<I::Message>, I> {
    /// Receive-only session. With a `bound`, it ends after observing that
    /// many messages and never asks the stream for another.
    pub fn receive_only(inbound: I, bound: Option<u64>) -> Self {
        let config = SessionConfig {
            send_interval: None,
            max_sends: None,
            max_receives: bound,
        };
        Self::new(Shape::ServerStream, config, None, Some(inbound))
    }
}

async fn next_tick(ticker: &mut Option<Interval>) {
    match ticker {
        Some(ticker) => {
            ticker.tick().await;
        }
        None => std::future::pending().await,
    }
}
