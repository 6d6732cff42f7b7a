//! Scripted transports and recording observers for session tests.

#![allow(dead_code)]

use grpctest_session::{
    AuthContext, Code, Entropy, EntropyError, Failure, Inbound, Message, Observer, Outbound,
    Request, Response, Shape, State, Status, StreamError, Summary, Termination, Transport,
    classify,
};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::marker::PhantomData;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::time::{self, Instant};

pub fn unavailable() -> StreamError {
    Status::unavailable("connection reset").into()
}

pub fn status(code: Code) -> StreamError {
    Status::new(code, "scripted").into()
}

pub fn responses(values: &[&str]) -> Vec<Result<Response, StreamError>> {
    values.iter().map(|v| Ok(Response::new(*v))).collect()
}

/// Inbound half that replays a fixed list of events, then waits forever.
pub struct ScriptedInbound<M> {
    events: VecDeque<Result<M, StreamError>>,
    spacing: Duration,
    polls: Arc<AtomicUsize>,
}

impl<M: Message> ScriptedInbound<M> {
    pub fn new(events: Vec<Result<M, StreamError>>) -> Self {
        Self {
            events: events.into(),
            spacing: Duration::ZERO,
            polls: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Never yields anything.
    pub fn quiet() -> Self {
        Self::new(Vec::new())
    }

    /// Wait `spacing` before yielding each event.
    pub fn spaced(mut self, spacing: Duration) -> Self {
        self.spacing = spacing;
        self
    }

    pub fn polls(&self) -> Arc<AtomicUsize> {
        self.polls.clone()
    }
}

impl<M: Message> Inbound for ScriptedInbound<M> {
    type Message = M;

    async fn receive(&mut self) -> Result<M, StreamError> {
        self.polls.fetch_add(1, Ordering::SeqCst);
        let Some(event) = self.events.pop_front() else {
            return std::future::pending().await;
        };
        if !self.spacing.is_zero() {
            time::sleep(self.spacing).await;
        }
        event
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Sent {
    Message(String),
    Finished,
}

/// Shared record of everything written to recording outbound halves.
#[derive(Clone, Default)]
pub struct Log {
    events: Arc<Mutex<Vec<(Instant, Sent)>>>,
}

impl Log {
    fn push(&self, event: Sent) {
        self.events.lock().push((Instant::now(), event));
    }

    pub fn events(&self) -> Vec<Sent> {
        self.events.lock().iter().map(|(_, e)| e.clone()).collect()
    }

    pub fn sent_values(&self) -> Vec<String> {
        self.events
            .lock()
            .iter()
            .filter_map(|(_, e)| match e {
                Sent::Message(value) => Some(value.clone()),
                Sent::Finished => None,
            })
            .collect()
    }

    pub fn sent_times(&self) -> Vec<Instant> {
        self.events
            .lock()
            .iter()
            .filter(|(_, e)| matches!(e, Sent::Message(_)))
            .map(|(at, _)| *at)
            .collect()
    }

    pub fn finish_count(&self) -> usize {
        self.events
            .lock()
            .iter()
            .filter(|(_, e)| *e == Sent::Finished)
            .count()
    }
}

/// Outbound half that records sends and can be told to fail.
pub struct RecordingOutbound<M, A> {
    log: Log,
    sent: usize,
    fail_after: Option<(usize, StreamError)>,
    finish: Option<Result<Option<A>, StreamError>>,
    _message: PhantomData<fn() -> M>,
}

impl<M: Message, A: Message> RecordingOutbound<M, A> {
    pub fn new(log: Log) -> Self {
        Self {
            log,
            sent: 0,
            fail_after: None,
            finish: None,
            _message: PhantomData,
        }
    }

    /// Sends after the first `count` fail with `error`.
    pub fn failing_after(mut self, count: usize, error: StreamError) -> Self {
        self.fail_after = Some((count, error));
        self
    }

    /// Result returned by the first `finish`.
    pub fn finishing(mut self, result: Result<Option<A>, StreamError>) -> Self {
        self.finish = Some(result);
        self
    }
}

impl<M: Message, A: Message> Outbound for RecordingOutbound<M, A> {
    type Message = M;
    type Ack = A;

    async fn send(&mut self, message: M) -> Result<(), StreamError> {
        if let Some((count, error)) = &self.fail_after
            && self.sent >= *count
        {
            return Err(error.clone());
        }
        self.sent += 1;
        self.log.push(Sent::Message(message.value().to_owned()));
        Ok(())
    }

    async fn finish(&mut self) -> Result<Option<A>, StreamError> {
        self.log.push(Sent::Finished);
        self.finish.take().unwrap_or(Ok(None))
    }
}

/// What the next open attempt should do.
pub enum Open {
    Fail(StreamError),
    Stream {
        inbound: Vec<Result<Response, StreamError>>,
        finish: Result<Option<Response>, StreamError>,
    },
}

impl Open {
    pub fn fail(code: Code) -> Self {
        Open::Fail(status(code))
    }

    pub fn inbound(events: Vec<Result<Response, StreamError>>) -> Self {
        Open::Stream {
            inbound: events,
            finish: Ok(None),
        }
    }

    pub fn quiet() -> Self {
        Self::inbound(Vec::new())
    }

    pub fn finishing(result: Result<Option<Response>, StreamError>) -> Self {
        Open::Stream {
            inbound: Vec::new(),
            finish: result,
        }
    }
}

/// Transport that plays back one [`Open`] per attempt. Once the script runs
/// out every open is rejected as unauthenticated so drivers always stop.
#[derive(Default)]
pub struct ScriptedTransport {
    script: Mutex<VecDeque<Open>>,
    calls: Mutex<VecDeque<Result<Response, StreamError>>>,
    opens: Mutex<Vec<Instant>>,
    auth: Mutex<Vec<AuthContext>>,
    initial: Mutex<Vec<Request>>,
    requests: Mutex<Vec<Request>>,
    pub log: Log,
}

impl ScriptedTransport {
    pub fn new(script: Vec<Open>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            ..Default::default()
        }
    }

    pub fn with_calls(mut self, calls: Vec<Result<Response, StreamError>>) -> Self {
        self.calls = Mutex::new(calls.into());
        self
    }

    pub fn open_times(&self) -> Vec<Instant> {
        self.opens.lock().clone()
    }

    pub fn open_count(&self) -> usize {
        self.opens.lock().len()
    }

    pub fn auth_contexts(&self) -> Vec<AuthContext> {
        self.auth.lock().clone()
    }

    pub fn initial_requests(&self) -> Vec<Request> {
        self.initial.lock().clone()
    }

    pub fn call_requests(&self) -> Vec<Request> {
        self.requests.lock().clone()
    }

    fn next_open(
        &self,
        auth: AuthContext,
    ) -> Result<(Vec<Result<Response, StreamError>>, Result<Option<Response>, StreamError>), StreamError>
    {
        self.opens.lock().push(Instant::now());
        self.auth.lock().push(auth);
        match self.script.lock().pop_front() {
            Some(Open::Fail(error)) => Err(error),
            Some(Open::Stream { inbound, finish }) => Ok((inbound, finish)),
            None => Err(Status::unauthenticated("script exhausted").into()),
        }
    }
}

impl Transport for ScriptedTransport {
    type DuplexOutbound = RecordingOutbound<Request, Response>;
    type DuplexInbound = ScriptedInbound<Response>;
    type SendStream = RecordingOutbound<Request, Response>;
    type ReceiveStream = ScriptedInbound<Response>;

    async fn open_duplex_stream(
        &self,
        auth: AuthContext,
    ) -> Result<(Self::DuplexOutbound, Self::DuplexInbound), StreamError> {
        let (inbound, finish) = self.next_open(auth)?;
        Ok((
            RecordingOutbound::new(self.log.clone()).finishing(finish),
            ScriptedInbound::new(inbound),
        ))
    }

    async fn open_send_stream(&self, auth: AuthContext) -> Result<Self::SendStream, StreamError> {
        let (_, finish) = self.next_open(auth)?;
        Ok(RecordingOutbound::new(self.log.clone()).finishing(finish))
    }

    async fn open_receive_stream(
        &self,
        auth: AuthContext,
        initial: Request,
    ) -> Result<Self::ReceiveStream, StreamError> {
        self.initial.lock().push(initial);
        let (inbound, _) = self.next_open(auth)?;
        Ok(ScriptedInbound::new(inbound))
    }

    async fn call(&self, auth: AuthContext, request: Request) -> Result<Response, StreamError> {
        self.opens.lock().push(Instant::now());
        self.auth.lock().push(auth);
        self.requests.lock().push(request);
        self.calls
            .lock()
            .pop_front()
            .unwrap_or_else(|| Err(Status::unauthenticated("script exhausted").into()))
    }
}

/// Entropy source that always fails.
pub struct FailingEntropy;

impl Entropy for FailingEntropy {
    fn fill(&mut self, _dest: &mut [u8]) -> Result<(), EntropyError> {
        Err(EntropyError::new("randomness unavailable"))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Opening(u64),
    OpenFailed(Failure),
    Transition(State, State),
    Sent(String),
    Received(String),
    Acknowledged(String),
    EntropyFailed,
    Closed(Termination),
    Reconnecting(Duration),
}

/// Observer that keeps every event in order.
#[derive(Default)]
pub struct RecordingObserver {
    events: Mutex<Vec<Event>>,
}

impl RecordingObserver {
    pub fn events(&self) -> Vec<Event> {
        self.events.lock().clone()
    }

    pub fn received_values(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                Event::Received(value) => Some(value),
                _ => None,
            })
            .collect()
    }

    pub fn transitions(&self) -> Vec<(State, State)> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                Event::Transition(from, to) => Some((from, to)),
                _ => None,
            })
            .collect()
    }

    pub fn terminations(&self) -> Vec<Termination> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                Event::Closed(termination) => Some(termination),
                _ => None,
            })
            .collect()
    }

    pub fn count(&self, wanted: &Event) -> usize {
        self.events.lock().iter().filter(|e| *e == wanted).count()
    }

    fn push(&self, event: Event) {
        self.events.lock().push(event);
    }
}

impl Observer for RecordingObserver {
    fn opening(&self, _shape: Shape, attempt: u64) {
        self.push(Event::Opening(attempt));
    }

    fn open_failed(&self, _shape: Shape, error: &StreamError) {
        self.push(Event::OpenFailed(classify(error)));
    }

    fn transition(&self, _shape: Shape, from: State, to: State) {
        self.push(Event::Transition(from, to));
    }

    fn sent(&self, _shape: Shape, value: &str, _count: u64) {
        self.push(Event::Sent(value.to_owned()));
    }

    fn received(&self, _shape: Shape, value: &str, _count: u64) {
        self.push(Event::Received(value.to_owned()));
    }

    fn acknowledged(&self, _shape: Shape, value: &str) {
        self.push(Event::Acknowledged(value.to_owned()));
    }

    fn entropy_failed(&self, _shape: Shape, _error: &EntropyError) {
        self.push(Event::EntropyFailed);
    }

    fn closed(&self, _shape: Shape, summary: &Summary) {
        self.push(Event::Closed(summary.termination.clone()));
    }

    fn reconnecting(&self, _shape: Shape, delay: Duration) {
        self.push(Event::Reconnecting(delay));
    }
}
