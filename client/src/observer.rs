//! Observer that feeds client metrics and then logs.

use crate::metrics::*;
use grpctest_session::{
    EntropyError, Observer, Role, Shape, State, StreamError, Summary, Termination,
    TracingObserver,
};
use std::time::Duration;

pub struct MetricsObserver {
    log: TracingObserver,
}

impl MetricsObserver {
    pub fn new() -> Self {
        Self {
            log: TracingObserver::new(Role::Client),
        }
    }
}

impl Default for MetricsObserver {
    fn default() -> Self {
        Self::new()
    }
}

impl Observer for MetricsObserver {
    fn opening(&self, shape: Shape, attempt: u64) {
        STREAM_OPENS.increment();
        self.log.opening(shape, attempt);
    }

    fn open_failed(&self, shape: Shape, error: &StreamError) {
        STREAM_OPEN_FAILURES.increment();
        self.log.open_failed(shape, error);
    }

    fn transition(&self, shape: Shape, from: State, to: State) {
        match (from, to) {
            (_, State::Active) => {
                SESSIONS_ACTIVE.increment();
            }
            (State::Active, _) => {
                SESSIONS_ACTIVE.decrement();
            }
            _ => {}
        }
        self.log.transition(shape, from, to);
    }

    fn sent(&self, shape: Shape, value: &str, count: u64) {
        REQUESTS_SENT.increment();
        self.log.sent(shape, value, count);
    }

    fn received(&self, shape: Shape, value: &str, count: u64) {
        RESPONSES_RECEIVED.increment();
        self.log.received(shape, value, count);
    }

    fn acknowledged(&self, shape: Shape, value: &str) {
        RESPONSES_RECEIVED.increment();
        self.log.acknowledged(shape, value);
    }

    fn entropy_failed(&self, shape: Shape, error: &EntropyError) {
        ENTROPY_FAILURES.increment();
        self.log.entropy_failed(shape, error);
    }

    fn closed(&self, shape: Shape, summary: &Summary) {
        let counter = match summary.termination {
            Termination::CleanEnd => &SESSIONS_CLEAN_END,
            Termination::Cancelled => &SESSIONS_CANCELLED,
            Termination::BoundReached => &SESSIONS_BOUND_REACHED,
            Termination::Unauthorized(_) => &SESSIONS_UNAUTHORIZED,
            Termination::Transient(_) => &SESSIONS_TRANSIENT,
            Termination::Entropy(_) => &SESSIONS_ENTROPY,
            Termination::Fatal(_) => &SESSIONS_FATAL,
        };
        counter.increment();
        self.log.closed(shape, summary);
    }

    fn reconnecting(&self, shape: Shape, delay: Duration) {
        RECONNECTS.increment();
        self.log.reconnecting(shape, delay);
    }
}
