//! Observer for server sessions.

use crate::metrics::*;
use grpctest_session::{
    EntropyError, Observer, Role, Shape, State, Summary, Termination, TracingObserver,
};

pub struct MetricsObserver {
    log: TracingObserver,
}

impl MetricsObserver {
    pub fn new() -> Self {
        Self {
            log: TracingObserver::new(Role::Server),
        }
    }
}

impl Default for MetricsObserver {
    fn default() -> Self {
        Self::new()
    }
}

impl Observer for MetricsObserver {
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
        RESPONSES_SENT.increment();
        self.log.sent(shape, value, count);
    }

    fn received(&self, shape: Shape, value: &str, count: u64) {
        REQUESTS_RECEIVED.increment();
        self.log.received(shape, value, count);
    }

    fn entropy_failed(&self, shape: Shape, error: &EntropyError) {
        ENTROPY_FAILURES.increment();
        self.log.entropy_failed(shape, error);
    }

    fn closed(&self, shape: Shape, summary: &Summary) {
        match summary.termination {
            Termination::CleanEnd | Termination::BoundReached => SESSIONS_CLEAN_END.increment(),
            Termination::Cancelled => SESSIONS_CANCELLED.increment(),
            _ => SESSIONS_FAILED.increment(),
        };
        self.log.closed(shape, summary);
    }
}
