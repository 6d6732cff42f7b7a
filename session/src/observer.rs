//! Observation hooks for sessions and drivers.
//!
//! Every hook has a no-op default so observers only implement what they
//! care about. [`TracingObserver`] is the stock implementation and emits
//! structured `tracing` events.

use crate::error::{EntropyError, StreamError};
use crate::session::{Shape, State, Summary, Termination};
use std::time::Duration;
use tracing::{debug, error, info, trace, warn};

pub trait Observer: Send + Sync + 'static {
    /// A stream open is about to be attempted. `attempt` starts at 1.
    fn opening(&self, _shape: Shape, _attempt: u64) {}

    fn open_failed(&self, _shape: Shape, _error: &StreamError) {}

    fn transition(&self, _shape: Shape, _from: State, _to: State) {}

    fn sent(&self, _shape: Shape, _value: &str, _count: u64) {}

    fn received(&self, _shape: Shape, _value: &str, _count: u64) {}

    /// The final response of a send-only stream arrived.
    fn acknowledged(&self, _shape: Shape, _value: &str) {}

    fn entropy_failed(&self, _shape: Shape, _error: &EntropyError) {}

    fn closed(&self, _shape: Shape, _summary: &Summary) {}

    fn reconnecting(&self, _shape: Shape, _delay: Duration) {}
}

/// Which end of the stream a session plays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    Client,
    Server,
}

impl Role {
    fn outgoing(self) -> &'static str {
        match self {
            Role::Client => "request",
            Role::Server => "response",
        }
    }

    fn incoming(self) -> &'static str {
        match self {
            Role::Client => "response",
            Role::Server => "request",
        }
    }
}

/// Logs session activity through `tracing`.
#[derive(Debug, Clone, Copy)]
pub struct TracingObserver {
    role: Role,
}

impl TracingObserver {
    pub fn new(role: Role) -> Self {
        Self { role }
    }
}

impl Observer for TracingObserver {
    fn opening(&self, shape: Shape, attempt: u64) {
        debug!(%shape, attempt, "opening stream");
    }

    fn open_failed(&self, shape: Shape, error: &StreamError) {
        error!(%shape, %error, "can't open stream");
    }

    fn transition(&self, shape: Shape, from: State, to: State) {
        match to {
            State::Active => debug!(%shape, "stream connected"),
            _ => trace!(%shape, ?from, ?to, "session state changed"),
        }
    }

    fn sent(&self, shape: Shape, value: &str, count: u64) {
        debug!(%shape, value, count, "sent {}", self.role.outgoing());
    }

    fn received(&self, shape: Shape, value: &str, count: u64) {
        debug!(%shape, value, count, "received {}", self.role.incoming());
    }

    fn acknowledged(&self, shape: Shape, value: &str) {
        debug!(%shape, value, "received final response");
    }

    fn entropy_failed(&self, shape: Shape, error: &EntropyError) {
        error!(%shape, %error, "can't generate identifier");
    }

    fn closed(&self, shape: Shape, summary: &Summary) {
        let sent = summary.sent;
        let received = summary.received;
        match &summary.termination {
            Termination::CleanEnd => debug!(%shape, sent, received, "stream closed"),
            Termination::Cancelled => info!(%shape, sent, received, "stream cancelled"),
            Termination::BoundReached => {
                info!(%shape, sent, received, "message limit reached")
            }
            Termination::Unauthorized(error) => {
                error!(%shape, %error, "invalid API key")
            }
            Termination::Transient(error) => {
                warn!(%shape, %error, sent, received, "stream failed")
            }
            Termination::Entropy(error) => {
                error!(%shape, %error, "can't generate identifier")
            }
            Termination::Fatal(error) => {
                error!(%shape, %error, sent, "final close failed")
            }
        }
    }

    fn reconnecting(&self, shape: Shape, delay: Duration) {
        debug!(%shape, ?delay, "disconnected, reconnecting");
    }
}
