use std::time::Duration;

/// Fixed pause between a session ending and the next open attempt.
pub const DEFAULT_RECONNECT_DELAY: Duration = Duration::from_secs(1);

/// Period between outgoing messages.
pub const DEFAULT_SEND_INTERVAL: Duration = Duration::from_secs(15);

/// Message limit for the send-only and receive-only variants.
pub const DEFAULT_BOUND: u64 = 10;

/// Timing and limits applied by the [`Driver`](crate::Driver).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconnectPolicy {
    pub reconnect_delay: Duration,
    pub send_interval: Duration,
    /// Messages to send (send-only), receive (receive-only) or exchange
    /// (single calls) before the driver stops. Values below one are raised
    /// to one.
    pub bound: u64,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            reconnect_delay: DEFAULT_RECONNECT_DELAY,
            send_interval: DEFAULT_SEND_INTERVAL,
            bound: DEFAULT_BOUND,
        }
    }
}

impl ReconnectPolicy {
    pub fn with_reconnect_delay(mut self, delay: Duration) -> Self {
        self.reconnect_delay = delay;
        self
    }

    pub fn with_send_interval(mut self, interval: Duration) -> Self {
        self.send_interval = interval;
        self
    }

    pub fn with_bound(mut self, bound: u64) -> Self {
        self.bound = bound;
        self
    }

    pub(crate) fn effective_bound(&self) -> u64 {
        self.bound.max(1)
    }
}
