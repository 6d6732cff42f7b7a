//! Client metrics.

use metriken::{Counter, Gauge, metric};

/// Stream open attempts.
#[metric(name = "client_stream_opens")]
pub static STREAM_OPENS: Counter = Counter::new();

/// Open attempts that failed.
#[metric(name = "client_stream_open_failures")]
pub static STREAM_OPEN_FAILURES: Counter = Counter::new();

/// Sessions currently connected.
#[metric(name = "client_sessions_active")]
pub static SESSIONS_ACTIVE: Gauge = Gauge::new();

/// Requests sent.
#[metric(name = "client_requests_sent")]
pub static REQUESTS_SENT: Counter = Counter::new();

/// Responses received, including final responses of client streams.
#[metric(name = "client_responses_received")]
pub static RESPONSES_RECEIVED: Counter = Counter::new();

/// Reconnects scheduled after a session ended.
#[metric(name = "client_reconnects")]
pub static RECONNECTS: Counter = Counter::new();

/// Identifier generation failures.
#[metric(name = "client_entropy_failures")]
pub static ENTROPY_FAILURES: Counter = Counter::new();

#[metric(name = "client_sessions_clean_end")]
pub static SESSIONS_CLEAN_END: Counter = Counter::new();

#[metric(name = "client_sessions_cancelled")]
pub static SESSIONS_CANCELLED: Counter = Counter::new();

#[metric(name = "client_sessions_bound_reached")]
pub static SESSIONS_BOUND_REACHED: Counter = Counter::new();

#[metric(name = "client_sessions_unauthorized")]
pub static SESSIONS_UNAUTHORIZED: Counter = Counter::new();

#[metric(name = "client_sessions_transient")]
pub static SESSIONS_TRANSIENT: Counter = Counter::new();

#[metric(name = "client_sessions_entropy")]
pub static SESSIONS_ENTROPY: Counter = Counter::new();

#[metric(name = "client_sessions_fatal")]
pub static SESSIONS_FATAL: Counter = Counter::new();
