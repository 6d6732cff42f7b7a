//! Server metrics.

use metriken::{Counter, Gauge, metric};

/// Calls of any shape that passed authentication.
#[metric(name = "server_calls")]
pub static CALLS: Counter = Counter::new();

/// Calls rejected by the API key check.
#[metric(name = "server_auth_rejections")]
pub static AUTH_REJECTIONS: Counter = Counter::new();

/// Stream sessions currently running.
#[metric(name = "server_sessions_active")]
pub static SESSIONS_ACTIVE: Gauge = Gauge::new();

/// Responses sent, including single responses to unary and client
/// stream calls.
#[metric(name = "server_responses_sent")]
pub static RESPONSES_SENT: Counter = Counter::new();

/// Requests received.
#[metric(name = "server_requests_received")]
pub static REQUESTS_RECEIVED: Counter = Counter::new();

/// Identifier generation failures.
#[metric(name = "server_entropy_failures")]
pub static ENTROPY_FAILURES: Counter = Counter::new();

#[metric(name = "server_sessions_clean_end")]
pub static SESSIONS_CLEAN_END: Counter = Counter::new();

#[metric(name = "server_sessions_cancelled")]
pub static SESSIONS_CANCELLED: Counter = Counter::new();

#[metric(name = "server_sessions_failed")]
pub static SESSIONS_FAILED: Counter = Counter::new();
