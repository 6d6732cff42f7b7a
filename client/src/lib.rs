//! grpctest client.
//!
//! Keeps one of the four interaction shapes of the grpctest service running
//! against a server, reconnecting after failures, and reports what was
//! exchanged.

pub mod config;
pub mod metrics;
mod observer;

pub use config::Config;
pub use observer::MetricsObserver;

use grpctest_common::config::ConfigError;
use grpctest_session::{Driver, Report};
use protocol_grpctest::{GrpcTransport, auth_context};
use std::fmt;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::info;

/// Interaction shape to exercise.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Bidirectional stream, runs until shutdown or rejected credentials.
    Bidi,
    /// Client stream, sends the configured number of requests.
    Client,
    /// Server stream, receives the configured number of responses.
    Server,
    /// Unary calls, the configured number of them.
    Call,
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Command::Bidi => "bidi",
            Command::Client => "client",
            Command::Server => "server",
            Command::Call => "call",
        };
        f.write_str(name)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("invalid target: {0}")]
    Transport(#[from] tonic::transport::Error),
    #[error(transparent)]
    Session(#[from] grpctest_session::Error),
}

/// Run `command` against the configured target until it completes, fails
/// for good, or `shutdown` is cancelled.
pub async fn run(
    command: Command,
    config: &Config,
    shutdown: CancellationToken,
) -> Result<Report, ClientError> {
    config.validate()?;
    let key = config.auth.require_key()?.to_string();
    let uri = config.uri();

    let transport = GrpcTransport::connect_lazy(uri.clone(), config.keepalive())?;
    let driver = Driver::new(transport, move || auth_context(&key), config.policy())
        .with_observer(Arc::new(MetricsObserver::new()))
        .with_shutdown(shutdown);

    info!(%command, target = %uri, "starting");

    let report = match command {
        Command::Bidi => driver.run_duplex().await?,
        Command::Client => driver.run_client_stream().await?,
        Command::Server => driver.run_server_stream().await?,
        Command::Call => driver.run_calls().await?,
    };

    info!(
        %command,
        exit = ?report.exit,
        opens = report.opens,
        sessions = report.sessions,
        sent = report.sent,
        received = report.received,
        "finished"
    );

    Ok(report)
}
