//! grpctest server.
//!
//! Serves `grpctest.GrpcTest` over tonic. Every call must carry the
//! configured API key as a bearer token. Streaming calls are backed by the
//! same session state machine the client uses, in the server role.

pub mod auth;
pub mod config;
pub mod metrics;
mod observer;
mod service;

pub use config::Config;
pub use observer::MetricsObserver;
pub use service::GrpcTestService;

use auth::ApiKey;
use grpctest_common::config::ConfigError;
use protocol_grpctest::GrpcTestServer;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio_stream::wrappers::TcpListenerStream;
use tokio_util::sync::CancellationToken;
use tracing::info;

#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("failed to bind listener: {0}")]
    Bind(#[from] std::io::Error),
    #[error("transport error: {0}")]
    Transport(#[from] tonic::transport::Error),
}

/// Bind the configured address and serve until `shutdown` is cancelled.
pub async fn run(config: &Config, shutdown: CancellationToken) -> Result<(), ServerError> {
    config.validate()?;
    let listener = TcpListener::bind(config.server.listen).await?;
    serve(listener, config, shutdown).await
}

/// Serve on an already bound listener until `shutdown` is cancelled.
///
/// Running sessions are cancelled along with the server so that open
/// streams end and graceful shutdown can complete.
pub async fn serve(
    listener: TcpListener,
    config: &Config,
    shutdown: CancellationToken,
) -> Result<(), ServerError> {
    let key = config.auth.require_key()?;
    let address = listener.local_addr()?;

    let service = GrpcTestService::new(
        config.server.interval,
        Arc::new(MetricsObserver::new()),
        shutdown.child_token(),
    );

    info!(%address, interval = ?config.server.interval, "grpctest server listening");

    tonic::transport::Server::builder()
        .http2_keepalive_interval(Some(config.keepalive.interval))
        .http2_keepalive_timeout(Some(config.keepalive.timeout))
        .add_service(GrpcTestServer::with_interceptor(service, ApiKey::new(key)))
        .serve_with_incoming_shutdown(TcpListenerStream::new(listener), async move {
            shutdown.cancelled().await
        })
        .await?;

    info!("grpctest server stopped");
    Ok(())
}
