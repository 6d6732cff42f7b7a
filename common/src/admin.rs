//! HTTP admin server for health checks and metrics exposition.
//!
//! - `GET /health` always returns 200
//! - `GET /ready` returns 200 until shutdown begins, then 503
//! - `GET /metrics` renders every registered counter and gauge in the
//!   Prometheus text format
//!
//! The server runs on its own thread with a current-thread runtime so it
//! keeps answering while the main runtime drains.

use axum::{Router, http::StatusCode, response::IntoResponse, routing::get};
use std::net::SocketAddr;
use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;

pub struct AdminHandle {
    shutdown_tx: oneshot::Sender<()>,
    join_handle: std::thread::JoinHandle<()>,
}

impl AdminHandle {
    /// Stop the server and wait for its thread.
    pub fn shutdown(self) {
        let _ = self.shutdown_tx.send(());
        let _ = self.join_handle.join();
    }
}

/// Start the admin server. `shutdown` only drives readiness; use
/// [`AdminHandle::shutdown`] to stop the server itself.
pub fn start(address: SocketAddr, shutdown: CancellationToken) -> std::io::Result<AdminHandle> {
    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;

    let join_handle = std::thread::Builder::new()
        .name("admin".to_string())
        .spawn(move || {
            runtime.block_on(serve(address, shutdown, shutdown_rx));
        })?;

    Ok(AdminHandle {
        shutdown_tx,
        join_handle,
    })
}

async fn serve(address: SocketAddr, shutdown: CancellationToken, stop: oneshot::Receiver<()>) {
    let app = Router::new()
        .route("/health", get(health_handler))
        .route(
            "/ready",
            get(move || ready_handler(shutdown.clone())),
        )
        .route("/metrics", get(metrics_handler));

    let listener = match tokio::net::TcpListener::bind(address).await {
        Ok(l) => l,
        Err(e) => {
            tracing::error!(error = %e, %address, "failed to bind admin server");
            return;
        }
    };

    tracing::info!(%address, "admin server listening");

    tokio::select! {
        result = axum::serve(listener, app) => {
            if let Err(e) = result {
                tracing::error!(error = %e, "admin server error");
            }
        }
        _ = stop => {}
    }

    tracing::debug!("admin server stopped");
}

async fn health_handler() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}

async fn ready_handler(shutdown: CancellationToken) -> impl IntoResponse {
    if shutdown.is_cancelled() {
        (StatusCode::SERVICE_UNAVAILABLE, "Shutting down")
    } else {
        (StatusCode::OK, "OK")
    }
}

async fn metrics_handler() -> impl IntoResponse {
    (
        StatusCode::OK,
        [("Content-Type", "text/plain; version=0.0.4; charset=utf-8")],
        render_prometheus(),
    )
}

/// Render all registered metrics in the Prometheus text format.
pub fn render_prometheus() -> String {
    let mut output = String::with_capacity(2048);

    for metric in metriken::metrics().iter() {
        let name = metric.name();
        if name.is_empty() {
            continue;
        }
        let Some(value) = metric.value() else {
            continue;
        };

        let name = prometheus_name(name);
        let (kind, value) = match value {
            metriken::Value::Counter(v) => ("counter", v.to_string()),
            metriken::Value::Gauge(v) => ("gauge", v.to_string()),
            _ => continue,
        };

        output.push_str(&format!("# TYPE {name} {kind}\n"));
        output.push_str(&format!("{name} {value}\n"));
    }

    output
}

fn prometheus_name(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect()
}
