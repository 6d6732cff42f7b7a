//! Signal handling for graceful shutdown.
//!
//! SIGINT and SIGTERM cancel the returned token. A second signal exits the
//! process immediately.

use tokio_util::sync::CancellationToken;

pub fn install_signal_handler() -> Result<CancellationToken, ctrlc::Error> {
    let shutdown = CancellationToken::new();
    let token = shutdown.clone();

    ctrlc::set_handler(move || {
        if token.is_cancelled() {
            tracing::warn!("received second signal, forcing immediate exit");
            std::process::exit(1);
        }
        tracing::info!("received shutdown signal, initiating graceful shutdown");
        token.cancel();
    })?;

    Ok(shutdown)
}
