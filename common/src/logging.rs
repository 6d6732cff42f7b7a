//! Structured logging initialization.
//!
//! `RUST_LOG` takes precedence over the configured level.

use crate::config::{LogFormat, LoggingConfig};
use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, Layer, Registry, fmt};

/// Install the global subscriber. Call once, before anything logs.
pub fn init(config: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.level.as_str()));

    tracing_subscriber::registry()
        .with(layer(config))
        .with(filter)
        .init();
}

fn layer(config: &LoggingConfig) -> Box<dyn Layer<Registry> + Send + Sync> {
    let base = fmt::layer()
        .with_target(config.target)
        .with_thread_names(config.thread_names);

    match (config.format, config.timestamps) {
        (LogFormat::Pretty, true) => base.with_ansi(true).boxed(),
        (LogFormat::Pretty, false) => base.with_ansi(true).without_time().boxed(),
        (LogFormat::Json, true) => base.json().boxed(),
        (LogFormat::Json, false) => base.json().without_time().boxed(),
        (LogFormat::Compact, true) => base.compact().with_ansi(true).boxed(),
        (LogFormat::Compact, false) => base.compact().with_ansi(true).without_time().boxed(),
    }
}
