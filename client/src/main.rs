//! grpctest client binary.

use clap::{Parser, Subcommand};
use grpctest_client::config::DEFAULT_CONFIG;
use grpctest_client::{Command, Config};
use grpctest_common::config::{API_KEY_ENV, parse_duration};
use grpctest_common::{admin, logging, signal};
use grpctest_session::Exit;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Parser)]
#[command(name = "grpctest-client")]
#[command(about = "Keeps grpctest streams alive against a server")]
struct Args {
    /// Path to configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Print default configuration and exit
    #[arg(long)]
    print_config: bool,

    /// Server host
    #[arg(long, global = true)]
    server: Option<String>,

    /// Server port
    #[arg(long, global = true)]
    port: Option<u16>,

    /// API key
    #[arg(long, global = true, env = API_KEY_ENV, hide_env_values = true)]
    key: Option<String>,

    /// Period between requests, e.g. "15s" or "500ms"
    #[arg(long, global = true, value_parser = parse_duration)]
    interval: Option<Duration>,

    /// Pause before reconnecting
    #[arg(long, global = true, value_parser = parse_duration)]
    reconnect_delay: Option<Duration>,

    /// Messages to exchange before exiting (ignored by bidi)
    #[arg(long, global = true)]
    bound: Option<u64>,

    #[command(subcommand)]
    command: Option<Shape>,
}

#[derive(Subcommand, Clone, Copy)]
enum Shape {
    /// Bidirectional stream until shutdown
    Bidi,
    /// Client stream of `bound` requests
    Client,
    /// Server stream of `bound` responses
    Server,
    /// `bound` unary calls
    Call,
}

impl From<Shape> for Command {
    fn from(shape: Shape) -> Self {
        match shape {
            Shape::Bidi => Command::Bidi,
            Shape::Client => Command::Client,
            Shape::Server => Command::Server,
            Shape::Call => Command::Call,
        }
    }
}

impl Args {
    fn apply(&self, config: &mut Config) {
        if let Some(host) = &self.server {
            config.target.host = host.clone();
        }
        if let Some(port) = self.port {
            config.target.port = port;
        }
        if let Some(key) = &self.key {
            config.auth.key = Some(key.clone());
        }
        if let Some(interval) = self.interval {
            config.session.interval = interval;
        }
        if let Some(delay) = self.reconnect_delay {
            config.session.reconnect_delay = delay;
        }
        if let Some(bound) = self.bound {
            config.session.bound = bound;
        }
    }
}

fn main() {
    let args = Args::parse();

    if args.print_config {
        print!("{DEFAULT_CONFIG}");
        return;
    }

    let Some(shape) = args.command else {
        eprintln!("No command given. Use one of: bidi, client, server, call");
        std::process::exit(2);
    };

    let mut config = match &args.config {
        Some(path) => match Config::load(path) {
            Ok(c) => c,
            Err(e) => {
                eprintln!("Failed to load config: {}", e);
                std::process::exit(1);
            }
        },
        None => Config::default(),
    };
    args.apply(&mut config);

    logging::init(&config.logging);

    let shutdown = match signal::install_signal_handler() {
        Ok(token) => token,
        Err(e) => {
            tracing::error!(error = %e, "failed to install signal handler");
            std::process::exit(1);
        }
    };

    if let Err(e) = run(shape.into(), config, shutdown) {
        tracing::error!(error = %e, "client error");
        std::process::exit(1);
    }
}

fn run(
    command: Command,
    config: Config,
    shutdown: tokio_util::sync::CancellationToken,
) -> Result<(), Box<dyn std::error::Error>> {
    let admin_handle = match config.admin.address {
        Some(address) => Some(admin::start(address, shutdown.clone())?),
        None => None,
    };

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .thread_name("grpctest-client")
        .build()?;

    let result = runtime.block_on(grpctest_client::run(command, &config, shutdown));

    if let Some(handle) = admin_handle {
        handle.shutdown();
    }

    match result?.exit {
        Exit::BoundReached => tracing::info!("message limit reached"),
        Exit::Shutdown => tracing::info!("shut down"),
    }

    Ok(())
}
