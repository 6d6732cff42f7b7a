//! grpctest server binary.

use clap::Parser;
use grpctest_common::config::{API_KEY_ENV, parse_duration};
use grpctest_common::{admin, logging, signal};
use grpctest_server::Config;
use grpctest_server::config::DEFAULT_CONFIG;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

#[derive(Parser)]
#[command(name = "grpctest-server")]
#[command(about = "Answers grpctest streams with time-ordered identifiers")]
struct Args {
    /// Path to configuration file
    config: Option<PathBuf>,

    /// Print default configuration and exit
    #[arg(long)]
    print_config: bool,

    /// Address to listen on
    #[arg(long)]
    listen: Option<SocketAddr>,

    /// API key clients must present
    #[arg(long, env = API_KEY_ENV, hide_env_values = true)]
    key: Option<String>,

    /// Period between responses on streams, e.g. "15s"
    #[arg(long, value_parser = parse_duration)]
    interval: Option<Duration>,
}

fn main() {
    let args = Args::parse();

    if args.print_config {
        print!("{DEFAULT_CONFIG}");
        return;
    }

    let mut config = match &args.config {
        Some(path) => match grpctest_common::config::load::<Config, _>(path) {
            Ok(c) => c,
            Err(e) => {
                eprintln!("Failed to load config: {}", e);
                std::process::exit(1);
            }
        },
        None => Config::default(),
    };
    if let Some(listen) = args.listen {
        config.server.listen = listen;
    }
    if let Some(key) = args.key {
        config.auth.key = Some(key);
    }
    if let Some(interval) = args.interval {
        config.server.interval = interval;
    }
    if let Err(e) = config.validate() {
        eprintln!("{}", e);
        std::process::exit(1);
    }

    logging::init(&config.logging);

    let shutdown = match signal::install_signal_handler() {
        Ok(token) => token,
        Err(e) => {
            tracing::error!(error = %e, "failed to install signal handler");
            std::process::exit(1);
        }
    };

    if let Err(e) = run(config, shutdown) {
        tracing::error!(error = %e, "server error");
        std::process::exit(1);
    }
}

fn run(config: Config, shutdown: CancellationToken) -> Result<(), Box<dyn std::error::Error>> {
    let admin_handle = match config.admin.address {
        Some(address) => Some(admin::start(address, shutdown.clone())?),
        None => None,
    };

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .thread_name("grpctest-server")
        .build()?;

    let result = runtime.block_on(grpctest_server::run(&config, shutdown));

    if let Some(handle) = admin_handle {
        handle.shutdown();
    }

    result?;
    Ok(())
}
