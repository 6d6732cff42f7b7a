//! Server configuration.

use grpctest_common::config::{
    self, AdminConfig, AuthConfig, ConfigError, DEFAULT_PORT, KeepaliveConfig, LoggingConfig,
    humantime_serde,
};
use grpctest_session::DEFAULT_SEND_INTERVAL;
use serde::Deserialize;
use std::net::{Ipv4Addr, SocketAddr};
use std::path::Path;
use std::time::Duration;

/// Server configuration loaded from a TOML file.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub keepalive: KeepaliveConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub admin: AdminConfig,
}

#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    /// Address the gRPC service listens on.
    #[serde(default = "default_listen")]
    pub listen: SocketAddr,
    /// Period between responses on server and bidirectional streams.
    #[serde(default = "default_interval", with = "humantime_serde")]
    pub interval: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: default_listen(),
            interval: DEFAULT_SEND_INTERVAL,
        }
    }
}

fn default_listen() -> SocketAddr {
    SocketAddr::from((Ipv4Addr::UNSPECIFIED, DEFAULT_PORT))
}

fn default_interval() -> Duration {
    DEFAULT_SEND_INTERVAL
}

impl Config {
    /// Load and validate a config file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let config: Config = config::load(path)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.interval.is_zero() {
            return Err(ConfigError::Invalid("server interval must be positive".into()));
        }
        self.auth.require_key()?;
        Ok(())
    }
}

/// Commented default configuration printed by `--print-config`.
pub const DEFAULT_CONFIG: &str = r#"# grpctest server configuration

[server]
# Address for the gRPC service
listen = "0.0.0.0:8841"
# Period between responses on server and bidirectional streams
interval = "15s"

[auth]
# Clients must send "authorization: bearer <key>". GRPCTEST_API_KEY or
# --key may be used instead.
# key = "secret"

[keepalive]
# HTTP/2 ping after this much idle time
interval = "10s"
# Drop the connection if the ping is not acknowledged in time
timeout = "5s"

[logging]
# "error", "warn", "info", "debug" or "trace". RUST_LOG takes precedence.
level = "info"
# "pretty", "json" or "compact"
format = "pretty"
timestamps = true
target = true
thread_names = false

[admin]
# Serve /health, /ready and /metrics on this address
# address = "127.0.0.1:9090"
"#;
