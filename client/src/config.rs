//! Client configuration.

use grpctest_common::config::{
    self, AdminConfig, AuthConfig, ConfigError, DEFAULT_PORT, KeepaliveConfig, LoggingConfig,
    humantime_serde,
};
use grpctest_session::{
    DEFAULT_BOUND, DEFAULT_RECONNECT_DELAY, DEFAULT_SEND_INTERVAL, ReconnectPolicy,
};
use protocol_grpctest::Keepalive;
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub target: TargetConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub keepalive: KeepaliveConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub admin: AdminConfig,
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct TargetConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for TargetConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: DEFAULT_PORT,
        }
    }
}

fn default_host() -> String {
    "localhost".to_string()
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct SessionConfig {
    /// Period between requests.
    #[serde(default = "default_interval", with = "humantime_serde")]
    pub interval: Duration,
    /// Pause before reopening a stream that ended.
    #[serde(default = "default_reconnect_delay", with = "humantime_serde")]
    pub reconnect_delay: Duration,
    /// Messages exchanged by the `client`, `server` and `call` commands
    /// before exiting. `bidi` ignores it.
    #[serde(default = "default_bound")]
    pub bound: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            interval: DEFAULT_SEND_INTERVAL,
            reconnect_delay: DEFAULT_RECONNECT_DELAY,
            bound: DEFAULT_BOUND,
        }
    }
}

fn default_interval() -> Duration {
    DEFAULT_SEND_INTERVAL
}

fn default_reconnect_delay() -> Duration {
    DEFAULT_RECONNECT_DELAY
}

fn default_bound() -> u64 {
    DEFAULT_BOUND
}

impl Config {
    /// Load and validate a config file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let config: Config = config::load(path)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.target.host.is_empty() {
            return Err(ConfigError::Invalid("target host must not be empty".into()));
        }
        if self.target.port == 0 {
            return Err(ConfigError::Invalid("target port must not be 0".into()));
        }
        if self.session.interval.is_zero() {
            return Err(ConfigError::Invalid("session interval must be positive".into()));
        }
        if self.session.bound == 0 {
            return Err(ConfigError::Invalid("session bound must be at least 1".into()));
        }
        Ok(())
    }

    pub fn policy(&self) -> ReconnectPolicy {
        ReconnectPolicy::default()
            .with_send_interval(self.session.interval)
            .with_reconnect_delay(self.session.reconnect_delay)
            .with_bound(self.session.bound)
    }

    pub fn keepalive(&self) -> Keepalive {
        Keepalive {
            interval: self.keepalive.interval,
            timeout: self.keepalive.timeout,
        }
    }

    pub fn uri(&self) -> String {
        format!("http://{}:{}", self.target.host, self.target.port)
    }
}

/// Commented default configuration printed by `--print-config`.
pub const DEFAULT_CONFIG: &str = r#"# grpctest client configuration

[target]
host = "localhost"
port = 8841

[auth]
# API key sent as "authorization: bearer <key>". GRPCTEST_API_KEY or --key
# may be used instead.
# key = "secret"

[session]
# Period between requests
interval = "15s"
# Pause before reopening a stream that ended
reconnect_delay = "1s"
# Messages exchanged by the client, server and call commands before exiting
bound = 10

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
# address = "127.0.0.1:9091"
"#;
