//! Configuration sections shared by the client and server.
//!
//! Both binaries read an optional TOML file. Every section and field has a
//! default, so an empty file is valid. Command line flags are applied on
//! top by each binary.

use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;

/// Environment variable consulted for the API key when `--key` is absent.
pub const API_KEY_ENV: &str = "GRPCTEST_API_KEY";

/// Default port for the gRPC service.
pub const DEFAULT_PORT: u16 = 8841;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(String),
    #[error("failed to parse config: {0}")]
    Parse(String),
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Read and parse a TOML config file.
pub fn load<T: DeserializeOwned, P: AsRef<Path>>(path: P) -> Result<T, ConfigError> {
    let content =
        std::fs::read_to_string(path.as_ref()).map_err(|e| ConfigError::Io(e.to_string()))?;
    toml::from_str(&content).map_err(|e| ConfigError::Parse(e.to_string()))
}

#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
    Compact,
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct LoggingConfig {
    /// Filter directive, overridden by `RUST_LOG`.
    #[serde(default = "default_level")]
    pub level: String,
    #[serde(default)]
    pub format: LogFormat,
    #[serde(default = "default_true")]
    pub timestamps: bool,
    #[serde(default = "default_true")]
    pub target: bool,
    #[serde(default)]
    pub thread_names: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
            format: LogFormat::default(),
            timestamps: true,
            target: true,
            thread_names: false,
        }
    }
}

fn default_level() -> String {
    "info".to_string()
}

fn default_true() -> bool {
    true
}

/// The admin HTTP endpoint is off unless `address` is set.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct AdminConfig {
    #[serde(default)]
    pub address: Option<SocketAddr>,
}

/// HTTP/2 keepalive pings.
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct KeepaliveConfig {
    /// Idle time before a ping is sent.
    #[serde(default = "default_idle_ping", with = "humantime_serde")]
    pub interval: Duration,
    /// How long to wait for the ping acknowledgement.
    #[serde(default = "default_idle_ping_timeout", with = "humantime_serde")]
    pub timeout: Duration,
}

impl Default for KeepaliveConfig {
    fn default() -> Self {
        Self {
            interval: default_idle_ping(),
            timeout: default_idle_ping_timeout(),
        }
    }
}

fn default_idle_ping() -> Duration {
    Duration::from_secs(10)
}

fn default_idle_ping_timeout() -> Duration {
    Duration::from_secs(5)
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct AuthConfig {
    #[serde(default)]
    pub key: Option<String>,
}

impl AuthConfig {
    /// The configured key. Missing or empty keys are rejected.
    pub fn require_key(&self) -> Result<&str, ConfigError> {
        match self.key.as_deref() {
            Some(key) if !key.is_empty() => Ok(key),
            _ => Err(ConfigError::Invalid(format!(
                "an API key is required, pass --key or set {API_KEY_ENV}"
            ))),
        }
    }
}

/// Parse a duration such as `15s`, `500ms`, `2m` or `1h`. A bare number is
/// taken as seconds.
pub fn parse_duration(s: &str) -> Result<Duration, String> {
    let s = s.trim();
    if s.is_empty() {
        return Err("empty duration".to_string());
    }

    let (num, suffix) = s.split_at(s.find(|c: char| !c.is_ascii_digit()).unwrap_or(s.len()));
    let value: u64 = num.parse().map_err(|e| format!("invalid number: {e}"))?;

    let multiplier = match suffix.trim() {
        "" | "s" | "sec" | "secs" => 1,
        "m" | "min" | "mins" => 60,
        "h" | "hr" | "hrs" | "hour" | "hours" => 3600,
        "ms" => return Ok(Duration::from_millis(value)),
        "us" => return Ok(Duration::from_micros(value)),
        other => return Err(format!("unknown time unit: {other}")),
    };

    value
        .checked_mul(multiplier)
        .map(Duration::from_secs)
        .ok_or_else(|| format!("duration too large: {s}"))
}

/// Serde adapter for [`parse_duration`] strings.
pub mod humantime_serde {
    use serde::{Deserialize, Deserializer};
    use std::time::Duration;

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        super::parse_duration(&s).map_err(serde::de::Error::custom)
    }
}
