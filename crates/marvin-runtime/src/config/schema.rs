//! Configuration schema definitions.

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use figment::value::Value;
use serde::{Deserialize, Serialize};

use marvin_core::Identity;
use marvin_transport::TcpConfig;

use crate::supervisor::Backoff;

/// Root configuration structure.
///
/// ```toml
/// channels = ["#marvin"]
///
/// [server]
/// host = "irc.hackint.eu"
/// port = 6697
///
/// [identity]
/// nickname = "marvin"
///
/// [modules.remind]
/// user_limit = 5
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct MarvinConfig {
    /// Server to connect to.
    #[serde(default)]
    pub server: ServerConfig,

    /// Names presented during registration.
    #[serde(default)]
    pub identity: IdentityConfig,

    /// Channels joined after registration.
    #[serde(default)]
    pub channels: Vec<String>,

    /// Reconnect policy.
    #[serde(default)]
    pub reconnect: ReconnectConfig,

    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Free-form per-module sections, keyed by module name.
    #[serde(default)]
    pub modules: BTreeMap<String, Value>,
}

impl MarvinConfig {
    /// Builds the transport settings.
    pub fn transport(&self) -> TcpConfig {
        TcpConfig {
            host: self.server.host.clone(),
            port: self.server.port,
            tls: self.server.tls || self.server.cert.is_some(),
            cert: self.server.cert.clone(),
            connect_timeout: Duration::from_secs(self.server.connect_timeout_secs),
        }
    }

    /// Builds the registration identity.
    pub fn identity(&self) -> Identity {
        let mut identity = Identity::new(&self.identity.nickname, &self.identity.realname);
        if let Some(username) = &self.identity.username {
            identity.username.clone_from(username);
        }
        identity
    }

    /// Builds the reconnect policy.
    pub fn backoff(&self) -> Backoff {
        Backoff {
            base_delay: Duration::from_secs(self.reconnect.base_delay_secs),
            max_attempts: self.reconnect.max_attempts,
        }
    }
}

/// IRC server settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Host name of the server.
    #[serde(default = "default_host")]
    pub host: String,

    /// Port to connect to.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Use TLS.
    #[serde(default = "default_tls")]
    pub tls: bool,

    /// PEM file with the CA to trust instead of the platform store.
    /// Implies `tls`.
    #[serde(default)]
    pub cert: Option<PathBuf>,

    /// Connect and TLS handshake timeout in seconds.
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            tls: default_tls(),
            cert: None,
            connect_timeout_secs: default_connect_timeout_secs(),
        }
    }
}

fn default_host() -> String {
    "irc.hackint.eu".to_string()
}

fn default_port() -> u16 {
    6697
}

fn default_tls() -> bool {
    true
}

fn default_connect_timeout_secs() -> u64 {
    30
}

/// Names presented to the server.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdentityConfig {
    /// Nickname.
    #[serde(default = "default_nickname")]
    pub nickname: String,

    /// Username; defaults to the nickname.
    #[serde(default)]
    pub username: Option<String>,

    /// Real name.
    #[serde(default = "default_realname")]
    pub realname: String,
}

impl Default for IdentityConfig {
    fn default() -> Self {
        Self {
            nickname: default_nickname(),
            username: None,
            realname: default_realname(),
        }
    }
}

fn default_nickname() -> String {
    "marvin".to_string()
}

fn default_realname() -> String {
    "Marvin Bot".to_string()
}

/// Reconnect policy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReconnectConfig {
    /// After failed attempt `i` the supervisor waits `i * base_delay_secs`.
    #[serde(default = "default_base_delay_secs")]
    pub base_delay_secs: u64,

    /// Give up after this many consecutive failures. Unbounded if unset.
    #[serde(default)]
    pub max_attempts: Option<u32>,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            base_delay_secs: default_base_delay_secs(),
            max_attempts: None,
        }
    }
}

fn default_base_delay_secs() -> u64 {
    3
}

// =============================================================================
// Logging
// =============================================================================

/// Log level.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl LogLevel {
    /// Returns the level as a filter directive string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }

    /// Converts to a `tracing` level.
    pub fn to_tracing_level(self) -> tracing::Level {
        match self {
            Self::Trace => tracing::Level::TRACE,
            Self::Debug => tracing::Level::DEBUG,
            Self::Info => tracing::Level::INFO,
            Self::Warn => tracing::Level::WARN,
            Self::Error => tracing::Level::ERROR,
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Compact,
    Full,
    Pretty,
    /// Requires the `json-log` feature; falls back to `full` without it.
    Json,
}

/// Output destination.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogOutput {
    Stdout,
    #[default]
    Stderr,
    File,
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Global level.
    #[serde(default)]
    pub level: LogLevel,

    /// Output format.
    #[serde(default)]
    pub format: LogFormat,

    /// Output destination.
    #[serde(default)]
    pub output: LogOutput,

    /// Log file for `output = "file"`.
    #[serde(default)]
    pub file_path: Option<PathBuf>,

    /// Per-target levels, e.g. `marvin_transport = "debug"`.
    #[serde(default)]
    pub filters: BTreeMap<String, LogLevel>,

    /// Log every raw line received from the server.
    #[serde(default)]
    pub verbose: bool,

    /// Include thread IDs.
    #[serde(default)]
    pub thread_ids: bool,

    /// Include source file and line.
    #[serde(default)]
    pub file_location: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: LogLevel::Info,
            format: LogFormat::Compact,
            output: LogOutput::Stderr,
            file_path: None,
            filters: BTreeMap::new(),
            verbose: false,
            thread_ids: false,
            file_location: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = MarvinConfig::default();
        assert_eq!(config.server.host, "irc.hackint.eu");
        assert_eq!(config.server.port, 6697);
        assert!(config.server.tls);
        assert_eq!(config.identity.nickname, "marvin");
        assert_eq!(config.identity.realname, "Marvin Bot");
        assert_eq!(config.reconnect.base_delay_secs, 3);
        assert!(config.reconnect.max_attempts.is_none());
    }

    #[test]
    fn test_identity_username_defaults_to_nickname() {
        let mut config = MarvinConfig::default();
        assert_eq!(config.identity().username, "marvin");

        config.identity.username = Some("bot".into());
        let identity = config.identity();
        assert_eq!(identity.nickname, "marvin");
        assert_eq!(identity.username, "bot");
    }

    #[test]
    fn test_cert_implies_tls() {
        let mut config = MarvinConfig::default();
        config.server.tls = false;
        assert!(!config.transport().tls);

        config.server.cert = Some("ca.pem".into());
        assert!(config.transport().tls);
    }

    #[test]
    fn test_backoff_from_reconnect_section() {
        let mut config = MarvinConfig::default();
        config.reconnect.base_delay_secs = 5;
        config.reconnect.max_attempts = Some(4);

        let backoff = config.backoff();
        assert_eq!(backoff.base_delay, Duration::from_secs(5));
        assert_eq!(backoff.max_attempts, Some(4));
    }
}
