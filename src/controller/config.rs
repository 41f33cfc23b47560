//! Controller configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::obfuscation::SentinelSet;
use crate::{DEFAULT_PATH, RESPONSE_TIMEOUT_MS};

/// Default request body limit.
pub const DEFAULT_MAX_BODY_SIZE: usize = 4 * 1024 * 1024;

/// Default time a session may sit unpolled before it can be evicted.
pub const DEFAULT_HANDSHAKE_GRACE_MS: u64 = 60_000;

/// Controller configuration.
#[derive(Debug, Clone)]
pub struct ControllerConfig {
    /// Listen address
    pub listen_addr: String,
    /// Listen port
    pub listen_port: u16,
    /// The single gate path agents post to
    pub path: String,
    /// Compress outbound payloads
    pub compress: bool,
    /// How long a `CHECK_STREAM_DATA` poll waits for outbound data
    pub response_timeout: Duration,
    /// Maximum concurrent sessions
    pub max_sessions: usize,
    /// Largest accepted request body in bytes
    pub max_body_size: usize,
    /// A session never polled after its handshake may be evicted once this
    /// has passed and the registry is full
    pub handshake_grace: Duration,
    /// Form keys announcing a handshake
    pub sentinels: SentinelSet,
}

impl ControllerConfig {
    /// Create a configuration with defaults for everything but the socket.
    pub fn new(listen_addr: impl Into<String>, listen_port: u16) -> Self {
        Self {
            listen_addr: listen_addr.into(),
            listen_port,
            path: DEFAULT_PATH.to_string(),
            compress: false,
            response_timeout: Duration::from_millis(RESPONSE_TIMEOUT_MS),
            max_sessions: 1024,
            max_body_size: DEFAULT_MAX_BODY_SIZE,
            handshake_grace: Duration::from_millis(DEFAULT_HANDSHAKE_GRACE_MS),
            sentinels: SentinelSet::default(),
        }
    }

    /// `host:port` to bind.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.listen_addr, self.listen_port)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), String> {
        if self.listen_addr.is_empty() {
            return Err("listen_addr cannot be empty".into());
        }
        if !self.path.starts_with('/') {
            return Err("path must start with '/'".into());
        }
        if self.max_sessions == 0 {
            return Err("max_sessions must be at least 1".into());
        }
        if self.response_timeout.is_zero() {
            return Err("response_timeout must be positive".into());
        }
        if self.max_body_size < 1024 {
            return Err("max_body_size must be at least 1024".into());
        }
        if self.handshake_grace.is_zero() {
            return Err("handshake_grace must be positive".into());
        }
        Ok(())
    }
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self::new("0.0.0.0", 80)
    }
}

/// Configuration file format for serialization.
#[derive(Debug, Serialize, Deserialize)]
pub struct ControllerConfigFile {
    /// Listen address
    pub listen_addr: String,
    /// Listen port
    pub listen_port: u16,
    /// Gate path
    #[serde(default = "default_path")]
    pub path: String,
    /// Compress outbound payloads
    #[serde(default)]
    pub compress: bool,
    /// `CHECK_STREAM_DATA` wait (milliseconds)
    #[serde(default = "default_response_timeout")]
    pub response_timeout_ms: u64,
    /// Maximum concurrent sessions
    #[serde(default = "default_max_sessions")]
    pub max_sessions: usize,
    /// Largest accepted request body in bytes
    #[serde(default = "default_max_body_size")]
    pub max_body_size: usize,
    /// Unpolled session eviction grace (milliseconds)
    #[serde(default = "default_handshake_grace")]
    pub handshake_grace_ms: u64,
    /// Handshake sentinels; the 52 ASCII letters when omitted
    #[serde(default)]
    pub sentinels: Option<SentinelSet>,
}

fn default_path() -> String {
    DEFAULT_PATH.to_string()
}

fn default_response_timeout() -> u64 {
    RESPONSE_TIMEOUT_MS
}

fn default_max_sessions() -> usize {
    1024
}

fn default_max_body_size() -> usize {
    DEFAULT_MAX_BODY_SIZE
}

fn default_handshake_grace() -> u64 {
    DEFAULT_HANDSHAKE_GRACE_MS
}

impl ControllerConfigFile {
    /// Parse a TOML document.
    pub fn from_toml(text: &str) -> Result<Self, String> {
        toml::from_str(text).map_err(|e| format!("Invalid controller config: {}", e))
    }

    /// Render as TOML.
    pub fn to_toml(&self) -> Result<String, String> {
        toml::to_string_pretty(self).map_err(|e| format!("Cannot serialize config: {}", e))
    }

    /// Convert to runtime configuration.
    pub fn to_config(&self) -> Result<ControllerConfig, String> {
        let config = ControllerConfig {
            listen_addr: self.listen_addr.clone(),
            listen_port: self.listen_port,
            path: self.path.clone(),
            compress: self.compress,
            response_timeout: Duration::from_millis(self.response_timeout_ms),
            max_sessions: self.max_sessions,
            max_body_size: self.max_body_size,
            handshake_grace: Duration::from_millis(self.handshake_grace_ms),
            sentinels: self.sentinels.clone().unwrap_or_default(),
        };
        config.validate()?;
        Ok(config)
    }

    /// Create from runtime configuration.
    pub fn from_config(config: &ControllerConfig) -> Self {
        Self {
            listen_addr: config.listen_addr.clone(),
            listen_port: config.listen_port,
            path: config.path.clone(),
            compress: config.compress,
            response_timeout_ms: config.response_timeout.as_millis() as u64,
            max_sessions: config.max_sessions,
            max_body_size: config.max_body_size,
            handshake_grace_ms: config.handshake_grace.as_millis() as u64,
            sentinels: Some(config.sentinels.clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config = ControllerConfig::new("127.0.0.1", 8080);
        assert!(config.validate().is_ok());
        assert_eq!(config.path, "/gate.php");
        assert_eq!(config.bind_addr(), "127.0.0.1:8080");
        assert_eq!(config.sentinels.len(), 52);
    }

    #[test]
    fn test_config_serialization() {
        let mut config = ControllerConfig::new("0.0.0.0", 8080);
        config.compress = true;
        config.response_timeout = Duration::from_millis(750);
        config.max_body_size = 8 * 1024 * 1024;
        config.handshake_grace = Duration::from_secs(5);

        let text = ControllerConfigFile::from_config(&config).to_toml().unwrap();
        let restored = ControllerConfigFile::from_toml(&text)
            .unwrap()
            .to_config()
            .unwrap();

        assert_eq!(config.listen_addr, restored.listen_addr);
        assert_eq!(config.listen_port, restored.listen_port);
        assert!(restored.compress);
        assert_eq!(restored.response_timeout, Duration::from_millis(750));
        assert_eq!(restored.sentinels, config.sentinels);
        assert_eq!(restored.max_body_size, 8 * 1024 * 1024);
        assert_eq!(restored.handshake_grace, Duration::from_secs(5));
    }

    #[test]
    fn test_minimal_file() {
        let file = ControllerConfigFile::from_toml(
            r#"
            listen_addr = "0.0.0.0"
            listen_port = 80
            sentinels = ["q", "Z"]
            "#,
        )
        .unwrap();

        let config = file.to_config().unwrap();
        assert_eq!(config.path, DEFAULT_PATH);
        assert_eq!(config.max_sessions, 1024);
        assert_eq!(config.max_body_size, DEFAULT_MAX_BODY_SIZE);
        assert_eq!(config.handshake_grace, Duration::from_secs(60));
        assert!(config.sentinels.contains("Z"));
        assert!(!config.sentinels.contains("A"));
    }

    #[test]
    fn test_validation() {
        assert!(ControllerConfig::new("", 80).validate().is_err());

        let mut config = ControllerConfig::default();
        config.path = "gate.php".into();
        assert!(config.validate().is_err());

        let mut config = ControllerConfig::default();
        config.max_sessions = 0;
        assert!(config.validate().is_err());

        let mut config = ControllerConfig::default();
        config.max_body_size = 100;
        assert!(config.validate().is_err());

        let mut config = ControllerConfig::default();
        config.handshake_grace = Duration::ZERO;
        assert!(config.validate().is_err());

        assert!(ControllerConfigFile::from_toml("listen_port = 80").is_err());
        assert!(ControllerConfigFile::from_toml(
            "listen_addr = \"a\"\nlisten_port = 1\nsentinels = []"
        )
        .is_err());
    }
}
