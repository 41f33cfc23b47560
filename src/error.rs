//! Error types for the formwire channel.

use thiserror::Error;

/// Result type alias for formwire operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while establishing or driving a channel.
#[derive(Error, Debug)]
pub enum Error {
    /// Cryptographic operation failed
    #[error("cryptographic error: {0}")]
    Crypto(String),

    /// Key agreement failed (bad peer key, unmarshal failure)
    #[error("key exchange failed: {0}")]
    KeyExchange(String),

    /// Checksum over a handshake blob or envelope did not match
    #[error("integrity check failed: {0}")]
    Integrity(String),

    /// Structurally invalid message (unparseable envelope, short blob)
    #[error("invalid message format: {0}")]
    InvalidMessage(String),

    /// Base64 or form decoding failed
    #[error("encoding error: {0}")]
    Encoding(String),

    /// No live session matches the given identifier
    #[error("unknown session: {0}")]
    UnknownSession(String),

    /// Operation on a session that is pending or already closed
    #[error("client not connected")]
    NotConnected,

    /// A bounded wait elapsed
    #[error("timeout after {0}ms")]
    Timeout(u64),

    /// Socket-level I/O error
    #[error("network error: {0}")]
    Network(#[from] std::io::Error),

    /// HTTP exchange failed (unreachable host, non-200 status)
    #[error("http error: {0}")]
    Http(String),

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// The embedding application refused the new session
    #[error("session rejected: {0}")]
    SessionRejected(String),

    /// Too many live sessions
    #[error("session limit of {0} reached")]
    SessionLimit(usize),

    /// The controller no longer accepts new sessions
    #[error("service is shutting down")]
    ShuttingDown,
}

impl Error {
    /// Create a new cryptographic error
    pub fn crypto(msg: impl Into<String>) -> Self {
        Error::Crypto(msg.into())
    }

    /// Create a new integrity error
    pub fn integrity(msg: impl Into<String>) -> Self {
        Error::Integrity(msg.into())
    }

    /// Create a new invalid-message error
    pub fn invalid(msg: impl Into<String>) -> Self {
        Error::InvalidMessage(msg.into())
    }

    /// Create a new HTTP transport error
    pub fn http(msg: impl Into<String>) -> Self {
        Error::Http(msg.into())
    }

    /// Create a new configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Error::Config(msg.into())
    }

    /// Transport failures the agent may simply retry.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Error::Http(_) | Error::Network(_) | Error::Timeout(_))
    }

    /// Check if this error is a checksum mismatch
    pub fn is_integrity_failure(&self) -> bool {
        matches!(self, Error::Integrity(_))
    }

    /// Whether the controller must tear the session down after this error.
    pub fn closes_session(&self) -> bool {
        matches!(
            self,
            Error::Integrity(_)
                | Error::InvalidMessage(_)
                | Error::Encoding(_)
                | Error::Crypto(_)
                | Error::NotConnected
        )
    }
}

impl From<base64::DecodeError> for Error {
    fn from(e: base64::DecodeError) -> Self {
        Error::Encoding(e.to_string())
    }
}

impl From<serde_cbor::Error> for Error {
    fn from(e: serde_cbor::Error) -> Self {
        Error::InvalidMessage(e.to_string())
    }
}

#[cfg(feature = "agent")]
impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        Error::Http(e.to_string())
    }
}
