//! One-round ECDH key exchange disguised as a form post.
//!
//! ## Protocol Flow
//!
//! ```text
//! Agent                                          Controller
//!   |                                                 |
//!   |  POST form: decoys + b64(sentinel)=blob         |
//!   |------------------------------------------------>|
//!   |                                                 |  verify md5, un-XOR key
//!   |                                                 |  generate P-384 keypair
//!   |                                                 |  secret = ECDH(ours, agent)
//!   |                                                 |  id = md5(agent key)
//!   |                                                 |  register session
//!   |  200: b64(xor_key || xor(ctrl key) || id)       |
//!   |<------------------------------------------------|
//!   |                                                 |
//!   |  secret = ECDH(ours, ctrl key)                  |
//!   |                                                 |
//!   |======== envelopes keyed by the shared secret ===|
//! ```

mod agent;
mod controller;

pub use agent::{AgentHandshake, Established};
pub use controller::{accept_handshake, Accepted};

use std::fmt;

use crate::crypto::{Checksum, CHECKSUM_SIZE};

/// Session identifier: the checksum of the agent's marshalled key.
///
/// Displayed and transmitted as 32 lowercase hex characters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SessionId([u8; CHECKSUM_SIZE]);

impl SessionId {
    /// Derive from the agent's marshalled public key.
    pub fn from_marshalled(marshalled: &[u8]) -> Self {
        Self(Checksum::digest(marshalled))
    }

    /// Build from raw checksum bytes.
    pub fn from_raw(raw: &[u8; CHECKSUM_SIZE]) -> Self {
        Self(*raw)
    }

    /// Parse the canonical lowercase hex form; anything else is `None`.
    pub fn parse(text: &str) -> Option<Self> {
        if text.len() != 2 * CHECKSUM_SIZE || text.bytes().any(|b| b.is_ascii_uppercase()) {
            return None;
        }
        let mut raw = [0u8; CHECKSUM_SIZE];
        hex::decode_to_slice(text, &mut raw).ok()?;
        Some(Self(raw))
    }

    /// Raw checksum bytes.
    pub fn to_raw(&self) -> [u8; CHECKSUM_SIZE] {
        self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}
