//! XOR-obfuscated public key framing used only by the handshake.

use crate::crypto::{Checksum, SecureRandom, CHECKSUM_SIZE};
use crate::error::{Error, Result};
use crate::wire::{b64_decode, b64_encode};

/// Length of the repeating XOR key.
pub const XOR_KEY_SIZE: usize = 8;

/// XOR `data` against `key`, repeating the key every 8 bytes.
///
/// The operation is its own inverse.
pub fn xor_obfuscate(key: &[u8; XOR_KEY_SIZE], data: &[u8]) -> Vec<u8> {
    data.iter()
        .zip(key.iter().cycle())
        .map(|(byte, k)| byte ^ k)
        .collect()
}

/// Agent-to-controller handshake blob.
pub struct HandshakeBlob;

impl HandshakeBlob {
    /// Frame a marshalled public key under a fresh random XOR key.
    pub fn encode(marshalled: &[u8]) -> String {
        Self::encode_with_key(&SecureRandom::bytes(), marshalled)
    }

    /// Frame a marshalled public key under the given XOR key.
    pub fn encode_with_key(xor_key: &[u8; XOR_KEY_SIZE], marshalled: &[u8]) -> String {
        let mut pool = Vec::with_capacity(XOR_KEY_SIZE + marshalled.len() + CHECKSUM_SIZE);
        pool.extend_from_slice(xor_key);
        pool.extend_from_slice(&xor_obfuscate(xor_key, marshalled));
        let sum = Checksum::digest(&pool);
        pool.extend_from_slice(&sum);
        b64_encode(pool)
    }

    /// Recover the marshalled public key.
    ///
    /// The checksum is verified before the XOR key is trusted.
    pub fn decode(value: &str) -> Result<Vec<u8>> {
        let raw = b64_decode(value)?;
        if raw.len() <= XOR_KEY_SIZE + CHECKSUM_SIZE {
            return Err(Error::invalid(format!(
                "handshake blob too short: {} bytes",
                raw.len()
            )));
        }

        let (body, sum) = raw.split_at(raw.len() - CHECKSUM_SIZE);
        if !Checksum::verify(body, sum) {
            return Err(Error::integrity("Data integrity mismatch"));
        }

        let (key, obfuscated) = body.split_at(XOR_KEY_SIZE);
        let mut xor_key = [0u8; XOR_KEY_SIZE];
        xor_key.copy_from_slice(key);
        Ok(xor_obfuscate(&xor_key, obfuscated))
    }
}

/// Controller-to-agent handshake reply: the controller's public key plus
/// the raw session identifier bytes in clear.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyReply {
    /// Controller's marshalled public key
    pub marshalled: Vec<u8>,
    /// Raw session id (checksum of the agent's marshalled key)
    pub session_id: [u8; CHECKSUM_SIZE],
}

impl KeyReply {
    /// Encode under a fresh random XOR key.
    pub fn encode(&self) -> String {
        let xor_key: [u8; XOR_KEY_SIZE] = SecureRandom::bytes();
        let mut pool =
            Vec::with_capacity(XOR_KEY_SIZE + self.marshalled.len() + CHECKSUM_SIZE);
        pool.extend_from_slice(&xor_key);
        pool.extend_from_slice(&xor_obfuscate(&xor_key, &self.marshalled));
        pool.extend_from_slice(&self.session_id);
        b64_encode(pool)
    }

    /// Parse a response body (trailing newline allowed).
    pub fn decode(body: &str) -> Result<Self> {
        let raw = b64_decode(body)?;
        if raw.len() <= XOR_KEY_SIZE + CHECKSUM_SIZE {
            return Err(Error::invalid(format!(
                "key reply too short: {} bytes",
                raw.len()
            )));
        }

        let (body, id) = raw.split_at(raw.len() - CHECKSUM_SIZE);
        let (key, obfuscated) = body.split_at(XOR_KEY_SIZE);
        let mut xor_key = [0u8; XOR_KEY_SIZE];
        xor_key.copy_from_slice(key);
        let mut session_id = [0u8; CHECKSUM_SIZE];
        session_id.copy_from_slice(id);

        Ok(Self {
            marshalled: xor_obfuscate(&xor_key, obfuscated),
            session_id,
        })
    }
}
