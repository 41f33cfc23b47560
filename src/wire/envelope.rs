//! The encrypted, checksummed unit exchanged on every data poll.

use serde::{Deserialize, Serialize};

use crate::crypto::{Checksum, SharedSecret, StreamCipher};
use crate::error::{Error, Result};
use crate::wire::{b64_decode, b64_encode, compress, decompress};

/// Which peer produced an envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    /// Agent request
    ToController,
    /// Controller response
    ToAgent,
}

/// One logical unit of data for a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Envelope {
    /// Hex session identifier the sender believes it is talking on
    pub session_id: String,
    /// Producer of this envelope
    pub direction: Direction,
    /// Payload is zlib-compressed
    pub compressed: bool,
    /// Payload bytes as transmitted
    #[serde(with = "serde_bytes")]
    pub payload: Vec<u8>,
    /// Hex checksum of `payload`
    pub checksum: String,
}

impl Envelope {
    /// Build an envelope around an uncompressed payload.
    pub fn new(session_id: impl Into<String>, direction: Direction, payload: Vec<u8>) -> Self {
        let checksum = Checksum::hex(&payload);
        Self {
            session_id: session_id.into(),
            direction,
            compressed: false,
            payload,
            checksum,
        }
    }

    /// Build an envelope, compressing the payload first when asked to.
    pub fn with_compression(
        session_id: impl Into<String>,
        direction: Direction,
        payload: &[u8],
        compress_payload: bool,
    ) -> Result<Self> {
        if !compress_payload {
            return Ok(Self::new(session_id, direction, payload.to_vec()));
        }
        let mut envelope = Self::new(session_id, direction, compress(payload)?);
        envelope.compressed = true;
        Ok(envelope)
    }

    /// Serialize, encrypt and base64-encode for transport.
    pub fn seal(&self, secret: &SharedSecret) -> Result<String> {
        let encoded = serde_cbor::to_vec(self)?;
        let encrypted = StreamCipher::encrypt(secret, &encoded)?;
        Ok(b64_encode(encrypted))
    }

    /// Reverse [`Envelope::seal`] and verify the payload checksum.
    pub fn open(value: &str, secret: &SharedSecret) -> Result<Self> {
        let encrypted = b64_decode(value)?;
        let decrypted = StreamCipher::decrypt(secret, &encrypted)?;
        let envelope: Envelope = serde_cbor::from_slice(&decrypted)?;

        if Checksum::hex(&envelope.payload) != envelope.checksum {
            return Err(Error::integrity("envelope checksum mismatch"));
        }
        Ok(envelope)
    }

    /// Reject envelopes addressed to another session or sent the wrong way.
    pub fn verify_route(&self, session_id: &str, direction: Direction) -> Result<()> {
        if self.session_id != session_id {
            return Err(Error::integrity(format!(
                "envelope for session {} arrived on {}",
                self.session_id, session_id
            )));
        }
        if self.direction != direction {
            return Err(Error::integrity("envelope direction mismatch"));
        }
        Ok(())
    }

    /// Consume the envelope, inflating the payload if needed.
    pub fn into_payload(self) -> Result<Vec<u8>> {
        if self.compressed {
            decompress(&self.payload)
        } else {
            Ok(self.payload)
        }
    }
}
