//! Controller side of the handshake.

use crate::crypto::{EphemeralSecret, PublicKey, SharedSecret};
use crate::error::Result;
use crate::handshake::SessionId;
use crate::wire::{HandshakeBlob, KeyReply};

/// A verified handshake, ready to become a session.
#[derive(Debug)]
pub struct Accepted {
    /// Checksum of the agent's marshalled key
    pub session_id: SessionId,
    /// Shared stream cipher key
    pub secret: SharedSecret,
    /// Base64 response body (without trailing newline)
    pub reply: String,
}

/// Verify an agent's handshake blob and answer it.
///
/// Fails on malformed base64, checksum mismatch or an unparseable key;
/// nothing is created in that case.
pub fn accept_handshake(blob: &str) -> Result<Accepted> {
    let marshalled = HandshakeBlob::decode(blob)?;
    let agent_public = PublicKey::from_sec1_bytes(&marshalled)?;

    let (controller_secret, controller_public) = EphemeralSecret::generate();
    let secret = controller_secret.diffie_hellman(&agent_public);
    let session_id = SessionId::from_marshalled(&marshalled);

    let reply = KeyReply {
        marshalled: controller_public.to_sec1_bytes(),
        session_id: session_id.to_raw(),
    }
    .encode();

    Ok(Accepted {
        session_id,
        secret,
        reply,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::wire::{b64_decode, b64_encode};

    #[test]
    fn test_rejects_tampered_blob() {
        let (_, public) = EphemeralSecret::generate();
        let blob = HandshakeBlob::encode(&public.to_sec1_bytes());
        let mut raw = b64_decode(&blob).unwrap();
        raw[20] ^= 0x80;

        let err = accept_handshake(&b64_encode(&raw)).unwrap_err();
        assert!(err.is_integrity_failure());
    }

    #[test]
    fn test_rejects_valid_frame_with_bad_key() {
        let blob = HandshakeBlob::encode(b"not an elliptic curve point");
        assert!(matches!(
            accept_handshake(&blob),
            Err(Error::KeyExchange(_))
        ));
    }

    #[test]
    fn test_rejects_malformed_base64() {
        assert!(matches!(
            accept_handshake("***"),
            Err(Error::Encoding(_))
        ));
    }
}
