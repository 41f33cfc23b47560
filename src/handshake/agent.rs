//! Agent side of the handshake.

use crate::crypto::{EphemeralSecret, PublicKey, SharedSecret};
use crate::error::{Error, Result};
use crate::handshake::SessionId;
use crate::wire::{HandshakeBlob, KeyReply};

/// A handshake in flight: the agent's keypair waiting for the reply.
pub struct AgentHandshake {
    secret: EphemeralSecret,
    session_id: SessionId,
}

/// Outcome of a completed handshake.
#[derive(Debug)]
pub struct Established {
    /// Session identifier assigned by the controller
    pub session_id: SessionId,
    /// Shared stream cipher key
    pub secret: SharedSecret,
}

impl AgentHandshake {
    /// Generate a keypair and the blob to post under a sentinel key.
    pub fn start() -> (Self, String) {
        let (secret, public) = EphemeralSecret::generate();
        let marshalled = public.to_sec1_bytes();
        let blob = HandshakeBlob::encode(&marshalled);
        let session_id = SessionId::from_marshalled(&marshalled);

        (Self { secret, session_id }, blob)
    }

    /// The id the controller is expected to assign.
    pub fn expected_session_id(&self) -> &SessionId {
        &self.session_id
    }

    /// Process the controller's response body and derive the secret.
    pub fn finish(self, body: &str) -> Result<Established> {
        let reply = KeyReply::decode(body)?;

        let session_id = SessionId::from_raw(&reply.session_id);
        if session_id != self.session_id {
            return Err(Error::integrity(format!(
                "controller assigned {} for key {}",
                session_id, self.session_id
            )));
        }

        let controller_public = PublicKey::from_sec1_bytes(&reply.marshalled)?;
        let secret = self.secret.diffie_hellman(&controller_public);

        Ok(Established { session_id, secret })
    }
}
