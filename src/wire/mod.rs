//! Wire formats.
//!
//! Two framings travel inside HTTP form values and response bodies:
//!
//! ```text
//! Handshake blob (agent -> controller):
//!   b64( xor_key[8] || xor(marshalled_pubkey, xor_key) || md5(first two)[16] )
//!
//! Key reply (controller -> agent):
//!   b64( xor_key[8] || xor(marshalled_pubkey, xor_key) || md5(agent_pubkey)[16] )
//!
//! Envelope (both directions, after the handshake):
//!   b64( rc4(secret, cbor{session_id, direction, compressed, payload, checksum}) )
//! ```

mod blob;
mod compress;
mod envelope;

pub use blob::{xor_obfuscate, HandshakeBlob, KeyReply, XOR_KEY_SIZE};
pub use compress::{compress, decompress, MAX_DECOMPRESSED_SIZE};
pub use envelope::{Direction, Envelope};

use base64::{engine::general_purpose::STANDARD, Engine};

use crate::error::Result;

/// Standard base64 with padding, as used for every form key and value.
pub fn b64_encode(data: impl AsRef<[u8]>) -> String {
    STANDARD.encode(data)
}

/// Decode standard base64, tolerating surrounding whitespace.
pub fn b64_decode(data: &str) -> Result<Vec<u8>> {
    Ok(STANDARD.decode(data.trim())?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_b64_trailing_newline() {
        let encoded = format!("{}\n", b64_encode(b"session"));
        assert_eq!(b64_decode(&encoded).unwrap(), b"session");
    }

    #[test]
    fn test_b64_rejects_garbage() {
        assert!(b64_decode("not base64!").is_err());
    }
}
