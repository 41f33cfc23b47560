//! Cryptographic primitives for formwire.
//!
//! This module provides:
//! - NIST P-384 Elliptic Curve Diffie-Hellman key agreement
//! - RC4 stream encryption keyed by the raw shared secret
//! - MD5 checksums for integrity tags and session identifiers
//! - Secure random number generation
//!
//! Every operation is a pure function of its inputs apart from key
//! generation, which draws from the OS entropy source.

mod checksum;
mod cipher;
mod keys;
mod random;

pub use checksum::Checksum;
pub use cipher::StreamCipher;
pub use keys::{EphemeralSecret, PublicKey, SharedSecret};
pub use random::SecureRandom;

/// Size of the raw P-384 shared secret in bytes
pub const SECRET_SIZE: usize = 48;

/// Size of an uncompressed SEC1 P-384 public key
pub const MARSHALLED_KEY_SIZE: usize = 97;

/// Size of an MD5 digest
pub const CHECKSUM_SIZE: usize = 16;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_key_exchange_and_encryption() {
        // Agent side
        let (agent_secret, agent_public) = EphemeralSecret::generate();

        // Controller side, fed the agent's marshalled key
        let (controller_secret, controller_public) = EphemeralSecret::generate();
        let agent_key = PublicKey::from_sec1_bytes(&agent_public.to_sec1_bytes()).unwrap();
        let controller_shared = controller_secret.diffie_hellman(&agent_key);

        // Agent derives from the controller's marshalled key
        let controller_key =
            PublicKey::from_sec1_bytes(&controller_public.to_sec1_bytes()).unwrap();
        let agent_shared = agent_secret.diffie_hellman(&controller_key);

        assert_eq!(agent_shared.as_bytes(), controller_shared.as_bytes());

        let ciphertext = StreamCipher::encrypt(&agent_shared, b"PING").unwrap();
        let plaintext = StreamCipher::decrypt(&controller_shared, &ciphertext).unwrap();
        assert_eq!(plaintext, b"PING");

        // Session id is the checksum of the agent's marshalled key
        let id = Checksum::hex(&agent_public.to_sec1_bytes());
        assert_eq!(id.len(), 32);
    }
}
