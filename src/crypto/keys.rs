//! P-384 key agreement primitives.
//!
//! Provides type-safe wrappers around NIST P-384 ECDH with automatic
//! zeroization of secret material on drop. Public keys travel in their
//! uncompressed SEC1 encoding, which is what the handshake calls the
//! "marshalled" key.

use p384::ecdh::EphemeralSecret as P384Ephemeral;
use p384::elliptic_curve::sec1::ToEncodedPoint;
use rand_core::OsRng;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::crypto::SECRET_SIZE;
use crate::error::{Error, Result};

/// An ephemeral (single-use) P-384 secret key.
///
/// Generated fresh for every handshake on both sides. The inner scalar is
/// zeroized by `p384` when dropped.
pub struct EphemeralSecret(P384Ephemeral);

impl EphemeralSecret {
    /// Generate a new random ephemeral secret from the OS entropy source.
    pub fn random() -> Self {
        Self(P384Ephemeral::random(&mut OsRng))
    }

    /// Generate a keypair in one step.
    pub fn generate() -> (Self, PublicKey) {
        let secret = Self::random();
        let public = PublicKey::from(&secret);
        (secret, public)
    }

    /// Perform P-384 Diffie-Hellman key agreement.
    pub fn diffie_hellman(&self, their_public: &PublicKey) -> SharedSecret {
        let shared = self.0.diffie_hellman(&their_public.0);
        let mut bytes = [0u8; SECRET_SIZE];
        bytes.copy_from_slice(shared.raw_secret_bytes().as_slice());
        SharedSecret(bytes)
    }
}

impl From<&EphemeralSecret> for PublicKey {
    fn from(secret: &EphemeralSecret) -> Self {
        PublicKey(secret.0.public_key())
    }
}

/// A P-384 public key.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PublicKey(p384::PublicKey);

impl PublicKey {
    /// Parse an uncompressed (or compressed) SEC1 encoded point.
    pub fn from_sec1_bytes(bytes: &[u8]) -> Result<Self> {
        p384::PublicKey::from_sec1_bytes(bytes)
            .map(Self)
            .map_err(|_| Error::KeyExchange("unmarshalling failed".into()))
    }

    /// Marshal as an uncompressed SEC1 point (`0x04 || X || Y`).
    pub fn to_sec1_bytes(&self) -> Vec<u8> {
        self.0.to_encoded_point(false).as_bytes().to_vec()
    }
}

/// The raw output of a P-384 key agreement (the shared x-coordinate).
///
/// This is used directly as the stream cipher key. Zeroized on drop and
/// never printed.
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct SharedSecret([u8; SECRET_SIZE]);

impl SharedSecret {
    /// Wrap raw secret bytes.
    pub fn from_bytes(bytes: [u8; SECRET_SIZE]) -> Self {
        Self(bytes)
    }

    /// Get the raw shared secret bytes.
    pub fn as_bytes(&self) -> &[u8; SECRET_SIZE] {
        &self.0
    }
}

impl std::fmt::Debug for SharedSecret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("SharedSecret(<redacted>)")
    }
}
