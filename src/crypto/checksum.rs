//! MD5 integrity checksums.
//!
//! MD5 is used only as an integrity tag and as the session identifier
//! derivation, never for authentication.

use md5::{Digest, Md5};

use crate::crypto::CHECKSUM_SIZE;

/// Checksum helpers.
pub struct Checksum;

impl Checksum {
    /// Raw 16-byte digest.
    pub fn digest(data: &[u8]) -> [u8; CHECKSUM_SIZE] {
        Md5::digest(data).into()
    }

    /// Lowercase hex digest (32 characters).
    pub fn hex(data: &[u8]) -> String {
        hex::encode(Self::digest(data))
    }

    /// Check a raw digest against `data`.
    pub fn verify(data: &[u8], expected: &[u8]) -> bool {
        Self::digest(data).as_slice() == expected
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_vector() {
        assert_eq!(Checksum::hex(b""), "d41d8cd98f00b204e9800998ecf8427e");
        assert_eq!(
            Checksum::hex(b"The quick brown fox jumps over the lazy dog"),
            "9e107d9d372bb6826bd81d3542a419d6"
        );
    }

    #[test]
    fn test_verify() {
        let sum = Checksum::digest(b"payload");
        assert!(Checksum::verify(b"payload", &sum));
        assert!(!Checksum::verify(b"payloaD", &sum));
        assert!(!Checksum::verify(b"payload", &sum[..8]));
    }

    #[test]
    fn test_hex_matches_digest() {
        let data = b"marshalled key";
        assert_eq!(Checksum::hex(data), hex::encode(Checksum::digest(data)));
        assert_eq!(Checksum::hex(data).len(), 2 * CHECKSUM_SIZE);
    }
}
