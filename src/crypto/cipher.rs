//! RC4 stream cipher keyed by the session's shared secret.
//!
//! Every call starts a fresh keystream from the full secret, so encryption
//! and decryption are the same operation and carry no state between polls.

use rc4::consts::U48;
use rc4::{KeyInit, Rc4, StreamCipher as _};

use crate::crypto::SharedSecret;
use crate::error::{Error, Result};

/// Stateless RC4 adapter.
pub struct StreamCipher;

impl StreamCipher {
    /// Encrypt `data` under `secret`.
    pub fn encrypt(secret: &SharedSecret, data: &[u8]) -> Result<Vec<u8>> {
        let mut buffer = data.to_vec();
        Self::apply_in_place(secret, &mut buffer)?;
        Ok(buffer)
    }

    /// Decrypt `data` under `secret`.
    pub fn decrypt(secret: &SharedSecret, data: &[u8]) -> Result<Vec<u8>> {
        Self::encrypt(secret, data)
    }

    /// XOR the keystream into `buffer`.
    pub fn apply_in_place(secret: &SharedSecret, buffer: &mut [u8]) -> Result<()> {
        let mut rc4 = Rc4::<U48>::new_from_slice(secret.as_bytes())
            .map_err(|_| Error::crypto("invalid RC4 key length"))?;
        rc4.apply_keystream(buffer);
        Ok(())
    }
}
