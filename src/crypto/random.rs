//! Secure random number generation.
//!
//! Provides cryptographically secure random bytes using the operating
//! system's entropy source. Used for key generation, XOR obfuscation keys
//! and decoy parameters alike.

use rand::distributions::{Alphanumeric, DistString};
use rand::Rng;
use rand_core::{OsRng, RngCore};

/// Cryptographically secure random number generator.
///
/// Wraps the OS-provided entropy source (e.g., /dev/urandom on Unix,
/// BCryptGenRandom on Windows).
pub struct SecureRandom;

impl SecureRandom {
    /// Fill a buffer with cryptographically secure random bytes.
    pub fn fill(dest: &mut [u8]) {
        OsRng.fill_bytes(dest);
    }

    /// Generate a fixed-size array of random bytes.
    pub fn bytes<const N: usize>() -> [u8; N] {
        let mut buf = [0u8; N];
        OsRng.fill_bytes(&mut buf);
        buf
    }

    /// Generate a random u64.
    pub fn u64() -> u64 {
        OsRng.next_u64()
    }

    /// Uniform integer in `0..upper`. Returns 0 when `upper` is 0.
    pub fn below(upper: usize) -> usize {
        if upper == 0 {
            return 0;
        }
        OsRng.gen_range(0..upper)
    }

    /// Uniform integer in `min..=max`. Returns `min` when the range is empty.
    pub fn between(min: usize, max: usize) -> usize {
        if min >= max {
            return min;
        }
        OsRng.gen_range(min..=max)
    }

    /// Random ASCII alphanumeric string of exactly `len` characters.
    pub fn alphanumeric(len: usize) -> String {
        Alphanumeric.sample_string(&mut OsRng, len)
    }
}
