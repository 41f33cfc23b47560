//! The fixed set of strings that mark a handshake parameter.

use serde::{Deserialize, Serialize};

use crate::crypto::SecureRandom;
use crate::error::{Error, Result};

const DEFAULT_CHARSET: &str = "ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz";

/// Ordered, non-empty set of sentinel strings.
///
/// A form key is a handshake parameter when its base64-decoded text equals
/// one of these. The default set is every ASCII letter as a one-character
/// string, in `A..Z` then `a..z` order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<String>", into = "Vec<String>")]
pub struct SentinelSet(Vec<String>);

impl SentinelSet {
    /// Build from explicit strings.
    pub fn new(sentinels: Vec<String>) -> Result<Self> {
        if sentinels.is_empty() {
            return Err(Error::config("sentinel set cannot be empty"));
        }
        if sentinels.iter().any(String::is_empty) {
            return Err(Error::config("sentinel strings cannot be empty"));
        }
        for (i, s) in sentinels.iter().enumerate() {
            if sentinels[..i].contains(s) {
                return Err(Error::config(format!("duplicate sentinel {:?}", s)));
            }
        }
        Ok(Self(sentinels))
    }

    /// One single-character sentinel per character of `charset`.
    pub fn from_charset(charset: &str) -> Result<Self> {
        Self::new(charset.chars().map(String::from).collect())
    }

    /// Whether `candidate` is a sentinel.
    pub fn contains(&self, candidate: &str) -> bool {
        self.0.iter().any(|s| s == candidate)
    }

    /// Pick a sentinel uniformly at random.
    pub fn choose(&self) -> &str {
        &self.0[SecureRandom::below(self.0.len())]
    }

    /// Sentinels in scan order.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    /// Number of sentinels.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Always false; the set is never empty.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Default for SentinelSet {
    fn default() -> Self {
        Self(DEFAULT_CHARSET.chars().map(String::from).collect())
    }
}

impl TryFrom<Vec<String>> for SentinelSet {
    type Error = Error;

    fn try_from(value: Vec<String>) -> Result<Self> {
        Self::new(value)
    }
}

impl From<SentinelSet> for Vec<String> {
    fn from(value: SentinelSet) -> Self {
        value.0
    }
}
