//! Decoy parameter generation.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::crypto::SecureRandom;
use crate::obfuscation::{FormParams, SentinelSet};
use crate::wire::b64_encode;

/// Minimum number of parameters in any request (real one included).
pub const MIN_PARAMETERS: usize = 3;

/// Maximum number of parameters in any request.
pub const MAX_PARAMETERS: usize = 64;

/// Decoy key draws at one length before the length limit grows.
const KEY_ATTEMPTS_PER_LEN: usize = 32;

/// Shape of the filler parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecoyConfig {
    /// Fewest parameters per request, real one included (at least 3)
    #[serde(default = "default_min_parameters")]
    pub min_parameters: usize,
    /// Most parameters per request
    #[serde(default = "default_max_parameters")]
    pub max_parameters: usize,
    /// Longest decoy key before base64
    #[serde(default = "default_key_len")]
    pub key_len: usize,
    /// Longest decoy value before base64
    #[serde(default = "default_value_len")]
    pub value_len: usize,
}

fn default_min_parameters() -> usize {
    MIN_PARAMETERS
}

fn default_max_parameters() -> usize {
    12
}

fn default_key_len() -> usize {
    16
}

fn default_value_len() -> usize {
    64
}

impl Default for DecoyConfig {
    fn default() -> Self {
        Self {
            min_parameters: default_min_parameters(),
            max_parameters: default_max_parameters(),
            key_len: default_key_len(),
            value_len: default_value_len(),
        }
    }
}

impl DecoyConfig {
    /// Fixed parameter count, mostly useful for tests.
    pub fn exact(count: usize) -> Self {
        Self {
            min_parameters: count,
            max_parameters: count,
            ..Self::default()
        }
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), String> {
        if self.min_parameters < MIN_PARAMETERS {
            return Err(format!("min_parameters must be at least {}", MIN_PARAMETERS));
        }
        if self.max_parameters < self.min_parameters {
            return Err("max_parameters cannot be below min_parameters".into());
        }
        if self.max_parameters > MAX_PARAMETERS {
            return Err(format!("max_parameters cannot exceed {}", MAX_PARAMETERS));
        }
        if self.key_len < 2 {
            return Err("key_len must be at least 2".into());
        }
        if self.value_len == 0 {
            return Err("value_len cannot be zero".into());
        }
        Ok(())
    }
}

/// Builds a fresh decoy parameter set around one real parameter.
#[derive(Debug, Clone)]
pub struct DecoyGenerator {
    config: DecoyConfig,
    sentinels: SentinelSet,
}

impl DecoyGenerator {
    /// Create a generator that never emits a sentinel-decoding key.
    pub fn new(config: DecoyConfig, sentinels: SentinelSet) -> Self {
        Self { config, sentinels }
    }

    /// Get the configuration.
    pub fn config(&self) -> &DecoyConfig {
        &self.config
    }

    /// Produce the ordered parameter list.
    ///
    /// `real_key` is the plain (not yet base64-encoded) key; `real_value` is
    /// sent as-is. The real pair lands at a uniformly random position.
    /// Decoy values stay short whatever the size of the real value.
    pub fn build(&self, real_key: &str, real_value: &str) -> FormParams {
        let min = self.config.min_parameters.clamp(MIN_PARAMETERS, MAX_PARAMETERS);
        let max = self.config.max_parameters.clamp(min, MAX_PARAMETERS);
        let total = SecureRandom::between(min, max);
        let position = SecureRandom::below(total);
        let value_len = self.config.value_len.max(1);

        let mut used: HashSet<String> = HashSet::with_capacity(total);
        used.insert(real_key.to_string());

        let mut params = Vec::with_capacity(total);
        for index in 0..total {
            if index == position {
                params.push((b64_encode(real_key), real_value.to_string()));
                continue;
            }

            let key = self.decoy_key(&used);
            used.insert(key.clone());
            let value = SecureRandom::alphanumeric(SecureRandom::between(1, value_len));
            params.push((b64_encode(key), b64_encode(value)));
        }
        params
    }

    /// Draw a key that is neither a sentinel nor already used.
    ///
    /// The length limit grows after repeated collisions, so a sentinel set
    /// covering every short key cannot stall the loop.
    fn decoy_key(&self, used: &HashSet<String>) -> String {
        let mut attempts = 0;
        loop {
            let max_len = self.config.key_len.max(2) + attempts / KEY_ATTEMPTS_PER_LEN;
            let candidate = SecureRandom::alphanumeric(SecureRandom::between(2, max_len));
            if !self.sentinels.contains(&candidate) && !used.contains(&candidate) {
                return candidate;
            }
            attempts += 1;
        }
    }
}
