//! Locating the real parameter in a parsed form.

use crate::obfuscation::SentinelSet;
use crate::wire::b64_decode;

/// What a request carries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Classification<'a> {
    /// A handshake blob under a sentinel key
    Handshake {
        /// Raw form value (base64 handshake blob)
        value: &'a str,
    },
    /// An envelope for a live session
    SessionData {
        /// Hex session id decoded from the key
        id: String,
        /// Raw form value (base64 sealed envelope)
        value: &'a str,
    },
    /// Nothing recognisable
    None,
}

/// Classify ordered form parameters.
///
/// Handshake detection runs over the whole form first; only when no key
/// decodes to a sentinel are keys matched against live sessions via
/// `is_session`. Within each pass the first matching key in form order
/// wins. Keys that are not valid base64 or not UTF-8 are skipped.
pub fn classify<'a, F>(
    params: &'a [(String, String)],
    sentinels: &SentinelSet,
    is_session: F,
) -> Classification<'a>
where
    F: Fn(&str) -> bool,
{
    let decoded: Vec<Option<String>> = params
        .iter()
        .map(|(key, _)| {
            b64_decode(key)
                .ok()
                .and_then(|raw| String::from_utf8(raw).ok())
        })
        .collect();

    for ((_, value), key) in params.iter().zip(&decoded) {
        if let Some(key) = key {
            if sentinels.contains(key) {
                return Classification::Handshake {
                    value: value.as_str(),
                };
            }
        }
    }

    for ((_, value), key) in params.iter().zip(decoded) {
        if let Some(key) = key {
            if is_session(&key) {
                return Classification::SessionData {
                    id: key,
                    value: value.as_str(),
                };
            }
        }
    }

    Classification::None
}
