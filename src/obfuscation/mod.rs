//! Decoy form parameters.
//!
//! Every request the agent makes is an ordinary-looking
//! `application/x-www-form-urlencoded` POST. The one parameter that
//! matters hides among randomly generated filler:
//!
//! 1. **Sentinels**: handshake parameters are recognised by a key that
//!    base64-decodes to a member of a small fixed set of strings
//! 2. **Decoys**: filler keys and values are base64 of random strings of
//!    random length, regenerated on every request
//! 3. **Classification**: the controller maps a parsed form to a
//!    handshake, a session poll, or nothing, with a pure function

mod classify;
mod decoy;
mod sentinel;

pub use classify::{classify, Classification};
pub use decoy::{DecoyConfig, DecoyGenerator};
pub use sentinel::SentinelSet;

/// Ordered form parameters as they appear on the wire.
pub type FormParams = Vec<(String, String)>;
