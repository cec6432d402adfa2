//! Utility functions and helpers.

pub mod http;

use serde::Serialize;
use sha2::{Digest, Sha256};

/// Parse the leading decimal digits of a string, ignoring whatever follows.
///
/// Returns `None` when the string does not start with a digit.
pub fn parse_leading_u32(s: &str) -> Option<u32> {
    let trimmed = s.trim();
    let end = trimmed
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(trimmed.len());
    trimmed[..end].parse().ok()
}

/// Short SHA-256 hex digest of a value's JSON form.
pub fn fingerprint<T: Serialize + ?Sized>(value: &T) -> String {
    let bytes = serde_json::to_vec(value).unwrap_or_default();
    let digest = Sha256::digest(&bytes);
    hex::encode(&digest[..8])
}
