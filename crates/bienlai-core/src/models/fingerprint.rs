use serde::{Deserialize, Serialize};
use std::fmt;

/// Content-addressable fingerprint of the original (pre-compression) image
/// bytes, used as the natural key for duplicate detection.
///
/// Always a 64-character lowercase hex SHA-256 digest. Computed once per
/// upload attempt and persisted alongside the expense record; never mutated.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContentFingerprint(String);

impl ContentFingerprint {
    /// Length of the hex-encoded digest.
    pub const HEX_LEN: usize = 64;

    /// Wrap an already-computed digest. Normalizes to lowercase and rejects
    /// anything that is not exactly 64 hex characters.
    pub fn from_hex(hex: &str) -> Result<Self, String> {
        let normalized = hex.to_lowercase();
        if normalized.len() != Self::HEX_LEN
            || !normalized.chars().all(|c| c.is_ascii_hexdigit())
        {
            return Err(format!("Invalid fingerprint: {}", hex));
        }
        Ok(ContentFingerprint(normalized))
    }

    /// Construct from raw digest bytes (32 bytes for SHA-256).
    pub fn from_digest_bytes(bytes: &[u8]) -> Self {
        ContentFingerprint(hex::encode(bytes))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ContentFingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
