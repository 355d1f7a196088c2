//! Content fingerprinting for duplicate detection.
//!
//! The fingerprint is computed from the original byte stream, before any
//! compression, so two uploads of the same photo collide even when their
//! compressed derivatives differ.

use sha2::{Digest, Sha256};

use bienlai_core::models::ContentFingerprint;

/// Compute the SHA-256 fingerprint of an image payload.
///
/// Deterministic and pure: identical byte streams always yield identical
/// fingerprints. Does not look at metadata or filenames.
pub fn fingerprint(bytes: &[u8]) -> ContentFingerprint {
    let digest = Sha256::digest(bytes);
    ContentFingerprint::from_digest_bytes(&digest)
}
