//! Content hashing for artifact identity
//!
//! The SHA-256 digest over the exact bytes received is the stable identity
//! of an artifact, independent of filename or declared mime type.

use sha2::{Digest, Sha256};

/// Calculate SHA-256 hash of a byte buffer
///
/// Processes the buffer in 1MB chunks and returns the lowercase
/// hex-encoded digest.
pub fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    for chunk in bytes.chunks(1024 * 1024) {
        hasher.update(chunk);
    }
    let digest = hasher.finalize();
    digest.iter().map(|b| format!("{:02x}", b)).collect()
}
