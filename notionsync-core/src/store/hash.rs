use sha2::{Digest, Sha256};

/// Hex SHA-256 of `bytes`, used as content address and change detector.
pub fn content_hash(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}
