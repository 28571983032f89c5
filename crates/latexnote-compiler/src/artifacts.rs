use sha2::{Digest, Sha256};

/// Hex-encoded SHA-256 of a produced artifact, used to identify PDFs in logs.
pub fn fingerprint(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}
