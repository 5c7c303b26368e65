//! Upload checksums

use sha2::{Digest, Sha256};

/// Hex-encoded SHA-256 of the uploaded bytes
#[must_use]
pub fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_digest() {
        assert_eq!(
            sha256_hex(b"abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn different_bytes_differ() {
        assert_ne!(sha256_hex(b"brief v1"), sha256_hex(b"brief v2"));
    }
}
