use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::canonical::{canonical_json, CanonicalError};

/// SHA-256 content hasher producing lowercase hex digests.
///
/// Every digest stored by the ledger (block hashes, Merkle nodes, passport
/// hashes) is the hex form produced here.
pub struct ContentHasher;

impl ContentHasher {
    /// Hash raw bytes, returning the 64-character hex digest.
    pub fn hash(data: &[u8]) -> String {
        hex::encode(Self::raw_hash(data))
    }

    /// Hash the canonical JSON encoding of a serializable value.
    pub fn hash_json<T: Serialize + ?Sized>(value: &T) -> Result<String, CanonicalError> {
        let canonical = canonical_json(value)?;
        Ok(Self::hash(canonical.as_bytes()))
    }

    /// Whether `s` has the shape of a digest from [`ContentHasher::hash`]:
    /// 64 hex characters.
    pub fn is_digest(s: &str) -> bool {
        s.len() == 64 && s.bytes().all(|b| b.is_ascii_hexdigit())
    }

    /// Raw 32-byte SHA-256 digest.
    pub fn raw_hash(data: &[u8]) -> [u8; 32] {
        Sha256::digest(data).into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_vector() {
        assert_eq!(
            ContentHasher::hash(b""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn hash_is_deterministic() {
        assert_eq!(ContentHasher::hash(b"hello"), ContentHasher::hash(b"hello"));
    }

    #[test]
    fn digest_shape() {
        assert!(ContentHasher::is_digest(&ContentHasher::hash(b"original")));
        assert!(ContentHasher::is_digest(&"AB".repeat(32)));
        assert!(!ContentHasher::is_digest("abc"));
        assert!(!ContentHasher::is_digest(&"g".repeat(64)));
        // 64 bytes but not 64 hex characters
        assert!(!ContentHasher::is_digest(&format!("{}é", "a".repeat(62))));
    }

    #[test]
    fn hash_json_ignores_key_order() {
        let a = serde_json::json!({"x": 1, "y": 2});
        let b: serde_json::Value = serde_json::from_str(r#"{"y":2,"x":1}"#).unwrap();
        assert_eq!(
            ContentHasher::hash_json(&a).unwrap(),
            ContentHasher::hash_json(&b).unwrap()
        );
    }

    #[test]
    fn hex_digest_is_64_chars() {
        assert_eq!(ContentHasher::hash(b"x").len(), 64);
    }
}
