use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use ed25519_dalek::pkcs8::spki::der::pem::LineEnding;
use ed25519_dalek::pkcs8::{DecodePublicKey, EncodePublicKey};

use crate::hasher::ContentHasher;

/// Ed25519 verifying key (public).
#[derive(Clone, PartialEq, Eq)]
pub struct VerifyingKey(ed25519_dalek::VerifyingKey);

/// Holder of the ledger's signing keypair.
///
/// One authority is constructed at process start (see
/// [`SigningAuthority::load_or_generate`]) and shared by handle with the
/// ledger and the passport manager. Signatures are Ed25519 over the raw
/// message bytes, transported as standard base64.
pub struct SigningAuthority {
    pub(crate) signing: ed25519_dalek::SigningKey,
    verifying: VerifyingKey,
}

/// Errors from signature checks and key decoding.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum SignatureError {
    #[error("signature is not valid base64 or has the wrong length")]
    MalformedSignature,
    #[error("invalid signature")]
    InvalidSignature,
    #[error("invalid key: {0}")]
    InvalidKey(String),
}

impl SigningAuthority {
    /// Generate a fresh in-memory keypair (not persisted).
    pub fn generate() -> Self {
        let mut csprng = rand::thread_rng();
        Self::from_signing_key(ed25519_dalek::SigningKey::generate(&mut csprng))
    }

    /// Create from raw 32-byte secret.
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self::from_signing_key(ed25519_dalek::SigningKey::from_bytes(&bytes))
    }

    pub(crate) fn from_signing_key(signing: ed25519_dalek::SigningKey) -> Self {
        let verifying = VerifyingKey(signing.verifying_key());
        Self { signing, verifying }
    }

    /// Sign a message, returning the base64 signature.
    pub fn sign(&self, message: &[u8]) -> String {
        use ed25519_dalek::Signer;
        BASE64.encode(self.signing.sign(message).to_bytes())
    }

    /// Verify against this authority's own public key.
    ///
    /// Returns `false` for any failure: bad base64, wrong length, or a
    /// signature that does not match.
    pub fn verify(&self, message: &[u8], signature: &str) -> bool {
        self.verifying.verify(message, signature)
    }

    /// Verify against an explicit public key.
    pub fn verify_with(&self, key: &VerifyingKey, message: &[u8], signature: &str) -> bool {
        key.verify(message, signature)
    }

    /// Like [`verify`](Self::verify) but says why a check failed.
    pub fn verify_strict(&self, message: &[u8], signature: &str) -> Result<(), SignatureError> {
        self.verifying.verify_strict(message, signature)
    }

    /// The public half of the keypair.
    pub fn verifying_key(&self) -> &VerifyingKey {
        &self.verifying
    }

    /// Public key in SubjectPublicKeyInfo PEM form.
    pub fn public_key_pem(&self) -> Result<String, SignatureError> {
        self.verifying.to_pem()
    }
}

impl VerifyingKey {
    /// Boolean verification; every failure mode collapses to `false`.
    pub fn verify(&self, message: &[u8], signature: &str) -> bool {
        self.verify_strict(message, signature).is_ok()
    }

    /// Verify a base64 signature, distinguishing malformed input from a
    /// mismatch.
    pub fn verify_strict(&self, message: &[u8], signature: &str) -> Result<(), SignatureError> {
        use ed25519_dalek::Verifier;
        let bytes = BASE64
            .decode(signature)
            .map_err(|_| SignatureError::MalformedSignature)?;
        let signature = ed25519_dalek::Signature::from_slice(&bytes)
            .map_err(|_| SignatureError::MalformedSignature)?;
        self.0
            .verify(message, &signature)
            .map_err(|_| SignatureError::InvalidSignature)
    }

    /// Parse a SubjectPublicKeyInfo PEM document.
    pub fn from_pem(pem: &str) -> Result<Self, SignatureError> {
        ed25519_dalek::VerifyingKey::from_public_key_pem(pem)
            .map(Self)
            .map_err(|e| SignatureError::InvalidKey(e.to_string()))
    }

    /// Encode as a SubjectPublicKeyInfo PEM document.
    pub fn to_pem(&self) -> Result<String, SignatureError> {
        self.0
            .to_public_key_pem(LineEnding::LF)
            .map_err(|e| SignatureError::InvalidKey(e.to_string()))
    }

    /// Short hex fingerprint (first 8 bytes of the SHA-256 of the key).
    pub fn fingerprint(&self) -> String {
        hex::encode(&ContentHasher::raw_hash(&self.0.to_bytes())[..8])
    }
}

impl std::fmt::Debug for SigningAuthority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SigningAuthority(<redacted>, {:?})", self.verifying)
    }
}

impl std::fmt::Debug for VerifyingKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "VerifyingKey({})", hex::encode(self.0.to_bytes()))
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    fn flip_signature_bit(signature: &str, bit: usize) -> String {
        let mut bytes = BASE64.decode(signature).unwrap();
        bytes[bit / 8] ^= 1 << (bit % 8);
        BASE64.encode(bytes)
    }

    #[test]
    fn sign_and_verify() {
        let authority = SigningAuthority::generate();
        let sig = authority.sign(b"hello world");
        assert!(authority.verify(b"hello world", &sig));
    }

    #[test]
    fn verify_fails_on_wrong_message() {
        let authority = SigningAuthority::generate();
        let sig = authority.sign(b"correct message");
        assert!(!authority.verify(b"wrong message", &sig));
    }

    #[test]
    fn verify_fails_with_wrong_key() {
        let a = SigningAuthority::generate();
        let b = SigningAuthority::generate();
        let sig = a.sign(b"message");
        assert!(!a.verify_with(b.verifying_key(), b"message", &sig));
        assert!(a.verify_with(a.verifying_key(), b"message", &sig));
    }

    #[test]
    fn malformed_signatures_are_false_not_errors() {
        let authority = SigningAuthority::generate();
        assert!(!authority.verify(b"m", "not base64!!"));
        assert!(!authority.verify(b"m", ""));
        assert!(!authority.verify(b"m", &BASE64.encode([0u8; 10])));
    }

    #[test]
    fn strict_verify_explains_failure() {
        let authority = SigningAuthority::generate();
        let sig = authority.sign(b"m");
        assert_eq!(
            authority.verify_strict(b"m", "%%%"),
            Err(SignatureError::MalformedSignature)
        );
        assert_eq!(
            authority.verify_strict(b"other", &sig),
            Err(SignatureError::InvalidSignature)
        );
        assert!(authority.verify_strict(b"m", &sig).is_ok());
    }

    #[test]
    fn from_bytes_is_deterministic() {
        let a = SigningAuthority::from_bytes([7; 32]);
        let b = SigningAuthority::from_bytes([7; 32]);
        assert_eq!(a.verifying_key(), b.verifying_key());
        // Ed25519 signatures are deterministic
        assert_eq!(a.sign(b"x"), b.sign(b"x"));
    }

    #[test]
    fn public_key_pem_roundtrip() {
        let authority = SigningAuthority::generate();
        let pem = authority.public_key_pem().unwrap();
        assert!(pem.starts_with("-----BEGIN PUBLIC KEY-----"));
        let key = VerifyingKey::from_pem(&pem).unwrap();
        assert_eq!(&key, authority.verifying_key());
    }

    #[test]
    fn bad_pem_is_invalid_key() {
        assert!(matches!(
            VerifyingKey::from_pem("garbage"),
            Err(SignatureError::InvalidKey(_))
        ));
    }

    #[test]
    fn debug_redacts_secret() {
        let authority = SigningAuthority::generate();
        assert!(format!("{authority:?}").contains("redacted"));
    }

    #[test]
    fn fingerprint_is_16_hex_chars() {
        let authority = SigningAuthority::generate();
        assert_eq!(authority.verifying_key().fingerprint().len(), 16);
    }

    proptest! {
        #[test]
        fn roundtrip_for_any_message(msg in prop::collection::vec(any::<u8>(), 0..256)) {
            let authority = SigningAuthority::from_bytes([3; 32]);
            let sig = authority.sign(&msg);
            prop_assert!(authority.verify(&msg, &sig));
        }

        #[test]
        fn any_signature_bit_flip_fails(bit in 0usize..512) {
            let authority = SigningAuthority::from_bytes([5; 32]);
            let sig = authority.sign(b"ledger block hash");
            let flipped = flip_signature_bit(&sig, bit);
            prop_assert!(!authority.verify(b"ledger block hash", &flipped));
        }

        #[test]
        fn any_message_bit_flip_fails(msg in prop::collection::vec(any::<u8>(), 1..64), bit in any::<prop::sample::Index>()) {
            let authority = SigningAuthority::from_bytes([9; 32]);
            let sig = authority.sign(&msg);
            let mut tampered = msg.clone();
            let bit = bit.index(msg.len() * 8);
            tampered[bit / 8] ^= 1 << (bit % 8);
            prop_assert!(!authority.verify(&tampered, &sig));
        }
    }
}
