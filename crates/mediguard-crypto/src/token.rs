//! HMAC-SHA256 integrity tokens.
//!
//! A token is the lowercase hex HMAC of a canonical payload under a shared
//! secret. Unlike a signature it can only be checked by holders of the
//! secret. The secret is kept in a `SecretString` so it never shows up in
//! debug output or logs.

use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretString};
use sha2::Sha256;
use subtle::ConstantTimeEq;

type HmacSha256 = Hmac<Sha256>;

/// Shared secret used to derive and check integrity tokens.
#[derive(Clone)]
pub struct HmacKey {
    secret: SecretString,
}

impl HmacKey {
    #[must_use]
    pub fn new(secret: SecretString) -> Self {
        Self { secret }
    }

    /// Compute the hex token for `payload`.
    pub fn token(&self, payload: &[u8]) -> String {
        let mut mac = HmacSha256::new_from_slice(self.secret.expose_secret().as_bytes())
            .expect("HMAC can take key of any size");
        mac.update(payload);
        hex::encode(mac.finalize().into_bytes())
    }

    /// Recompute the token for `payload` and compare it to `token` in
    /// constant time.
    pub fn verify(&self, payload: &[u8], token: &str) -> bool {
        constant_time_eq(&self.token(payload), token)
    }
}

impl std::fmt::Debug for HmacKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "HmacKey(<redacted>)")
    }
}

/// Constant-time string comparison. Length differences return early, which
/// only reveals the length.
pub fn constant_time_eq(a: &str, b: &str) -> bool {
    a.as_bytes().ct_eq(b.as_bytes()).into()
}
