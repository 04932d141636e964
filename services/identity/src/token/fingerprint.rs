use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use rand::Rng;
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

/// Session fingerprints and verification nonces.
///
/// Both are 32 random bytes, base64url-encoded; only their SHA-256 digest is
/// used as a lookup key or embedded where the raw value must stay private.
pub struct FingerprintGenerator;

impl FingerprintGenerator {
    pub fn generate() -> String {
        let random_bytes: [u8; 32] = rand::thread_rng().r#gen();
        URL_SAFE_NO_PAD.encode(random_bytes)
    }

    pub fn hash(value: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(value.as_bytes());
        URL_SAFE_NO_PAD.encode(hasher.finalize())
    }

    /// Whether `raw` hashes to `digest`, compared in constant time.
    pub fn matches(raw: &str, digest: &str) -> bool {
        Self::hash(raw).as_bytes().ct_eq(digest.as_bytes()).into()
    }

    /// A fresh nonce and its digest.
    pub fn nonce() -> (String, String) {
        let nonce = Self::generate();
        let digest = Self::hash(&nonce);
        (nonce, digest)
    }
}
