use crate::error::IdentityError;
use crate::store::ConfigSnapshot;
use aes_gcm::{
    Aes256Gcm, Nonce,
    aead::{Aead, KeyInit},
};
use base64::{Engine as _, engine::general_purpose::STANDARD};
use rand::RngCore;
use std::fmt;

const NONCE_LEN: usize = 12;

/// Base64 text of `nonce || ciphertext`, as stored by the persistence layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncryptedBlob(String);

impl EncryptedBlob {
    pub fn new(encoded: impl Into<String>) -> Self {
        Self(encoded.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EncryptedBlob {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// AES-256-GCM envelope for the persisted configuration.
#[derive(Clone)]
pub struct ConfigEncryptor {
    cipher: Aes256Gcm,
}

impl ConfigEncryptor {
    pub fn new(key: &[u8; 32]) -> Self {
        Self {
            cipher: Aes256Gcm::new(&(*key).into()),
        }
    }

    /// Build from a base64-encoded 32-byte key.
    pub fn from_base64(encoded: &str) -> Result<Self, IdentityError> {
        let bytes = STANDARD
            .decode(encoded.trim())
            .map_err(|e| IdentityError::encryption(format!("invalid encryption key: {e}")))?;
        let key: [u8; 32] = bytes
            .try_into()
            .map_err(|_| IdentityError::encryption("encryption key must be 32 bytes"))?;
        Ok(Self::new(&key))
    }

    /// Fresh random key, base64-encoded for `ENCRYPTION_KEY`.
    pub fn generate_key() -> String {
        let mut key = [0u8; 32];
        rand::thread_rng().fill_bytes(&mut key);
        STANDARD.encode(key)
    }

    pub fn encrypt(&self, data: &[u8]) -> Result<Vec<u8>, IdentityError> {
        let mut nonce_bytes = [0u8; NONCE_LEN];
        rand::thread_rng().fill_bytes(&mut nonce_bytes);
        let nonce = Nonce::from_slice(&nonce_bytes);

        let ciphertext = self
            .cipher
            .encrypt(nonce, data)
            .map_err(|e| IdentityError::encryption(e.to_string()))?;

        let mut result = nonce_bytes.to_vec();
        result.extend(ciphertext);
        Ok(result)
    }

    pub fn decrypt(&self, data: &[u8]) -> Result<Vec<u8>, IdentityError> {
        if data.len() < NONCE_LEN {
            return Err(IdentityError::encryption("data too short for decryption"));
        }

        let (nonce_bytes, ciphertext) = data.split_at(NONCE_LEN);
        self.cipher
            .decrypt(Nonce::from_slice(nonce_bytes), ciphertext)
            .map_err(|e| IdentityError::encryption(e.to_string()))
    }

    /// Serialize and encrypt a snapshot for persistence.
    pub fn seal(&self, snapshot: &ConfigSnapshot) -> Result<EncryptedBlob, IdentityError> {
        let json = snapshot
            .to_json_bytes()
            .map_err(|e| IdentityError::encryption(format!("snapshot serialization failed: {e}")))?;
        Ok(EncryptedBlob(STANDARD.encode(self.encrypt(&json)?)))
    }

    /// Inverse of [`Self::seal`]. The returned snapshot is uncommitted (version 0).
    pub fn open(&self, blob: &EncryptedBlob) -> Result<ConfigSnapshot, IdentityError> {
        let raw = STANDARD
            .decode(blob.as_str())
            .map_err(|e| IdentityError::encryption(format!("invalid base64: {e}")))?;
        let json = self.decrypt(&raw)?;
        ConfigSnapshot::from_json_bytes(&json)
            .map_err(|e| IdentityError::encryption(format!("snapshot deserialization failed: {e}")))
    }
}

impl fmt::Debug for ConfigEncryptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ConfigEncryptor([redacted])")
    }
}
