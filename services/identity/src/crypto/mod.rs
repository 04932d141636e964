//! Key management and at-rest protection.
//!
//! Algorithm classification, signing key generation and validation, JWK set
//! derivation, the AES-256-GCM envelope for the persisted configuration and
//! the secret hashing capability.

pub mod algorithm;
pub mod encryptor;
pub mod hasher;
pub mod jwks;
pub mod keys;

pub use algorithm::{AlgorithmFamily, JwtAlgorithm, is_ecdsa, is_hmac, is_rsa};
pub use encryptor::{ConfigEncryptor, EncryptedBlob};
pub use hasher::{Argon2Hasher, SecretHasher, hash_secret, verify_secret};
pub use jwks::{Jwk, Jwks};
pub use keys::{GeneratedKeys, KeyManager, KeyMaterial, SigningKeyMaterial, SigningKeys};
