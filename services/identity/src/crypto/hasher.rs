use crate::error::IdentityError;
use argon2::password_hash::SaltString;
use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier};
use rand::rngs::OsRng;
use std::sync::Arc;
use tokio::task;

/// One-way hashing of passwords and the admin secret.
pub trait SecretHasher: Send + Sync {
    fn hash(&self, plain: &str) -> Result<String, IdentityError>;

    /// False for a mismatch and for an unparsable digest alike.
    fn verify(&self, plain: &str, digest: &str) -> bool;
}

/// Argon2id with default parameters, PHC string output.
#[derive(Debug, Clone, Default)]
pub struct Argon2Hasher;

impl SecretHasher for Argon2Hasher {
    fn hash(&self, plain: &str) -> Result<String, IdentityError> {
        let salt = SaltString::generate(&mut OsRng);
        Argon2::default()
            .hash_password(plain.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| IdentityError::internal(format!("failed to hash secret: {e}")))
    }

    fn verify(&self, plain: &str, digest: &str) -> bool {
        PasswordHash::new(digest).is_ok_and(|parsed| {
            Argon2::default()
                .verify_password(plain.as_bytes(), &parsed)
                .is_ok()
        })
    }
}

/// Hash `plain` on the blocking pool so Argon2 never stalls a runtime worker.
pub async fn hash_secret(hasher: Arc<dyn SecretHasher>, plain: String) -> Result<String, IdentityError> {
    task::spawn_blocking(move || hasher.hash(&plain))
        .await
        .map_err(|e| IdentityError::internal(format!("hashing task failed: {e}")))?
}

/// Blocking-pool counterpart of [`SecretHasher::verify`]; a failed task is a mismatch.
pub async fn verify_secret(hasher: Arc<dyn SecretHasher>, plain: String, digest: String) -> bool {
    task::spawn_blocking(move || hasher.verify(&plain, &digest))
        .await
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_and_verify() {
        let hasher = Argon2Hasher;
        let digest = hasher.hash("admin-secret").unwrap();

        assert!(digest.starts_with("$argon2id$"));
        assert!(hasher.verify("admin-secret", &digest));
        assert!(!hasher.verify("other-secret", &digest));
    }

    #[test]
    fn test_salts_differ() {
        let hasher = Argon2Hasher;
        assert_ne!(hasher.hash("same").unwrap(), hasher.hash("same").unwrap());
    }

    #[test]
    fn test_garbage_digest_fails_closed() {
        assert!(!Argon2Hasher.verify("anything", "not-a-phc-string"));
        assert!(!Argon2Hasher.verify("", ""));
    }

    #[tokio::test]
    async fn test_blocking_pool_helpers() {
        let hasher: Arc<dyn SecretHasher> = Arc::new(Argon2Hasher);
        let digest = hash_secret(Arc::clone(&hasher), "pool-secret".to_string())
            .await
            .unwrap();

        assert!(verify_secret(Arc::clone(&hasher), "pool-secret".to_string(), digest.clone()).await);
        assert!(!verify_secret(hasher, "wrong".to_string(), digest).await);
    }
}
