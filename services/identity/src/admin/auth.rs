use crate::admin::cookie::read_admin_cookie;
use crate::crypto::{SecretHasher, verify_secret};
use crate::request::RequestContext;
use crate::store::{ConfigSnapshot, keys};
use std::sync::Arc;

pub const ADMIN_SECRET_HEADER: &str = "x-authorizer-admin-secret";

/// Whether `request` comes from the super-administrator.
///
/// Accepts the plain admin secret in [`ADMIN_SECRET_HEADER`], or an admin
/// cookie holding a hash of the stored admin-secret digest.
pub async fn is_super_admin(
    snapshot: &ConfigSnapshot,
    hasher: &Arc<dyn SecretHasher>,
    request: &RequestContext,
) -> bool {
    let digest = snapshot.get_string(keys::ADMIN_SECRET_HASH);
    if digest.is_empty() {
        return false;
    }

    if let Some(secret) = request.header(ADMIN_SECRET_HEADER) {
        return verify_secret(Arc::clone(hasher), secret.to_string(), digest.to_string()).await;
    }

    match read_admin_cookie(snapshot, request) {
        Some(cookie) => verify_secret(Arc::clone(hasher), digest.to_string(), cookie).await,
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::admin::cookie::DEFAULT_ADMIN_COOKIE_NAME;
    use crate::crypto::Argon2Hasher;
    use url::form_urlencoded;

    fn hasher() -> Arc<dyn SecretHasher> {
        Arc::new(Argon2Hasher)
    }

    fn snapshot_with_secret(secret: &str) -> (ConfigSnapshot, String) {
        let digest = Argon2Hasher.hash(secret).unwrap();
        (
            ConfigSnapshot::new().with_string(keys::ADMIN_SECRET_HASH, digest.clone()),
            digest,
        )
    }

    #[tokio::test]
    async fn test_header_secret() {
        let (snapshot, _) = snapshot_with_secret("admin-secret");

        let good = RequestContext::new("localhost").with_header(ADMIN_SECRET_HEADER, "admin-secret");
        let bad = RequestContext::new("localhost").with_header(ADMIN_SECRET_HEADER, "nope");

        assert!(is_super_admin(&snapshot, &hasher(), &good).await);
        assert!(!is_super_admin(&snapshot, &hasher(), &bad).await);
        assert!(!is_super_admin(&snapshot, &hasher(), &RequestContext::new("localhost")).await);
    }

    #[tokio::test]
    async fn test_admin_cookie() {
        let (snapshot, digest) = snapshot_with_secret("admin-secret");
        let cookie_value = Argon2Hasher.hash(&digest).unwrap();
        let encoded: String = form_urlencoded::byte_serialize(cookie_value.as_bytes()).collect();

        let request = RequestContext::new("localhost").with_cookie(DEFAULT_ADMIN_COOKIE_NAME, &encoded);
        assert!(is_super_admin(&snapshot, &hasher(), &request).await);

        let forged = RequestContext::new("localhost").with_cookie(DEFAULT_ADMIN_COOKIE_NAME, "forged");
        assert!(!is_super_admin(&snapshot, &hasher(), &forged).await);
    }

    #[tokio::test]
    async fn test_no_admin_configured() {
        let request = RequestContext::new("localhost").with_header(ADMIN_SECRET_HEADER, "");
        assert!(!is_super_admin(&ConfigSnapshot::new(), &hasher(), &request).await);
    }
}
