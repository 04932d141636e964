use crate::storage::VerificationPurpose;
use serde::{Deserialize, Serialize};

pub const VERIFICATION_TOKEN_TYPE: &str = "verification";

/// Lifetime of a verification token, independent of the access-token TTL.
pub const VERIFICATION_TOKEN_TTL_SECONDS: i64 = 30 * 60;

/// Claims of an out-of-band verification token.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct VerificationClaims {
    pub iss: String,
    pub sub: String,
    pub aud: String,
    pub exp: i64,
    pub iat: i64,
    pub jti: String,
    pub token_type: String,
    pub purpose: VerificationPurpose,
    pub host: String,
    /// Digest of the nonce stored with the verification request.
    pub nonce: String,
    pub redirect_url: String,
}

impl VerificationClaims {
    pub fn new(
        issuer: String,
        audience: String,
        email: &str,
        purpose: VerificationPurpose,
        host: &str,
        nonce_digest: &str,
        redirect_url: &str,
    ) -> Self {
        let now = chrono::Utc::now().timestamp();
        Self {
            iss: issuer,
            sub: email.to_string(),
            aud: audience,
            exp: now + VERIFICATION_TOKEN_TTL_SECONDS,
            iat: now,
            jti: uuid::Uuid::new_v4().to_string(),
            token_type: VERIFICATION_TOKEN_TYPE.to_string(),
            purpose,
            host: host.to_string(),
            nonce: nonce_digest.to_string(),
            redirect_url: redirect_url.to_string(),
        }
    }

    pub fn email(&self) -> &str {
        &self.sub
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_expiry_is_thirty_minutes() {
        let claims = VerificationClaims::new(
            "issuer".to_string(),
            "client".to_string(),
            "a@example.com",
            VerificationPurpose::BasicAuthSignup,
            "https://auth.example.com",
            "digest",
            "https://app.example.com",
        );
        assert_eq!(claims.exp - claims.iat, 1800);
        assert_eq!(claims.email(), "a@example.com");
    }
}
