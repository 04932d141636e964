use crate::error::IdentityError;
use crate::token::claims::{AccessClaims, is_reserved_claim};
use std::collections::HashMap;

pub struct AccessTokenBuilder {
    issuer: String,
    audience: String,
    subject: Option<String>,
    fingerprint: Option<String>,
    ttl_seconds: i64,
    roles: Vec<String>,
    scope: Vec<String>,
    email: Option<String>,
    custom_claims: HashMap<String, serde_json::Value>,
}

impl AccessTokenBuilder {
    pub fn new(issuer: impl Into<String>, audience: impl Into<String>) -> Self {
        Self {
            issuer: issuer.into(),
            audience: audience.into(),
            subject: None,
            fingerprint: None,
            ttl_seconds: 1800,
            roles: Vec::new(),
            scope: Vec::new(),
            email: None,
            custom_claims: HashMap::new(),
        }
    }

    pub fn subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = Some(subject.into());
        self
    }

    pub fn fingerprint(mut self, fingerprint: impl Into<String>) -> Self {
        self.fingerprint = Some(fingerprint.into());
        self
    }

    pub const fn ttl_seconds(mut self, ttl: i64) -> Self {
        self.ttl_seconds = ttl;
        self
    }

    pub fn roles(mut self, roles: Vec<String>) -> Self {
        self.roles = roles;
        self
    }

    pub fn scope(mut self, scope: Vec<String>) -> Self {
        self.scope = scope;
        self
    }

    pub fn email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    /// Also publish the roles under `claim`. Reserved claim names are skipped.
    pub fn role_claim(mut self, claim: &str) -> Self {
        if !claim.is_empty() && !is_reserved_claim(claim) {
            self.custom_claims
                .insert(claim.to_string(), serde_json::json!(self.roles.clone()));
        }
        self
    }

    pub fn build(self) -> Result<AccessClaims, IdentityError> {
        let subject = self
            .subject
            .ok_or_else(|| IdentityError::internal("access token subject is required"))?;
        let fingerprint = self
            .fingerprint
            .ok_or_else(|| IdentityError::internal("access token fingerprint is required"))?;

        let mut claims = AccessClaims::new(self.issuer, subject, self.audience, self.ttl_seconds)?
            .with_roles(self.roles)
            .with_scope(self.scope)
            .with_fingerprint(fingerprint);

        if let Some(email) = self.email {
            claims = claims.with_email(email);
        }

        for (key, value) in self.custom_claims {
            claims = claims.with_custom_claim(key, value);
        }

        Ok(claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_basic() {
        let claims = AccessTokenBuilder::new("issuer", "client")
            .subject("user-123")
            .fingerprint("fp")
            .roles(vec!["user".to_string()])
            .role_claim("https://example.com/roles")
            .ttl_seconds(3600)
            .build()
            .unwrap();

        assert_eq!(claims.sub, "user-123");
        assert_eq!(claims.exp - claims.iat, 3600);
        assert_eq!(claims.custom["https://example.com/roles"][0], "user");
    }

    #[test]
    fn test_builder_requires_subject_and_fingerprint() {
        assert!(AccessTokenBuilder::new("i", "c").fingerprint("fp").build().is_err());
        assert!(AccessTokenBuilder::new("i", "c").subject("u").build().is_err());
    }

    #[test]
    fn test_reserved_role_claim_is_skipped() {
        let claims = AccessTokenBuilder::new("issuer", "client")
            .subject("user-123")
            .fingerprint("fp")
            .roles(vec!["user".to_string()])
            .role_claim("sub")
            .build()
            .unwrap();

        assert!(claims.custom.is_empty());
        let json = serde_json::to_string(&claims).unwrap();
        assert_eq!(json.matches("\"sub\"").count(), 1);
    }
}
