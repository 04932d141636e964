use crate::error::IdentityError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

pub const ACCESS_TOKEN_TYPE: &str = "access_token";

/// Claim names owned by [`AccessClaims`]; a custom claim must not reuse them.
pub const RESERVED_CLAIMS: &[&str] = &[
    "iss",
    "sub",
    "aud",
    "exp",
    "iat",
    "nbf",
    "jti",
    "token_type",
    "roles",
    "scope",
    "email",
    "fingerprint",
];

pub fn is_reserved_claim(name: &str) -> bool {
    RESERVED_CLAIMS.contains(&name)
}

/// Claims carried by an access token.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AccessClaims {
    // Standard JWT claims
    pub iss: String,
    pub sub: String,
    pub aud: String,
    pub exp: i64,
    pub iat: i64,
    pub jti: String,

    pub token_type: String,
    pub roles: Vec<String>,
    pub scope: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    /// Raw session fingerprint; its hash keys the session registry.
    pub fingerprint: String,

    #[serde(flatten)]
    pub custom: HashMap<String, serde_json::Value>,
}

impl AccessClaims {
    /// Fails when `now + ttl_seconds` does not fit a timestamp.
    pub fn new(
        issuer: String,
        subject: String,
        audience: String,
        ttl_seconds: i64,
    ) -> Result<Self, IdentityError> {
        let now = chrono::Utc::now().timestamp();
        let exp = now
            .checked_add(ttl_seconds)
            .ok_or_else(|| IdentityError::invalid_input(format!("token lifetime {ttl_seconds}s overflows")))?;
        Ok(Self {
            iss: issuer,
            sub: subject,
            aud: audience,
            exp,
            iat: now,
            jti: uuid::Uuid::new_v4().to_string(),
            token_type: ACCESS_TOKEN_TYPE.to_string(),
            roles: Vec::new(),
            scope: Vec::new(),
            email: None,
            fingerprint: String::new(),
            custom: HashMap::new(),
        })
    }

    pub fn with_roles(mut self, roles: Vec<String>) -> Self {
        self.roles = roles;
        self
    }

    pub fn with_scope(mut self, scope: Vec<String>) -> Self {
        self.scope = scope;
        self
    }

    pub fn with_email(mut self, email: String) -> Self {
        self.email = Some(email);
        self
    }

    pub fn with_fingerprint(mut self, fingerprint: String) -> Self {
        self.fingerprint = fingerprint;
        self
    }

    pub fn with_custom_claim(mut self, key: String, value: serde_json::Value) -> Self {
        self.custom.insert(key, value);
        self
    }

    pub fn is_expired(&self) -> bool {
        self.exp < chrono::Utc::now().timestamp()
    }

    /// Seconds left before expiry at `now`; negative once expired.
    pub const fn remaining_at(&self, now: i64) -> i64 {
        self.exp - now
    }
}
