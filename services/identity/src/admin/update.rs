//! Typed configuration update.
//!
//! Each field has exactly one update path; unknown keys are rejected at
//! deserialization.

use crate::error::IdentityError;
use crate::store::snapshot::MAX_TTL_SECONDS;
use crate::store::{ConfigSnapshot, keys};
use crate::token::claims::is_reserved_claim;
use serde::Deserialize;
use std::fmt;

/// Minimum length of a rotated admin secret.
pub const MIN_ADMIN_SECRET_LEN: usize = 6;

#[derive(Default, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigUpdate {
    // Signing
    pub jwt_type: Option<String>,
    pub jwt_secret: Option<String>,
    pub jwt_private_key: Option<String>,
    pub jwt_public_key: Option<String>,
    pub jwt_role_claim: Option<String>,

    // Admin secret rotation
    pub admin_secret: Option<String>,
    pub old_admin_secret: Option<String>,

    // Roles
    pub roles: Option<Vec<String>>,
    pub default_roles: Option<Vec<String>>,
    pub protected_roles: Option<Vec<String>>,

    // Feature toggles
    pub disable_sign_up: Option<bool>,
    pub disable_email_verification: Option<bool>,
    pub disable_magic_link_login: Option<bool>,
    pub disable_basic_authentication: Option<bool>,

    // Mail
    pub smtp_host: Option<String>,
    pub smtp_port: Option<String>,
    pub smtp_username: Option<String>,
    pub smtp_password: Option<String>,
    pub sender_email: Option<String>,

    // Application
    /// Seconds.
    pub access_token_ttl: Option<i64>,
    pub app_url: Option<String>,
    pub cookie_name: Option<String>,
    pub organization_name: Option<String>,
    pub allowed_origins: Option<Vec<String>>,

    // OAuth providers
    pub google_client_id: Option<String>,
    pub google_client_secret: Option<String>,
    pub github_client_id: Option<String>,
    pub github_client_secret: Option<String>,
}

impl ConfigUpdate {
    /// Parse a JSON update body; unknown or mistyped fields are `InvalidConfiguration`.
    pub fn from_json(raw: &str) -> Result<Self, IdentityError> {
        serde_json::from_str(raw)
            .map_err(|e| IdentityError::invalid_configuration(format!("invalid update: {e}")))
    }

    /// Whether any signing field is present.
    pub const fn touches_signing(&self) -> bool {
        self.jwt_type.is_some()
            || self.jwt_secret.is_some()
            || self.jwt_private_key.is_some()
            || self.jwt_public_key.is_some()
    }

    pub const fn rotates_admin_secret(&self) -> bool {
        self.admin_secret.is_some()
    }

    /// Range and name checks that need no snapshot.
    pub fn validate(&self) -> Result<(), IdentityError> {
        if let Some(ttl) = self.access_token_ttl {
            validate_ttl(keys::ACCESS_TOKEN_TTL, ttl)?;
        }
        if let Some(claim) = &self.jwt_role_claim {
            validate_role_claim(claim)?;
        }
        Ok(())
    }

    /// Copy every non-signing, non-admin field into `snapshot`.
    pub fn apply_settings(&self, snapshot: &mut ConfigSnapshot) {
        let strings = [
            (keys::JWT_ROLE_CLAIM, &self.jwt_role_claim),
            (keys::SMTP_HOST, &self.smtp_host),
            (keys::SMTP_PORT, &self.smtp_port),
            (keys::SMTP_USERNAME, &self.smtp_username),
            (keys::SMTP_PASSWORD, &self.smtp_password),
            (keys::SENDER_EMAIL, &self.sender_email),
            (keys::APP_URL, &self.app_url),
            (keys::COOKIE_NAME, &self.cookie_name),
            (keys::ORGANIZATION_NAME, &self.organization_name),
            (keys::GOOGLE_CLIENT_ID, &self.google_client_id),
            (keys::GOOGLE_CLIENT_SECRET, &self.google_client_secret),
            (keys::GITHUB_CLIENT_ID, &self.github_client_id),
            (keys::GITHUB_CLIENT_SECRET, &self.github_client_secret),
        ];
        for (key, value) in strings {
            if let Some(value) = value {
                snapshot.set_string(key, value.as_str());
            }
        }
        if let Some(ttl) = self.access_token_ttl {
            snapshot.set_string(keys::ACCESS_TOKEN_TTL, ttl.to_string());
        }

        let bools = [
            (keys::DISABLE_SIGN_UP, self.disable_sign_up),
            (keys::DISABLE_EMAIL_VERIFICATION, self.disable_email_verification),
            (keys::DISABLE_MAGIC_LINK_LOGIN, self.disable_magic_link_login),
            (keys::DISABLE_BASIC_AUTHENTICATION, self.disable_basic_authentication),
        ];
        for (key, value) in bools {
            if let Some(value) = value {
                snapshot.set_bool(key, value);
            }
        }

        let lists = [
            (keys::ROLES, &self.roles),
            (keys::DEFAULT_ROLES, &self.default_roles),
            (keys::PROTECTED_ROLES, &self.protected_roles),
            (keys::ALLOWED_ORIGINS, &self.allowed_origins),
        ];
        for (key, value) in lists {
            if let Some(value) = value {
                snapshot.set_list(key, value.clone());
            }
        }
    }
}

impl fmt::Debug for ConfigUpdate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConfigUpdate")
            .field("jwt_type", &self.jwt_type)
            .field("touches_signing", &self.touches_signing())
            .field("rotates_admin_secret", &self.rotates_admin_secret())
            .field("roles", &self.roles)
            .field("default_roles", &self.default_roles)
            .field("protected_roles", &self.protected_roles)
            .finish_non_exhaustive()
    }
}

/// A lifetime must lie within one second and [`MAX_TTL_SECONDS`].
pub fn validate_ttl(key: &str, seconds: i64) -> Result<(), IdentityError> {
    if (1..=MAX_TTL_SECONDS).contains(&seconds) {
        Ok(())
    } else {
        Err(IdentityError::invalid_configuration(format!(
            "{key} must be between 1 and {MAX_TTL_SECONDS} seconds, got {seconds}"
        )))
    }
}

/// The role claim may not shadow a claim the token already carries.
/// Empty and `roles` both mean "no extra claim".
pub fn validate_role_claim(claim: &str) -> Result<(), IdentityError> {
    if claim.is_empty() || claim == "roles" || !is_reserved_claim(claim) {
        Ok(())
    } else {
        Err(IdentityError::invalid_configuration(format!(
            "{} cannot be the reserved claim {claim}",
            keys::JWT_ROLE_CLAIM
        )))
    }
}

/// Default roles must be declared roles; protected roles must be neither.
pub fn validate_role_sets(
    roles: &[String],
    default_roles: &[String],
    protected_roles: &[String],
) -> Result<(), IdentityError> {
    if let Some(role) = default_roles.iter().find(|role| !roles.contains(role)) {
        return Err(IdentityError::invalid_roles(format!(
            "default role {role} is not in roles"
        )));
    }
    if let Some(role) = protected_roles
        .iter()
        .find(|role| roles.contains(role) || default_roles.contains(role))
    {
        return Err(IdentityError::invalid_roles(format!(
            "protected role {role} found in roles or default roles"
        )));
    }
    Ok(())
}
