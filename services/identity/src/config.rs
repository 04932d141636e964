//! Process bootstrap configuration.
//!
//! Loaded once from the environment at startup and turned into the first
//! [`ConfigSnapshot`]. After that the snapshot in the store is authoritative;
//! these values are not consulted again.

use crate::admin::cookie::{DEFAULT_ADMIN_COOKIE_NAME, DEFAULT_COOKIE_NAME};
use crate::admin::update::{validate_role_claim, validate_role_sets, validate_ttl};
use crate::crypto::{ConfigEncryptor, JwtAlgorithm, KeyManager, SecretHasher};
use crate::error::IdentityError;
use crate::store::{ConfigSnapshot, keys};
use std::env;
use std::fmt;
use std::time::Duration;

#[derive(Clone)]
pub struct Config {
    // Server settings
    pub host: String,
    pub port: u16,

    // Identity
    pub client_id: String,
    pub jwt_issuer: String,
    pub app_url: String,
    pub organization_name: String,

    // Signing
    pub jwt_type: JwtAlgorithm,
    pub jwt_secret: String,
    pub jwt_private_key: String,
    pub jwt_public_key: String,
    pub jwt_role_claim: String,
    pub access_token_ttl: Duration,
    pub session_ttl: Duration,

    // Security
    pub admin_secret: String,
    /// Base64 AES-256 key for the persisted configuration.
    pub encryption_key: String,

    // Roles
    pub roles: Vec<String>,
    pub default_roles: Vec<String>,
    pub protected_roles: Vec<String>,
    pub allowed_origins: Vec<String>,

    // Cookies
    pub cookie_name: String,
    pub admin_cookie_name: String,

    // Mail
    pub smtp_host: String,
    pub smtp_port: String,
    pub smtp_username: String,
    pub smtp_password: String,
    pub sender_email: String,

    // Feature toggles
    pub disable_sign_up: bool,
    pub disable_email_verification: bool,
    pub disable_magic_link_login: bool,
    pub disable_basic_authentication: bool,

    // Runtime
    pub session_sweep_interval: Duration,
    pub worker_queue_capacity: usize,
    pub worker_count: usize,
    pub log_level: String,
    pub log_json: bool,
}

impl Config {
    /// Load configuration from `.env` and the process environment.
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfiguration` when a variable is present but invalid.
    pub fn from_env() -> Result<Self, IdentityError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Load configuration through `lookup`, which returns a variable's value.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, IdentityError> {
        let string = |name: &str, default: &str| lookup(name).unwrap_or_else(|| default.to_string());
        let list = |name: &str, default: &str| split_list(&string(name, default));

        let jwt_type: JwtAlgorithm = string("JWT_TYPE", "RS256").parse()?;
        let encryption_key = lookup("ENCRYPTION_KEY").unwrap_or_else(ConfigEncryptor::generate_key);

        Ok(Self {
            host: string("HOST", "0.0.0.0"),
            port: parse_env(&lookup, "PORT", 8080)?,
            client_id: lookup("CLIENT_ID").unwrap_or_else(|| uuid::Uuid::new_v4().to_string()),
            jwt_issuer: string("JWT_ISSUER", ""),
            app_url: string("APP_URL", ""),
            organization_name: string("ORGANIZATION_NAME", "Authorizer"),
            jwt_type,
            jwt_secret: string("JWT_SECRET", ""),
            jwt_private_key: string("JWT_PRIVATE_KEY", ""),
            jwt_public_key: string("JWT_PUBLIC_KEY", ""),
            jwt_role_claim: string("JWT_ROLE_CLAIM", "role"),
            access_token_ttl: Duration::from_secs(parse_env(&lookup, "ACCESS_TOKEN_TTL", 1800)?),
            session_ttl: Duration::from_secs(parse_env(&lookup, "SESSION_TTL", 30 * 24 * 60 * 60)?),
            admin_secret: string("ADMIN_SECRET", "admin"),
            encryption_key,
            roles: list("ROLES", "user"),
            default_roles: list("DEFAULT_ROLES", "user"),
            protected_roles: list("PROTECTED_ROLES", ""),
            allowed_origins: list("ALLOWED_ORIGINS", "*"),
            cookie_name: string("COOKIE_NAME", DEFAULT_COOKIE_NAME),
            admin_cookie_name: string("ADMIN_COOKIE_NAME", DEFAULT_ADMIN_COOKIE_NAME),
            smtp_host: string("SMTP_HOST", ""),
            smtp_port: string("SMTP_PORT", ""),
            smtp_username: string("SMTP_USERNAME", ""),
            smtp_password: string("SMTP_PASSWORD", ""),
            sender_email: string("SENDER_EMAIL", ""),
            disable_sign_up: parse_env(&lookup, "DISABLE_SIGN_UP", false)?,
            disable_email_verification: parse_env(&lookup, "DISABLE_EMAIL_VERIFICATION", false)?,
            disable_magic_link_login: parse_env(&lookup, "DISABLE_MAGIC_LINK_LOGIN", false)?,
            disable_basic_authentication: parse_env(&lookup, "DISABLE_BASIC_AUTHENTICATION", false)?,
            session_sweep_interval: Duration::from_secs(parse_env(&lookup, "SESSION_SWEEP_INTERVAL", 300)?),
            worker_queue_capacity: parse_env(&lookup, "WORKER_QUEUE_CAPACITY", 1024)?,
            worker_count: parse_env(&lookup, "WORKER_COUNT", 4)?,
            log_level: string("LOG_LEVEL", "info"),
            log_json: parse_env(&lookup, "LOG_JSON", false)?,
        })
    }

    pub fn encryptor(&self) -> Result<ConfigEncryptor, IdentityError> {
        ConfigEncryptor::from_base64(&self.encryption_key)
    }

    /// Build the first snapshot, generating signing material when none is given.
    ///
    /// # Errors
    ///
    /// Fails when the provided key material, lifetimes, role claim or role
    /// sets are invalid.
    pub fn bootstrap_snapshot(&self, hasher: &dyn SecretHasher) -> Result<ConfigSnapshot, IdentityError> {
        for (key, ttl) in [
            (keys::ACCESS_TOKEN_TTL, self.access_token_ttl),
            (keys::SESSION_TTL, self.session_ttl),
        ] {
            let seconds = i64::try_from(ttl.as_secs()).unwrap_or(i64::MAX);
            validate_ttl(key, seconds)?;
        }
        validate_role_claim(&self.jwt_role_claim)?;

        let mut snapshot = ConfigSnapshot::new()
            .with_string(keys::CLIENT_ID, self.client_id.as_str())
            .with_string(keys::JWT_ISSUER, self.jwt_issuer.as_str())
            .with_string(keys::JWT_ROLE_CLAIM, self.jwt_role_claim.as_str())
            .with_string(keys::APP_URL, self.app_url.as_str())
            .with_string(keys::ORGANIZATION_NAME, self.organization_name.as_str())
            .with_string(keys::ACCESS_TOKEN_TTL, self.access_token_ttl.as_secs().to_string())
            .with_string(keys::SESSION_TTL, self.session_ttl.as_secs().to_string())
            .with_string(keys::ADMIN_SECRET_HASH, hasher.hash(&self.admin_secret)?)
            .with_string(keys::COOKIE_NAME, self.cookie_name.as_str())
            .with_string(keys::ADMIN_COOKIE_NAME, self.admin_cookie_name.as_str())
            .with_string(keys::SMTP_HOST, self.smtp_host.as_str())
            .with_string(keys::SMTP_PORT, self.smtp_port.as_str())
            .with_string(keys::SMTP_USERNAME, self.smtp_username.as_str())
            .with_string(keys::SMTP_PASSWORD, self.smtp_password.as_str())
            .with_string(keys::SENDER_EMAIL, self.sender_email.as_str())
            .with_bool(keys::DISABLE_SIGN_UP, self.disable_sign_up)
            .with_bool(keys::DISABLE_EMAIL_VERIFICATION, self.disable_email_verification)
            .with_bool(keys::DISABLE_MAGIC_LINK_LOGIN, self.disable_magic_link_login)
            .with_bool(keys::DISABLE_BASIC_AUTHENTICATION, self.disable_basic_authentication)
            .with_list(keys::ROLES, self.roles.clone())
            .with_list(keys::DEFAULT_ROLES, self.default_roles.clone())
            .with_list(keys::PROTECTED_ROLES, self.protected_roles.clone())
            .with_list(keys::ALLOWED_ORIGINS, self.allowed_origins.clone());

        let provided = if self.jwt_type.is_hmac() {
            !self.jwt_secret.is_empty()
        } else {
            !self.jwt_private_key.is_empty() && !self.jwt_public_key.is_empty()
        };

        if provided {
            let (secret, private_pem, public_pem) = if self.jwt_type.is_hmac() {
                (self.jwt_secret.as_str(), "", "")
            } else {
                ("", self.jwt_private_key.as_str(), self.jwt_public_key.as_str())
            };
            KeyManager::validate_material(self.jwt_type, secret, private_pem, public_pem)?;
            snapshot.set_string(keys::JWT_TYPE, self.jwt_type.as_str());
            snapshot.set_string(keys::JWT_SECRET, secret);
            snapshot.set_string(keys::JWT_PRIVATE_KEY, private_pem);
            snapshot.set_string(keys::JWT_PUBLIC_KEY, public_pem);
            let jwks = KeyManager::build_public_key_set(&snapshot)?;
            snapshot.set_string(keys::JWK, jwks.to_json());
        } else {
            let material = KeyManager::generate(self.jwt_type, &self.client_id)?;
            KeyManager::install(&mut snapshot, &material);
        }

        if !snapshot.is_mail_configured() {
            snapshot.set_bool(keys::DISABLE_EMAIL_VERIFICATION, true);
            snapshot.set_bool(keys::DISABLE_MAGIC_LINK_LOGIN, true);
        }

        validate_role_sets(&self.roles, &self.default_roles, &self.protected_roles)?;
        Ok(snapshot)
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("client_id", &self.client_id)
            .field("jwt_type", &self.jwt_type)
            .field("roles", &self.roles)
            .field("default_roles", &self.default_roles)
            .field("session_sweep_interval", &self.session_sweep_interval)
            .finish_non_exhaustive()
    }
}

/// Parse environment variable with default value.
fn parse_env<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &str,
    default: T,
) -> Result<T, IdentityError>
where
    T::Err: fmt::Display,
{
    match lookup(name) {
        Some(val) => val
            .trim()
            .parse()
            .map_err(|e| IdentityError::invalid_configuration(format!("Invalid {name}: {e}"))),
        None => Ok(default),
    }
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(ToString::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::Argon2Hasher;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> Result<Config, IdentityError> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        Config::from_lookup(|name| map.get(name).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = config(&[]).unwrap();
        assert_eq!(config.port, 8080);
        assert_eq!(config.jwt_type, JwtAlgorithm::RS256);
        assert_eq!(config.roles, vec!["user"]);
        assert!(config.encryptor().is_ok());
    }

    #[test]
    fn test_invalid_values_rejected() {
        assert!(config(&[("PORT", "eighty")]).is_err());
        assert!(matches!(
            config(&[("JWT_TYPE", "none")]),
            Err(IdentityError::UnsupportedAlgorithm(_))
        ));
    }

    #[test]
    fn test_lists_are_trimmed() {
        let config = config(&[("ROLES", " user, admin ,,editor")]).unwrap();
        assert_eq!(config.roles, vec!["user", "admin", "editor"]);
    }

    #[test]
    fn test_bootstrap_generates_missing_keys() {
        let config = config(&[("JWT_TYPE", "ES384"), ("CLIENT_ID", "client-7")]).unwrap();
        let snapshot = config.bootstrap_snapshot(&Argon2Hasher).unwrap();

        assert_eq!(snapshot.get_string(keys::JWT_TYPE), "ES384");
        assert!(!snapshot.get_string(keys::JWT_PRIVATE_KEY).is_empty());
        assert!(snapshot.get_string(keys::JWT_SECRET).is_empty());
        assert!(snapshot.get_string(keys::JWK).contains("client-7"));
        assert!(snapshot.get_bool(keys::DISABLE_EMAIL_VERIFICATION));
        assert!(Argon2Hasher.verify("admin", snapshot.get_string(keys::ADMIN_SECRET_HASH)));
    }

    #[test]
    fn test_bootstrap_uses_provided_secret() {
        let config = config(&[("JWT_TYPE", "HS256"), ("JWT_SECRET", "provided-secret")]).unwrap();
        let snapshot = config.bootstrap_snapshot(&Argon2Hasher).unwrap();
        assert_eq!(snapshot.get_string(keys::JWT_SECRET), "provided-secret");
    }

    #[test]
    fn test_bootstrap_rejects_bad_roles() {
        let config = config(&[
            ("JWT_TYPE", "HS256"),
            ("ROLES", "user"),
            ("DEFAULT_ROLES", "user,editor"),
        ])
        .unwrap();
        assert!(matches!(
            config.bootstrap_snapshot(&Argon2Hasher),
            Err(IdentityError::InvalidRoleConfiguration(_))
        ));
    }

    #[test]
    fn test_bootstrap_rejects_out_of_range_lifetimes_and_reserved_role_claim() {
        for vars in [
            [("JWT_TYPE", "HS256"), ("ACCESS_TOKEN_TTL", "0")],
            [("JWT_TYPE", "HS256"), ("SESSION_TTL", "9223372036854775807")],
            [("JWT_TYPE", "HS256"), ("JWT_ROLE_CLAIM", "sub")],
        ] {
            let config = config(&vars).unwrap();
            assert!(matches!(
                config.bootstrap_snapshot(&Argon2Hasher),
                Err(IdentityError::InvalidConfiguration(_))
            ));
        }
    }
}
