//! Configuration key names.
//!
//! String keys live in the string map, toggles in the bool map and role
//! sets in the list map. Unknown keys read as the typed zero value.

// String settings
pub const JWT_TYPE: &str = "JWT_TYPE";
pub const JWT_SECRET: &str = "JWT_SECRET";
pub const JWT_PRIVATE_KEY: &str = "JWT_PRIVATE_KEY";
pub const JWT_PUBLIC_KEY: &str = "JWT_PUBLIC_KEY";
pub const JWT_ROLE_CLAIM: &str = "JWT_ROLE_CLAIM";
pub const JWK: &str = "JWK";
pub const JWT_ISSUER: &str = "JWT_ISSUER";
pub const CLIENT_ID: &str = "CLIENT_ID";
pub const ADMIN_SECRET_HASH: &str = "ADMIN_SECRET_HASH";
pub const ACCESS_TOKEN_TTL: &str = "ACCESS_TOKEN_TTL";
pub const SESSION_TTL: &str = "SESSION_TTL";
pub const COOKIE_NAME: &str = "COOKIE_NAME";
pub const ADMIN_COOKIE_NAME: &str = "ADMIN_COOKIE_NAME";
pub const APP_URL: &str = "APP_URL";
pub const SMTP_HOST: &str = "SMTP_HOST";
pub const SMTP_PORT: &str = "SMTP_PORT";
pub const SMTP_USERNAME: &str = "SMTP_USERNAME";
pub const SMTP_PASSWORD: &str = "SMTP_PASSWORD";
pub const SENDER_EMAIL: &str = "SENDER_EMAIL";
pub const ORGANIZATION_NAME: &str = "ORGANIZATION_NAME";
pub const GOOGLE_CLIENT_ID: &str = "GOOGLE_CLIENT_ID";
pub const GOOGLE_CLIENT_SECRET: &str = "GOOGLE_CLIENT_SECRET";
pub const GITHUB_CLIENT_ID: &str = "GITHUB_CLIENT_ID";
pub const GITHUB_CLIENT_SECRET: &str = "GITHUB_CLIENT_SECRET";

// Feature toggles
pub const DISABLE_SIGN_UP: &str = "DISABLE_SIGN_UP";
pub const DISABLE_EMAIL_VERIFICATION: &str = "DISABLE_EMAIL_VERIFICATION";
pub const DISABLE_MAGIC_LINK_LOGIN: &str = "DISABLE_MAGIC_LINK_LOGIN";
pub const DISABLE_BASIC_AUTHENTICATION: &str = "DISABLE_BASIC_AUTHENTICATION";

// Role and origin lists
pub const ROLES: &str = "ROLES";
pub const DEFAULT_ROLES: &str = "DEFAULT_ROLES";
pub const PROTECTED_ROLES: &str = "PROTECTED_ROLES";
pub const ALLOWED_ORIGINS: &str = "ALLOWED_ORIGINS";

/// Fragments marking a key whose value must never be logged.
pub(crate) const SENSITIVE_FRAGMENTS: &[&str] = &["SECRET", "PRIVATE", "PASSWORD"];
