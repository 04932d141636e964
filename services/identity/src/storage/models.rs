use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Why a verification request exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerificationPurpose {
    BasicAuthSignup,
    MagicLinkLogin,
    ForgotPassword,
    UpdateEmail,
}

impl VerificationPurpose {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::BasicAuthSignup => "basic_auth_signup",
            Self::MagicLinkLogin => "magic_link_login",
            Self::ForgotPassword => "forgot_password",
            Self::UpdateEmail => "update_email",
        }
    }
}

impl fmt::Display for VerificationPurpose {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub const SIGNUP_METHOD_BASIC_AUTH: &str = "basic_auth";
pub const SIGNUP_METHOD_MAGIC_LINK: &str = "magic_link_login";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub given_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub family_name: Option<String>,
    pub roles: Vec<String>,
    /// Argon2 digest; absent for passwordless users.
    #[serde(skip_serializing)]
    pub password: Option<String>,
    pub email_verified_at: Option<DateTime<Utc>>,
    /// Comma-separated signup methods, e.g. `basic_auth,magic_link_login`.
    pub signup_methods: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn new(email: impl Into<String>, roles: Vec<String>, signup_method: &str) -> Self {
        let now = Utc::now();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            email: email.into(),
            given_name: None,
            family_name: None,
            roles,
            password: None,
            email_verified_at: None,
            signup_methods: signup_method.to_string(),
            created_at: now,
            updated_at: now,
        }
    }

    pub const fn is_verified(&self) -> bool {
        self.email_verified_at.is_some()
    }

    pub fn has_signup_method(&self, method: &str) -> bool {
        self.signup_methods.split(',').any(|m| m == method)
    }

    pub fn add_signup_method(&mut self, method: &str) {
        if !self.has_signup_method(method) {
            if !self.signup_methods.is_empty() {
                self.signup_methods.push(',');
            }
            self.signup_methods.push_str(method);
        }
    }
}

/// Pending out-of-band confirmation. Consumed at most once.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationRequest {
    pub id: String,
    pub token: String,
    pub purpose: VerificationPurpose,
    pub email: String,
    /// Raw nonce; the token carries only its digest.
    pub nonce: String,
    pub redirect_uri: String,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl VerificationRequest {
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}

/// Audit row written after a successful login.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionRecord {
    pub id: String,
    pub user_id: String,
    pub user_agent: String,
    pub ip: String,
    pub created_at: DateTime<Utc>,
}

impl SessionRecord {
    pub fn new(user_id: impl Into<String>, user_agent: impl Into<String>, ip: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            user_id: user_id.into(),
            user_agent: user_agent.into(),
            ip: ip.into(),
            created_at: Utc::now(),
        }
    }
}
