//! End-user flows built on the token service and session registry.

pub mod login;
pub mod logout;
pub mod magic_link;
pub mod session;
pub mod signup;
pub mod validation;
pub mod verify_email;

#[cfg(test)]
pub(crate) mod fixture;

use crate::admin::Cookie;
use crate::storage::User;
use crate::token::AuthToken;
use serde::{Deserialize, Serialize};

pub use login::LoginRequest;
pub use magic_link::MagicLinkLoginRequest;
pub use signup::SignUpRequest;

/// Response of every user-facing flow.
#[derive(Debug, Clone, Serialize)]
pub struct AuthResponse {
    pub message: String,
    #[serde(flatten)]
    pub token: Option<AuthToken>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<User>,
    /// Cookie to set on the transport response.
    #[serde(skip)]
    pub cookie: Option<Cookie>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub redirect_uri: Option<String>,
}

impl AuthResponse {
    pub fn message(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            token: None,
            user: None,
            cookie: None,
            redirect_uri: None,
        }
    }

    #[must_use]
    pub fn with_user(mut self, user: User) -> Self {
        self.user = Some(user);
        self
    }

    #[must_use]
    pub fn with_cookie(mut self, cookie: Cookie) -> Self {
        self.cookie = Some(cookie);
        self
    }

    pub fn access_token(&self) -> Option<&str> {
        self.token.as_ref().map(|token| token.access_token.as_str())
    }
}

/// Scope and roles requested for a session check.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SessionQuery {
    #[serde(default)]
    pub roles: Vec<String>,
    #[serde(default)]
    pub scope: Vec<String>,
}
