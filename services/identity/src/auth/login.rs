use crate::auth::AuthResponse;
use crate::auth::validation::normalize_email;
use crate::crypto::verify_secret;
use crate::error::IdentityError;
use crate::request::RequestContext;
use crate::service::IdentityService;
use crate::storage::SIGNUP_METHOD_BASIC_AUTH;
use crate::store::keys;
use serde::Deserialize;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, instrument};

#[derive(Clone, Default, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub roles: Vec<String>,
    #[serde(default)]
    pub scope: Vec<String>,
}

impl LoginRequest {
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
            ..Self::default()
        }
    }
}

impl fmt::Debug for LoginRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoginRequest")
            .field("email", &self.email)
            .field("roles", &self.roles)
            .finish_non_exhaustive()
    }
}

impl IdentityService {
    /// Email and password login for a verified user.
    #[instrument(skip(self, request, params), fields(host = %request.host))]
    pub async fn login(
        &self,
        request: &RequestContext,
        params: LoginRequest,
    ) -> Result<AuthResponse, IdentityError> {
        let snapshot = self.store().get_all();
        if snapshot.get_bool(keys::DISABLE_BASIC_AUTHENTICATION) {
            return Err(IdentityError::Disabled(
                "basic authentication is disabled for this instance".to_string(),
            ));
        }

        let email = normalize_email(&params.email)?;
        let bad_credentials = || IdentityError::invalid_input("bad user credentials");

        let user = match self.persistence().get_user_by_email(&email).await {
            Ok(user) => user,
            Err(IdentityError::NotFound(_)) => return Err(bad_credentials()),
            Err(e) => return Err(e),
        };
        let Some(digest) = user.password.as_deref() else {
            return Err(bad_credentials());
        };
        if !user.has_signup_method(SIGNUP_METHOD_BASIC_AUTH) {
            return Err(bad_credentials());
        }
        if !user.is_verified() {
            return Err(IdentityError::invalid_input("email not verified"));
        }
        if !verify_secret(Arc::clone(self.hasher()), params.password.clone(), digest.to_string()).await {
            debug!(user_id = %user.id, "Password mismatch");
            return Err(bad_credentials());
        }

        let roles = if params.roles.is_empty() {
            user.roles.clone()
        } else if params.roles.iter().all(|role| user.roles.contains(role)) {
            params.roles.clone()
        } else {
            return Err(IdentityError::Unauthorized);
        };

        self.login_response(request, user, &roles, &params.scope, "Logged in successfully")
            .await
    }
}
