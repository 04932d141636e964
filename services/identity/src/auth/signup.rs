use crate::auth::AuthResponse;
use crate::auth::validation::{normalize_email, resolve_roles, validate_password};
use crate::crypto::hash_secret;
use crate::error::IdentityError;
use crate::request::RequestContext;
use crate::service::IdentityService;
use crate::storage::{SIGNUP_METHOD_BASIC_AUTH, User, VerificationPurpose};
use crate::store::keys;
use serde::Deserialize;
use std::fmt;
use std::sync::Arc;
use tracing::{info, instrument};

/// Basic-auth signup input.
#[derive(Clone, Default, Deserialize)]
pub struct SignUpRequest {
    pub email: String,
    pub password: String,
    pub confirm_password: String,
    #[serde(default)]
    pub given_name: Option<String>,
    #[serde(default)]
    pub family_name: Option<String>,
    #[serde(default)]
    pub roles: Vec<String>,
    #[serde(default)]
    pub scope: Vec<String>,
    #[serde(default)]
    pub redirect_uri: Option<String>,
}

impl SignUpRequest {
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        let password = password.into();
        Self {
            email: email.into(),
            confirm_password: password.clone(),
            password,
            ..Self::default()
        }
    }
}

impl fmt::Debug for SignUpRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SignUpRequest")
            .field("email", &self.email)
            .field("roles", &self.roles)
            .field("scope", &self.scope)
            .finish_non_exhaustive()
    }
}

impl IdentityService {
    /// Register a user with email and password.
    ///
    /// With email verification enabled the response carries only a message
    /// and a verification mail is queued; otherwise the user is logged in.
    #[instrument(skip(self, request, params), fields(host = %request.host))]
    pub async fn signup(
        &self,
        request: &RequestContext,
        params: SignUpRequest,
    ) -> Result<AuthResponse, IdentityError> {
        let snapshot = self.store().get_all();
        if snapshot.get_bool(keys::DISABLE_SIGN_UP) {
            return Err(IdentityError::Disabled("signup is disabled for this instance".to_string()));
        }
        if snapshot.get_bool(keys::DISABLE_BASIC_AUTHENTICATION) {
            return Err(IdentityError::Disabled(
                "basic authentication is disabled for this instance".to_string(),
            ));
        }

        validate_password(&params.password, &params.confirm_password)?;
        let email = normalize_email(&params.email)?;

        match self.persistence().get_user_by_email(&email).await {
            Ok(existing) if existing.is_verified() => {
                return Err(IdentityError::Conflict(format!("{email} has already signed up")));
            }
            Ok(_) => {
                return Err(IdentityError::Conflict(format!(
                    "{email} has already signed up. please complete the email verification process or reset the password"
                )));
            }
            Err(IdentityError::NotFound(_)) => {}
            Err(e) => return Err(e),
        }

        let roles = resolve_roles(
            &params.roles,
            snapshot.get_list(keys::ROLES),
            snapshot.get_list(keys::DEFAULT_ROLES),
        )?;

        let verification_disabled = snapshot.get_bool(keys::DISABLE_EMAIL_VERIFICATION);
        let mut user = User::new(email.as_str(), roles, SIGNUP_METHOD_BASIC_AUTH);
        user.given_name = params.given_name;
        user.family_name = params.family_name;
        user.password = Some(hash_secret(Arc::clone(self.hasher()), params.password).await?);
        if verification_disabled {
            user.email_verified_at = Some(chrono::Utc::now());
        }
        let user = self.persistence().add_user(user).await?;
        info!(user_id = %user.id, verified = verification_disabled, "User signed up");

        if !verification_disabled {
            self.request_verification(
                request,
                &email,
                VerificationPurpose::BasicAuthSignup,
                params.redirect_uri.as_deref(),
            )
            .await?;
            return Ok(AuthResponse::message(
                "Verification email has been sent. Please check your inbox",
            )
            .with_user(user));
        }

        let roles = user.roles.clone();
        self.login_response(request, user, &roles, &params.scope, "Signed up successfully.")
            .await
    }
}
