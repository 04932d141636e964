use crate::auth::AuthResponse;
use crate::auth::validation::{normalize_email, resolve_roles};
use crate::error::IdentityError;
use crate::request::RequestContext;
use crate::service::IdentityService;
use crate::storage::{SIGNUP_METHOD_MAGIC_LINK, User, VerificationPurpose};
use crate::store::keys;
use serde::Deserialize;
use tracing::{info, instrument};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct MagicLinkLoginRequest {
    pub email: String,
    #[serde(default)]
    pub roles: Vec<String>,
    #[serde(default)]
    pub redirect_uri: Option<String>,
}

impl MagicLinkLoginRequest {
    pub fn new(email: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            ..Self::default()
        }
    }
}

impl IdentityService {
    /// Mail a one-time login link, creating the user on first use.
    #[instrument(skip(self, request, params), fields(host = %request.host))]
    pub async fn magic_link_login(
        &self,
        request: &RequestContext,
        params: MagicLinkLoginRequest,
    ) -> Result<AuthResponse, IdentityError> {
        let snapshot = self.store().get_all();
        if snapshot.get_bool(keys::DISABLE_MAGIC_LINK_LOGIN) {
            return Err(IdentityError::Disabled(
                "magic link login is disabled for this instance".to_string(),
            ));
        }

        let email = normalize_email(&params.email)?;

        match self.persistence().get_user_by_email(&email).await {
            Ok(mut user) => {
                if !user.has_signup_method(SIGNUP_METHOD_MAGIC_LINK) {
                    user.add_signup_method(SIGNUP_METHOD_MAGIC_LINK);
                    self.persistence().update_user(user).await?;
                }
            }
            Err(IdentityError::NotFound(_)) => {
                if snapshot.get_bool(keys::DISABLE_SIGN_UP) {
                    return Err(IdentityError::Disabled(
                        "signup is disabled for this instance".to_string(),
                    ));
                }
                let roles = resolve_roles(
                    &params.roles,
                    snapshot.get_list(keys::ROLES),
                    snapshot.get_list(keys::DEFAULT_ROLES),
                )?;
                let user = self
                    .persistence()
                    .add_user(User::new(email.as_str(), roles, SIGNUP_METHOD_MAGIC_LINK))
                    .await?;
                info!(user_id = %user.id, "User created through magic link");
            }
            Err(e) => return Err(e),
        }

        self.request_verification(
            request,
            &email,
            VerificationPurpose::MagicLinkLogin,
            params.redirect_uri.as_deref(),
        )
        .await?;

        Ok(AuthResponse::message(
            "Magic Link has been sent to your email. Please check your inbox!",
        ))
    }
}
