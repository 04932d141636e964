use crate::auth::AuthResponse;
use crate::error::IdentityError;
use crate::request::RequestContext;
use crate::service::IdentityService;
use tracing::{info, instrument};

impl IdentityService {
    /// Consume a verification token and log its user in.
    ///
    /// The token is checked against the current signing key; its pending
    /// request is removed atomically, so a replay fails with `AlreadyConsumed`.
    #[instrument(skip_all, fields(host = %request.host))]
    pub async fn verify_email(
        &self,
        request: &RequestContext,
        token: &str,
    ) -> Result<AuthResponse, IdentityError> {
        let (claims, pending) = self
            .tokens()
            .consume_verification_token(token, self.persistence())
            .await?;

        let mut user = self.persistence().get_user_by_email(&pending.email).await?;
        if !user.is_verified() {
            user.email_verified_at = Some(chrono::Utc::now());
            user = self.persistence().update_user(user).await?;
            info!(user_id = %user.id, purpose = %claims.purpose, "Email verified");
        }

        let roles = user.roles.clone();
        let mut response = self
            .login_response(request, user, &roles, &[], "Email verified successfully.")
            .await?;
        response.redirect_uri = Some(pending.redirect_uri);
        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use crate::auth::fixture::{PASSWORD, fixture, request};
    use crate::auth::{MagicLinkLoginRequest, SignUpRequest};
    use crate::error::IdentityError;

    #[tokio::test]
    async fn test_verify_signup_then_replay() {
        let f = fixture(|s| s);
        f.service
            .signup(&request(), SignUpRequest::new("alice@example.com", PASSWORD))
            .await
            .unwrap();
        let token = f.persistence.verification_requests().await[0].token.clone();

        let response = f.service.verify_email(&request(), &token).await.unwrap();
        assert!(response.user.as_ref().unwrap().is_verified());
        assert!(response.access_token().is_some());
        assert!(response.cookie.is_some());
        assert_eq!(f.service.sessions().len().await, 1);

        let replay = f.service.verify_email(&request(), &token).await;
        assert!(matches!(replay, Err(IdentityError::AlreadyConsumed)));
    }

    #[tokio::test]
    async fn test_verify_magic_link_uses_redirect() {
        let f = fixture(|s| s);
        let params = MagicLinkLoginRequest {
            redirect_uri: Some("https://app.example.com/welcome".to_string()),
            ..MagicLinkLoginRequest::new("bob@example.com")
        };
        f.service.magic_link_login(&request(), params).await.unwrap();
        let token = f.persistence.verification_requests().await[0].token.clone();

        let response = f.service.verify_email(&request(), &token).await.unwrap();
        assert_eq!(
            response.redirect_uri.as_deref(),
            Some("https://app.example.com/welcome")
        );
    }

    #[tokio::test]
    async fn test_garbage_token_rejected() {
        let f = fixture(|s| s);
        let result = f.service.verify_email(&request(), "not-a-token").await;
        assert!(matches!(result, Err(IdentityError::InvalidSignature(_))));
    }
}
