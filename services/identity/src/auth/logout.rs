use crate::admin::cookie::{clear_session_cookie, read_session_cookie};
use crate::auth::AuthResponse;
use crate::error::IdentityError;
use crate::request::RequestContext;
use crate::service::IdentityService;
use crate::token::FingerprintGenerator;
use tracing::{info, instrument};

impl IdentityService {
    /// End the session named by the session cookie or bearer token.
    #[instrument(skip_all, fields(host = %request.host))]
    pub async fn logout(&self, request: &RequestContext) -> Result<AuthResponse, IdentityError> {
        let snapshot = self.store().get_all();

        let hash = match read_session_cookie(&snapshot, request) {
            Some(hash) => hash,
            None => {
                let raw = request.bearer_token().ok_or(IdentityError::Unauthorized)?;
                let claims = self.verify_access_token(raw).await?;
                FingerprintGenerator::hash(&claims.fingerprint)
            }
        };

        let Some(entry) = self.sessions().remove(&hash).await else {
            return Err(IdentityError::Unauthorized);
        };
        info!(user_id = %entry.user_id, "Logged out");

        Ok(AuthResponse::message("Logged out successfully")
            .with_cookie(clear_session_cookie(&snapshot, &request.host)))
    }
}
