use crate::admin::cookie::{read_session_cookie, session_cookie};
use crate::auth::{AuthResponse, SessionQuery};
use crate::error::IdentityError;
use crate::request::RequestContext;
use crate::service::IdentityService;
use crate::storage::User;
use crate::token::{AuthToken, FingerprintGenerator, SessionToken};
use tracing::{debug, instrument};

impl IdentityService {
    /// Current access token for a live session.
    ///
    /// A bearer token is refreshed when it is close to expiry; a session
    /// cookie always gets a freshly minted token bound to the same session.
    #[instrument(skip_all, fields(host = %request.host))]
    pub async fn session(
        &self,
        request: &RequestContext,
        query: SessionQuery,
    ) -> Result<AuthResponse, IdentityError> {
        let snapshot = self.store().get_all();

        if let Some(raw) = request.bearer_token() {
            let refreshed = self.tokens().refresh(raw).await?;
            let user = self.session_user(&refreshed.claims.sub).await?;
            let token = token_from_session(refreshed);
            let cookie = session_cookie(&snapshot, &request.host, &token.fingerprint_hash);
            return Ok(AuthResponse {
                message: "Session token refreshed".to_string(),
                token: Some(token),
                user: Some(user),
                cookie: Some(cookie),
                redirect_uri: None,
            });
        }

        let Some(hash) = read_session_cookie(&snapshot, request) else {
            return Err(IdentityError::Unauthorized);
        };
        let Some(entry) = self.sessions().get(&hash).await else {
            debug!("Session cookie names no live session");
            return Err(IdentityError::Unauthorized);
        };
        let user = self.session_user(&entry.user_id).await?;

        let roles = if query.roles.is_empty() {
            user.roles.clone()
        } else if query.roles.iter().all(|role| user.roles.contains(role)) {
            query.roles
        } else {
            return Err(IdentityError::Unauthorized);
        };

        let token = self.tokens().issue_for_session(&entry, &user, &roles, &query.scope)?;
        let cookie = session_cookie(&snapshot, &request.host, &hash);
        Ok(AuthResponse {
            message: "Session token refreshed".to_string(),
            token: Some(token),
            user: Some(user),
            cookie: Some(cookie),
            redirect_uri: None,
        })
    }

    async fn session_user(&self, user_id: &str) -> Result<User, IdentityError> {
        match self.persistence().get_user_by_id(user_id).await {
            Ok(user) => Ok(user),
            Err(IdentityError::NotFound(_)) => Err(IdentityError::Unauthorized),
            Err(e) => Err(e),
        }
    }
}

fn token_from_session(session: SessionToken) -> AuthToken {
    let SessionToken {
        claims,
        access_token,
        expires_in,
        ..
    } = session;
    AuthToken {
        access_token,
        token_type: "Bearer".to_string(),
        expires_in: expires_in.max(1),
        expires_at: claims.exp,
        scope: claims.scope,
        user_id: claims.sub,
        fingerprint_hash: FingerprintGenerator::hash(&claims.fingerprint),
        fingerprint: claims.fingerprint,
    }
}
