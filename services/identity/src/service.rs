//! Service facade wiring the store, tokens, sessions and collaborators.

use crate::admin::cookie::{clear_admin_cookie, session_cookie};
use crate::admin::{ConfigUpdate, ConfigUpdateOrchestrator, Cookie, UpdateOutcome};
use crate::auth::AuthResponse;
use crate::crypto::{ConfigEncryptor, GeneratedKeys, Jwks, KeyManager, SecretHasher};
use crate::error::IdentityError;
use crate::request::RequestContext;
use crate::session::SessionRegistry;
use crate::storage::{
    MailSender, OAuthRegistry, PersistenceProvider, SessionRecord, User, VerificationPurpose,
    VerificationRequest,
};
use crate::store::{ConfigSnapshot, ConfigStore, keys};
use crate::token::{AccessClaims, FingerprintGenerator, TokenService, VERIFICATION_TOKEN_TTL_SECONDS};
use rust_common::{BackgroundWorker, PlatformError};
use std::sync::Arc;
use tracing::{debug, info};

/// External dependencies of the service.
#[derive(Clone)]
pub struct Collaborators {
    pub persistence: Arc<dyn PersistenceProvider>,
    pub mailer: Arc<dyn MailSender>,
    pub oauth: Arc<dyn OAuthRegistry>,
    pub hasher: Arc<dyn SecretHasher>,
}

/// Entry point for every credential operation.
///
/// All components share one [`ConfigStore`] and one [`SessionRegistry`];
/// side effects that must not block a request (mail, audit rows) go through
/// the background worker.
pub struct IdentityService {
    store: Arc<ConfigStore>,
    sessions: Arc<SessionRegistry>,
    tokens: TokenService,
    orchestrator: ConfigUpdateOrchestrator,
    persistence: Arc<dyn PersistenceProvider>,
    mailer: Arc<dyn MailSender>,
    hasher: Arc<dyn SecretHasher>,
    worker: BackgroundWorker,
}

impl IdentityService {
    pub fn new(
        snapshot: ConfigSnapshot,
        collaborators: Collaborators,
        encryptor: ConfigEncryptor,
        worker: BackgroundWorker,
    ) -> Self {
        let store = Arc::new(ConfigStore::new(snapshot));
        let sessions = Arc::new(SessionRegistry::new());
        let tokens = TokenService::new(Arc::clone(&store), Arc::clone(&sessions));
        let orchestrator = ConfigUpdateOrchestrator::new(
            Arc::clone(&store),
            Arc::clone(&sessions),
            Arc::clone(&collaborators.persistence),
            collaborators.oauth,
            Arc::clone(&collaborators.hasher),
            encryptor,
        );

        Self {
            store,
            sessions,
            tokens,
            orchestrator,
            persistence: collaborators.persistence,
            mailer: collaborators.mailer,
            hasher: collaborators.hasher,
            worker,
        }
    }

    pub const fn store(&self) -> &Arc<ConfigStore> {
        &self.store
    }

    pub const fn sessions(&self) -> &Arc<SessionRegistry> {
        &self.sessions
    }

    pub const fn tokens(&self) -> &TokenService {
        &self.tokens
    }

    pub const fn worker(&self) -> &BackgroundWorker {
        &self.worker
    }

    pub(crate) fn persistence(&self) -> &dyn PersistenceProvider {
        self.persistence.as_ref()
    }

    pub(crate) const fn hasher(&self) -> &Arc<dyn SecretHasher> {
        &self.hasher
    }

    /// Public verification keys of the active configuration.
    pub fn public_key_set(&self) -> Result<Jwks, IdentityError> {
        let snapshot = self.store.get_all();
        match Jwks::from_json(snapshot.get_string(keys::JWK)) {
            Ok(jwks) if !jwks.keys.is_empty() => Ok(jwks),
            _ => KeyManager::build_public_key_set(&snapshot),
        }
    }

    pub async fn is_super_admin(&self, request: &RequestContext) -> bool {
        self.orchestrator.is_super_admin(request).await
    }

    pub async fn generate_jwt_keys(
        &self,
        request: &RequestContext,
        algorithm: &str,
    ) -> Result<GeneratedKeys, IdentityError> {
        self.orchestrator.generate_jwt_keys(request, algorithm).await
    }

    pub async fn update_configuration(
        &self,
        request: &RequestContext,
        update: ConfigUpdate,
    ) -> Result<UpdateOutcome, IdentityError> {
        self.orchestrator.update_configuration(request, update).await
    }

    /// Clearing admin cookie for a super-administrator ending their session.
    pub async fn admin_logout(&self, request: &RequestContext) -> Result<Cookie, IdentityError> {
        if !self.is_super_admin(request).await {
            return Err(IdentityError::Unauthorized);
        }
        info!("Admin logged out");
        Ok(clear_admin_cookie(&self.store.get_all(), &request.host))
    }

    pub async fn verify_access_token(&self, raw: &str) -> Result<AccessClaims, IdentityError> {
        self.tokens.verify_access_token(raw).await
    }

    /// Drop every session of `user_id`; their access tokens stop verifying.
    pub async fn revoke_user_sessions(&self, user_id: &str) -> usize {
        let removed = self.sessions.remove_all_for_user(user_id).await;
        info!(user_id = %user_id, removed, "User sessions revoked");
        removed
    }

    /// Start a session for `user` and build the login response.
    pub(crate) async fn login_response(
        &self,
        request: &RequestContext,
        user: User,
        roles: &[String],
        scope: &[String],
        message: &str,
    ) -> Result<AuthResponse, IdentityError> {
        let snapshot = self.store.get_all();
        let token = self.tokens.start_session(&user, roles, scope).await?;
        let cookie = session_cookie(&snapshot, &request.host, &token.fingerprint_hash);
        self.record_session(&user, request);

        Ok(AuthResponse {
            message: message.to_string(),
            token: Some(token),
            user: Some(user),
            cookie: Some(cookie),
            redirect_uri: None,
        })
    }

    /// Write the session audit row in the background.
    fn record_session(&self, user: &User, request: &RequestContext) {
        let record = SessionRecord::new(&user.id, request.user_agent(), request.client_ip());
        let persistence = Arc::clone(&self.persistence);
        self.worker.submit("session_audit", async move {
            persistence.add_session(record).await.map_err(PlatformError::from)
        });
    }

    /// Store a verification request for `email` and mail its token in the background.
    pub(crate) async fn request_verification(
        &self,
        request: &RequestContext,
        email: &str,
        purpose: VerificationPurpose,
        redirect_uri: Option<&str>,
    ) -> Result<VerificationRequest, IdentityError> {
        let snapshot = self.store.get_all();
        let redirect_uri = match redirect_uri.filter(|uri| !uri.is_empty()) {
            Some(uri) => uri.to_string(),
            None => default_redirect(&snapshot, request),
        };
        let host = request.origin();

        let (nonce, digest) = FingerprintGenerator::nonce();
        let token = self
            .tokens
            .create_verification_token(email, purpose, &host, &digest, &redirect_uri)?;

        let now = chrono::Utc::now();
        let pending = self
            .persistence
            .add_verification_request(VerificationRequest {
                id: uuid::Uuid::new_v4().to_string(),
                token: token.clone(),
                purpose,
                email: email.to_string(),
                nonce,
                redirect_uri,
                expires_at: now + chrono::Duration::seconds(VERIFICATION_TOKEN_TTL_SECONDS),
                created_at: now,
            })
            .await?;
        debug!(email = %email, purpose = %purpose, "Verification request stored");

        let mailer = Arc::clone(&self.mailer);
        let recipient = email.to_string();
        self.worker.submit("verification_mail", async move {
            mailer
                .send_verification_mail(&recipient, &token, &host, purpose)
                .await
                .map_err(PlatformError::from)
        });

        Ok(pending)
    }
}

impl std::fmt::Debug for IdentityService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IdentityService")
            .field("version", &self.store.version())
            .field("worker", &self.worker)
            .finish_non_exhaustive()
    }
}

fn default_redirect(snapshot: &ConfigSnapshot, request: &RequestContext) -> String {
    let app_url = snapshot.get_string(keys::APP_URL);
    if app_url.is_empty() {
        format!("{}/app", request.origin())
    } else {
        app_url.to_string()
    }
}
