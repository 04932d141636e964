use crate::crypto::{KeyManager, SigningKeys};
use crate::error::IdentityError;
use crate::session::{SessionEntry, SessionRegistry};
use crate::storage::{PersistenceProvider, User, VerificationPurpose, VerificationRequest};
use crate::store::{ConfigSnapshot, ConfigStore, keys};
use crate::token::builder::AccessTokenBuilder;
use crate::token::claims::{ACCESS_TOKEN_TYPE, AccessClaims};
use crate::token::fingerprint::FingerprintGenerator;
use crate::token::verification::{VERIFICATION_TOKEN_TYPE, VerificationClaims};
use arc_swap::ArcSwap;
use jsonwebtoken::{Header, Validation, decode, encode};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, instrument, warn};

/// Trailing window before expiry in which an access token is reissued.
pub const REFRESH_WINDOW_SECONDS: i64 = 5 * 60;

pub const DEFAULT_SCOPE: [&str; 3] = ["openid", "email", "profile"];

/// Tokens handed out on login, signup and verification.
#[derive(Debug, Clone, Serialize)]
pub struct AuthToken {
    pub access_token: String,
    pub token_type: String,
    pub expires_in: i64,
    pub expires_at: i64,
    pub scope: Vec<String>,
    pub user_id: String,
    /// Raw fingerprint embedded in the access token.
    #[serde(skip)]
    pub fingerprint: String,
    /// Session registry key; also the session cookie value.
    #[serde(skip)]
    pub fingerprint_hash: String,
}

/// Outcome of a session check.
#[derive(Debug, Clone)]
pub struct SessionToken {
    pub claims: AccessClaims,
    pub access_token: String,
    pub expires_in: i64,
    /// True when a replacement access token was minted.
    pub refreshed: bool,
}

/// Issues and verifies access and verification tokens.
///
/// Every operation reads one snapshot from the store and uses it throughout,
/// so signing key, algorithm and policy always come from the same
/// configuration version.
pub struct TokenService {
    store: Arc<ConfigStore>,
    sessions: Arc<SessionRegistry>,
    cached_keys: ArcSwap<Option<Arc<SigningKeys>>>,
}

impl TokenService {
    pub fn new(store: Arc<ConfigStore>, sessions: Arc<SessionRegistry>) -> Self {
        Self {
            store,
            sessions,
            cached_keys: ArcSwap::new(Arc::new(None)),
        }
    }

    pub const fn sessions(&self) -> &Arc<SessionRegistry> {
        &self.sessions
    }

    /// Parsed keys for `snapshot`, reused while its version stays current.
    fn signing_keys(&self, snapshot: &ConfigSnapshot) -> Result<Arc<SigningKeys>, IdentityError> {
        if let Some(cached) = &**self.cached_keys.load() {
            if cached.version == snapshot.version() {
                return Ok(Arc::clone(cached));
            }
        }

        let signing = Arc::new(KeyManager::signing_keys(snapshot)?);
        debug!(version = signing.version, algorithm = %signing.algorithm, "Signing keys loaded");
        self.cached_keys.store(Arc::new(Some(Arc::clone(&signing))));
        Ok(signing)
    }

    fn validation(snapshot: &ConfigSnapshot, signing: &SigningKeys) -> Validation {
        let mut validation = Validation::new(signing.backend_algorithm());
        validation.leeway = 0;
        let issuer = snapshot.get_string(keys::JWT_ISSUER);
        if !issuer.is_empty() {
            validation.set_issuer(&[issuer]);
        }
        validation.set_audience(&[snapshot.get_string(keys::CLIENT_ID)]);
        validation
    }

    fn sign<T: Serialize>(signing: &SigningKeys, claims: &T) -> Result<String, IdentityError> {
        let mut header = Header::new(signing.backend_algorithm());
        header.kid = Some(signing.key_id.clone());
        Ok(encode(&header, claims, signing.encoding_key())?)
    }

    /// Sign arbitrary access claims with the active key.
    pub fn encode_access_claims(&self, claims: &AccessClaims) -> Result<String, IdentityError> {
        let snapshot = self.store.get_all();
        let signing = self.signing_keys(&snapshot)?;
        Self::sign(&signing, claims)
    }

    fn mint(
        &self,
        snapshot: &ConfigSnapshot,
        user: &User,
        roles: &[String],
        scope: &[String],
        fingerprint: &str,
    ) -> Result<(String, AccessClaims), IdentityError> {
        let signing = self.signing_keys(snapshot)?;
        let scope = if scope.is_empty() {
            DEFAULT_SCOPE.iter().map(ToString::to_string).collect()
        } else {
            scope.to_vec()
        };

        let claims = AccessTokenBuilder::new(
            snapshot.get_string(keys::JWT_ISSUER),
            snapshot.get_string(keys::CLIENT_ID),
        )
        .subject(&user.id)
        .email(&user.email)
        .fingerprint(fingerprint)
        .ttl_seconds(snapshot.access_token_ttl_seconds())
        .roles(roles.to_vec())
        .role_claim(snapshot.get_string(keys::JWT_ROLE_CLAIM))
        .scope(scope)
        .build()?;

        let token = Self::sign(&signing, &claims)?;
        Ok((token, claims))
    }

    fn bundle(token: String, claims: &AccessClaims, fingerprint: String) -> AuthToken {
        let now = chrono::Utc::now().timestamp();
        AuthToken {
            access_token: token,
            token_type: "Bearer".to_string(),
            expires_in: claims.remaining_at(now).max(1),
            expires_at: claims.exp,
            scope: claims.scope.clone(),
            user_id: claims.sub.clone(),
            fingerprint_hash: FingerprintGenerator::hash(&fingerprint),
            fingerprint,
        }
    }

    /// Mint an access token under a fresh fingerprint. Does not register a session.
    pub fn issue_tokens(
        &self,
        user: &User,
        roles: &[String],
        scope: &[String],
    ) -> Result<AuthToken, IdentityError> {
        let snapshot = self.store.get_all();
        let fingerprint = FingerprintGenerator::generate();
        let (token, claims) = self.mint(&snapshot, user, roles, scope, &fingerprint)?;
        Ok(Self::bundle(token, &claims, fingerprint))
    }

    /// Issue tokens and register the new session.
    #[instrument(skip(self, user, roles, scope), fields(user_id = %user.id))]
    pub async fn start_session(
        &self,
        user: &User,
        roles: &[String],
        scope: &[String],
    ) -> Result<AuthToken, IdentityError> {
        let snapshot = self.store.get_all();
        let fingerprint = FingerprintGenerator::generate();
        let (token, claims) = self.mint(&snapshot, user, roles, scope, &fingerprint)?;
        let bundle = Self::bundle(token, &claims, fingerprint);

        let entry = SessionEntry::new(&bundle.fingerprint, &user.id, snapshot.session_ttl_seconds())?;
        self.sessions.put(bundle.fingerprint_hash.clone(), entry).await;
        Ok(bundle)
    }

    /// Mint a new access token bound to an existing session.
    pub fn issue_for_session(
        &self,
        entry: &SessionEntry,
        user: &User,
        roles: &[String],
        scope: &[String],
    ) -> Result<AuthToken, IdentityError> {
        if entry.user_id != user.id {
            return Err(IdentityError::Unauthorized);
        }
        let snapshot = self.store.get_all();
        let (token, claims) = self.mint(&snapshot, user, roles, scope, &entry.fingerprint)?;
        Ok(Self::bundle(token, &claims, entry.fingerprint.clone()))
    }

    fn decode_access(&self, raw: &str) -> Result<AccessClaims, IdentityError> {
        let snapshot = self.store.get_all();
        let signing = self.signing_keys(&snapshot)?;
        let data = decode::<AccessClaims>(raw, signing.decoding_key(), &Self::validation(&snapshot, &signing))?;
        if data.claims.token_type != ACCESS_TOKEN_TYPE {
            return Err(IdentityError::InvalidSignature("not an access token".to_string()));
        }
        Ok(data.claims)
    }

    async fn live_session(&self, claims: &AccessClaims) -> Result<SessionEntry, IdentityError> {
        let hash = FingerprintGenerator::hash(&claims.fingerprint);
        match self.sessions.get(&hash).await {
            Some(entry) if entry.user_id == claims.sub => Ok(entry),
            _ => {
                debug!(user_id = %claims.sub, "Access token has no live session");
                Err(IdentityError::Unauthorized)
            }
        }
    }

    /// Verify signature, expiry and the backing session.
    ///
    /// The algorithm and key come from the active snapshot; the token header
    /// only has to agree with them.
    #[instrument(skip_all)]
    pub async fn verify_access_token(&self, raw: &str) -> Result<AccessClaims, IdentityError> {
        let claims = self.decode_access(raw)?;
        self.live_session(&claims).await?;
        Ok(claims)
    }

    /// Verify `raw` and reissue it when it is close to expiry.
    #[instrument(skip_all)]
    pub async fn refresh(&self, raw: &str) -> Result<SessionToken, IdentityError> {
        let claims = self.decode_access(raw)?;
        self.live_session(&claims).await?;

        let now = chrono::Utc::now().timestamp();
        if claims.remaining_at(now) > REFRESH_WINDOW_SECONDS {
            return Ok(SessionToken {
                expires_in: claims.remaining_at(now),
                access_token: raw.to_string(),
                claims,
                refreshed: false,
            });
        }

        let snapshot = self.store.get_all();
        let signing = self.signing_keys(&snapshot)?;
        let mut renewed = claims;
        renewed.iat = now;
        renewed.exp = now
            .checked_add(snapshot.access_token_ttl_seconds())
            .ok_or_else(|| IdentityError::invalid_input("token lifetime overflows"))?;
        renewed.jti = uuid::Uuid::new_v4().to_string();
        let token = Self::sign(&signing, &renewed)?;
        debug!(user_id = %renewed.sub, "Access token refreshed");

        Ok(SessionToken {
            expires_in: renewed.remaining_at(now),
            access_token: token,
            claims: renewed,
            refreshed: true,
        })
    }

    /// Sign a verification token for an out-of-band flow.
    pub fn create_verification_token(
        &self,
        email: &str,
        purpose: VerificationPurpose,
        host: &str,
        nonce_digest: &str,
        redirect_url: &str,
    ) -> Result<String, IdentityError> {
        let snapshot = self.store.get_all();
        let signing = self.signing_keys(&snapshot)?;
        let claims = VerificationClaims::new(
            snapshot.get_string(keys::JWT_ISSUER).to_string(),
            snapshot.get_string(keys::CLIENT_ID).to_string(),
            email,
            purpose,
            host,
            nonce_digest,
            redirect_url,
        );
        Self::sign(&signing, &claims)
    }

    /// Check signature and expiry only; does not consume the request.
    pub fn verify_verification_token(&self, raw: &str) -> Result<VerificationClaims, IdentityError> {
        let snapshot = self.store.get_all();
        let signing = self.signing_keys(&snapshot)?;
        let data =
            decode::<VerificationClaims>(raw, signing.decoding_key(), &Self::validation(&snapshot, &signing))?;
        if data.claims.token_type != VERIFICATION_TOKEN_TYPE {
            return Err(IdentityError::InvalidSignature("not a verification token".to_string()));
        }
        Ok(data.claims)
    }

    /// Verify `raw` and atomically remove its pending request.
    ///
    /// A second call for the same token fails with `AlreadyConsumed`.
    #[instrument(skip_all)]
    pub async fn consume_verification_token(
        &self,
        raw: &str,
        persistence: &dyn PersistenceProvider,
    ) -> Result<(VerificationClaims, VerificationRequest), IdentityError> {
        let claims = self.verify_verification_token(raw)?;

        let Some(request) = persistence.take_verification_request(raw).await? else {
            warn!(purpose = %claims.purpose, "Verification token replayed");
            return Err(IdentityError::AlreadyConsumed);
        };

        if request.is_expired_at(chrono::Utc::now()) {
            return Err(IdentityError::ExpiredToken);
        }
        if request.email != claims.email()
            || request.purpose != claims.purpose
            || !FingerprintGenerator::matches(&request.nonce, &claims.nonce)
        {
            return Err(IdentityError::InvalidSignature(
                "verification token does not match its request".to_string(),
            ));
        }

        Ok((claims, request))
    }
}

impl std::fmt::Debug for TokenService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenService")
            .field("store", &self.store)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::JwtAlgorithm;
    use crate::storage::{InMemoryProvider, SIGNUP_METHOD_BASIC_AUTH};

    fn store_with(algorithm: JwtAlgorithm) -> Arc<ConfigStore> {
        let mut snapshot = ConfigSnapshot::new()
            .with_string(keys::CLIENT_ID, "client-1")
            .with_string(keys::JWT_ISSUER, "https://auth.example.com");
        let material = KeyManager::generate(algorithm, "client-1").unwrap();
        KeyManager::install(&mut snapshot, &material);
        Arc::new(ConfigStore::new(snapshot))
    }

    fn user() -> User {
        User::new("a@example.com", vec!["user".to_string()], SIGNUP_METHOD_BASIC_AUTH)
    }

    #[tokio::test]
    async fn test_issue_and_verify() {
        let service = TokenService::new(store_with(JwtAlgorithm::HS256), Arc::new(SessionRegistry::new()));
        let user = user();

        let bundle = service.start_session(&user, &user.roles, &[]).await.unwrap();
        let claims = service.verify_access_token(&bundle.access_token).await.unwrap();

        assert_eq!(claims.sub, user.id);
        assert_eq!(claims.scope, vec!["openid", "email", "profile"]);
        assert_eq!(FingerprintGenerator::hash(&claims.fingerprint), bundle.fingerprint_hash);
        assert!(bundle.expires_in >= 1);
    }

    #[tokio::test]
    async fn test_token_without_session_is_unauthorized() {
        let service = TokenService::new(store_with(JwtAlgorithm::ES256), Arc::new(SessionRegistry::new()));
        let user = user();

        let bundle = service.issue_tokens(&user, &user.roles, &[]).unwrap();
        assert!(matches!(
            service.verify_access_token(&bundle.access_token).await,
            Err(IdentityError::Unauthorized)
        ));
    }

    #[tokio::test]
    async fn test_expired_token_rejected() {
        let service = TokenService::new(store_with(JwtAlgorithm::HS384), Arc::new(SessionRegistry::new()));
        let user = user();
        let bundle = service.start_session(&user, &user.roles, &[]).await.unwrap();

        let mut claims = service.verify_access_token(&bundle.access_token).await.unwrap();
        claims.exp = chrono::Utc::now().timestamp() - 10;
        let expired = service.encode_access_claims(&claims).unwrap();

        assert!(matches!(
            service.verify_access_token(&expired).await,
            Err(IdentityError::ExpiredToken)
        ));
    }

    #[tokio::test]
    async fn test_refresh_inside_window_reissues() {
        let service = TokenService::new(store_with(JwtAlgorithm::HS256), Arc::new(SessionRegistry::new()));
        let user = user();
        let bundle = service.start_session(&user, &user.roles, &[]).await.unwrap();

        let untouched = service.refresh(&bundle.access_token).await.unwrap();
        assert!(!untouched.refreshed);

        let mut claims = untouched.claims;
        claims.exp = chrono::Utc::now().timestamp() + 60;
        let near_expiry = service.encode_access_claims(&claims).unwrap();

        let refreshed = service.refresh(&near_expiry).await.unwrap();
        assert!(refreshed.refreshed);
        assert_eq!(refreshed.claims.fingerprint, claims.fingerprint);
        assert!(refreshed.expires_in > REFRESH_WINDOW_SECONDS);
        service.verify_access_token(&refreshed.access_token).await.unwrap();
    }

    #[tokio::test]
    async fn test_verification_token_consumed_once() {
        let service = TokenService::new(store_with(JwtAlgorithm::RS256), Arc::new(SessionRegistry::new()));
        let provider = InMemoryProvider::new();
        let (nonce, digest) = FingerprintGenerator::nonce();

        let token = service
            .create_verification_token(
                "a@example.com",
                VerificationPurpose::MagicLinkLogin,
                "https://auth.example.com",
                &digest,
                "https://app.example.com",
            )
            .unwrap();
        provider
            .add_verification_request(VerificationRequest {
                id: "vr-1".to_string(),
                token: token.clone(),
                purpose: VerificationPurpose::MagicLinkLogin,
                email: "a@example.com".to_string(),
                nonce,
                redirect_uri: "https://app.example.com".to_string(),
                expires_at: chrono::Utc::now() + chrono::Duration::minutes(30),
                created_at: chrono::Utc::now(),
            })
            .await
            .unwrap();

        let (claims, _) = service.consume_verification_token(&token, &provider).await.unwrap();
        assert_eq!(claims.email(), "a@example.com");
        assert!(matches!(
            service.consume_verification_token(&token, &provider).await,
            Err(IdentityError::AlreadyConsumed)
        ));
    }

    #[tokio::test]
    async fn test_access_token_is_not_a_verification_token() {
        let service = TokenService::new(store_with(JwtAlgorithm::HS256), Arc::new(SessionRegistry::new()));
        let user = user();
        let bundle = service.issue_tokens(&user, &user.roles, &[]).unwrap();
        assert!(service.verify_verification_token(&bundle.access_token).is_err());
    }
}
