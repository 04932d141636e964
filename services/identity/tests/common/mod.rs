//! Shared wiring for the integration suites.

#![allow(dead_code)]

use identity_service::admin::ADMIN_SECRET_HEADER;
use identity_service::crypto::{Argon2Hasher, ConfigEncryptor, JwtAlgorithm, KeyManager, SecretHasher};
use identity_service::storage::{InMemoryProvider, OAuthProviders, RecordingMailSender, User};
use identity_service::store::{ConfigSnapshot, keys};
use identity_service::{Collaborators, IdentityService, RequestContext};
use rust_common::{BackgroundWorker, BackgroundWorkerConfig};
use std::sync::Arc;

pub const ADMIN_SECRET: &str = "admin-secret";
pub const PASSWORD: &str = "Passw0rd!";

pub struct TestService {
    pub service: IdentityService,
    pub persistence: Arc<InMemoryProvider>,
    pub mailer: Arc<RecordingMailSender>,
}

pub fn snapshot(algorithm: JwtAlgorithm) -> ConfigSnapshot {
    let mut snapshot = ConfigSnapshot::new()
        .with_string(keys::CLIENT_ID, "integration-client")
        .with_string(keys::JWT_ISSUER, "https://auth.example.com")
        .with_string(keys::ADMIN_SECRET_HASH, Argon2Hasher.hash(ADMIN_SECRET).unwrap())
        .with_string(keys::SMTP_HOST, "smtp.example.com")
        .with_string(keys::SMTP_PORT, "587")
        .with_string(keys::SMTP_USERNAME, "mailer")
        .with_string(keys::SMTP_PASSWORD, "mailer-pass")
        .with_string(keys::SENDER_EMAIL, "noreply@example.com")
        .with_list(keys::ROLES, ["user", "admin"])
        .with_list(keys::DEFAULT_ROLES, ["user"])
        .with_list(keys::PROTECTED_ROLES, ["superadmin"]);
    KeyManager::install(
        &mut snapshot,
        &KeyManager::generate(algorithm, "integration-client").unwrap(),
    );
    snapshot
}

/// Must be called inside a tokio runtime.
pub fn service_with(snapshot: ConfigSnapshot) -> TestService {
    let persistence = Arc::new(InMemoryProvider::new());
    let mailer = Arc::new(RecordingMailSender::new());
    let service = IdentityService::new(
        snapshot,
        Collaborators {
            persistence: persistence.clone(),
            mailer: mailer.clone(),
            oauth: Arc::new(OAuthProviders::new()),
            hasher: Arc::new(Argon2Hasher),
        },
        ConfigEncryptor::from_base64(&ConfigEncryptor::generate_key()).unwrap(),
        BackgroundWorker::spawn(BackgroundWorkerConfig::default().with_name("integration")),
    );
    TestService {
        service,
        persistence,
        mailer,
    }
}

pub fn service(algorithm: JwtAlgorithm) -> TestService {
    service_with(snapshot(algorithm))
}

pub fn user(email: &str) -> User {
    User::new(email, vec!["user".to_string()], "basic_auth")
}

pub fn request() -> RequestContext {
    RequestContext::new("auth.example.com")
}

pub fn admin_request() -> RequestContext {
    request().with_header(ADMIN_SECRET_HEADER, ADMIN_SECRET)
}
