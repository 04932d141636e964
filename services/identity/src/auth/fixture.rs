use crate::crypto::{Argon2Hasher, ConfigEncryptor, JwtAlgorithm, KeyManager, SecretHasher};
use crate::request::RequestContext;
use crate::service::{Collaborators, IdentityService};
use crate::storage::{InMemoryProvider, OAuthProviders, RecordingMailSender};
use crate::store::{ConfigSnapshot, keys};
use rust_common::{BackgroundWorker, BackgroundWorkerConfig};
use std::sync::Arc;

pub const PASSWORD: &str = "Passw0rd!";

pub struct Fixture {
    pub service: IdentityService,
    pub persistence: Arc<InMemoryProvider>,
    pub mailer: Arc<RecordingMailSender>,
}

pub fn base_snapshot() -> ConfigSnapshot {
    let mut snapshot = ConfigSnapshot::new()
        .with_string(keys::CLIENT_ID, "client-1")
        .with_string(keys::ADMIN_SECRET_HASH, Argon2Hasher.hash("admin-secret").unwrap())
        .with_string(keys::SMTP_HOST, "smtp.example.com")
        .with_string(keys::SMTP_PORT, "587")
        .with_string(keys::SMTP_USERNAME, "mailer")
        .with_string(keys::SMTP_PASSWORD, "mailer-pass")
        .with_string(keys::SENDER_EMAIL, "noreply@example.com")
        .with_list(keys::ROLES, ["user", "admin"])
        .with_list(keys::DEFAULT_ROLES, ["user"]);
    KeyManager::install(
        &mut snapshot,
        &KeyManager::generate(JwtAlgorithm::HS256, "client-1").unwrap(),
    );
    snapshot
}

/// Service over in-memory collaborators; `configure` adjusts the first snapshot.
pub fn fixture(configure: impl FnOnce(ConfigSnapshot) -> ConfigSnapshot) -> Fixture {
    let persistence = Arc::new(InMemoryProvider::new());
    let mailer = Arc::new(RecordingMailSender::new());
    let service = IdentityService::new(
        configure(base_snapshot()),
        Collaborators {
            persistence: persistence.clone(),
            mailer: mailer.clone(),
            oauth: Arc::new(OAuthProviders::new()),
            hasher: Arc::new(Argon2Hasher),
        },
        ConfigEncryptor::from_base64(&ConfigEncryptor::generate_key()).unwrap(),
        BackgroundWorker::spawn(BackgroundWorkerConfig::default().with_name("test")),
    );
    Fixture {
        service,
        persistence,
        mailer,
    }
}

pub fn request() -> RequestContext {
    RequestContext::new("auth.example.com:8080")
        .with_header("user-agent", "test-agent")
        .with_header("x-forwarded-for", "10.0.0.1")
}
