use crate::error::IdentityError;
use crate::storage::provider::OAuthRegistry;
use crate::store::{ConfigSnapshot, keys};
use arc_swap::ArcSwap;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::info;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OAuthProvider {
    pub name: &'static str,
    pub client_id: String,
}

const PROVIDERS: [(&str, &str, &str); 2] = [
    ("google", keys::GOOGLE_CLIENT_ID, keys::GOOGLE_CLIENT_SECRET),
    ("github", keys::GITHUB_CLIENT_ID, keys::GITHUB_CLIENT_SECRET),
];

/// Providers `snapshot` enables. A provider with only one of client id and
/// client secret is an `InvalidConfiguration`.
pub fn validate_providers(snapshot: &ConfigSnapshot) -> Result<Vec<OAuthProvider>, IdentityError> {
    let mut enabled = Vec::new();
    for (name, id_key, secret_key) in PROVIDERS {
        let client_id = snapshot.get_string(id_key);
        let client_secret = snapshot.get_string(secret_key);
        match (client_id.is_empty(), client_secret.is_empty()) {
            (true, true) => {}
            (false, false) => enabled.push(OAuthProvider {
                name,
                client_id: client_id.to_string(),
            }),
            _ => {
                return Err(IdentityError::invalid_configuration(format!(
                    "{name} provider needs both client id and client secret"
                )));
            }
        }
    }
    Ok(enabled)
}

/// Enabled third-party providers, rebuilt from the active snapshot.
#[derive(Default)]
pub struct OAuthProviders {
    enabled: ArcSwap<Vec<OAuthProvider>>,
}

impl OAuthProviders {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn enabled(&self) -> Arc<Vec<OAuthProvider>> {
        self.enabled.load_full()
    }

    pub fn is_enabled(&self, name: &str) -> bool {
        self.enabled.load().iter().any(|p| p.name == name)
    }
}

#[async_trait]
impl OAuthRegistry for OAuthProviders {
    async fn reinitialize(&self, snapshot: &ConfigSnapshot) -> Result<(), IdentityError> {
        let enabled = validate_providers(snapshot)?;
        info!(count = enabled.len(), "OAuth providers reinitialized");
        self.enabled.store(Arc::new(enabled));
        Ok(())
    }
}
