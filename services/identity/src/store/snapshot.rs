use crate::store::keys::{self, SENSITIVE_FRAGMENTS};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Longest accepted token or session lifetime: one year.
pub const MAX_TTL_SECONDS: i64 = 365 * 24 * 60 * 60;

/// Point-in-time copy of the configuration.
///
/// A snapshot obtained from [`crate::store::ConfigStore::clone_snapshot`] is a
/// private value: mutating it has no effect on readers until it is committed.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigSnapshot {
    #[serde(skip)]
    version: u64,
    #[serde(rename = "string", default)]
    strings: BTreeMap<String, String>,
    #[serde(rename = "bool", default)]
    bools: BTreeMap<String, bool>,
    #[serde(rename = "list", default)]
    lists: BTreeMap<String, Vec<String>>,
}

impl ConfigSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Version assigned at commit; 0 for a snapshot never committed.
    pub const fn version(&self) -> u64 {
        self.version
    }

    pub(crate) const fn set_version(&mut self, version: u64) {
        self.version = version;
    }

    pub fn get_string(&self, key: &str) -> &str {
        self.strings.get(key).map_or("", String::as_str)
    }

    pub fn get_bool(&self, key: &str) -> bool {
        self.bools.get(key).copied().unwrap_or(false)
    }

    pub fn get_list(&self, key: &str) -> &[String] {
        self.lists.get(key).map_or(&[], Vec::as_slice)
    }

    pub fn set_string(&mut self, key: &str, value: impl Into<String>) {
        self.strings.insert(key.to_string(), value.into());
    }

    pub fn set_bool(&mut self, key: &str, value: bool) {
        self.bools.insert(key.to_string(), value);
    }

    pub fn set_list(&mut self, key: &str, value: Vec<String>) {
        self.lists.insert(key.to_string(), value);
    }

    pub fn with_string(mut self, key: &str, value: impl Into<String>) -> Self {
        self.set_string(key, value);
        self
    }

    pub fn with_bool(mut self, key: &str, value: bool) -> Self {
        self.set_bool(key, value);
        self
    }

    pub fn with_list<S: Into<String>>(mut self, key: &str, value: impl IntoIterator<Item = S>) -> Self {
        self.set_list(key, value.into_iter().map(Into::into).collect());
        self
    }

    /// Access-token lifetime in seconds, 30 minutes unless configured.
    pub fn access_token_ttl_seconds(&self) -> i64 {
        parse_seconds(self.get_string(keys::ACCESS_TOKEN_TTL), 30 * 60)
    }

    /// Session lifetime in seconds, 30 days unless configured.
    pub fn session_ttl_seconds(&self) -> i64 {
        parse_seconds(self.get_string(keys::SESSION_TTL), 30 * 24 * 60 * 60)
    }

    /// Whether every setting outbound mail needs is present.
    pub fn is_mail_configured(&self) -> bool {
        [
            keys::SMTP_HOST,
            keys::SMTP_PORT,
            keys::SMTP_USERNAME,
            keys::SMTP_PASSWORD,
            keys::SENDER_EMAIL,
        ]
        .iter()
        .all(|key| !self.get_string(key).is_empty())
    }

    /// Serialize to the JSON layout used for the persisted copy.
    pub fn to_json_bytes(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }

    pub fn from_json_bytes(bytes: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(bytes)
    }
}

fn parse_seconds(raw: &str, default: i64) -> i64 {
    raw.trim()
        .parse::<i64>()
        .ok()
        .filter(|seconds| (1..=MAX_TTL_SECONDS).contains(seconds))
        .unwrap_or(default)
}

fn is_sensitive(key: &str) -> bool {
    SENSITIVE_FRAGMENTS.iter().any(|fragment| key.contains(fragment))
}

impl fmt::Debug for ConfigSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let strings: BTreeMap<&str, &str> = self
            .strings
            .iter()
            .map(|(k, v)| {
                let shown = if is_sensitive(k) && !v.is_empty() { "[redacted]" } else { v.as_str() };
                (k.as_str(), shown)
            })
            .collect();

        f.debug_struct("ConfigSnapshot")
            .field("version", &self.version)
            .field("strings", &strings)
            .field("bools", &self.bools)
            .field("lists", &self.lists)
            .finish()
    }
}
