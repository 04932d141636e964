use crate::error::IdentityError;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tracing::{debug, info};

/// One live session, keyed in the registry by the hash of its fingerprint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionEntry {
    pub fingerprint: String,
    pub user_id: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl SessionEntry {
    pub fn new(
        fingerprint: impl Into<String>,
        user_id: impl Into<String>,
        ttl_seconds: i64,
    ) -> Result<Self, IdentityError> {
        let now = Utc::now();
        let expires_at = ChronoDuration::try_seconds(ttl_seconds)
            .and_then(|ttl| now.checked_add_signed(ttl))
            .ok_or_else(|| IdentityError::invalid_input(format!("session lifetime {ttl_seconds}s overflows")))?;
        Ok(Self {
            fingerprint: fingerprint.into(),
            user_id: user_id.into(),
            created_at: now,
            expires_at,
        })
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}

#[derive(Default)]
struct Inner {
    by_hash: HashMap<String, SessionEntry>,
    by_user: HashMap<String, HashSet<String>>,
}

impl Inner {
    fn unlink(&mut self, hash: &str, user_id: &str) {
        if let Some(hashes) = self.by_user.get_mut(user_id) {
            hashes.remove(hash);
            if hashes.is_empty() {
                self.by_user.remove(user_id);
            }
        }
    }

    fn remove(&mut self, hash: &str) -> Option<SessionEntry> {
        let entry = self.by_hash.remove(hash)?;
        self.unlink(hash, &entry.user_id);
        Some(entry)
    }
}

/// Active sessions per user.
///
/// Both indexes sit behind one lock so a reader never sees a session in one
/// map and not the other, and `reinit` is observed as a single step.
#[derive(Default)]
pub struct SessionRegistry {
    inner: RwLock<Inner>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `entry` under `fingerprint_hash`, replacing any previous owner.
    pub async fn put(&self, fingerprint_hash: impl Into<String>, entry: SessionEntry) {
        let hash = fingerprint_hash.into();
        let mut inner = self.inner.write().await;

        if let Some(previous) = inner.by_hash.get(&hash).map(|e| e.user_id.clone()) {
            inner.unlink(&hash, &previous);
        }
        inner
            .by_user
            .entry(entry.user_id.clone())
            .or_default()
            .insert(hash.clone());
        debug!(user_id = %entry.user_id, "Session registered");
        inner.by_hash.insert(hash, entry);
    }

    /// Live session for `fingerprint_hash`; expired entries read as absent.
    pub async fn get(&self, fingerprint_hash: &str) -> Option<SessionEntry> {
        let inner = self.inner.read().await;
        inner
            .by_hash
            .get(fingerprint_hash)
            .filter(|entry| !entry.is_expired_at(Utc::now()))
            .cloned()
    }

    pub async fn list_by_user(&self, user_id: &str) -> Vec<SessionEntry> {
        let inner = self.inner.read().await;
        let now = Utc::now();
        inner
            .by_user
            .get(user_id)
            .into_iter()
            .flatten()
            .filter_map(|hash| inner.by_hash.get(hash))
            .filter(|entry| !entry.is_expired_at(now))
            .cloned()
            .collect()
    }

    pub async fn remove(&self, fingerprint_hash: &str) -> Option<SessionEntry> {
        let removed = self.inner.write().await.remove(fingerprint_hash);
        if let Some(entry) = &removed {
            debug!(user_id = %entry.user_id, "Session removed");
        }
        removed
    }

    /// Drop every session owned by `user_id`; returns how many were dropped.
    pub async fn remove_all_for_user(&self, user_id: &str) -> usize {
        let mut inner = self.inner.write().await;
        let hashes = inner.by_user.remove(user_id).unwrap_or_default();
        for hash in &hashes {
            inner.by_hash.remove(hash);
        }
        info!(user_id = %user_id, count = hashes.len(), "Sessions revoked for user");
        hashes.len()
    }

    /// Drop all sessions. Used when the signing trust domain changes.
    pub async fn reinit(&self) -> usize {
        let previous = std::mem::take(&mut *self.inner.write().await);
        let count = previous.by_hash.len();
        info!(count, "Session registry reinitialized");
        count
    }

    /// Remove sessions whose expiry is at or before `now`.
    pub async fn sweep_expired(&self, now: DateTime<Utc>) -> usize {
        let mut inner = self.inner.write().await;
        let expired: Vec<String> = inner
            .by_hash
            .iter()
            .filter(|(_, entry)| entry.is_expired_at(now))
            .map(|(hash, _)| hash.clone())
            .collect();
        for hash in &expired {
            inner.remove(hash);
        }
        if !expired.is_empty() {
            info!(count = expired.len(), "Expired sessions swept");
        }
        expired.len()
    }

    /// Run [`Self::sweep_expired`] every `interval` until the task is aborted.
    pub fn spawn_sweeper(self: &Arc<Self>, interval: Duration) -> JoinHandle<()> {
        let registry = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                registry.sweep_expired(Utc::now()).await;
            }
        })
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.by_hash.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.by_hash.is_empty()
    }
}

impl std::fmt::Debug for SessionRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionRegistry").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DAY: i64 = 24 * 60 * 60;

    fn entry(fingerprint: impl Into<String>, user_id: &str, ttl_seconds: i64) -> SessionEntry {
        SessionEntry::new(fingerprint, user_id, ttl_seconds).unwrap()
    }

    #[tokio::test]
    async fn test_put_get_remove() {
        let registry = SessionRegistry::new();
        registry.put("hash-1", entry("fp-1", "user-1", DAY)).await;

        let entry = registry.get("hash-1").await.unwrap();
        assert_eq!(entry.user_id, "user-1");
        assert_eq!(entry.fingerprint, "fp-1");

        assert!(registry.remove("hash-1").await.is_some());
        assert!(registry.get("hash-1").await.is_none());
        assert!(registry.list_by_user("user-1").await.is_empty());
    }

    #[tokio::test]
    async fn test_multi_device_and_remove_all() {
        let registry = SessionRegistry::new();
        registry.put("a", entry("fa", "user-1", DAY)).await;
        registry.put("b", entry("fb", "user-1", DAY)).await;
        registry.put("c", entry("fc", "user-2", DAY)).await;

        assert_eq!(registry.list_by_user("user-1").await.len(), 2);
        assert_eq!(registry.remove_all_for_user("user-1").await, 2);
        assert!(registry.get("a").await.is_none());
        assert!(registry.get("c").await.is_some());
    }

    #[tokio::test]
    async fn test_put_reassigns_owner() {
        let registry = SessionRegistry::new();
        registry.put("h", entry("f", "user-1", DAY)).await;
        registry.put("h", entry("f", "user-2", DAY)).await;

        assert!(registry.list_by_user("user-1").await.is_empty());
        assert_eq!(registry.list_by_user("user-2").await.len(), 1);
        assert_eq!(registry.len().await, 1);
    }

    #[tokio::test]
    async fn test_reinit_drops_everything() {
        let registry = SessionRegistry::new();
        for i in 0..10 {
            registry
                .put(format!("h{i}"), entry(format!("f{i}"), "user", DAY))
                .await;
        }
        assert_eq!(registry.reinit().await, 10);
        assert!(registry.is_empty().await);
        assert!(registry.list_by_user("user").await.is_empty());
    }

    #[tokio::test]
    async fn test_expired_entries_read_as_absent_and_sweep() {
        let registry = SessionRegistry::new();
        registry.put("old", entry("f1", "user", -1)).await;
        registry.put("new", entry("f2", "user", DAY)).await;

        assert!(registry.get("old").await.is_none());
        assert_eq!(registry.list_by_user("user").await.len(), 1);
        assert_eq!(registry.sweep_expired(Utc::now()).await, 1);
        assert_eq!(registry.len().await, 1);
    }

    #[tokio::test]
    async fn test_sweeper_runs_periodically() {
        let registry = Arc::new(SessionRegistry::new());
        registry.put("old", entry("f", "user", -1)).await;

        let handle = registry.spawn_sweeper(Duration::from_millis(20));
        tokio::time::sleep(Duration::from_millis(200)).await;

        assert!(registry.is_empty().await);
        handle.abort();
    }

    #[test]
    fn test_overflowing_lifetime_is_an_error() {
        assert!(matches!(
            SessionEntry::new("f", "user", i64::MAX),
            Err(IdentityError::InvalidInput(_))
        ));
    }
}
