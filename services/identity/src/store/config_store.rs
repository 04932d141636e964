use crate::store::snapshot::ConfigSnapshot;
use arc_swap::ArcSwap;
use std::sync::Arc;
use tracing::info;

/// Holder of the active configuration snapshot.
///
/// Readers load an `Arc` to a complete snapshot; a commit is a single pointer
/// swap, so a reader sees either the previous snapshot or the new one in
/// full. Versions are assigned inside the swap, so they are published in
/// increasing order. Share the store as `Arc<ConfigStore>`.
pub struct ConfigStore {
    current: ArcSwap<ConfigSnapshot>,
}

impl ConfigStore {
    pub fn new(mut initial: ConfigSnapshot) -> Self {
        initial.set_version(1);
        Self {
            current: ArcSwap::from_pointee(initial),
        }
    }

    /// Read-only view for consumers needing several keys consistently.
    pub fn get_all(&self) -> Arc<ConfigSnapshot> {
        self.current.load_full()
    }

    pub fn get_string(&self, key: &str) -> String {
        self.current.load().get_string(key).to_string()
    }

    pub fn get_bool(&self, key: &str) -> bool {
        self.current.load().get_bool(key)
    }

    pub fn get_list(&self, key: &str) -> Vec<String> {
        self.current.load().get_list(key).to_vec()
    }

    /// Mutable copy of the active snapshot; changes stay private until committed.
    pub fn clone_snapshot(&self) -> ConfigSnapshot {
        self.current.load().as_ref().clone()
    }

    pub fn version(&self) -> u64 {
        self.current.load().version()
    }

    /// Publish `snapshot` as the active configuration and return its version.
    pub fn commit(&self, snapshot: ConfigSnapshot) -> u64 {
        let mut version = 0;
        self.current.rcu(|current| {
            let mut next = snapshot.clone();
            version = current.version() + 1;
            next.set_version(version);
            Arc::new(next)
        });
        info!(version, "Configuration committed");
        version
    }
}

impl std::fmt::Debug for ConfigStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConfigStore")
            .field("version", &self.version())
            .finish_non_exhaustive()
    }
}
