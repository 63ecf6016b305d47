//! Keyed registry of controllers owned by an account scope.
//!
//! Views look up (or lazily create) the controller for an item or account
//! here instead of in a process-wide map. Everything registered under an
//! account goes away with [`ControllerRegistry::evict_account`].

use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

/// Account key -> item key -> shared controller.
pub struct ControllerRegistry<V> {
    entries: RwLock<HashMap<String, HashMap<String, Arc<V>>>>,
}

impl<V> ControllerRegistry<V> {
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Existing entry, if any.
    pub fn get(&self, account: &str, key: &str) -> Option<Arc<V>> {
        self.entries
            .read()
            .get(account)
            .and_then(|items| items.get(key))
            .cloned()
    }

    /// Existing entry, or the one `create` builds. `create` runs at most once
    /// per key even under concurrent callers.
    pub fn get_or_insert_with<F>(&self, account: &str, key: &str, create: F) -> Arc<V>
    where
        F: FnOnce() -> V,
    {
        if let Some(existing) = self.get(account, key) {
            return existing;
        }
        let mut entries = self.entries.write();
        Arc::clone(
            entries
                .entry(account.to_string())
                .or_default()
                .entry(key.to_string())
                .or_insert_with(|| Arc::new(create())),
        )
    }

    /// Drop one entry.
    pub fn remove(&self, account: &str, key: &str) -> Option<Arc<V>> {
        let mut entries = self.entries.write();
        let items = entries.get_mut(account)?;
        let removed = items.remove(key);
        if items.is_empty() {
            entries.remove(account);
        }
        removed
    }

    /// Drop everything registered under `account`. Returns how many entries went.
    pub fn evict_account(&self, account: &str) -> usize {
        let evicted = self
            .entries
            .write()
            .remove(account)
            .map(|items| items.len())
            .unwrap_or(0);
        if evicted > 0 {
            tracing::debug!(account, evicted, "evicted account controllers");
        }
        evicted
    }

    /// Accounts with at least one entry.
    pub fn accounts(&self) -> Vec<String> {
        self.entries.read().keys().cloned().collect()
    }

    /// Total entries across accounts.
    pub fn len(&self) -> usize {
        self.entries.read().values().map(|items| items.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<V> Default for ControllerRegistry<V> {
    fn default() -> Self {
        Self::new()
    }
}
