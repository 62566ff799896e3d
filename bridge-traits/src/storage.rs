//! Key-Value Storage Abstractions
//!
//! Session records are persisted as JSON strings under a single key, so the
//! only capability the core needs from a host is a string key-value store.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::RwLock;

use crate::error::{BridgeError, Result};

/// Key-value persistence trait
///
/// Backs both the short-lived (per app run) and long-lived (first session,
/// device identity) session stores:
/// - Desktop: SQLite table scoped per store
/// - Mobile shells: SharedPreferences / NSUserDefaults
/// - Web: sessionStorage / localStorage
///
/// A store that cannot be written must return an error from [`set`]; the
/// session layer probes stores on startup and substitutes a
/// [`MemoryStore`] when the probe fails.
///
/// [`set`]: KeyValueStore::set
///
/// # Example
///
/// ```ignore
/// use bridge_traits::storage::KeyValueStore;
///
/// async fn remember(store: &dyn KeyValueStore, record: &str) -> Result<()> {
///     store.set("branch_session", record).await
/// }
/// ```
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Retrieve a value
    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// Store a value, replacing any previous one
    async fn set(&self, key: &str, value: &str) -> Result<()>;

    /// Delete a value; deleting a missing key is not an error
    async fn remove(&self, key: &str) -> Result<()>;

    /// Delete every value in this store
    async fn clear(&self) -> Result<()>;
}

/// In-process store.
///
/// Contents live as long as the value does.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RwLock<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.read().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn poisoned() -> BridgeError {
    BridgeError::Storage("memory store lock poisoned".to_string())
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let entries = self.entries.read().map_err(|_| poisoned())?;
        Ok(entries.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        let mut entries = self.entries.write().map_err(|_| poisoned())?;
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<()> {
        let mut entries = self.entries.write().map_err(|_| poisoned())?;
        entries.remove(key);
        Ok(())
    }

    async fn clear(&self) -> Result<()> {
        let mut entries = self.entries.write().map_err(|_| poisoned())?;
        entries.clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_memory_store_round_trip() {
        let store = MemoryStore::new();
        assert_eq!(store.get("branch_session").await.unwrap(), None);

        store.set("branch_session", "{}").await.unwrap();
        assert_eq!(
            store.get("branch_session").await.unwrap(),
            Some("{}".to_string())
        );

        store.set("branch_session", r#"{"a":1}"#).await.unwrap();
        assert_eq!(store.len(), 1);

        store.remove("branch_session").await.unwrap();
        store.remove("missing").await.unwrap();
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_memory_store_clear() {
        let store = MemoryStore::new();
        store.set("a", "1").await.unwrap();
        store.set("b", "2").await.unwrap();
        store.clear().await.unwrap();
        assert!(store.is_empty());
    }
}
