//! Session records persisted through a host [`KeyValueStore`].
//!
//! Each store holds one JSON object under [`SESSION_KEY`]. A store that fails
//! the startup probe is replaced with a [`MemoryStore`] for the life of the
//! client.

use bridge_traits::{KeyValueStore, MemoryStore};
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::warn;

use crate::error::{Result, SessionError};

pub const SESSION_KEY: &str = "branch_session";
const PROBE_KEY: &str = "branch_storage_probe";

pub struct SessionStorage {
    store: Arc<dyn KeyValueStore>,
    degraded: bool,
}

impl SessionStorage {
    /// Probe `store` with a write and remove; fall back to memory on failure.
    pub async fn open(store: Arc<dyn KeyValueStore>) -> Self {
        let probe = async {
            store.set(PROBE_KEY, "1").await?;
            store.remove(PROBE_KEY).await
        };

        match probe.await {
            Ok(()) => Self {
                store,
                degraded: false,
            },
            Err(e) => {
                warn!(error = %e, "Session store unavailable, using in-memory storage");
                Self {
                    store: Arc::new(MemoryStore::new()),
                    degraded: true,
                }
            }
        }
    }

    /// True when the probe failed and records live only in memory.
    pub fn is_degraded(&self) -> bool {
        self.degraded
    }

    /// Stored record; unreadable or malformed records read as empty.
    pub async fn read(&self) -> Map<String, Value> {
        let raw = match self.store.get(SESSION_KEY).await {
            Ok(raw) => raw,
            Err(e) => {
                warn!(error = %e, "Failed to read session record");
                None
            }
        };

        match raw.map(|s| serde_json::from_str::<Value>(&s)) {
            Some(Ok(Value::Object(record))) => record,
            Some(_) => {
                warn!("Discarding malformed session record");
                Map::new()
            }
            None => Map::new(),
        }
    }

    pub async fn write(&self, record: &Map<String, Value>) -> Result<()> {
        let encoded = Value::Object(record.clone()).to_string();
        self.store
            .set(SESSION_KEY, &encoded)
            .await
            .map_err(|e| SessionError::Storage(e.to_string()))
    }

    /// One field of the record, treating falsy values as missing.
    pub async fn read_field(&self, key: &str) -> Option<Value> {
        self.read().await.remove(key).filter(|v| !is_falsy(v))
    }

    /// Read, update and write back a set of fields.
    pub async fn merge(&self, fields: Map<String, Value>) -> Result<()> {
        let mut record = self.read().await;
        record.extend(fields);
        self.write(&record).await
    }

    pub async fn store_field(&self, key: &str, value: Value) -> Result<()> {
        let mut fields = Map::new();
        fields.insert(key.to_string(), value);
        self.merge(fields).await
    }

    /// Remove the session record.
    pub async fn clear(&self) -> Result<()> {
        self.store
            .remove(SESSION_KEY)
            .await
            .map_err(|e| SessionError::Storage(e.to_string()))
    }
}

/// `null`, `""`, `false` and `0` count as unset in stored records.
pub fn is_falsy(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::String(s) => s.is_empty(),
        Value::Number(n) => n.as_f64() == Some(0.0),
        _ => false,
    }
}
