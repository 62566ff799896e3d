//! Key-value storage using SQLite

use async_trait::async_trait;
use bridge_traits::{
    error::{BridgeError, Result},
    storage::KeyValueStore,
};
use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions},
    Row,
};
use std::path::{Path, PathBuf};
use tracing::debug;

const CREATE_TABLE: &str = r#"
    CREATE TABLE IF NOT EXISTS kv_store (
        scope TEXT NOT NULL,
        key TEXT NOT NULL,
        value TEXT NOT NULL,
        updated_at INTEGER NOT NULL,
        PRIMARY KEY (scope, key)
    )
"#;

/// SQLite-backed key-value store
///
/// Several stores can share one database file; each instance only sees rows
/// in its own `scope`, so the long-lived and short-lived session stores can
/// live side by side.
pub struct SqliteKeyValueStore {
    pool: SqlitePool,
    scope: String,
}

impl SqliteKeyValueStore {
    /// Open (creating if needed) a store in the database at `db_path`
    pub async fn open(db_path: impl AsRef<Path>, scope: impl Into<String>) -> Result<Self> {
        let db_path = db_path.as_ref();
        if let Some(parent) = db_path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(BridgeError::Io)?;
        }

        let options = SqliteConnectOptions::new()
            .filename(db_path)
            .create_if_missing(true);

        let pool = SqlitePool::connect_with(options)
            .await
            .map_err(|e| BridgeError::DatabaseError(format!("Failed to connect to DB: {}", e)))?;

        let store = Self::with_pool(pool, scope).await?;
        debug!(path = ?db_path, scope = %store.scope, "Initialized key-value store");
        Ok(store)
    }

    /// Create an in-memory store (for testing)
    pub async fn in_memory(scope: impl Into<String>) -> Result<Self> {
        // Every connection to `:memory:` is a separate database, so pin the pool to one.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .map_err(|e| BridgeError::DatabaseError(format!("Failed to connect to DB: {}", e)))?;

        Self::with_pool(pool, scope).await
    }

    /// Create a store over an existing pool, sharing it with other scopes
    pub async fn with_pool(pool: SqlitePool, scope: impl Into<String>) -> Result<Self> {
        sqlx::query(CREATE_TABLE)
            .execute(&pool)
            .await
            .map_err(|e| BridgeError::DatabaseError(format!("Failed to create table: {}", e)))?;

        Ok(Self {
            pool,
            scope: scope.into(),
        })
    }

    /// Default database location in the user's data directory
    pub fn default_path() -> Result<PathBuf> {
        dirs::data_local_dir()
            .map(|dir| dir.join("branch-sdk").join("session.db"))
            .ok_or_else(|| {
                BridgeError::NotAvailable("No local data directory for this user".to_string())
            })
    }

    /// Pool handle, for opening sibling scopes on the same database
    pub fn pool(&self) -> SqlitePool {
        self.pool.clone()
    }

    pub fn scope(&self) -> &str {
        &self.scope
    }
}

#[async_trait]
impl KeyValueStore for SqliteKeyValueStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let row = sqlx::query("SELECT value FROM kv_store WHERE scope = ? AND key = ?")
            .bind(&self.scope)
            .bind(key)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| BridgeError::DatabaseError(format!("Failed to read key: {}", e)))?;

        Ok(row.map(|row| row.get::<String, _>(0)))
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO kv_store (scope, key, value, updated_at)
            VALUES (?, ?, ?, ?)
            ON CONFLICT(scope, key) DO UPDATE SET
                value = excluded.value,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(&self.scope)
        .bind(key)
        .bind(value)
        .bind(core_async::time::now_millis() as i64)
        .execute(&self.pool)
        .await
        .map_err(|e| BridgeError::DatabaseError(format!("Failed to write key: {}", e)))?;

        debug!(scope = %self.scope, key, "Stored value");
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<()> {
        sqlx::query("DELETE FROM kv_store WHERE scope = ? AND key = ?")
            .bind(&self.scope)
            .bind(key)
            .execute(&self.pool)
            .await
            .map_err(|e| BridgeError::DatabaseError(format!("Failed to delete key: {}", e)))?;
        Ok(())
    }

    async fn clear(&self) -> Result<()> {
        sqlx::query("DELETE FROM kv_store WHERE scope = ?")
            .bind(&self.scope)
            .execute(&self.pool)
            .await
            .map_err(|e| BridgeError::DatabaseError(format!("Failed to clear scope: {}", e)))?;

        debug!(scope = %self.scope, "Cleared store");
        Ok(())
    }
}
