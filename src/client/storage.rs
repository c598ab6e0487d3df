//! # Session Storage
//!
//! Durable key/value storage behind the token store. Only the access token and
//! a minimal user projection are ever written here; the refresh token travels in
//! an HTTP-only cookie and is never persisted by the client.
//!
//! ## Backends
//!
//! - `SqliteStorage`: a single `session_kv` table in a local SQLite file, created
//!   on demand, WAL journal. `SqliteStorage::in_memory()` gives a throwaway database.
//! - `MemoryStorage`: an in-process map, for tests and callers that opt out of
//!   persistence.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use storefront::client::storage::{SessionStorage, SqliteStorage};
//!
//! # async fn example() -> Result<(), storefront::client::StorageError> {
//! let storage = SqliteStorage::open("/tmp/storefront/session.db").await?;
//! storage.write("accessToken", "tok1").await?;
//! assert_eq!(storage.read("accessToken").await?.as_deref(), Some("tok1"));
//! # Ok(())
//! # }
//! ```

use crate::client::error::StorageError;
use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use std::collections::HashMap;
use std::path::Path;
use tokio::sync::RwLock;

/// Result type for storage operations
pub type Result<T> = std::result::Result<T, StorageError>;

/// Key under which the access token is persisted
pub const ACCESS_TOKEN_KEY: &str = "accessToken";
/// Key under which the user projection is persisted
pub const USER_KEY: &str = "user";

/// Durable key/value storage for session data
#[async_trait]
pub trait SessionStorage: Send + Sync {
    async fn read(&self, key: &str) -> Result<Option<String>>;
    async fn write(&self, key: &str, value: &str) -> Result<()>;
    async fn remove(&self, key: &str) -> Result<()>;
}

/// SQLite-backed session storage
#[derive(Debug, Clone)]
pub struct SqliteStorage {
    pool: SqlitePool,
}

impl SqliteStorage {
    /// Open or create the session database at `path`
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal);
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await?;

        let storage = Self { pool };
        storage.init_schema().await?;
        tracing::debug!(path = %path.display(), "Session storage opened");
        Ok(storage)
    }

    /// A private in-memory database, gone when the storage is dropped
    pub async fn in_memory() -> Result<Self> {
        // One connection: every pooled connection to :memory: is a separate database.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await?;
        let storage = Self { pool };
        storage.init_schema().await?;
        Ok(storage)
    }

    async fn init_schema(&self) -> Result<()> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS session_kv (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )",
        )
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Number of stored keys
    pub async fn len(&self) -> Result<usize> {
        let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM session_kv")
            .fetch_one(&self.pool)
            .await?;
        Ok(count.0 as usize)
    }

    pub async fn is_empty(&self) -> Result<bool> {
        Ok(self.len().await? == 0)
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}

#[async_trait]
impl SessionStorage for SqliteStorage {
    async fn read(&self, key: &str) -> Result<Option<String>> {
        let row: Option<(String,)> = sqlx::query_as("SELECT value FROM session_kv WHERE key = ?")
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(|(value,)| value))
    }

    async fn write(&self, key: &str, value: &str) -> Result<()> {
        sqlx::query(
            "INSERT INTO session_kv (key, value, updated_at) VALUES (?, ?, ?)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
        )
        .bind(key)
        .bind(value)
        .bind(chrono::Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<()> {
        sqlx::query("DELETE FROM session_kv WHERE key = ?")
            .bind(key)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

/// In-process session storage
#[derive(Debug, Default)]
pub struct MemoryStorage {
    entries: RwLock<HashMap<String, String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sorted list of stored keys
    pub async fn keys(&self) -> Vec<String> {
        let entries = self.entries.read().await;
        let mut keys: Vec<String> = entries.keys().cloned().collect();
        keys.sort();
        keys
    }
}

#[async_trait]
impl SessionStorage for MemoryStorage {
    async fn read(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries.read().await.get(key).cloned())
    }

    async fn write(&self, key: &str, value: &str) -> Result<()> {
        self.entries.write().await.insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<()> {
        self.entries.write().await.remove(key);
        Ok(())
    }
}
