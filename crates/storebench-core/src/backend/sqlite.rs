//! SQLite-backed store.
//!
//! Each call is shipped to tokio's blocking pool and awaited, so every
//! operation pays an executor round trip on top of the SQLite statement.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension};

use super::StorageBackend;
use crate::error::Result;

const SCHEMA: &str = r#"
    CREATE TABLE IF NOT EXISTS kv (
        key TEXT PRIMARY KEY,
        value TEXT NOT NULL
    );
"#;

/// Key-value store on a single SQLite table.
pub struct SqliteBackend {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteBackend {
    /// Create a store in an in-memory database.
    pub fn in_memory() -> Result<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    /// Open or create a store in the database file at `path`.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let conn = Connection::open(path)?;
        conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get::<_, String>(0))?;
        Self::from_connection(conn)
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Number of keys currently stored.
    pub fn len(&self) -> Result<usize> {
        let conn = self.conn.lock();
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM kv", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    async fn with_conn<T, F>(&self, f: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> rusqlite::Result<T> + Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        let value = tokio::task::spawn_blocking(move || {
            let conn = conn.lock();
            f(&conn)
        })
        .await??;
        Ok(value)
    }
}

#[async_trait]
impl StorageBackend for SqliteBackend {
    async fn set(&self, key: &str, value: &str) -> Result<()> {
        let (key, value) = (key.to_owned(), value.to_owned());
        self.with_conn(move |conn| {
            conn.prepare_cached("INSERT OR REPLACE INTO kv (key, value) VALUES (?1, ?2)")?
                .execute(params![key, value])
                .map(|_| ())
        })
        .await
    }

    async fn get(&self, key: &str) -> Result<Option<String>> {
        let key = key.to_owned();
        self.with_conn(move |conn| {
            conn.prepare_cached("SELECT value FROM kv WHERE key = ?1")?
                .query_row(params![key], |row| row.get(0))
                .optional()
        })
        .await
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let key = key.to_owned();
        self.with_conn(move |conn| {
            conn.prepare_cached("DELETE FROM kv WHERE key = ?1")?
                .execute(params![key])
                .map(|_| ())
        })
        .await
    }
}
