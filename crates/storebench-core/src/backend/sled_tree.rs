//! Sled-backed store.
//!
//! The embedded, natively compiled store: calls go straight to the sled tree
//! on the caller's task with no executor hop.

use std::path::Path;

use async_trait::async_trait;
use sled::{Db, Tree};

use super::StorageBackend;
use crate::error::{Error, Result};

/// Tree holding benchmark keys.
const KV_TREE: &str = "kv";

/// Page cache capacity in bytes.
const CACHE_CAPACITY: u64 = 64 * 1024 * 1024;

/// Background flush interval in milliseconds.
const FLUSH_EVERY_MS: u64 = 1000;

/// Key-value store on a sled tree.
pub struct SledBackend {
    _db: Db,
    tree: Tree,
}

impl SledBackend {
    /// Open or create a store at `path`.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::from_config(sled::Config::new().path(path.as_ref()))
    }

    /// Create a temporary store, deleted on drop.
    pub fn temporary() -> Result<Self> {
        Self::from_config(sled::Config::new().temporary(true))
    }

    fn from_config(config: sled::Config) -> Result<Self> {
        let db = config
            .cache_capacity(CACHE_CAPACITY)
            .use_compression(true)
            .flush_every_ms(Some(FLUSH_EVERY_MS))
            .open()?;
        let tree = db.open_tree(KV_TREE)?;
        Ok(Self { _db: db, tree })
    }

    /// Number of keys currently stored.
    pub fn len(&self) -> usize {
        self.tree.len()
    }

    /// Check if the store is empty.
    pub fn is_empty(&self) -> bool {
        self.tree.is_empty()
    }
}

#[async_trait]
impl StorageBackend for SledBackend {
    async fn set(&self, key: &str, value: &str) -> Result<()> {
        self.tree.insert(key.as_bytes(), value.as_bytes())?;
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<String>> {
        match self.tree.get(key.as_bytes())? {
            Some(bytes) => String::from_utf8(bytes.to_vec())
                .map(Some)
                .map_err(|e| Error::InvalidData(format!("value for `{}`: {}", key, e))),
            None => Ok(None),
        }
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.tree.remove(key.as_bytes())?;
        Ok(())
    }
}
