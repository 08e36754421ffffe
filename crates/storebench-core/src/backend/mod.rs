//! Storage backends under test.
//!
//! Every backend exposes the same three string key-value calls so the runner
//! can drive them identically. Two real stores are provided (sled and SQLite)
//! plus an in-memory store with injectable latency and faults for tests.

mod memory;
mod sled_tree;
mod sqlite;

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::config::BenchConfig;
use crate::error::Result;

pub use self::memory::{FaultPlan, MemoryBackend};
pub use self::sled_tree::SledBackend;
pub use self::sqlite::SqliteBackend;

/// Async key-value store with string keys and values.
#[async_trait]
pub trait StorageBackend: Send + Sync {
    /// Store `value` under `key`, replacing any previous value.
    async fn set(&self, key: &str, value: &str) -> Result<()>;

    /// Fetch the value stored under `key`.
    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// Remove `key`. Removing an absent key succeeds.
    async fn delete(&self, key: &str) -> Result<()>;
}

/// A single storage call, used for error reporting and fault injection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    /// `set(key, value)`.
    Set,
    /// `get(key)`.
    Get,
    /// `delete(key)`.
    Delete,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operation::Set => write!(f, "set"),
            Operation::Get => write!(f, "get"),
            Operation::Delete => write!(f, "delete"),
        }
    }
}

/// A backend paired with the name its results are reported under.
#[derive(Clone)]
pub struct NamedBackend {
    pub name: String,
    pub backend: Arc<dyn StorageBackend>,
}

impl NamedBackend {
    pub fn new(name: impl Into<String>, backend: Arc<dyn StorageBackend>) -> Self {
        Self {
            name: name.into(),
            backend,
        }
    }
}

impl fmt::Debug for NamedBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NamedBackend")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

/// Backends the factory knows how to open.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// Embedded sled tree, called inline.
    Sled,
    /// SQLite table, called through the blocking pool.
    Sqlite,
    /// In-process map with optional simulated latency.
    Memory,
}

impl BackendKind {
    /// Name results are reported under.
    pub fn name(&self) -> &'static str {
        match self {
            BackendKind::Sled => "sled",
            BackendKind::Sqlite => "sqlite",
            BackendKind::Memory => "memory",
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Open a backend of the given kind.
///
/// File-backed stores live under `config.data_dir` when set; otherwise they
/// are temporary and vanish on drop.
pub fn open_backend(kind: BackendKind, config: &BenchConfig) -> Result<NamedBackend> {
    let backend: Arc<dyn StorageBackend> = match kind {
        BackendKind::Sled => match &config.data_dir {
            Some(dir) => {
                std::fs::create_dir_all(dir)?;
                Arc::new(SledBackend::open(dir.join("sled"))?)
            }
            None => Arc::new(SledBackend::temporary()?),
        },
        BackendKind::Sqlite => match &config.data_dir {
            Some(dir) => {
                std::fs::create_dir_all(dir)?;
                Arc::new(SqliteBackend::open(dir.join("kv.sqlite3"))?)
            }
            None => Arc::new(SqliteBackend::in_memory()?),
        },
        BackendKind::Memory => {
            let mut memory = MemoryBackend::new();
            if let Some(latency) = config.memory_latency {
                memory = memory.with_latency(latency);
            }
            if let Some(fault) = config.memory_fault {
                memory = memory.with_fault(fault);
            }
            Arc::new(memory)
        }
    };

    tracing::debug!(backend = %kind, data_dir = ?config.data_dir, "backend opened");
    Ok(NamedBackend::new(kind.name(), backend))
}

/// Open every backend listed in `config.backends`, in order.
pub fn open_configured(config: &BenchConfig) -> Result<Vec<NamedBackend>> {
    config
        .backends
        .iter()
        .map(|&kind| open_backend(kind, config))
        .collect()
}
