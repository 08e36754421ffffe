//! Core error types.

use thiserror::Error;

use crate::backend::Operation;

/// Benchmark errors.
#[derive(Debug, Error)]
pub enum Error {
    /// Sled storage error.
    #[error("sled error: {0}")]
    Sled(#[from] sled::Error),

    /// SQLite storage error.
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// A blocking storage task panicked or was cancelled.
    #[error("storage task failed: {0}")]
    Task(#[from] tokio::task::JoinError),

    /// Stored bytes could not be decoded.
    #[error("invalid data: {0}")]
    InvalidData(String),

    /// Failure injected by a test backend.
    #[error("injected failure on {op} call #{call}")]
    Injected {
        /// Operation that was failed.
        op: Operation,
        /// 1-based call number within that operation.
        call: usize,
    },

    /// A backend call failed during a benchmark run.
    #[error("{backend}: {op} `{key}` failed: {source}")]
    Operation {
        /// Name of the backend under test.
        backend: String,
        /// Operation that failed.
        op: Operation,
        /// Key passed to the failing call.
        key: String,
        /// Underlying backend error.
        #[source]
        source: Box<Error>,
    },

    /// A session is already in flight.
    #[error("a benchmark session is already running")]
    AlreadyRunning,

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// IO error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result alias for benchmark operations.
pub type Result<T> = std::result::Result<T, Error>;
