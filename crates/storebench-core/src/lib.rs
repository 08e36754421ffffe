//! Storebench Core - sequential key-value storage benchmarks.
//!
//! Times a fixed number of sequential writes, reads and deletes against each
//! configured backend and collects the results for side-by-side comparison.
//!
//! # Components
//!
//! - **Backend**: the [`StorageBackend`] capability plus sled, SQLite and
//!   in-memory implementations
//! - **Runner**: the three-phase timing loop for one backend
//! - **Orchestrator**: runs backends in turn and owns the session state
//! - **Result**: per-backend timings and speedup comparison

pub mod backend;
pub mod config;
pub mod error;
pub mod orchestrator;
pub mod progress;
pub mod result;
pub mod runner;

pub use backend::{
    open_backend, open_configured, BackendKind, FaultPlan, MemoryBackend, NamedBackend,
    Operation, SledBackend, SqliteBackend, StorageBackend,
};
pub use config::{BenchConfig, OperationCount};
pub use error::{Error, Result};
pub use orchestrator::{BenchmarkOrchestrator, SessionState};
pub use progress::Progress;
pub use result::{BenchmarkResult, Comparison, ComparisonEntry};
pub use runner::{BenchmarkRunner, Phase};
