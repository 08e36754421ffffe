//! Sequential write/read/delete benchmark for a single backend.
//!
//! Each phase issues `operations` calls one after another, awaiting every call
//! before starting the next, so timings reflect per-call latency rather than
//! throughput under concurrency.

use std::fmt;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use tokio::time::Instant;

use crate::backend::{Operation, StorageBackend};
use crate::error::{Error, Result};
use crate::progress::Progress;
use crate::result::BenchmarkResult;

/// Progress published before the first write.
const WRITE_START: f64 = 0.1;
/// Progress published before the first read.
const READ_START: f64 = 0.5;
/// Progress published before the first delete.
const CLEANUP_START: f64 = 0.9;
/// Share of the progress bar covered by the write and read phases each.
const PHASE_SPAN: f64 = 0.4;
/// Intermediate progress updates per timed phase.
const UPDATES_PER_PHASE: usize = 10;

/// Key written on iteration `i`.
pub fn key(i: usize) -> String {
    format!("test_{}", i)
}

/// Value written on iteration `i`. Embeds the current time so no two
/// writes carry the same payload.
pub fn value(i: usize) -> String {
    let millis = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis();
    format!("value_{}_{}", i, millis)
}

/// Benchmark phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Write,
    Read,
    Cleanup,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::Write => write!(f, "write"),
            Phase::Read => write!(f, "read"),
            Phase::Cleanup => write!(f, "cleanup"),
        }
    }
}

/// Runs the three phases against one backend and reports progress.
pub struct BenchmarkRunner {
    progress: Arc<Progress>,
}

impl BenchmarkRunner {
    pub fn new(progress: Arc<Progress>) -> Self {
        Self { progress }
    }

    /// Signal this runner publishes to.
    pub fn progress(&self) -> &Arc<Progress> {
        &self.progress
    }

    /// Write, read back and delete `operations` keys.
    ///
    /// The first failing call aborts the run and its error is returned; no
    /// partial result is produced.
    pub async fn run(
        &self,
        name: &str,
        backend: &dyn StorageBackend,
        operations: usize,
    ) -> Result<BenchmarkResult> {
        tracing::info!(backend = name, operations, "running benchmark");

        // Zero when there are fewer than ten operations: boundaries only.
        let every = operations / UPDATES_PER_PHASE;

        self.progress.set(WRITE_START);
        let start = Instant::now();
        for i in 0..operations {
            let key = key(i);
            backend
                .set(&key, &value(i))
                .await
                .map_err(|e| op_error(name, Operation::Set, key, e))?;
            self.report(every, i, operations, WRITE_START);
        }
        let write_time_ms = elapsed_ms(start);
        tracing::debug!(backend = name, phase = %Phase::Write, elapsed_ms = write_time_ms, "phase complete");

        self.progress.set(READ_START);
        let start = Instant::now();
        for i in 0..operations {
            let key = key(i);
            backend
                .get(&key)
                .await
                .map_err(|e| op_error(name, Operation::Get, key, e))?;
            self.report(every, i, operations, READ_START);
        }
        let read_time_ms = elapsed_ms(start);
        tracing::debug!(backend = name, phase = %Phase::Read, elapsed_ms = read_time_ms, "phase complete");

        self.progress.set(CLEANUP_START);
        for i in 0..operations {
            let key = key(i);
            backend
                .delete(&key)
                .await
                .map_err(|e| op_error(name, Operation::Delete, key, e))?;
        }
        self.progress.set(1.0);
        tracing::debug!(backend = name, phase = %Phase::Cleanup, "phase complete");

        tracing::info!(backend = name, write_time_ms, read_time_ms, "benchmark complete");

        Ok(BenchmarkResult {
            name: name.to_string(),
            write_time_ms,
            read_time_ms,
            operations,
        })
    }

    fn report(&self, every: usize, i: usize, operations: usize, base: f64) {
        if every != 0 && i % every == 0 {
            self.progress
                .set(base + (i as f64 / operations as f64) * PHASE_SPAN);
        }
    }
}

/// Whole milliseconds since `start`, saturating at `u64::MAX`.
fn elapsed_ms(start: Instant) -> u64 {
    u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX)
}

fn op_error(backend: &str, op: Operation, key: String, source: Error) -> Error {
    Error::Operation {
        backend: backend.to_string(),
        op,
        key,
        source: Box::new(source),
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::backend::{FaultPlan, MemoryBackend};

    /// Collect every progress value published during a run.
    fn record(progress: &Arc<Progress>) -> Arc<parking_lot::Mutex<Vec<f64>>> {
        let seen = Arc::new(parking_lot::Mutex::new(Vec::new()));
        let mut rx = progress.subscribe();
        let sink = Arc::clone(&seen);
        tokio::spawn(async move {
            while rx.changed().await.is_ok() {
                sink.lock().push(*rx.borrow_and_update());
            }
        });
        seen
    }

    #[test]
    fn test_keys_and_values() {
        assert_eq!(key(0), "test_0");
        assert_eq!(key(42), "test_42");
        assert!(value(7).starts_with("value_7_"));
    }

    #[tokio::test]
    async fn test_run_produces_result() {
        let store = MemoryBackend::new();
        let runner = BenchmarkRunner::new(Arc::new(Progress::new()));

        let result = runner.run("memory", &store, 100).await.unwrap();

        assert_eq!(result.name, "memory");
        assert_eq!(result.operations, 100);
        assert_eq!(store.calls(Operation::Set), 100);
        assert_eq!(store.calls(Operation::Get), 100);
        assert_eq!(store.calls(Operation::Delete), 100);
        assert!(store.is_empty());
        assert_eq!(runner.progress().get(), 1.0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timings_follow_latency() {
        let store = MemoryBackend::new().with_latency(Duration::from_millis(2));
        let runner = BenchmarkRunner::new(Arc::new(Progress::new()));

        let result = runner.run("slow", &store, 100).await.unwrap();

        assert!((200..=220).contains(&result.write_time_ms), "{:?}", result);
        assert!((200..=220).contains(&result.read_time_ms), "{:?}", result);
    }

    #[tokio::test(start_paused = true)]
    async fn test_elapsed_ms_whole_milliseconds() {
        let start = Instant::now();
        tokio::time::advance(Duration::from_micros(2_999)).await;
        assert_eq!(elapsed_ms(start), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_progress_is_monotonic() {
        let progress = Arc::new(Progress::new());
        let seen = record(&progress);
        let store = MemoryBackend::new().with_latency(Duration::from_millis(1));
        let runner = BenchmarkRunner::new(Arc::clone(&progress));

        runner.run("memory", &store, 200).await.unwrap();
        tokio::task::yield_now().await;

        let seen = seen.lock().clone();
        assert!(!seen.is_empty());
        assert!(seen.windows(2).all(|w| w[0] <= w[1]), "{:?}", seen);
        assert_eq!(*seen.last().unwrap(), 1.0);
        for boundary in [WRITE_START, READ_START, CLEANUP_START] {
            assert!(seen.contains(&boundary), "missing {} in {:?}", boundary, seen);
        }
    }

    #[tokio::test]
    async fn test_small_count_does_not_divide_by_zero() {
        let store = MemoryBackend::new();
        let runner = BenchmarkRunner::new(Arc::new(Progress::new()));

        for operations in [0, 1, 9] {
            let result = runner.run("tiny", &store, operations).await.unwrap();
            assert_eq!(result.operations, operations);
            assert!(store.is_empty());
        }
    }

    #[tokio::test]
    async fn test_failure_propagates() {
        let store = MemoryBackend::new().with_fault(FaultPlan::new(Operation::Get, 3));
        let runner = BenchmarkRunner::new(Arc::new(Progress::new()));

        let err = runner.run("flaky", &store, 100).await.unwrap_err();

        match err {
            Error::Operation { backend, op, key, source } => {
                assert_eq!(backend, "flaky");
                assert_eq!(op, Operation::Get);
                assert_eq!(key, "test_2");
                assert!(matches!(*source, Error::Injected { call: 3, .. }));
            }
            other => panic!("unexpected error: {:?}", other),
        }
        // The read phase stopped at the failing call; nothing was deleted.
        assert_eq!(store.calls(Operation::Get), 3);
        assert_eq!(store.calls(Operation::Delete), 0);
    }
}
