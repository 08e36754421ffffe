//! Benchmark sessions across several backends.
//!
//! The orchestrator owns the state a presentation layer renders: the
//! configured operation count, whether a session is running, the progress of
//! the backend currently under test, and the results of the last session.

use std::sync::Arc;

use parking_lot::RwLock;
use tokio::sync::watch;

use crate::backend::NamedBackend;
use crate::config::OperationCount;
use crate::error::{Error, Result};
use crate::progress::Progress;
use crate::result::{BenchmarkResult, Comparison};
use crate::runner::BenchmarkRunner;

/// Whether a session is in flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Running,
}

/// Runs every registered backend in turn and publishes the results.
pub struct BenchmarkOrchestrator {
    backends: Vec<NamedBackend>,
    operation_count: RwLock<OperationCount>,
    results: RwLock<Arc<[BenchmarkResult]>>,
    state: watch::Sender<SessionState>,
    runner: BenchmarkRunner,
}

impl BenchmarkOrchestrator {
    /// Create an orchestrator with no registered backends.
    pub fn new() -> Self {
        let (state, _rx) = watch::channel(SessionState::Idle);
        Self {
            backends: Vec::new(),
            operation_count: RwLock::new(OperationCount::default()),
            results: RwLock::new(Arc::from(Vec::new())),
            state,
            runner: BenchmarkRunner::new(Arc::new(Progress::new())),
        }
    }

    /// Create an orchestrator for `backends`, run in the given order.
    pub fn with_backends(backends: Vec<NamedBackend>) -> Self {
        Self {
            backends,
            ..Self::new()
        }
    }

    /// Register another backend after the existing ones.
    pub fn register(&mut self, backend: NamedBackend) {
        self.backends.push(backend);
    }

    /// Registered backends, in run order.
    pub fn backends(&self) -> &[NamedBackend] {
        &self.backends
    }

    pub fn operation_count(&self) -> OperationCount {
        *self.operation_count.read()
    }

    pub fn set_operation_count(&self, count: OperationCount) {
        *self.operation_count.write() = count;
    }

    /// Results of the last successful session, in backend order.
    pub fn results(&self) -> Arc<[BenchmarkResult]> {
        self.results.read().clone()
    }

    /// Results of the last session compared against each other.
    pub fn comparison(&self) -> Comparison {
        Comparison::new(&self.results())
    }

    pub fn state(&self) -> SessionState {
        *self.state.borrow()
    }

    pub fn is_running(&self) -> bool {
        self.state() == SessionState::Running
    }

    /// Subscribe to running/idle transitions.
    pub fn subscribe_state(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }

    /// Progress of the backend currently under test.
    pub fn progress(&self) -> f64 {
        self.runner.progress().get()
    }

    /// Subscribe to progress updates.
    pub fn subscribe_progress(&self) -> watch::Receiver<f64> {
        self.runner.progress().subscribe()
    }

    /// Run the registered backends with the configured operation count.
    pub async fn run_all(&self) -> Result<Arc<[BenchmarkResult]>> {
        let count = self.operation_count();
        self.run_session(&self.backends, count.get()).await
    }

    /// Run `backends` one after another with `operations` calls per phase.
    ///
    /// Results are published only if every backend completes. On failure the
    /// error is logged, results stay empty, and the error is returned.
    pub async fn run_session(
        &self,
        backends: &[NamedBackend],
        operations: usize,
    ) -> Result<Arc<[BenchmarkResult]>> {
        let started = self.state.send_if_modified(|state| match *state {
            SessionState::Running => false,
            SessionState::Idle => {
                *state = SessionState::Running;
                true
            }
        });
        if !started {
            return Err(Error::AlreadyRunning);
        }
        let _session = SessionGuard {
            state: &self.state,
            progress: self.runner.progress(),
        };

        *self.results.write() = Arc::from(Vec::new());
        self.runner.progress().reset();
        tracing::info!(backends = backends.len(), operations, "benchmark session started");

        let outcome = self.run_each(backends, operations).await;

        let outcome = match outcome {
            Ok(results) => {
                let results: Arc<[BenchmarkResult]> = Arc::from(results);
                *self.results.write() = Arc::clone(&results);
                tracing::info!(backends = results.len(), "benchmark session complete");
                Ok(results)
            }
            Err(e) => {
                tracing::error!(error = %e, "benchmark session failed");
                Err(e)
            }
        };

        outcome
    }

    async fn run_each(
        &self,
        backends: &[NamedBackend],
        operations: usize,
    ) -> Result<Vec<BenchmarkResult>> {
        let mut results = Vec::with_capacity(backends.len());
        for named in backends {
            self.runner.progress().reset();
            let result = self
                .runner
                .run(&named.name, named.backend.as_ref(), operations)
                .await?;
            results.push(result);
        }
        Ok(results)
    }
}

/// Returns the orchestrator to idle when a session ends, including when the
/// session future is dropped before completing.
struct SessionGuard<'a> {
    state: &'a watch::Sender<SessionState>,
    progress: &'a Progress,
}

impl Drop for SessionGuard<'_> {
    fn drop(&mut self) {
        self.progress.reset();
        self.state.send_replace(SessionState::Idle);
    }
}

impl Default for BenchmarkOrchestrator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::backend::{FaultPlan, MemoryBackend, Operation};

    fn memory(name: &str) -> NamedBackend {
        NamedBackend::new(name, Arc::new(MemoryBackend::new()))
    }

    #[tokio::test]
    async fn test_run_all_uses_configured_count() {
        let orchestrator = BenchmarkOrchestrator::with_backends(vec![memory("a"), memory("b")]);
        orchestrator.set_operation_count(OperationCount::new(300).unwrap());

        let results = orchestrator.run_all().await.unwrap();

        assert_eq!(results.len(), 2);
        assert!(results.iter().all(|r| r.operations == 300));
        assert_eq!(orchestrator.results(), results);
        assert_eq!(orchestrator.state(), SessionState::Idle);
        assert_eq!(orchestrator.progress(), 0.0);
    }

    #[tokio::test]
    async fn test_failure_clears_results() {
        let mut orchestrator = BenchmarkOrchestrator::new();
        orchestrator.register(memory("ok"));
        orchestrator.run_all().await.unwrap();
        assert_eq!(orchestrator.results().len(), 1);

        let flaky = MemoryBackend::new().with_fault(FaultPlan::new(Operation::Delete, 1));
        orchestrator.register(NamedBackend::new("flaky", Arc::new(flaky)));

        let err = orchestrator.run_all().await.unwrap_err();
        assert!(matches!(err, Error::Operation { op: Operation::Delete, .. }));
        assert!(orchestrator.results().is_empty());
        assert!(!orchestrator.is_running());
        assert_eq!(orchestrator.progress(), 0.0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_session_rejected() {
        let slow = MemoryBackend::new().with_latency(Duration::from_millis(1));
        let orchestrator = Arc::new(BenchmarkOrchestrator::with_backends(vec![NamedBackend::new(
            "slow",
            Arc::new(slow),
        )]));
        let mut state = orchestrator.subscribe_state();

        let first = tokio::spawn({
            let orchestrator = Arc::clone(&orchestrator);
            async move { orchestrator.run_all().await }
        });
        state.wait_for(|s| *s == SessionState::Running).await.unwrap();

        let err = orchestrator.run_all().await.unwrap_err();
        assert!(matches!(err, Error::AlreadyRunning));

        first.await.unwrap().unwrap();
        assert_eq!(orchestrator.results().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropped_session_returns_to_idle() {
        let slow = MemoryBackend::new().with_latency(Duration::from_millis(1));
        let orchestrator = BenchmarkOrchestrator::with_backends(vec![NamedBackend::new(
            "slow",
            Arc::new(slow),
        )]);

        let cut_short =
            tokio::time::timeout(Duration::from_millis(10), orchestrator.run_all()).await;
        assert!(cut_short.is_err());

        assert_eq!(orchestrator.state(), SessionState::Idle);
        assert_eq!(orchestrator.progress(), 0.0);
        assert!(orchestrator.results().is_empty());

        let results = orchestrator.run_all().await.unwrap();
        assert_eq!(results.len(), 1);
    }

    #[tokio::test]
    async fn test_comparison_of_last_session() {
        let orchestrator = BenchmarkOrchestrator::with_backends(vec![memory("a"), memory("b")]);
        assert!(orchestrator.comparison().is_empty());

        orchestrator.run_all().await.unwrap();
        let comparison = orchestrator.comparison();
        assert_eq!(comparison.entries.len(), 2);
        assert_eq!(comparison.entries[0].result.name, "a");
    }
}
