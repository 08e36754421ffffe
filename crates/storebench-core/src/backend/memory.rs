//! In-process store with simulated latency and fault injection.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};

use super::{Operation, StorageBackend};
use crate::error::{Error, Result};

/// Fail the `call`-th invocation (1-based) of `op`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FaultPlan {
    pub op: Operation,
    pub call: usize,
}

impl FaultPlan {
    pub fn new(op: Operation, call: usize) -> Self {
        Self { op, call }
    }
}

/// Key-value store on a concurrent hash map.
///
/// With a latency configured, every call sleeps for that long before touching
/// the map, which makes timings predictable under a paused tokio clock.
#[derive(Default)]
pub struct MemoryBackend {
    entries: DashMap<String, String>,
    latency: Option<Duration>,
    fault: Option<FaultPlan>,
    sets: AtomicUsize,
    gets: AtomicUsize,
    deletes: AtomicUsize,
}

impl MemoryBackend {
    /// Create an empty store with no latency and no faults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sleep for `latency` on every call.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Inject a single failure.
    pub fn with_fault(mut self, fault: FaultPlan) -> Self {
        self.fault = Some(fault);
        self
    }

    /// Number of keys currently stored.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if the store is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of calls made so far for `op`, including failed ones.
    pub fn calls(&self, op: Operation) -> usize {
        self.counter(op).load(Ordering::SeqCst)
    }

    fn counter(&self, op: Operation) -> &AtomicUsize {
        match op {
            Operation::Set => &self.sets,
            Operation::Get => &self.gets,
            Operation::Delete => &self.deletes,
        }
    }

    async fn enter(&self, op: Operation) -> Result<()> {
        let call = self.counter(op).fetch_add(1, Ordering::SeqCst) + 1;

        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }

        match self.fault {
            Some(fault) if fault.op == op && fault.call == call => {
                tracing::debug!(%op, call, "injecting backend failure");
                Err(Error::Injected { op, call })
            }
            _ => Ok(()),
        }
    }
}

#[async_trait]
impl StorageBackend for MemoryBackend {
    async fn set(&self, key: &str, value: &str) -> Result<()> {
        self.enter(Operation::Set).await?;
        self.entries.insert(key.to_owned(), value.to_owned());
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<String>> {
        self.enter(Operation::Get).await?;
        Ok(self.entries.get(key).map(|v| v.value().clone()))
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.enter(Operation::Delete).await?;
        self.entries.remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_set_get_delete() {
        let store = MemoryBackend::new();

        store.set("a", "1").await.unwrap();
        assert_eq!(store.get("a").await.unwrap(), Some("1".to_string()));
        assert_eq!(store.get("b").await.unwrap(), None);

        store.delete("a").await.unwrap();
        assert!(store.is_empty());
        assert_eq!(store.calls(Operation::Get), 2);
    }

    #[tokio::test]
    async fn test_fault_on_nth_call() {
        let store = MemoryBackend::new().with_fault(FaultPlan::new(Operation::Set, 3));

        store.set("k1", "v").await.unwrap();
        store.set("k2", "v").await.unwrap();
        let err = store.set("k3", "v").await.unwrap_err();
        assert!(matches!(err, Error::Injected { op: Operation::Set, call: 3 }));

        // Only the planned call fails
        store.set("k4", "v").await.unwrap();
        assert_eq!(store.len(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_latency_is_applied() {
        let store = MemoryBackend::new().with_latency(Duration::from_millis(5));

        let start = tokio::time::Instant::now();
        store.set("k", "v").await.unwrap();
        store.get("k").await.unwrap();

        assert!(start.elapsed() >= Duration::from_millis(10));
    }
}
