//! Benchmark results and cross-backend comparison.

use serde::{Deserialize, Serialize};

/// Timings for one backend's completed run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BenchmarkResult {
    /// Backend the run was made against.
    pub name: String,
    /// Wall-clock milliseconds for the whole write phase.
    pub write_time_ms: u64,
    /// Wall-clock milliseconds for the whole read phase.
    pub read_time_ms: u64,
    /// Calls issued per phase.
    pub operations: usize,
}

impl BenchmarkResult {
    /// Write plus read time. Cleanup is not timed.
    pub fn total_time_ms(&self) -> u64 {
        self.write_time_ms + self.read_time_ms
    }
}

/// One row of a [`Comparison`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonEntry {
    #[serde(flatten)]
    pub result: BenchmarkResult,
    pub total_time_ms: u64,
    /// How many times faster than the slowest result, one decimal place.
    pub speedup: f64,
    /// Lowest total time. Only set when there is more than one result.
    pub winner: bool,
}

/// Results annotated relative to each other, in run order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Comparison {
    pub entries: Vec<ComparisonEntry>,
}

impl Comparison {
    /// Compare results against the slowest one.
    ///
    /// Ties for fastest all count as winners. A zero total is treated as 1 ms.
    pub fn new(results: &[BenchmarkResult]) -> Self {
        let slowest = results
            .iter()
            .map(|r| r.total_time_ms().max(1))
            .max()
            .unwrap_or(1);
        let fastest = results
            .iter()
            .map(|r| r.total_time_ms().max(1))
            .min()
            .unwrap_or(1);

        let entries = results
            .iter()
            .map(|r| {
                let total = r.total_time_ms().max(1);
                ComparisonEntry {
                    result: r.clone(),
                    total_time_ms: r.total_time_ms(),
                    speedup: round_tenths(slowest as f64 / total as f64),
                    winner: results.len() > 1 && total == fastest,
                }
            })
            .collect();

        Self { entries }
    }

    /// The fastest entry, if there is more than one result.
    pub fn winner(&self) -> Option<&ComparisonEntry> {
        self.entries.iter().find(|e| e.winner)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn round_tenths(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}
