//! Benchmark configuration.

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::backend::{BackendKind, FaultPlan};
use crate::error::{Error, Result};

/// Number of calls issued per phase, in `[MIN, MAX]` steps of `STEP`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "usize", into = "usize")]
pub struct OperationCount(usize);

impl OperationCount {
    pub const MIN: usize = 100;
    pub const MAX: usize = 1000;
    pub const STEP: usize = 100;

    /// Accept only in-range multiples of `STEP`.
    pub fn new(count: usize) -> Result<Self> {
        if !(Self::MIN..=Self::MAX).contains(&count) || count % Self::STEP != 0 {
            return Err(Error::Config(format!(
                "operation count must be between {} and {} in steps of {}, got {}",
                Self::MIN,
                Self::MAX,
                Self::STEP,
                count
            )));
        }
        Ok(Self(count))
    }

    /// Round to the nearest step and clamp into range.
    pub fn clamped(count: usize) -> Self {
        let stepped = (count + Self::STEP / 2) / Self::STEP * Self::STEP;
        Self(stepped.clamp(Self::MIN, Self::MAX))
    }

    /// Map a slider position in `[0, 1]` onto the range.
    pub fn from_fraction(fraction: f64) -> Self {
        let fraction = if fraction.is_nan() { 0.0 } else { fraction.clamp(0.0, 1.0) };
        let span = (Self::MAX - Self::MIN) as f64;
        let steps = ((fraction * span + Self::MIN as f64) / Self::STEP as f64).round();
        Self::clamped(steps as usize * Self::STEP)
    }

    /// Slider position for this count.
    pub fn fraction(&self) -> f64 {
        (self.0 - Self::MIN) as f64 / (Self::MAX - Self::MIN) as f64
    }

    pub fn get(&self) -> usize {
        self.0
    }
}

impl Default for OperationCount {
    fn default() -> Self {
        Self(Self::MIN)
    }
}

impl fmt::Display for OperationCount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<usize> for OperationCount {
    type Error = Error;

    fn try_from(count: usize) -> Result<Self> {
        Self::new(count)
    }
}

impl From<OperationCount> for usize {
    fn from(count: OperationCount) -> usize {
        count.0
    }
}

/// Benchmark session configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BenchConfig {
    /// Calls per phase.
    pub operation_count: OperationCount,

    /// Backends to run, in reporting order.
    pub backends: Vec<BackendKind>,

    /// Directory for file-backed stores. None uses temporary stores.
    pub data_dir: Option<PathBuf>,

    /// Per-call latency for the memory backend, in milliseconds on disk.
    #[serde(with = "optional_millis")]
    pub memory_latency: Option<Duration>,

    /// Failure injected into the memory backend.
    pub memory_fault: Option<FaultPlan>,
}

impl Default for BenchConfig {
    fn default() -> Self {
        Self {
            operation_count: OperationCount::default(),
            backends: vec![BackendKind::Sled, BackendKind::Sqlite],
            data_dir: None,
            memory_latency: None,
            memory_fault: None,
        }
    }
}

impl BenchConfig {
    /// Load a configuration from a JSON file. Missing fields take defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&contents).map_err(|e| {
            Error::Config(format!(
                "failed parsing {} at line {}: {}",
                path.display(),
                e.line(),
                e
            ))
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Check that at least one backend is configured.
    pub fn validate(&self) -> Result<()> {
        if self.backends.is_empty() {
            return Err(Error::Config("no backends configured".to_string()));
        }
        Ok(())
    }

    /// Set the operation count.
    pub fn with_operation_count(mut self, count: OperationCount) -> Self {
        self.operation_count = count;
        self
    }

    /// Set the backends to run.
    pub fn with_backends(mut self, backends: Vec<BackendKind>) -> Self {
        self.backends = backends;
        self
    }

    /// Keep file-backed stores under `dir`.
    pub fn with_data_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.data_dir = Some(dir.into());
        self
    }

    /// Set the simulated latency of the memory backend.
    pub fn with_memory_latency(mut self, latency: Duration) -> Self {
        self.memory_latency = Some(latency);
        self
    }

    /// Make the memory backend fail the given call.
    pub fn with_memory_fault(mut self, fault: FaultPlan) -> Self {
        self.memory_fault = Some(fault);
        self
    }
}

mod optional_millis {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Option<Duration>, s: S) -> Result<S::Ok, S::Error> {
        match value {
            Some(d) => s.serialize_some(&u64::try_from(d.as_millis()).unwrap_or(u64::MAX)),
            None => s.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Duration>, D::Error> {
        Ok(Option::<u64>::deserialize(d)?.map(Duration::from_millis))
    }
}
