//! Progress signal shared between the runner and its observers.
//!
//! A single writer publishes a fraction in `[0, 1]`; any number of readers can
//! poll it or wait for changes through a watch receiver.

use tokio::sync::watch;

/// Progress of the backend currently being benchmarked.
#[derive(Debug)]
pub struct Progress {
    tx: watch::Sender<f64>,
}

impl Progress {
    /// Create a signal starting at 0.
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(0.0);
        Self { tx }
    }

    /// Publish a new value, clamped to `[0, 1]`.
    pub fn set(&self, value: f64) {
        let value = if value.is_nan() { 0.0 } else { value.clamp(0.0, 1.0) };
        self.tx.send_replace(value);
    }

    /// Reset to 0.
    pub fn reset(&self) {
        self.set(0.0);
    }

    /// Current value.
    pub fn get(&self) -> f64 {
        *self.tx.borrow()
    }

    /// Subscribe to changes.
    pub fn subscribe(&self) -> watch::Receiver<f64> {
        self.tx.subscribe()
    }
}

impl Default for Progress {
    fn default() -> Self {
        Self::new()
    }
}
