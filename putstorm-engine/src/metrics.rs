//! Process-wide counters shared by all executors.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use tokio::time::Instant;

/// Lock-free outcome counters with a fixed start instant.
#[derive(Debug)]
pub struct Metrics {
    succeeded: AtomicU64,
    failed: AtomicU64,
    started: Instant,
}

impl Metrics {
    /// Creates zeroed counters starting now.
    pub fn new() -> Self {
        Self {
            succeeded: AtomicU64::new(0),
            failed: AtomicU64::new(0),
            started: Instant::now(),
        }
    }

    pub fn record_success(&self) {
        self.succeeded.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_failure(&self) {
        self.failed.fetch_add(1, Ordering::Relaxed);
    }

    /// Reads the counters without blocking writers.
    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            succeeded: self.succeeded.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            elapsed: self.started.elapsed(),
        }
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

/// A point-in-time view of [`Metrics`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Snapshot {
    pub succeeded: u64,
    pub failed: u64,
    /// Time since the metrics were created.
    pub elapsed: Duration,
}

impl Snapshot {
    /// Average successful operations per second since start.
    pub fn throughput(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs > 0.0 {
            self.succeeded as f64 / secs
        } else {
            0.0
        }
    }

    /// Operations that reached a terminal record.
    pub fn completed(&self) -> u64 {
        self.succeeded + self.failed
    }
}
