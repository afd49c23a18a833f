//! Per-operation latency records.

use std::fmt;
use std::time::{Duration, SystemTime};

use crate::error::Stage;

/// How a single operation ended.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Outcome {
    /// The backend accepted the write and its response was consumed.
    Success,
    /// The write failed in the given stage.
    ///
    /// `None` means the operation never reached an outcome, e.g. because its task was cancelled.
    Failure(Option<Stage>),
}

impl Outcome {
    /// The stage a failed operation failed in, if it got that far.
    pub fn failed_stage(&self) -> Option<Stage> {
        match self {
            Outcome::Success => None,
            Outcome::Failure(stage) => *stage,
        }
    }
}

/// The terminal record of one issued operation.
#[derive(Clone, Debug)]
pub struct OperationRecord {
    /// 1-based issuance sequence number.
    pub seq: u64,
    /// Wall-clock time at which the operation was issued.
    pub issued_at: SystemTime,
    /// Monotonic time between issuance and completion.
    pub elapsed: Duration,
    pub outcome: Outcome,
}

impl OperationRecord {
    /// Wall-clock completion time, never earlier than [`issued_at`](Self::issued_at).
    pub fn completed_at(&self) -> SystemTime {
        self.issued_at + self.elapsed
    }

    /// Elapsed time in fractional milliseconds.
    pub fn elapsed_millis(&self) -> f64 {
        self.elapsed.as_nanos() as f64 / 1_000_000.0
    }

    pub fn is_success(&self) -> bool {
        self.outcome == Outcome::Success
    }
}

/// Formats the machine-readable metrics line:
///
/// ```text
/// METRICS <issued unix secs> <elapsed ms> <issued RFC 3339> <completed RFC 3339>
/// ```
impl fmt::Display for OperationRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let issued_secs = self
            .issued_at
            .duration_since(SystemTime::UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or_default();

        write!(
            f,
            "METRICS {issued_secs} {} {} {}",
            self.elapsed_millis(),
            humantime::format_rfc3339_nanos(self.issued_at),
            humantime::format_rfc3339_nanos(self.completed_at()),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_metrics_line() {
        let record = OperationRecord {
            seq: 1,
            issued_at: SystemTime::UNIX_EPOCH + Duration::from_secs(1_700_000_000),
            elapsed: Duration::from_micros(12_500),
            outcome: Outcome::Success,
        };

        assert_eq!(
            record.to_string(),
            "METRICS 1700000000 12.5 2023-11-14T22:13:20.000000000Z 2023-11-14T22:13:20.012500000Z"
        );
    }

    #[test]
    fn completion_follows_issuance() {
        let record = OperationRecord {
            seq: 7,
            issued_at: SystemTime::now(),
            elapsed: Duration::ZERO,
            outcome: Outcome::Failure(None),
        };
        assert!(record.completed_at() >= record.issued_at);
        assert!(!record.is_success());
    }
}
