//! Output of per-operation records and rolling throughput.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use yansi::{Condition, Paint};

use crate::metrics::{Metrics, Snapshot};
use crate::record::OperationRecord;

/// Interval of the rolling throughput line.
pub const THROUGHPUT_INTERVAL: Duration = Duration::from_secs(5);

/// Sink for the generator's machine-readable output.
pub trait Report: fmt::Debug + Send + Sync + 'static {
    /// Called exactly once per issued operation, in completion order.
    fn operation(&self, record: &OperationRecord);

    /// Called with the current counters on every throughput tick.
    fn throughput(&self, snapshot: &Snapshot);
}

/// Prints records and throughput lines to stdout.
#[derive(Debug, Default)]
pub struct ConsoleReport;

impl Report for ConsoleReport {
    fn operation(&self, record: &OperationRecord) {
        println!("{record}");
    }

    fn throughput(&self, snapshot: &Snapshot) {
        println!(
            "{} {:.1} TPS",
            "=> @".bold().whenever(Condition::STDOUT_IS_TTY),
            snapshot.throughput()
        );
    }
}

/// Reports the throughput immediately and then every `period`.
///
/// This future runs forever and is intended to be spawned alongside the dispatcher.
pub async fn report_throughput(metrics: Arc<Metrics>, report: Arc<dyn Report>, period: Duration) {
    let mut ticker = tokio::time::interval(period);
    loop {
        ticker.tick().await;
        report.throughput(&metrics.snapshot());
    }
}
