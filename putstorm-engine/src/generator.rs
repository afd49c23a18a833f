//! Wires payload, executor, dispatcher and reporting into a single run.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio_util::task::AbortOnDropHandle;

use crate::backend::SharedBackend;
use crate::dispatcher::Dispatcher;
use crate::executor::RequestExecutor;
use crate::metrics::{Metrics, Snapshot};
use crate::payload::Payload;
use crate::report::{ConsoleReport, Report, THROUGHPUT_INTERVAL, report_throughput};
use crate::spec::LoadSpec;

/// An open-loop load run against a single backend.
#[derive(Debug)]
pub struct LoadGenerator {
    spec: LoadSpec,
    backend: SharedBackend,
    report: Arc<dyn Report>,
    throughput_interval: Duration,
}

impl LoadGenerator {
    /// Creates a generator that reports to stdout.
    pub fn new(spec: LoadSpec, backend: SharedBackend) -> Self {
        Self {
            spec,
            backend,
            report: Arc::new(ConsoleReport),
            throughput_interval: THROUGHPUT_INTERVAL,
        }
    }

    /// Replaces the sink for records and throughput lines.
    pub fn with_report(mut self, report: Arc<dyn Report>) -> Self {
        self.report = report;
        self
    }

    /// Runs until the configured count completes. Never returns for an unbounded run.
    pub async fn run(self) -> RunSummary {
        self.run_until(std::future::pending()).await
    }

    /// Runs until the configured count completes or `shutdown` resolves.
    ///
    /// On shutdown, issuance stops immediately and operations still in flight are abandoned.
    pub async fn run_until(self, shutdown: impl Future<Output = ()>) -> RunSummary {
        let spec = &self.spec;
        let payload = Payload::random(spec.payload_size);
        let metrics = Arc::new(Metrics::new());

        tracing::info!(
            backend = self.backend.name(),
            target = %spec.target,
            count = spec.count,
            "writing {} ({} B) @ {} TPS",
            spec.path,
            payload.len(),
            spec.rate,
        );

        let _throughput = AbortOnDropHandle::new(tokio::spawn(report_throughput(
            Arc::clone(&metrics),
            Arc::clone(&self.report),
            self.throughput_interval,
        )));

        let executor = RequestExecutor::new(
            spec,
            payload,
            Arc::clone(&self.backend),
            Arc::clone(&metrics),
            Arc::clone(&self.report),
        );
        let mut dispatcher = Dispatcher::new(spec, Arc::new(executor));

        let interrupted = tokio::select! {
            _ = dispatcher.run() => false,
            _ = shutdown => true,
        };

        let summary = RunSummary {
            issued: dispatcher.issued(),
            in_flight: dispatcher.in_flight(),
            snapshot: metrics.snapshot(),
            interrupted,
        };
        self.report.throughput(&summary.snapshot);

        tracing::info!(
            issued = summary.issued,
            succeeded = summary.snapshot.succeeded,
            failed = summary.snapshot.failed,
            abandoned = summary.in_flight,
            elapsed = ?summary.snapshot.elapsed,
            interrupted,
            "run finished at {:.1} TPS",
            summary.snapshot.throughput(),
        );

        summary
    }
}

/// The outcome of a [`LoadGenerator`] run.
#[derive(Clone, Copy, Debug)]
pub struct RunSummary {
    /// Operations launched.
    pub issued: u64,
    /// Operations still running when the run ended; non-zero only when interrupted.
    pub in_flight: usize,
    /// Final counters.
    pub snapshot: Snapshot,
    /// Whether the run was stopped by the shutdown future.
    pub interrupted: bool,
}
