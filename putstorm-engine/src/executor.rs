//! Runs a single write end-to-end.

use std::sync::Arc;
use std::time::SystemTime;

use tokio::time::Instant;

use crate::backend::{CLIENT_ID, SharedBackend, WriteRequest};
use crate::metrics::Metrics;
use crate::payload::Payload;
use crate::record::{OperationRecord, Outcome};
use crate::report::Report;
use crate::spec::LoadSpec;

/// Executes writes of the shared payload against a backend.
///
/// Invocations are independent of each other. The only shared state they touch is the read-only
/// payload and the atomic [`Metrics`] counters.
#[derive(Debug)]
pub struct RequestExecutor {
    backend: SharedBackend,
    payload: Payload,
    path: Arc<str>,
    host: Option<Arc<str>>,
    metrics: Arc<Metrics>,
    report: Arc<dyn Report>,
}

impl RequestExecutor {
    pub fn new(
        spec: &LoadSpec,
        payload: Payload,
        backend: SharedBackend,
        metrics: Arc<Metrics>,
        report: Arc<dyn Report>,
    ) -> Self {
        Self {
            backend,
            payload,
            path: spec.path.as_str().into(),
            host: spec.host.as_deref().map(Into::into),
            metrics,
            report,
        }
    }

    /// Performs the write with the given sequence number.
    ///
    /// Failures are logged and never retried. Exactly one [`OperationRecord`] is reported per
    /// call, including when the returned future is dropped before completion.
    pub async fn execute(&self, seq: u64) {
        let mut pending = PendingOperation::start(seq, &self.metrics, self.report.as_ref());

        let request = WriteRequest {
            path: Arc::clone(&self.path),
            payload: self.payload.bytes(),
            client_id: CLIENT_ID,
            request_id: seq,
            host: self.host.clone(),
        };

        match self.backend.write(request).await {
            Ok(response) => {
                tracing::info!(
                    seq,
                    status = response.status,
                    "{} :: {}",
                    response.status,
                    response.summary()
                );
                self.metrics.record_success();
                pending.finish(Outcome::Success);
            }
            Err(error) => {
                let stage = error.stage();
                tracing::error!(
                    seq,
                    %stage,
                    error = &error as &dyn std::error::Error,
                    "{stage} failed"
                );
                pending.finish(Outcome::Failure(Some(stage)));
            }
        }
    }
}

/// Guard for an in-flight operation that reports its record when dropped.
struct PendingOperation<'a> {
    seq: u64,
    issued_at: SystemTime,
    started: Instant,
    outcome: Outcome,
    metrics: &'a Metrics,
    report: &'a dyn Report,
}

impl<'a> PendingOperation<'a> {
    fn start(seq: u64, metrics: &'a Metrics, report: &'a dyn Report) -> Self {
        Self {
            seq,
            issued_at: SystemTime::now(),
            started: Instant::now(),
            outcome: Outcome::Failure(None),
            metrics,
            report,
        }
    }

    fn finish(&mut self, outcome: Outcome) {
        self.outcome = outcome;
    }
}

impl Drop for PendingOperation<'_> {
    fn drop(&mut self) {
        if self.outcome != Outcome::Success {
            self.metrics.record_failure();
        }

        self.report.operation(&OperationRecord {
            seq: self.seq,
            issued_at: self.issued_at,
            elapsed: self.started.elapsed(),
            outcome: self.outcome,
        });
    }
}

#[cfg(test)]
mod tests {
    use std::num::NonZeroU32;
    use std::time::Duration;

    use super::*;
    use crate::error::Stage;
    use crate::testing::{Behavior, RecordingReport, ScriptedBackend};

    fn spec() -> LoadSpec {
        LoadSpec {
            target: "test".into(),
            host: Some("storage.internal".into()),
            path: "bucket/key".into(),
            payload_size: 16,
            rate: NonZeroU32::MIN,
            count: 1,
            pool_size: 2,
        }
    }

    fn executor(
        behavior: Behavior,
    ) -> (
        Arc<RequestExecutor>,
        Arc<ScriptedBackend>,
        Arc<Metrics>,
        Arc<RecordingReport>,
    ) {
        let backend = Arc::new(ScriptedBackend::new(behavior));
        let metrics = Arc::new(Metrics::new());
        let report = Arc::new(RecordingReport::default());
        let executor = RequestExecutor::new(
            &spec(),
            Payload::random(16),
            backend.clone(),
            metrics.clone(),
            report.clone(),
        );
        (Arc::new(executor), backend, metrics, report)
    }

    #[tokio::test]
    async fn success_increments_and_reports() {
        let (executor, backend, metrics, report) = executor(Behavior::Succeed);

        executor.execute(42).await;

        let requests = backend.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(&*requests[0].path, "bucket/key");
        assert_eq!(requests[0].request_id, 42);
        assert_eq!(requests[0].client_id, CLIENT_ID);
        assert_eq!(requests[0].host.as_deref(), Some("storage.internal"));
        assert_eq!(requests[0].payload.len(), 16);

        let records = report.records();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].seq, 42);
        assert_eq!(records[0].outcome, Outcome::Success);
        assert_eq!(metrics.snapshot().succeeded, 1);
        assert_eq!(metrics.snapshot().failed, 0);
    }

    #[tokio::test]
    async fn failure_reports_stage() {
        let (executor, _backend, metrics, report) = executor(Behavior::Fail(Stage::Send));

        executor.execute(1).await;

        let records = report.records();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].outcome.failed_stage(), Some(Stage::Send));
        assert_eq!(metrics.snapshot().succeeded, 0);
        assert_eq!(metrics.snapshot().failed, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn records_latency() {
        let (executor, _backend, _metrics, report) =
            executor(Behavior::Delay(Duration::from_millis(120)));

        executor.execute(1).await;

        let records = report.records();
        assert_eq!(records[0].elapsed, Duration::from_millis(120));
        assert!(records[0].completed_at() >= records[0].issued_at);
    }

    #[tokio::test]
    async fn reports_on_panic() {
        let (executor, _backend, metrics, report) = executor(Behavior::Panic);

        let result = tokio::spawn(async move { executor.execute(3).await }).await;
        assert!(result.unwrap_err().is_panic());

        let records = report.records();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].outcome, Outcome::Failure(None));
        assert_eq!(metrics.snapshot().failed, 1);
    }

    #[tokio::test]
    async fn reports_on_cancellation() {
        let (executor, backend, _metrics, report) = executor(Behavior::Hang);

        let task = tokio::spawn(async move { executor.execute(9).await });
        while backend.requests().is_empty() {
            tokio::task::yield_now().await;
        }
        task.abort();
        assert!(task.await.unwrap_err().is_cancelled());

        let records = report.records();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].seq, 9);
        assert_eq!(records[0].outcome, Outcome::Failure(None));
    }
}
