//! Open-loop issuance of operations.
//!
//! The [`Dispatcher`] launches one operation per scheduler tick and never waits for an operation
//! to finish before launching the next one. If the backend is slower than the issuance interval,
//! the number of in-flight operations grows without a cap; only the backend's connection pool
//! limits it. This measures the backend under the offered load rather than under a load
//! throttled by its own responsiveness.

use std::sync::Arc;

use tokio_util::task::TaskTracker;

use crate::executor::RequestExecutor;
use crate::scheduler::RateScheduler;
use crate::spec::LoadSpec;

/// Issues operations paced by a [`RateScheduler`].
#[derive(Debug)]
pub struct Dispatcher {
    executor: Arc<RequestExecutor>,
    scheduler: RateScheduler,
    limit: Option<u64>,
    issued: u64,
    tracker: TaskTracker,
}

impl Dispatcher {
    pub fn new(spec: &LoadSpec, executor: Arc<RequestExecutor>) -> Self {
        Self {
            executor,
            scheduler: RateScheduler::new(spec.interval()),
            limit: spec.is_bounded().then_some(spec.count),
            issued: 0,
            tracker: TaskTracker::new(),
        }
    }

    /// Number of operations launched so far.
    pub fn issued(&self) -> u64 {
        self.issued
    }

    /// Number of launched operations that have not completed yet.
    pub fn in_flight(&self) -> usize {
        self.tracker.len()
    }

    /// Launches operations until the configured count is reached.
    ///
    /// With a count of `0` this never returns. Otherwise it waits for all launched operations to
    /// complete and returns the number issued.
    pub async fn run(&mut self) -> u64 {
        while self.limit.is_none_or(|limit| self.issued < limit) {
            self.issued += 1;
            let seq = self.issued;
            let executor = Arc::clone(&self.executor);
            self.tracker.spawn(async move { executor.execute(seq).await });

            self.scheduler.next().await;
        }

        self.tracker.close();
        self.tracker.wait().await;

        tracing::debug!(issued = self.issued, "all operations completed");
        self.issued
    }
}

#[cfg(test)]
mod tests {
    use std::num::NonZeroU32;
    use std::time::Duration;

    use tokio::time::Instant;

    use super::*;
    use crate::metrics::Metrics;
    use crate::payload::Payload;
    use crate::testing::{Behavior, RecordingReport, ScriptedBackend};

    struct Harness {
        dispatcher: Dispatcher,
        backend: Arc<ScriptedBackend>,
        report: Arc<RecordingReport>,
    }

    fn harness(rate: u32, count: u64, behavior: Behavior) -> Harness {
        let spec = LoadSpec {
            target: "test".into(),
            host: None,
            path: "key".into(),
            payload_size: 8,
            rate: NonZeroU32::new(rate).unwrap(),
            count,
            pool_size: 2,
        };
        let backend = Arc::new(ScriptedBackend::new(behavior));
        let report = Arc::new(RecordingReport::default());
        let executor = RequestExecutor::new(
            &spec,
            Payload::random(spec.payload_size),
            backend.clone(),
            Arc::new(Metrics::new()),
            report.clone(),
        );

        Harness {
            dispatcher: Dispatcher::new(&spec, Arc::new(executor)),
            backend,
            report,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn issues_exactly_count() {
        let mut h = harness(10, 7, Behavior::Succeed);

        assert_eq!(h.dispatcher.run().await, 7);

        let seqs: Vec<_> = h.backend.requests().iter().map(|r| r.request_id).collect();
        assert_eq!(seqs, (1..=7).collect::<Vec<_>>());
        assert_eq!(h.report.records().len(), 7);
        assert_eq!(h.dispatcher.in_flight(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn issuance_ignores_latency() {
        // Every write takes ten intervals, which must not slow down issuance.
        let mut h = harness(10, 5, Behavior::Delay(Duration::from_secs(1)));
        let start = Instant::now();

        h.dispatcher.run().await;

        let offsets: Vec<_> = h
            .backend
            .call_times()
            .iter()
            .map(|at| at.duration_since(start))
            .collect();
        let expected: Vec<_> = (0..5).map(|i| Duration::from_millis(100 * i)).collect();
        assert_eq!(offsets, expected);
    }

    #[tokio::test(start_paused = true)]
    async fn waits_for_in_flight_operations() {
        let mut h = harness(10, 3, Behavior::Delay(Duration::from_secs(2)));
        let start = Instant::now();

        h.dispatcher.run().await;

        // The last operation launches at 200ms and takes 2s.
        assert_eq!(start.elapsed(), Duration::from_millis(2200));
        assert_eq!(h.report.records().len(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn unbounded_keeps_issuing() {
        let mut h = harness(100, 0, Behavior::Hang);

        let result = tokio::time::timeout(Duration::from_secs(1), h.dispatcher.run()).await;
        assert!(result.is_err());

        // Nothing completes, yet issuance continues at the tick rate.
        assert!(h.dispatcher.issued() >= 100);
        assert_eq!(h.dispatcher.in_flight() as u64, h.dispatcher.issued());
        assert!(h.report.records().is_empty());
    }
}
