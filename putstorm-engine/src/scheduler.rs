//! Periodic issuance ticks.

use std::time::Duration;

use tokio::time::{Instant, Interval, MissedTickBehavior};

/// Produces a tick every `period`, see [`LoadSpec::interval`](crate::spec::LoadSpec::interval).
///
/// The first issuance happens immediately, so the first call to [`next`](Self::next) resolves one
/// period after construction. A consumer that falls behind gets one immediate tick and then
/// realigns to the initial schedule; missed ticks are never replayed in a burst.
#[derive(Debug)]
pub struct RateScheduler {
    interval: Interval,
}

impl RateScheduler {
    pub fn new(period: Duration) -> Self {
        let mut interval = tokio::time::interval_at(Instant::now() + period, period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        Self { interval }
    }

    /// The time between two ticks.
    pub fn period(&self) -> Duration {
        self.interval.period()
    }

    /// Waits until the next tick is due.
    pub async fn next(&mut self) {
        self.interval.tick().await;
    }
}
