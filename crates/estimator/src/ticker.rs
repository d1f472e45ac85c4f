//! Fixed-period local clock that drives re-extrapolation between syncs.

use std::time::Duration;

use tokio::time::{Instant, Interval, MissedTickBehavior};

/// Shortest allowed tick period.
pub const MIN_TICK_PERIOD: Duration = Duration::from_millis(100);
/// Longest allowed tick period.
pub const MAX_TICK_PERIOD: Duration = Duration::from_millis(1000);

/// Clamp a requested period into the supported range.
pub fn clamp_period(period: Duration) -> Duration {
    period.clamp(MIN_TICK_PERIOD, MAX_TICK_PERIOD)
}

/// A repeating timer. Late ticks are skipped rather than bunched up, so
/// a stalled task never produces a burst of renders.
pub struct Ticker {
    interval: Interval,
}

impl Ticker {
    /// Must be called from within a tokio runtime.
    pub fn new(period: Duration) -> Self {
        let period = clamp_period(period);
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        Self { interval }
    }

    /// Wait for the next tick. The first tick completes immediately.
    pub async fn tick(&mut self) -> Instant {
        self.interval.tick().await
    }
}
