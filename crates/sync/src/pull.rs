//! Pull transport: fetch the snapshot set on a fixed interval.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::api::{PullApiError, SnapshotFetcher};
use crate::events::SyncEvent;

pub struct PullTransport {
    fetcher: Arc<dyn SnapshotFetcher>,
    interval: Duration,
}

impl PullTransport {
    pub fn new(fetcher: Arc<dyn SnapshotFetcher>, interval: Duration) -> Self {
        Self { fetcher, interval }
    }

    /// Poll until cancelled. The first fetch happens immediately.
    ///
    /// A failed cycle is reported and the loop waits for the next tick;
    /// an in-flight fetch is abandoned when `cancel` fires.
    pub async fn run(self, events: mpsc::Sender<SyncEvent>, cancel: CancellationToken) {
        tracing::info!(interval_secs = self.interval.as_secs(), "Starting pull transport");

        let mut interval = tokio::time::interval(self.interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = interval.tick() => {}
            }

            let result = tokio::select! {
                _ = cancel.cancelled() => break,
                result = self.fetcher.fetch_snapshots() => result,
            };

            let event = match result {
                Ok(set) => {
                    tracing::debug!(session_count = set.len(), "Poll succeeded");
                    SyncEvent::Snapshots(set)
                }
                Err(PullApiError::Payload(e)) => {
                    tracing::warn!(error = %e, "Discarding polled payload");
                    SyncEvent::Rejected {
                        reason: e.to_string(),
                    }
                }
                Err(e) => {
                    tracing::warn!(error = %e, "Poll failed");
                    SyncEvent::PollFailed {
                        error: e.to_string(),
                    }
                }
            };

            if events.send(event).await.is_err() {
                break;
            }
        }

        tracing::info!("Pull transport stopped");
    }
}
