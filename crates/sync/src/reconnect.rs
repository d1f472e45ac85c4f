//! Exponential-backoff reconnection for the push transport.
//!
//! When the subscription drops, [`reconnect_loop`] keeps retrying with
//! increasing delays, capped at [`ReconnectConfig::max_delay`], until a
//! connection succeeds or the [`CancellationToken`] is triggered.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::client::{PushClient, PushConnection};
use crate::events::SyncEvent;

/// Backoff schedule between reconnect attempts.
#[derive(Debug, Clone)]
pub struct ReconnectConfig {
    pub initial_delay: Duration,
    /// Ceiling; the schedule stays here once reached.
    pub max_delay: Duration,
    pub multiplier: f64,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
            multiplier: 2.0,
        }
    }
}

/// The delay that follows `current`, never above `max_delay`.
pub fn next_delay(current: Duration, config: &ReconnectConfig) -> Duration {
    Duration::try_from_secs_f64(current.as_secs_f64() * config.multiplier)
        .map_or(config.max_delay, |grown| grown.min(config.max_delay))
}

/// Reconnect with exponential backoff.
///
/// Sleeps before every attempt (the caller has just seen a failure) and
/// announces each attempt as [`SyncEvent::Reconnecting`]. Returns
/// `None` if `cancel` fires or the event receiver is gone.
pub async fn reconnect_loop(
    client: &PushClient,
    config: &ReconnectConfig,
    events: &mpsc::Sender<SyncEvent>,
    cancel: &CancellationToken,
) -> Option<PushConnection> {
    let mut delay = config.initial_delay;
    let mut attempt = 0u32;

    loop {
        attempt += 1;
        tracing::info!(attempt, delay_ms = delay.as_millis() as u64, "Reconnecting push transport");

        if events
            .send(SyncEvent::Reconnecting { attempt, delay })
            .await
            .is_err()
        {
            return None;
        }

        tokio::select! {
            _ = cancel.cancelled() => return None,
            _ = tokio::time::sleep(delay) => {}
        }

        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::info!("Reconnect cancelled");
                return None;
            }
            result = client.connect() => {
                match result {
                    Ok(conn) => {
                        tracing::info!(attempt, "Push transport reconnected");
                        return Some(conn);
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, "Reconnect attempt {attempt} failed");
                    }
                }
            }
        }

        delay = next_delay(delay, config);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::credential::Credential;

    #[test]
    fn default_schedule_doubles_up_to_thirty_seconds() {
        let config = ReconnectConfig::default();
        let schedule: Vec<u64> = std::iter::successors(Some(config.initial_delay), |d| {
            Some(next_delay(*d, &config))
        })
        .take(8)
        .map(|d| d.as_secs())
        .collect();

        assert_eq!(schedule, [1, 2, 4, 8, 16, 30, 30, 30]);
    }

    #[test]
    fn absurd_multiplier_falls_back_to_ceiling() {
        let config = ReconnectConfig {
            multiplier: f64::INFINITY,
            ..Default::default()
        };
        assert_eq!(next_delay(Duration::from_secs(1), &config), config.max_delay);
    }

    #[tokio::test]
    async fn cancellation_token_stops_reconnect() {
        let cancel = CancellationToken::new();
        cancel.cancel();

        let client = PushClient::new("ws://127.0.0.1:9".into(), Credential::new("t"));
        let (tx, _rx) = mpsc::channel(8);

        let result = reconnect_loop(&client, &ReconnectConfig::default(), &tx, &cancel).await;
        assert!(result.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn each_attempt_is_announced_with_growing_delay() {
        let cancel = CancellationToken::new();
        let client = PushClient::new("ws://127.0.0.1:9".into(), Credential::new("t"));
        let (tx, mut rx) = mpsc::channel(8);
        let config = ReconnectConfig {
            initial_delay: Duration::from_millis(100),
            max_delay: Duration::from_millis(250),
            multiplier: 2.0,
        };

        let task = {
            let cancel = cancel.clone();
            tokio::spawn(async move { reconnect_loop(&client, &config, &tx, &cancel).await })
        };

        let mut delays = Vec::new();
        while delays.len() < 3 {
            if let Some(SyncEvent::Reconnecting { delay, .. }) = rx.recv().await {
                delays.push(delay);
            }
        }
        cancel.cancel();
        assert!(task.await.unwrap().is_none());

        assert_eq!(
            delays,
            vec![
                Duration::from_millis(100),
                Duration::from_millis(200),
                Duration::from_millis(250),
            ]
        );
    }
}
