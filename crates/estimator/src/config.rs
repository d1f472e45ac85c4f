use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use accrual_sync::api::DEFAULT_POLL_PATH;
use accrual_sync::{
    Credential, PullApi, PullApiError, PullTransport, PushClient, PushTransport, ReconnectConfig,
    SyncChannel,
};

use crate::estimator::EstimatorSettings;

/// Poll intervals outside this range are rejected.
const MIN_POLL_INTERVAL_SECS: u64 = 5;
const MAX_POLL_INTERVAL_SECS: u64 = 300;

/// Which transport delivers snapshots.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportKind {
    Push,
    Pull,
}

impl FromStr for TransportKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "push" | "ws" | "websocket" => Ok(Self::Push),
            "pull" | "poll" | "http" => Ok(Self::Pull),
            _ => Err(ConfigError::Invalid {
                var: "ACCRUAL_TRANSPORT",
                reason: format!("expected push or pull, got {s:?}"),
            }),
        }
    }
}

/// Estimator configuration loaded from environment variables.
///
/// All fields except the credential have defaults suitable for local
/// development.
#[derive(Debug, Clone)]
pub struct EstimatorConfig {
    pub transport: TransportKind,
    pub ws_url: String,
    pub api_url: String,
    pub poll_path: String,
    pub poll_interval: Duration,
    /// Ticker period, clamped to 100..=1000 ms by the ticker.
    pub tick_interval: Duration,
    pub reconnect: ReconnectConfig,
    pub request_timeout: Duration,
    pub stale_after: Duration,
    pub credential: Credential,
}

impl EstimatorConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                        | Default                            |
    /// |--------------------------------|------------------------------------|
    /// | `ACCRUAL_TRANSPORT`            | `push`                             |
    /// | `ACCRUAL_WS_URL`               | `ws://localhost:8000/ws/mining`    |
    /// | `ACCRUAL_API_URL`              | `http://localhost:8000`            |
    /// | `ACCRUAL_POLL_PATH`            | `/api/mining/live-progress`        |
    /// | `ACCRUAL_POLL_INTERVAL_SECS`   | `15`                               |
    /// | `ACCRUAL_TICK_INTERVAL_MS`     | `250`                              |
    /// | `ACCRUAL_RECONNECT_INITIAL_MS` | `1000`                             |
    /// | `ACCRUAL_RECONNECT_MAX_SECS`   | `30`                               |
    /// | `ACCRUAL_REQUEST_TIMEOUT_SECS` | `10`                               |
    /// | `ACCRUAL_STALE_AFTER_SECS`     | `60`                               |
    /// | `ACCRUAL_TOKEN`                | required                           |
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let transport = lookup("ACCRUAL_TRANSPORT")
            .map(|v| v.parse::<TransportKind>())
            .transpose()?
            .unwrap_or(TransportKind::Push);

        let ws_url =
            lookup("ACCRUAL_WS_URL").unwrap_or_else(|| "ws://localhost:8000/ws/mining".into());
        let api_url = lookup("ACCRUAL_API_URL").unwrap_or_else(|| "http://localhost:8000".into());
        let poll_path = lookup("ACCRUAL_POLL_PATH").unwrap_or_else(|| DEFAULT_POLL_PATH.into());

        let poll_interval_secs = parse_or(&lookup, "ACCRUAL_POLL_INTERVAL_SECS", 15)?;
        if !(MIN_POLL_INTERVAL_SECS..=MAX_POLL_INTERVAL_SECS).contains(&poll_interval_secs) {
            return Err(ConfigError::Invalid {
                var: "ACCRUAL_POLL_INTERVAL_SECS",
                reason: format!(
                    "must be between {MIN_POLL_INTERVAL_SECS} and {MAX_POLL_INTERVAL_SECS}, got {poll_interval_secs}"
                ),
            });
        }

        let tick_interval_ms = parse_or(&lookup, "ACCRUAL_TICK_INTERVAL_MS", 250)?;
        let reconnect_initial_ms = parse_or(&lookup, "ACCRUAL_RECONNECT_INITIAL_MS", 1000)?;
        let reconnect_max_secs = parse_or(&lookup, "ACCRUAL_RECONNECT_MAX_SECS", 30)?;
        if reconnect_max_secs == 0 {
            return Err(ConfigError::Invalid {
                var: "ACCRUAL_RECONNECT_MAX_SECS",
                reason: "must be at least 1".into(),
            });
        }
        // Backoff only multiplies, so the first delay must be non-zero.
        if reconnect_initial_ms == 0 || reconnect_initial_ms > reconnect_max_secs.saturating_mul(1000) {
            return Err(ConfigError::Invalid {
                var: "ACCRUAL_RECONNECT_INITIAL_MS",
                reason: format!(
                    "must be between 1 and ACCRUAL_RECONNECT_MAX_SECS ({reconnect_max_secs}s), got {reconnect_initial_ms}"
                ),
            });
        }

        let request_timeout_secs = parse_or(&lookup, "ACCRUAL_REQUEST_TIMEOUT_SECS", 10)?;
        let stale_after_secs = parse_or(&lookup, "ACCRUAL_STALE_AFTER_SECS", 60)?;

        let token = lookup("ACCRUAL_TOKEN")
            .filter(|t| !t.trim().is_empty())
            .ok_or(ConfigError::Missing("ACCRUAL_TOKEN"))?;

        Ok(Self {
            transport,
            ws_url,
            api_url,
            poll_path,
            poll_interval: Duration::from_secs(poll_interval_secs),
            tick_interval: Duration::from_millis(tick_interval_ms),
            reconnect: ReconnectConfig {
                initial_delay: Duration::from_millis(reconnect_initial_ms),
                max_delay: Duration::from_secs(reconnect_max_secs),
                ..Default::default()
            },
            request_timeout: Duration::from_secs(request_timeout_secs),
            stale_after: Duration::from_secs(stale_after_secs),
            credential: Credential::new(token),
        })
    }

    /// How long a displayed amount may be held above a lower resync
    /// baseline: one full sync interval of the active transport.
    pub fn hold_limit(&self) -> Duration {
        self.poll_interval.max(self.reconnect.max_delay)
    }

    pub fn settings(&self) -> EstimatorSettings {
        EstimatorSettings {
            tick_interval: self.tick_interval,
            stale_after: self.stale_after,
            hold_limit: self.hold_limit(),
        }
    }

    /// Build the configured transport.
    pub fn build_channel(&self) -> Result<SyncChannel, PullApiError> {
        Ok(match self.transport {
            TransportKind::Push => {
                let client = PushClient::new(self.ws_url.clone(), self.credential.clone());
                SyncChannel::Push(PushTransport::new(client, self.reconnect.clone()))
            }
            TransportKind::Pull => {
                let api = PullApi::new(
                    &self.api_url,
                    &self.poll_path,
                    self.credential.clone(),
                    self.request_timeout,
                )?;
                SyncChannel::Pull(PullTransport::new(Arc::new(api), self.poll_interval))
            }
        })
    }
}

fn parse_or(
    lookup: &impl Fn(&str) -> Option<String>,
    var: &'static str,
    default: u64,
) -> Result<u64, ConfigError> {
    match lookup(var) {
        None => Ok(default),
        Some(raw) => raw.trim().parse().map_err(|_| ConfigError::Invalid {
            var,
            reason: format!("expected an unsigned integer, got {raw:?}"),
        }),
    }
}

/// Configuration could not be loaded.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} environment variable is required")]
    Missing(&'static str),

    #[error("{var} is invalid: {reason}")]
    Invalid { var: &'static str, reason: String },
}
