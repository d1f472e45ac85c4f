//! The read-only state exposed to the presentation layer.

use accrual_core::{AssetTotals, SessionEstimate, Timestamp};
use serde::Serialize;

/// How fresh the estimator's ground truth is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
    /// Not started, or stopped.
    Idle,
    /// Push subscription is open.
    Connected,
    /// Push subscription is down or not yet open; retrying.
    Reconnecting,
    /// Pull transport, last cycle succeeded.
    Polling,
    /// Pull transport, last cycle failed or was rejected.
    Degraded,
}

impl ConnectionState {
    /// Whether the last sync attempt produced usable ground truth.
    pub fn is_live(self) -> bool {
        matches!(self, Self::Connected | Self::Polling)
    }
}

/// Extrapolated state of every live session, as of the last tick.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EstimatorView {
    pub computed_at: Option<Timestamp>,
    /// Number of ticks published so far.
    pub tick: u64,
    pub connection: ConnectionState,
    /// When the last accepted snapshot set arrived.
    pub last_synced_at: Option<Timestamp>,
    /// No accepted snapshot set within the staleness window.
    pub stale: bool,
    pub rejected_payloads: u64,
    pub failed_syncs: u64,
    pub per_session: Vec<SessionEstimate>,
    pub per_asset: Vec<AssetTotals>,
}

impl EstimatorView {
    pub fn idle() -> Self {
        Self {
            computed_at: None,
            tick: 0,
            connection: ConnectionState::Idle,
            last_synced_at: None,
            stale: true,
            rejected_payloads: 0,
            failed_syncs: 0,
            per_session: Vec::new(),
            per_asset: Vec::new(),
        }
    }
}

impl Default for EstimatorView {
    fn default() -> Self {
        Self::idle()
    }
}
