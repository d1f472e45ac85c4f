//! Extrapolation state owned by the estimator task.
//!
//! [`SessionArena`] keeps one record per live session, keyed by
//! `session_id`, and is rebuilt wholesale from every accepted snapshot
//! set. [`EstimatorState`] adds connection bookkeeping and produces the
//! [`EstimatorView`].

use std::collections::HashMap;

use accrual_core::aggregate::{aggregate_by_asset, estimate_session};
use accrual_core::{Amount, SessionEstimate, SessionId, SessionSnapshot, SnapshotSet, Timestamp};
use accrual_sync::SyncEvent;

use crate::view::{ConnectionState, EstimatorView};

// ---------------------------------------------------------------------------
// SessionArena
// ---------------------------------------------------------------------------

/// Display floor kept after a resync whose baseline lands below what the
/// session already showed.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Hold {
    amount: Amount,
    until: Timestamp,
}

#[derive(Debug, Clone)]
struct SessionState {
    snapshot: SessionSnapshot,
    hold: Option<Hold>,
    last_displayed: Option<Amount>,
}

impl SessionState {
    fn estimate(&mut self, now: Timestamp) -> SessionEstimate {
        let estimate = estimate_session(&self.snapshot, now);

        let shown = match self.hold {
            Some(hold) if now < hold.until && estimate.accrued_amount < hold.amount => hold.amount,
            Some(_) => {
                self.hold = None;
                estimate.accrued_amount
            }
            None => estimate.accrued_amount,
        };

        self.last_displayed = Some(shown);
        estimate.with_accrued(shown)
    }
}

/// Per-session extrapolation records for the current snapshot set.
#[derive(Debug, Clone, Default)]
pub struct SessionArena {
    sessions: Vec<SessionState>,
}

impl SessionArena {
    /// Build a fresh arena from `set`, discarding `previous` except for
    /// each surviving session's last displayed amount.
    ///
    /// If a session's new baseline extrapolates below what was already
    /// shown, the shown amount is held until `now + hold_limit` or until
    /// the new baseline catches up, whichever comes first.
    pub fn rebuild(
        previous: &SessionArena,
        set: &SnapshotSet,
        now: Timestamp,
        hold_limit: chrono::Duration,
    ) -> Self {
        let shown: HashMap<&SessionId, Amount> = previous
            .sessions
            .iter()
            .filter_map(|s| s.last_displayed.map(|amount| (&s.snapshot.session_id, amount)))
            .collect();

        let sessions = set
            .iter()
            .map(|snapshot| {
                let fresh = accrual_core::model::extrapolate(snapshot, now);
                let hold = shown
                    .get(&snapshot.session_id)
                    .filter(|&&prior| prior > fresh)
                    .map(|&prior| {
                        tracing::debug!(
                            session_id = %snapshot.session_id,
                            %prior,
                            %fresh,
                            "Holding displayed amount until resync catches up",
                        );
                        Hold {
                            amount: prior,
                            until: now
                                .checked_add_signed(hold_limit)
                                .unwrap_or(chrono::DateTime::<chrono::Utc>::MAX_UTC),
                        }
                    });
                SessionState {
                    snapshot: snapshot.clone(),
                    hold,
                    last_displayed: None,
                }
            })
            .collect();

        Self { sessions }
    }

    /// Estimate every session at `now`, recording what was shown.
    pub fn estimate_all(&mut self, now: Timestamp) -> Vec<SessionEstimate> {
        self.sessions.iter_mut().map(|s| s.estimate(now)).collect()
    }
}

// ---------------------------------------------------------------------------
// EstimatorState
// ---------------------------------------------------------------------------

/// Everything the estimator task owns. Only that task touches it, so
/// snapshot replacement and view computation never interleave.
#[derive(Debug)]
pub struct EstimatorState {
    arena: SessionArena,
    connection: ConnectionState,
    push: bool,
    last_synced_at: Option<Timestamp>,
    rejected_payloads: u64,
    failed_syncs: u64,
    ticks: u64,
    stale_after: chrono::Duration,
    hold_limit: chrono::Duration,
}

impl EstimatorState {
    pub fn new(push: bool, stale_after: chrono::Duration, hold_limit: chrono::Duration) -> Self {
        Self {
            arena: SessionArena::default(),
            connection: if push {
                ConnectionState::Reconnecting
            } else {
                ConnectionState::Polling
            },
            push,
            last_synced_at: None,
            rejected_payloads: 0,
            failed_syncs: 0,
            ticks: 0,
            stale_after,
            hold_limit,
        }
    }

    pub fn connection(&self) -> ConnectionState {
        self.connection
    }

    /// Fold one transport event into the state.
    pub fn apply(&mut self, event: SyncEvent, now: Timestamp) {
        match event {
            SyncEvent::Connected => self.connection = ConnectionState::Connected,
            SyncEvent::Disconnected { reason } => {
                tracing::warn!(reason = %reason, "Snapshot subscription lost; extrapolating from last snapshots");
                self.failed_syncs += 1;
                self.connection = ConnectionState::Reconnecting;
            }
            SyncEvent::Reconnecting { .. } => self.connection = ConnectionState::Reconnecting,
            SyncEvent::Snapshots(set) => {
                tracing::debug!(
                    session_count = set.len(),
                    inactive = set.inactive_count(),
                    "Replacing snapshot set",
                );
                self.arena = SessionArena::rebuild(&self.arena, &set, now, self.hold_limit);
                self.last_synced_at = Some(now);
                if !self.push {
                    self.connection = ConnectionState::Polling;
                }
            }
            SyncEvent::Rejected { reason } => {
                tracing::warn!(reason = %reason, "Snapshot payload rejected; keeping previous snapshots");
                self.rejected_payloads += 1;
                if !self.push {
                    self.connection = ConnectionState::Degraded;
                }
            }
            SyncEvent::PollFailed { error } => {
                tracing::warn!(error = %error, "Snapshot poll failed; keeping previous snapshots");
                self.failed_syncs += 1;
                self.connection = ConnectionState::Degraded;
            }
        }
    }

    /// The sync task ended without being cancelled.
    pub fn mark_transport_lost(&mut self) {
        self.connection = if self.push {
            ConnectionState::Reconnecting
        } else {
            ConnectionState::Degraded
        };
    }

    /// Advance the tick counter and compute the view.
    pub fn tick(&mut self, now: Timestamp) -> EstimatorView {
        self.ticks += 1;
        self.view(now)
    }

    /// Compute the view at `now` without counting a tick.
    pub fn view(&mut self, now: Timestamp) -> EstimatorView {
        let per_session = self.arena.estimate_all(now);
        let per_asset = aggregate_by_asset(&per_session);
        let stale = self
            .last_synced_at
            .map_or(true, |synced| now - synced > self.stale_after);

        EstimatorView {
            computed_at: Some(now),
            tick: self.ticks,
            connection: self.connection,
            last_synced_at: self.last_synced_at,
            stale,
            rejected_payloads: self.rejected_payloads,
            failed_syncs: self.failed_syncs,
            per_session,
            per_asset,
        }
    }
}
