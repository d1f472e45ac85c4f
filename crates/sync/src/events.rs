//! Events a transport reports to the estimator.

use std::time::Duration;

use accrual_core::SnapshotSet;

/// Something a [`SyncChannel`](crate::SyncChannel) observed.
///
/// Transports never fail fatally; every failure is reported as an event
/// and the transport keeps going until cancelled.
#[derive(Debug, Clone)]
pub enum SyncEvent {
    /// The push subscription is established.
    Connected,

    /// The push subscription dropped or could not be opened.
    Disconnected { reason: String },

    /// A reconnect attempt is about to be made after `delay`.
    Reconnecting { attempt: u32, delay: Duration },

    /// A complete, validated snapshot set arrived.
    Snapshots(SnapshotSet),

    /// A payload arrived but was discarded as a whole.
    Rejected { reason: String },

    /// A poll request failed; previous snapshots stay in force.
    PollFailed { error: String },
}
