//! The transport-agnostic synchronisation channel.

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::events::SyncEvent;
use crate::pull::PullTransport;
use crate::push::PushTransport;

/// Where fresh snapshot sets come from. Exactly one transport is active
/// per estimator, chosen at construction.
pub enum SyncChannel {
    Push(PushTransport),
    Pull(PullTransport),
}

impl SyncChannel {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Push(_) => "push",
            Self::Pull(_) => "pull",
        }
    }

    pub fn is_push(&self) -> bool {
        matches!(self, Self::Push(_))
    }

    /// Run the transport until `cancel` fires or `events` is closed.
    pub async fn run(self, events: mpsc::Sender<SyncEvent>, cancel: CancellationToken) {
        match self {
            Self::Push(transport) => transport.run(events, cancel).await,
            Self::Pull(transport) => transport.run(events, cancel).await,
        }
    }

    /// Run the transport on its own task.
    pub fn spawn(self, events: mpsc::Sender<SyncEvent>, cancel: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(self.run(events, cancel))
    }
}
