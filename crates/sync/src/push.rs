//! Push transport: a persistent WebSocket subscription.
//!
//! Connect, process payloads until the socket drops, reconnect with
//! capped backoff. Runs until cancelled.

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::client::{PushClient, PushConnection};
use crate::events::SyncEvent;
use crate::processor::{process_messages, StreamEnd};
use crate::reconnect::{reconnect_loop, ReconnectConfig};

pub struct PushTransport {
    client: PushClient,
    reconnect: ReconnectConfig,
}

impl PushTransport {
    pub fn new(client: PushClient, reconnect: ReconnectConfig) -> Self {
        Self { client, reconnect }
    }

    /// Core connection loop: connect -> process messages -> reconnect.
    pub async fn run(self, events: mpsc::Sender<SyncEvent>, cancel: CancellationToken) {
        tracing::info!(ws_url = %self.client.ws_url(), "Starting push transport");

        let first = tokio::select! {
            _ = cancel.cancelled() => return,
            result = self.client.connect() => result,
        };

        let mut conn = match first {
            Ok(conn) => conn,
            Err(e) => {
                tracing::warn!(error = %e, "Connection failed, entering reconnect loop");
                match self.reconnect_after(e.to_string(), &events, &cancel).await {
                    Some(conn) => conn,
                    None => return,
                }
            }
        };

        loop {
            if events.send(SyncEvent::Connected).await.is_err() {
                return;
            }

            let PushConnection {
                connection_id,
                mut ws_stream,
            } = conn;

            let reason = match process_messages(&mut ws_stream, &connection_id, &events, &cancel).await
            {
                StreamEnd::Shutdown => {
                    tracing::info!(connection_id = %connection_id, "Push transport stopped");
                    return;
                }
                StreamEnd::Dropped(reason) => reason,
            };

            if cancel.is_cancelled() {
                return;
            }

            tracing::info!(connection_id = %connection_id, reason = %reason, "Connection lost, entering reconnect loop");
            conn = match self.reconnect_after(reason, &events, &cancel).await {
                Some(conn) => conn,
                None => return,
            };
        }
    }

    async fn reconnect_after(
        &self,
        reason: String,
        events: &mpsc::Sender<SyncEvent>,
        cancel: &CancellationToken,
    ) -> Option<PushConnection> {
        events.send(SyncEvent::Disconnected { reason }).await.ok()?;
        reconnect_loop(&self.client, &self.reconnect, events, cancel).await
    }
}
