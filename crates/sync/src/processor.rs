//! Push transport message processing loop.
//!
//! Reads frames from the subscription, parses each text frame as a
//! complete snapshot payload and forwards the outcome as a
//! [`SyncEvent`].

use futures::StreamExt;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;
use tokio_util::sync::CancellationToken;

use crate::client::PushStream;
use crate::events::SyncEvent;
use crate::messages::parse_payload;

/// Why [`process_messages`] returned.
#[derive(Debug, PartialEq, Eq)]
pub enum StreamEnd {
    /// The server closed the socket, the stream ended, or a receive
    /// error occurred.
    Dropped(String),
    /// Cancellation fired or the event receiver is gone.
    Shutdown,
}

/// Process frames until the socket drops or `cancel` fires.
///
/// On cancellation a Close frame is sent before returning.
pub async fn process_messages(
    ws_stream: &mut PushStream,
    connection_id: &str,
    events: &mpsc::Sender<SyncEvent>,
    cancel: &CancellationToken,
) -> StreamEnd {
    loop {
        let msg_result = tokio::select! {
            _ = cancel.cancelled() => {
                let _ = ws_stream.close(None).await;
                return StreamEnd::Shutdown;
            }
            next = ws_stream.next() => next,
        };

        let event = match msg_result {
            Some(Ok(Message::Text(text))) => handle_text_message(&text, connection_id),
            Some(Ok(Message::Binary(_))) => {
                tracing::trace!(connection_id, "Ignoring binary frame");
                continue;
            }
            Some(Ok(Message::Ping(_) | Message::Pong(_) | Message::Frame(_))) => continue,
            Some(Ok(Message::Close(frame))) => {
                tracing::info!(connection_id, ?frame, "Snapshot source closed WebSocket");
                return StreamEnd::Dropped("closed by server".into());
            }
            Some(Err(e)) => {
                tracing::error!(connection_id, error = %e, "WebSocket receive error");
                return StreamEnd::Dropped(e.to_string());
            }
            None => {
                tracing::info!(connection_id, "WebSocket stream exhausted");
                return StreamEnd::Dropped("stream ended".into());
            }
        };

        if events.send(event).await.is_err() {
            return StreamEnd::Shutdown;
        }
    }
}

fn handle_text_message(text: &str, connection_id: &str) -> SyncEvent {
    match parse_payload(text) {
        Ok(set) => {
            tracing::debug!(connection_id, session_count = set.len(), "Snapshot payload received");
            SyncEvent::Snapshots(set)
        }
        Err(e) => {
            tracing::warn!(
                connection_id,
                error = %e,
                raw_message = %text,
                "Discarding snapshot payload",
            );
            SyncEvent::Rejected {
                reason: e.to_string(),
            }
        }
    }
}
