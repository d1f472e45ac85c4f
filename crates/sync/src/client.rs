//! WebSocket client for the push snapshot source.
//!
//! [`PushClient`] holds the endpoint and credential. Call
//! [`PushClient::connect`] to open a live [`PushConnection`].

use std::fmt;

use reqwest::Url;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

use crate::credential::Credential;

/// The raw WebSocket stream type used by the push transport.
pub type PushStream = WebSocketStream<MaybeTlsStream<tokio::net::TcpStream>>;

/// Configuration handle for the push snapshot source.
pub struct PushClient {
    ws_url: String,
    credential: Credential,
}

/// A live, authenticated subscription.
pub struct PushConnection {
    /// Random id used to correlate log lines for one connection.
    pub connection_id: String,
    pub ws_stream: PushStream,
}

impl fmt::Debug for PushConnection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PushConnection")
            .field("connection_id", &self.connection_id)
            .finish_non_exhaustive()
    }
}

impl PushClient {
    /// * `ws_url`     - subscription endpoint, e.g. `wss://host/ws/mining`.
    /// * `credential` - token from the current-user context.
    pub fn new(ws_url: String, credential: Credential) -> Self {
        Self { ws_url, credential }
    }

    pub fn ws_url(&self) -> &str {
        &self.ws_url
    }

    /// Open the subscription.
    ///
    /// Browsers cannot set headers on a WebSocket upgrade, so the backend
    /// reads the token from the `token` query parameter.
    pub async fn connect(&self) -> Result<PushConnection, PushClientError> {
        let connection_id = uuid::Uuid::new_v4().to_string();
        let url = authenticated_url(&self.ws_url, &self.credential)?;

        let (ws_stream, _response) = connect_async(url.as_str()).await.map_err(|e| {
            PushClientError::Connection(format!(
                "Failed to connect to snapshot source at {}: {e}",
                self.ws_url
            ))
        })?;

        tracing::info!(connection_id = %connection_id, "Connected to snapshot source at {}", self.ws_url);

        Ok(PushConnection {
            connection_id,
            ws_stream,
        })
    }
}

fn authenticated_url(ws_url: &str, credential: &Credential) -> Result<Url, PushClientError> {
    let mut url = Url::parse(ws_url)
        .map_err(|e| PushClientError::InvalidUrl(format!("{ws_url}: {e}")))?;
    url.query_pairs_mut().append_pair("token", credential.token());
    Ok(url)
}

/// Errors that can occur when working with the WebSocket client.
#[derive(Debug, thiserror::Error)]
pub enum PushClientError {
    /// Failed to establish the WebSocket connection.
    #[error("Connection error: {0}")]
    Connection(String),

    /// The configured endpoint is not a valid URL.
    #[error("Invalid snapshot source URL {0}")]
    InvalidUrl(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn token_is_appended_as_query_parameter() {
        let credential = Credential::new("abc.def");
        assert_eq!(
            authenticated_url("ws://host/ws/mining", &credential).unwrap().as_str(),
            "ws://host/ws/mining?token=abc.def"
        );
        assert_eq!(
            authenticated_url("ws://host/ws?v=2", &credential).unwrap().as_str(),
            "ws://host/ws?v=2&token=abc.def"
        );
    }

    #[test]
    fn token_is_percent_encoded() {
        let credential = Credential::new("a+b/c=&d");
        assert_eq!(
            authenticated_url("ws://host/ws", &credential).unwrap().as_str(),
            "ws://host/ws?token=a%2Bb%2Fc%3D%26d"
        );
    }

    #[tokio::test]
    async fn malformed_endpoint_is_rejected_before_connecting() {
        let client = PushClient::new("not a url".into(), Credential::new("t"));
        assert_matches!(client.connect().await, Err(PushClientError::InvalidUrl(_)));
    }

    #[tokio::test]
    async fn connect_to_closed_port_fails() {
        let client = PushClient::new("ws://127.0.0.1:9/ws".into(), Credential::new("t"));
        assert_matches!(client.connect().await, Err(PushClientError::Connection(_)));
    }
}
