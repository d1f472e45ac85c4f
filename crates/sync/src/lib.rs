//! Snapshot synchronisation for the mining-accrual estimator.
//!
//! Provides the wire payload parser, a WebSocket push transport with
//! capped exponential reconnect, an HTTP pull transport, and the
//! [`SyncChannel`] that selects between them at construction time.
//! Transports report everything they observe as [`SyncEvent`]s over an
//! `mpsc` channel and never fail fatally.

pub mod api;
pub mod channel;
pub mod client;
pub mod credential;
pub mod events;
pub mod messages;
pub mod processor;
pub mod pull;
pub mod push;
pub mod reconnect;

pub use api::{PullApi, PullApiError, SnapshotFetcher};
pub use channel::SyncChannel;
pub use client::{PushClient, PushClientError};
pub use credential::Credential;
pub use events::SyncEvent;
pub use messages::{parse_payload, PayloadError};
pub use pull::PullTransport;
pub use push::PushTransport;
pub use reconnect::ReconnectConfig;
