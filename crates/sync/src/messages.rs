//! Snapshot payload types and parser.
//!
//! Both transports deliver the same JSON shape:
//! `{"active_sessions": [{"session_id": .., "asset": .., "principal": ..,
//! "daily_rate": .., "accrued_amount": .., "observed_at": .., "active": ..}]}`.
//! A payload is accepted or rejected as a whole.

use accrual_core::{CoreError, SessionSnapshot, SnapshotSet};
use serde::Deserialize;

/// Raw payload as delivered by the snapshot source.
#[derive(Debug, Clone, Deserialize)]
pub struct SnapshotPayload {
    pub active_sessions: Vec<SessionSnapshot>,
}

/// Why a payload was discarded.
#[derive(Debug, thiserror::Error)]
pub enum PayloadError {
    /// Malformed JSON, a missing required field, or an unknown asset.
    #[error("Malformed payload: {0}")]
    Schema(#[from] serde_json::Error),

    /// Well-formed JSON whose values violate a domain constraint.
    #[error("Invalid payload: {0}")]
    Invalid(#[from] CoreError),
}

/// Parse and validate a payload into a complete [`SnapshotSet`].
pub fn parse_payload(text: &str) -> Result<SnapshotSet, PayloadError> {
    let payload: SnapshotPayload = serde_json::from_str(text)?;
    into_snapshot_set(payload)
}

/// Validate an already-deserialized payload.
pub fn into_snapshot_set(payload: SnapshotPayload) -> Result<SnapshotSet, PayloadError> {
    Ok(SnapshotSet::from_snapshots(payload.active_sessions)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use accrual_core::{Asset, SessionId};
    use assert_matches::assert_matches;
    use rust_decimal_macros::dec;

    #[test]
    fn parse_full_payload() {
        let json = r#"{"active_sessions":[
            {"session_id":12,"asset":"bitcoin","principal":"0.5","daily_rate":0.02,
             "accrued_amount":"0.00123456","observed_at":"2026-04-01T10:00:00Z","active":true},
            {"session_id":"eth-3","asset":"ETH","principal":4,"daily_rate":"0.015",
             "accrued_amount":0,"observed_at":"2026-04-01T10:00:00Z","active":true}
        ]}"#;
        let set = parse_payload(json).unwrap();
        assert_eq!(set.len(), 2);

        let btc = set.get(&SessionId::from(12)).unwrap();
        assert_eq!(btc.asset, Asset::Btc);
        assert_eq!(btc.principal, dec!(0.5));
        assert_eq!(btc.accrued_amount, dec!(0.00123456));

        let eth = set.get(&SessionId::from("eth-3")).unwrap();
        assert_eq!(eth.daily_rate, dec!(0.015));
    }

    #[test]
    fn empty_session_list_is_valid() {
        let set = parse_payload(r#"{"active_sessions":[]}"#).unwrap();
        assert!(set.is_empty());
    }

    #[test]
    fn missing_field_is_schema_error() {
        let json = r#"{"active_sessions":[{"session_id":1,"asset":"BTC","principal":1,
            "daily_rate":0.1,"observed_at":"2026-04-01T10:00:00Z","active":true}]}"#;
        assert_matches!(parse_payload(json), Err(PayloadError::Schema(_)));
    }

    #[test]
    fn unknown_asset_is_schema_error() {
        let json = r#"{"active_sessions":[{"session_id":1,"asset":"DOGE","principal":1,
            "daily_rate":0.1,"accrued_amount":0,"observed_at":"2026-04-01T10:00:00Z","active":true}]}"#;
        assert_matches!(parse_payload(json), Err(PayloadError::Schema(_)));
    }

    #[test]
    fn negative_amount_is_invalid() {
        let json = r#"{"active_sessions":[{"session_id":1,"asset":"BTC","principal":1,
            "daily_rate":0.1,"accrued_amount":"-0.5","observed_at":"2026-04-01T10:00:00Z","active":true}]}"#;
        assert_matches!(parse_payload(json), Err(PayloadError::Invalid(_)));
    }

    #[test]
    fn invalid_json_is_schema_error() {
        assert_matches!(parse_payload("not json"), Err(PayloadError::Schema(_)));
    }
}
