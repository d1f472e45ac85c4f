//! Server-reported mining session state and the validated set that
//! replaces it wholesale on every sync.

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::asset::Asset;
use crate::error::CoreError;
use crate::types::{Amount, SessionId, Timestamp};

/// Upper bound accepted for `principal` and `accrued_amount`.
pub const MAX_AMOUNT: Decimal = Decimal::from_parts(0xD4A5_1000, 0xE8, 0, false, 0); // 1e12

/// Upper bound accepted for `daily_rate` (10 000 % per day).
pub const MAX_DAILY_RATE: Decimal = Decimal::from_parts(100, 0, 0, false, 0);

/// One mining session as last reported by the server.
///
/// Immutable once built; a newer report replaces the whole record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub session_id: SessionId,
    pub asset: Asset,
    /// Deposited amount backing the session.
    pub principal: Amount,
    /// Fraction of `principal` accrued per 24h.
    pub daily_rate: Amount,
    /// Authoritative accumulated amount as of `observed_at`.
    pub accrued_amount: Amount,
    pub observed_at: Timestamp,
    pub active: bool,
}

impl SessionSnapshot {
    /// Amount accrued per full day at this snapshot's rate.
    pub fn daily_accrual(&self) -> Amount {
        self.principal.saturating_mul(self.daily_rate)
    }

    /// Check numeric fields are within range.
    pub fn validate(&self) -> Result<(), CoreError> {
        validate_amount(self.principal, "principal", &self.session_id)?;
        validate_amount(self.accrued_amount, "accrued_amount", &self.session_id)?;
        if self.daily_rate < Decimal::ZERO {
            return Err(CoreError::Validation(format!(
                "session {}: daily_rate must be non-negative, got {}",
                self.session_id, self.daily_rate
            )));
        }
        if self.daily_rate > MAX_DAILY_RATE {
            return Err(CoreError::Validation(format!(
                "session {}: daily_rate {} exceeds {MAX_DAILY_RATE}",
                self.session_id, self.daily_rate
            )));
        }
        Ok(())
    }
}

fn validate_amount(value: Amount, name: &str, session_id: &SessionId) -> Result<(), CoreError> {
    if value < Decimal::ZERO {
        return Err(CoreError::Validation(format!(
            "session {session_id}: {name} must be non-negative, got {value}"
        )));
    }
    if value > MAX_AMOUNT {
        return Err(CoreError::Validation(format!(
            "session {session_id}: {name} {value} exceeds {MAX_AMOUNT}"
        )));
    }
    Ok(())
}

/// The complete, validated set of live sessions from one sync.
///
/// Built all-or-nothing: a single invalid record rejects the set.
/// Inactive sessions are dropped on construction since they neither
/// accrue nor appear in the view.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SnapshotSet {
    sessions: BTreeMap<SessionId, SessionSnapshot>,
    inactive: usize,
}

impl SnapshotSet {
    pub fn from_snapshots(snapshots: Vec<SessionSnapshot>) -> Result<Self, CoreError> {
        let mut sessions = BTreeMap::new();
        let mut seen = std::collections::HashSet::new();
        let mut inactive = 0;

        for snapshot in snapshots {
            snapshot.validate()?;
            if !seen.insert(snapshot.session_id.clone()) {
                return Err(CoreError::Validation(format!(
                    "duplicate session_id {}",
                    snapshot.session_id
                )));
            }
            if snapshot.active {
                sessions.insert(snapshot.session_id.clone(), snapshot);
            } else {
                inactive += 1;
            }
        }

        Ok(Self { sessions, inactive })
    }

    pub fn get(&self, session_id: &SessionId) -> Option<&SessionSnapshot> {
        self.sessions.get(session_id)
    }

    /// Live sessions ordered by id.
    pub fn iter(&self) -> impl Iterator<Item = &SessionSnapshot> {
        self.sessions.values()
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Number of records dropped because they were reported inactive.
    pub fn inactive_count(&self) -> usize {
        self.inactive
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use chrono::TimeZone;
    use rust_decimal_macros::dec;

    fn snapshot(id: i64, accrued: Amount, active: bool) -> SessionSnapshot {
        SessionSnapshot {
            session_id: id.into(),
            asset: Asset::Btc,
            principal: dec!(1.5),
            daily_rate: dec!(0.02),
            accrued_amount: accrued,
            observed_at: chrono::Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap(),
            active,
        }
    }

    #[test]
    fn max_amount_constant_is_one_trillion() {
        assert_eq!(MAX_AMOUNT, dec!(1_000_000_000_000));
        assert_eq!(MAX_DAILY_RATE, dec!(100));
    }

    #[test]
    fn negative_accrued_amount_fails_validation() {
        let s = snapshot(1, dec!(-0.00000001), true);
        assert_matches!(s.validate(), Err(CoreError::Validation(_)));
    }

    #[test]
    fn negative_zero_is_accepted() {
        let s = snapshot(1, -dec!(0), true);
        assert!(s.validate().is_ok());
    }

    #[test]
    fn set_drops_inactive_sessions() {
        let set = SnapshotSet::from_snapshots(vec![
            snapshot(1, dec!(0.1), true),
            snapshot(2, dec!(0.2), false),
        ])
        .unwrap();
        assert_eq!(set.len(), 1);
        assert_eq!(set.inactive_count(), 1);
        assert!(set.get(&SessionId::from(2)).is_none());
    }

    #[test]
    fn set_rejects_duplicates() {
        let result = SnapshotSet::from_snapshots(vec![
            snapshot(7, dec!(0.1), true),
            snapshot(7, dec!(0.2), true),
        ]);
        assert_matches!(result, Err(CoreError::Validation(msg)) if msg.contains("duplicate"));
    }

    #[test]
    fn one_bad_record_rejects_whole_set() {
        let result = SnapshotSet::from_snapshots(vec![
            snapshot(1, dec!(0.1), true),
            snapshot(2, dec!(-1), true),
        ]);
        assert!(result.is_err());
    }
}
