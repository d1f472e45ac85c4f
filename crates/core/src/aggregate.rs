//! Per-session estimates and per-asset totals.

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::Serialize;

use crate::asset::Asset;
use crate::model;
use crate::snapshot::SessionSnapshot;
use crate::types::{Amount, SessionId, Timestamp, AMOUNT_SCALE, SECONDS_PER_DAY};

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Extrapolated state of one live session at a given instant.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionEstimate {
    pub session_id: SessionId,
    pub asset: Asset,
    pub principal: Amount,
    pub daily_rate: Amount,
    /// Estimated accrued amount (authoritative baseline plus extrapolation).
    pub accrued_amount: Amount,
    /// `principal + accrued_amount`.
    pub balance: Amount,
    pub per_second_rate: Amount,
    /// When the baseline was known-correct on the server.
    pub observed_at: Timestamp,
}

impl SessionEstimate {
    /// `principal * daily_rate`, kept unrounded for aggregation.
    pub fn daily_accrual(&self) -> Amount {
        self.principal.saturating_mul(self.daily_rate)
    }

    /// Replace the estimated amount, keeping `balance` consistent.
    pub fn with_accrued(mut self, accrued_amount: Amount) -> Self {
        self.accrued_amount = accrued_amount;
        self.balance = self.principal.saturating_add(accrued_amount);
        self
    }
}

/// Totals over every live session of one asset.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AssetTotals {
    pub asset: Asset,
    pub session_count: usize,
    pub total_principal: Amount,
    pub total_accrued: Amount,
    pub total_balance: Amount,
    /// `Σ(principal_i × daily_rate_i) / 86400`.
    pub per_second_rate: Amount,
}

// ---------------------------------------------------------------------------
// Estimation
// ---------------------------------------------------------------------------

/// Estimate one session at `now`.
pub fn estimate_session(snapshot: &SessionSnapshot, now: Timestamp) -> SessionEstimate {
    let accrued_amount = model::extrapolate(snapshot, now);
    SessionEstimate {
        session_id: snapshot.session_id.clone(),
        asset: snapshot.asset,
        principal: snapshot.principal,
        daily_rate: snapshot.daily_rate,
        accrued_amount,
        balance: snapshot.principal.saturating_add(accrued_amount),
        per_second_rate: model::per_second_rate(snapshot),
        observed_at: snapshot.observed_at,
    }
}

/// Group estimates by asset and total them.
///
/// The combined rate weights each session's rate by its principal: the
/// daily accruals are summed before dividing, so a small session with a
/// high rate contributes only in proportion to its deposit. Assets with
/// no sessions are omitted.
pub fn aggregate_by_asset(estimates: &[SessionEstimate]) -> Vec<AssetTotals> {
    #[derive(Default)]
    struct Acc {
        count: usize,
        principal: Amount,
        accrued: Amount,
        balance: Amount,
        daily_accrual: Amount,
    }

    let mut groups: BTreeMap<Asset, Acc> = BTreeMap::new();
    for estimate in estimates {
        let acc = groups.entry(estimate.asset).or_default();
        acc.count += 1;
        acc.principal = acc.principal.saturating_add(estimate.principal);
        acc.accrued = acc.accrued.saturating_add(estimate.accrued_amount);
        acc.balance = acc.balance.saturating_add(estimate.balance);
        acc.daily_accrual = acc.daily_accrual.saturating_add(estimate.daily_accrual());
    }

    groups
        .into_iter()
        .map(|(asset, acc)| AssetTotals {
            asset,
            session_count: acc.count,
            total_principal: acc.principal,
            total_accrued: acc.accrued,
            total_balance: acc.balance,
            per_second_rate: acc.daily_accrual / Decimal::from(SECONDS_PER_DAY),
        })
        .collect()
}

/// Round an amount to [`AMOUNT_SCALE`] digits for display.
pub fn display_amount(amount: Amount) -> Amount {
    amount.round_dp(AMOUNT_SCALE)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};
    use rust_decimal_macros::dec;

    fn base_time() -> Timestamp {
        Utc.with_ymd_and_hms(2026, 5, 10, 8, 30, 0).unwrap()
    }

    fn snapshot(id: i64, asset: Asset, principal: Amount, rate: Amount) -> SessionSnapshot {
        SessionSnapshot {
            session_id: id.into(),
            asset,
            principal,
            daily_rate: rate,
            accrued_amount: Decimal::ZERO,
            observed_at: base_time(),
            active: true,
        }
    }

    #[test]
    fn combined_rate_is_principal_weighted() {
        let snapshots = [
            snapshot(1, Asset::Btc, dec!(100), dec!(0.10)),
            snapshot(2, Asset::Btc, dec!(900), dec!(0.01)),
        ];
        let estimates: Vec<_> = snapshots
            .iter()
            .map(|s| estimate_session(s, base_time()))
            .collect();

        let totals = aggregate_by_asset(&estimates);
        assert_eq!(totals.len(), 1);

        let weighted = (dec!(100) * dec!(0.10) + dec!(900) * dec!(0.01)) / dec!(86400);
        let averaged = (dec!(0.10) + dec!(0.01)) / dec!(2) / dec!(86400);
        assert_eq!(totals[0].per_second_rate, weighted);
        assert_ne!(totals[0].per_second_rate, averaged);
        assert_eq!(totals[0].session_count, 2);
        assert_eq!(totals[0].total_principal, dec!(1000));
    }

    #[test]
    fn groups_are_split_by_asset_in_ticker_order() {
        let now = base_time() + Duration::seconds(SECONDS_PER_DAY);
        let estimates: Vec<_> = [
            snapshot(1, Asset::Eth, dec!(10), dec!(0.01)),
            snapshot(2, Asset::Btc, dec!(1), dec!(0.02)),
            snapshot(3, Asset::Eth, dec!(30), dec!(0.01)),
        ]
        .iter()
        .map(|s| estimate_session(s, now))
        .collect();

        let totals = aggregate_by_asset(&estimates);
        assert_eq!(totals.len(), 2);
        assert_eq!(totals[0].asset, Asset::Btc);
        assert_eq!(totals[0].total_accrued, dec!(0.02));
        assert_eq!(totals[1].asset, Asset::Eth);
        assert_eq!(totals[1].session_count, 2);
        assert_eq!(totals[1].total_accrued, dec!(0.4));
        assert_eq!(totals[1].total_balance, dec!(40.4));
    }

    #[test]
    fn empty_input_yields_no_groups() {
        assert!(aggregate_by_asset(&[]).is_empty());
    }

    #[test]
    fn with_accrued_keeps_balance_consistent() {
        let estimate = estimate_session(&snapshot(1, Asset::Btc, dec!(2), dec!(0.01)), base_time());
        let held = estimate.with_accrued(dec!(0.5));
        assert_eq!(held.balance, dec!(2.5));
    }

    #[test]
    fn display_amount_rounds_to_eight_digits() {
        assert_eq!(display_amount(dec!(0.123456789)), dec!(0.12345679));
        assert_eq!(display_amount(dec!(1.5)), dec!(1.5));
    }
}
