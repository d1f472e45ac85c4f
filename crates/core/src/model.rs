//! Accrual extrapolation between server snapshots.
//!
//! Pure functions: given a [`SessionSnapshot`] and the current instant,
//! estimate the amount accrued since the snapshot was observed assuming
//! the snapshot's rate stays constant.

use rust_decimal::Decimal;

use crate::snapshot::SessionSnapshot;
use crate::types::{Amount, Timestamp, MILLIS_PER_DAY, SECONDS_PER_DAY};

/// Time elapsed since `observed_at`, in milliseconds, clamped at zero.
///
/// A `now` behind `observed_at` (client clock skew) counts as no
/// elapsed time rather than a negative interval.
pub fn elapsed_millis(observed_at: Timestamp, now: Timestamp) -> i64 {
    (now - observed_at).num_milliseconds().max(0)
}

/// Accrual per second for one snapshot: `principal * daily_rate / 86400`.
pub fn per_second_rate(snapshot: &SessionSnapshot) -> Amount {
    snapshot.daily_accrual() / Decimal::from(SECONDS_PER_DAY)
}

/// Extrapolated accrued amount for `snapshot` at `now`.
///
/// Inactive sessions return their last known amount unchanged. The
/// multiplication runs before the division so a whole day of elapsed
/// time reproduces `principal * daily_rate` exactly.
pub fn extrapolate(snapshot: &SessionSnapshot, now: Timestamp) -> Amount {
    if !snapshot.active {
        return snapshot.accrued_amount;
    }

    let elapsed = elapsed_millis(snapshot.observed_at, now);
    if elapsed == 0 {
        return snapshot.accrued_amount;
    }

    let accrued_since = snapshot
        .daily_accrual()
        .saturating_mul(Decimal::from(elapsed))
        / Decimal::from(MILLIS_PER_DAY);

    snapshot.accrued_amount.saturating_add(accrued_since)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::asset::Asset;
    use crate::types::SessionId;
    use chrono::{Duration, TimeZone, Utc};
    use rust_decimal_macros::dec;

    fn base_time() -> Timestamp {
        Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap()
    }

    fn snapshot(principal: Amount, rate: Amount, accrued: Amount) -> SessionSnapshot {
        SessionSnapshot {
            session_id: SessionId::from(1_i64),
            asset: Asset::Btc,
            principal,
            daily_rate: rate,
            accrued_amount: accrued,
            observed_at: base_time(),
            active: true,
        }
    }

    #[test]
    fn at_observation_instant_returns_accrued_exactly() {
        let s = snapshot(dec!(2.5), dec!(0.03), dec!(0.12345678));
        assert_eq!(extrapolate(&s, base_time()), dec!(0.12345678));
    }

    #[test]
    fn one_full_day_accrues_principal_times_rate() {
        let s = snapshot(dec!(1000), dec!(0.05), dec!(0));
        let now = base_time() + Duration::seconds(SECONDS_PER_DAY);
        assert_eq!(extrapolate(&s, now), dec!(50));
    }

    #[test]
    fn half_day_accrues_half() {
        let s = snapshot(dec!(1000), dec!(0.05), dec!(10));
        let now = base_time() + Duration::hours(12);
        assert_eq!(extrapolate(&s, now), dec!(35));
    }

    #[test]
    fn clock_skew_clamps_to_zero_elapsed() {
        let s = snapshot(dec!(1000), dec!(0.05), dec!(3));
        let now = base_time() - Duration::seconds(90);
        assert_eq!(elapsed_millis(s.observed_at, now), 0);
        assert_eq!(extrapolate(&s, now), dec!(3));
    }

    #[test]
    fn inactive_session_is_not_extrapolated() {
        let mut s = snapshot(dec!(1000), dec!(0.05), dec!(7));
        s.active = false;
        let now = base_time() + Duration::hours(5);
        assert_eq!(extrapolate(&s, now), dec!(7));
    }

    #[test]
    fn extrapolation_is_monotonic_in_time() {
        let s = snapshot(dec!(0.00731), dec!(0.013), dec!(0.00000042));
        let mut previous = extrapolate(&s, base_time());
        for ms in (0..5_000).step_by(97) {
            let current = extrapolate(&s, base_time() + Duration::milliseconds(ms));
            assert!(current >= previous, "went backward at {ms}ms");
            previous = current;
        }
    }

    #[test]
    fn per_second_rate_matches_formula() {
        let s = snapshot(dec!(864), dec!(0.1), dec!(0));
        assert_eq!(per_second_rate(&s), dec!(0.001));
    }

    #[test]
    fn sub_satoshi_growth_is_kept() {
        let s = snapshot(dec!(0.001), dec!(0.01), dec!(0));
        let now = base_time() + Duration::milliseconds(250);
        let value = extrapolate(&s, now);
        assert!(value > Decimal::ZERO);
        assert!(value < dec!(0.00000001));
    }
}
