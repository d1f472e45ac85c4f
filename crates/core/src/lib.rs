//! Domain logic for the live mining-accrual estimator.
//!
//! Everything here is pure and synchronous:
//!
//! - [`SessionSnapshot`] / [`SnapshotSet`]: server-reported session
//!   state, validated all-or-nothing.
//! - [`model`]: extrapolation of the accrued amount between snapshots.
//! - [`aggregate`]: per-session estimates and principal-weighted
//!   per-asset totals.
//! - [`Clock`]: the time source extrapolation reads.

pub mod aggregate;
pub mod asset;
pub mod clock;
pub mod error;
pub mod model;
pub mod snapshot;
pub mod types;

pub use aggregate::{AssetTotals, SessionEstimate};
pub use asset::Asset;
pub use clock::{Clock, ManualClock, SystemClock};
pub use error::CoreError;
pub use snapshot::{SessionSnapshot, SnapshotSet};
pub use types::{Amount, SessionId, Timestamp};
