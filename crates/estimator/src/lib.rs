//! `accrual-estimator` library crate.
//!
//! The orchestrator that turns discrete server snapshots into a
//! continuously ticking view. The `accrual-watch` binary in `main.rs`
//! drives it from the command line.

pub mod config;
pub mod estimator;
pub mod state;
pub mod ticker;
pub mod view;

pub use config::{ConfigError, EstimatorConfig, TransportKind};
pub use estimator::{AccrualEstimator, EstimatorError, EstimatorSettings};
pub use view::{ConnectionState, EstimatorView};
