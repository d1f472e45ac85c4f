//! `accrual-watch` -- follow live mining accrual from the terminal.
//!
//! Starts an [`AccrualEstimator`] against the configured snapshot
//! source and logs the per-asset totals on a fixed interval until
//! Ctrl-C. See [`EstimatorConfig::from_env`] for the environment
//! variables; additionally:
//!
//! | Variable                      | Required | Default | Description                         |
//! |-------------------------------|----------|---------|-------------------------------------|
//! | `ACCRUAL_REPORT_INTERVAL_SECS`| no       | `5`     | Seconds between logged summaries    |
//! | `LOG_FORMAT`                  | no       | `text`  | `json` for structured log lines     |

use std::time::Duration;

use accrual_core::aggregate::display_amount;
use accrual_estimator::{AccrualEstimator, EstimatorConfig, EstimatorView};

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Default interval between logged summaries.
const DEFAULT_REPORT_INTERVAL_SECS: u64 = 5;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    let json = std::env::var("LOG_FORMAT").is_ok_and(|v| v.eq_ignore_ascii_case("json"));
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "accrual_watch=info,accrual_estimator=info,accrual_sync=info".into()
            }),
        )
        .with(json.then(|| tracing_subscriber::fmt::layer().json()))
        .with((!json).then(tracing_subscriber::fmt::layer))
        .init();

    let config = EstimatorConfig::from_env().unwrap_or_else(|e| {
        tracing::error!(error = %e, "Invalid configuration");
        std::process::exit(1);
    });

    let report_secs: u64 = std::env::var("ACCRUAL_REPORT_INTERVAL_SECS")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(DEFAULT_REPORT_INTERVAL_SECS);

    let mut estimator = AccrualEstimator::from_config(&config).unwrap_or_else(|e| {
        tracing::error!(error = %e, "Failed to build sync channel");
        std::process::exit(1);
    });

    if let Err(e) = estimator.start() {
        tracing::error!(error = %e, "Failed to start estimator");
        std::process::exit(1);
    }

    let mut report = tokio::time::interval(Duration::from_secs(report_secs.max(1)));
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Interrupt received");
                break;
            }
            _ = report.tick() => log_view(&estimator.current_view()),
        }
    }

    estimator.stop().await;
}

fn log_view(view: &EstimatorView) {
    if view.per_asset.is_empty() {
        tracing::info!(connection = ?view.connection, stale = view.stale, "No active mining sessions");
        return;
    }

    for totals in &view.per_asset {
        tracing::info!(
            asset = %totals.asset,
            sessions = totals.session_count,
            principal = %display_amount(totals.total_principal),
            mined = %display_amount(totals.total_accrued),
            balance = %display_amount(totals.total_balance),
            per_second = %totals.per_second_rate.round_dp(12),
            connection = ?view.connection,
            stale = view.stale,
            "Mining progress",
        );
    }
}
