//! The accrual estimator: one task that owns the snapshot set and
//! re-extrapolates it on every tick.
//!
//! [`AccrualEstimator::start`] spawns two tasks sharing a
//! [`CancellationToken`]:
//!
//! - the [`SyncChannel`] task, which reports [`SyncEvent`]s over an
//!   `mpsc` channel;
//! - the estimator task, which `select!`s over those events and the
//!   [`Ticker`], and publishes an [`EstimatorView`] on a `watch` channel.
//!
//! Readers never touch the snapshot set; they read the last published view.

use std::sync::Arc;
use std::time::Duration;

use accrual_core::{Clock, SystemClock};
use accrual_sync::{SyncChannel, SyncEvent};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::config::EstimatorConfig;
use crate::state::EstimatorState;
use crate::ticker::Ticker;
use crate::view::{ConnectionState, EstimatorView};

/// Capacity of the transport -> estimator event channel.
const EVENT_CHANNEL_CAPACITY: usize = 32;

/// How long [`AccrualEstimator::stop`] waits for each task before aborting it.
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

/// Timing knobs for the estimator task.
#[derive(Debug, Clone)]
pub struct EstimatorSettings {
    pub tick_interval: Duration,
    pub stale_after: Duration,
    pub hold_limit: Duration,
}

impl Default for EstimatorSettings {
    fn default() -> Self {
        Self {
            tick_interval: Duration::from_millis(250),
            stale_after: Duration::from_secs(60),
            hold_limit: Duration::from_secs(30),
        }
    }
}

/// Errors from estimator lifecycle calls.
#[derive(Debug, thiserror::Error)]
pub enum EstimatorError {
    #[error("Estimator is already running")]
    AlreadyRunning,

    #[error("Estimator was stopped; its sync channel cannot be reopened")]
    ChannelConsumed,

    #[error("Estimator must be started from within a tokio runtime")]
    NoRuntime,
}

struct Running {
    cancel: CancellationToken,
    estimator_task: JoinHandle<()>,
    sync_task: JoinHandle<()>,
}

/// Client-side estimator of live mining accrual.
///
/// Makes a slowly, discretely synced server quantity appear to grow
/// continuously while staying anchored to the latest server snapshot.
pub struct AccrualEstimator {
    channel: Option<SyncChannel>,
    settings: EstimatorSettings,
    clock: Arc<dyn Clock>,
    view_tx: Option<watch::Sender<EstimatorView>>,
    view_rx: watch::Receiver<EstimatorView>,
    running: Option<Running>,
}

impl AccrualEstimator {
    pub fn new(channel: SyncChannel, settings: EstimatorSettings, clock: Arc<dyn Clock>) -> Self {
        let (view_tx, view_rx) = watch::channel(EstimatorView::idle());
        Self {
            channel: Some(channel),
            settings,
            clock,
            view_tx: Some(view_tx),
            view_rx,
            running: None,
        }
    }

    /// Build an estimator for `config` on the system clock.
    pub fn from_config(config: &EstimatorConfig) -> Result<Self, accrual_sync::PullApiError> {
        Ok(Self::new(
            config.build_channel()?,
            config.settings(),
            Arc::new(SystemClock),
        ))
    }

    /// Open the sync channel and start the ticker.
    ///
    /// Nothing is spawned unless both tasks can be, so a failed start
    /// leaves nothing behind.
    pub fn start(&mut self) -> Result<(), EstimatorError> {
        if self.running.is_some() {
            return Err(EstimatorError::AlreadyRunning);
        }
        let handle = tokio::runtime::Handle::try_current().map_err(|_| EstimatorError::NoRuntime)?;
        let (Some(channel), Some(view_tx)) = (self.channel.take(), self.view_tx.take()) else {
            return Err(EstimatorError::ChannelConsumed);
        };

        let cancel = CancellationToken::new();
        let (event_tx, event_rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);

        let state = EstimatorState::new(
            channel.is_push(),
            to_chrono(self.settings.stale_after),
            to_chrono(self.settings.hold_limit),
        );
        tracing::info!(
            transport = channel.kind(),
            tick_ms = self.settings.tick_interval.as_millis() as u64,
            "Starting accrual estimator",
        );

        let sync_task = handle.spawn(channel.run(event_tx, cancel.child_token()));
        let estimator_task = handle.spawn(run_estimator(
            state,
            Arc::clone(&self.clock),
            event_rx,
            self.settings.tick_interval,
            view_tx,
            cancel.clone(),
        ));

        self.running = Some(Running {
            cancel,
            estimator_task,
            sync_task,
        });
        Ok(())
    }

    /// Cancel both tasks and wait for them to exit. Idempotent.
    ///
    /// Once this returns no tick or sync event can change the view.
    pub async fn stop(&mut self) {
        let Some(running) = self.running.take() else {
            return;
        };

        tracing::info!("Stopping accrual estimator");
        running.cancel.cancel();
        join_or_abort(running.sync_task, "sync").await;
        join_or_abort(running.estimator_task, "estimator").await;
        tracing::info!("Accrual estimator stopped");
    }

    pub fn is_running(&self) -> bool {
        self.running.is_some()
    }

    /// The latest published view. Never blocks.
    pub fn current_view(&self) -> EstimatorView {
        self.view_rx.borrow().clone()
    }

    /// Freshness of the ground truth behind the current view.
    pub fn connection_state(&self) -> ConnectionState {
        self.view_rx.borrow().connection
    }

    /// Receive every view the estimator publishes.
    pub fn subscribe(&self) -> watch::Receiver<EstimatorView> {
        self.view_rx.clone()
    }
}

impl Drop for AccrualEstimator {
    fn drop(&mut self) {
        if let Some(running) = self.running.take() {
            running.cancel.cancel();
            running.sync_task.abort();
            running.estimator_task.abort();
        }
    }
}

async fn join_or_abort(mut task: JoinHandle<()>, name: &'static str) {
    if tokio::time::timeout(SHUTDOWN_TIMEOUT, &mut task).await.is_err() {
        tracing::warn!(task = name, "Task did not stop in time; aborting");
        task.abort();
        let _ = task.await;
    }
}

fn to_chrono(duration: Duration) -> chrono::Duration {
    chrono::Duration::from_std(duration).unwrap_or(chrono::Duration::MAX)
}

/// The estimator task: fold sync events and ticks into the view.
async fn run_estimator(
    mut state: EstimatorState,
    clock: Arc<dyn Clock>,
    mut events: mpsc::Receiver<SyncEvent>,
    tick_interval: Duration,
    view_tx: watch::Sender<EstimatorView>,
    cancel: CancellationToken,
) {
    let mut ticker = Ticker::new(tick_interval);
    let mut events_open = true;
    view_tx.send_replace(state.view(clock.now()));

    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            event = events.recv(), if events_open => match event {
                Some(event) => {
                    let now = clock.now();
                    state.apply(event, now);
                    view_tx.send_replace(state.view(now));
                }
                None => {
                    tracing::error!("Sync task exited unexpectedly; extrapolating from last snapshots");
                    events_open = false;
                    state.mark_transport_lost();
                }
            },
            _ = ticker.tick() => {
                view_tx.send_replace(state.tick(clock.now()));
            }
        }
    }

    view_tx.send_modify(|view| view.connection = ConnectionState::Idle);
    tracing::debug!("Estimator task exited");
}
