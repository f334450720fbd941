//! Background task that refreshes rates on a fixed interval

use crate::core::{RateError, UpdateResult};
use crate::updater::RatesUpdater;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::{MissedTickBehavior, interval};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

pub const DEFAULT_STOP_TIMEOUT: Duration = Duration::from_secs(5);

struct Running {
    shutdown: CancellationToken,
    handle: JoinHandle<()>,
}

/// Drives [`RatesUpdater::run_update`] for a full refresh every `interval`.
///
/// The first tick runs immediately after `start`. Cancellation is only observed
/// while waiting for the next tick, never in the middle of an update.
pub struct RateScheduler {
    updater: Arc<RatesUpdater>,
    interval: Duration,
    stop_timeout: Duration,
    running: Mutex<Option<Running>>,
}

impl RateScheduler {
    pub fn new(updater: Arc<RatesUpdater>, interval: Duration) -> Self {
        Self {
            updater,
            interval,
            stop_timeout: DEFAULT_STOP_TIMEOUT,
            running: Mutex::new(None),
        }
    }

    pub fn with_stop_timeout(mut self, stop_timeout: Duration) -> Self {
        self.stop_timeout = stop_timeout;
        self
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub async fn is_running(&self) -> bool {
        self.running
            .lock()
            .await
            .as_ref()
            .is_some_and(|r| !r.handle.is_finished())
    }

    /// Spawns the timer loop. Returns `false` if it was already running.
    pub async fn start(&self) -> bool {
        let mut running = self.running.lock().await;
        if running.as_ref().is_some_and(|r| !r.handle.is_finished()) {
            warn!("Scheduler is already running");
            return false;
        }

        let shutdown = CancellationToken::new();
        let handle = tokio::spawn(run_loop(
            Arc::clone(&self.updater),
            self.interval,
            shutdown.clone(),
        ));
        *running = Some(Running { shutdown, handle });

        info!(
            interval_secs = self.interval.as_secs(),
            "Scheduler started"
        );
        true
    }

    /// Signals the loop to exit and waits up to the stop timeout for it to finish.
    pub async fn stop(&self) {
        let Some(Running { shutdown, handle }) = self.running.lock().await.take() else {
            return;
        };
        shutdown.cancel();

        match tokio::time::timeout(self.stop_timeout, handle).await {
            Ok(Ok(())) => info!("Scheduler stopped"),
            Ok(Err(e)) => error!(error = %e, "Scheduler task ended abnormally"),
            Err(_) => warn!(
                timeout_secs = self.stop_timeout.as_secs(),
                "Scheduler did not stop in time, leaving the current update to finish"
            ),
        }
    }

    /// Runs a single full update outside of the timer.
    pub async fn run_once(&self) -> Result<UpdateResult, RateError> {
        self.updater.run_update(None).await
    }
}

async fn run_loop(updater: Arc<RatesUpdater>, period: Duration, shutdown: CancellationToken) {
    let mut ticker = interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        // Cancellation wins over a tick that is ready at the same time
        tokio::select! {
            biased;
            _ = shutdown.cancelled() => break,
            _ = ticker.tick() => {}
        }

        info!("Scheduled rates update...");
        match updater.run_update(None).await {
            Ok(result) if result.success => {
                info!(pairs = result.pairs_stored, "Scheduled update stored rates");
                if !result.errors.is_empty() {
                    warn!(errors = ?result.errors, "Scheduled update had source errors");
                }
            }
            Ok(result) => warn!(errors = ?result.errors, "Scheduled update finished with errors"),
            Err(e) => error!(error = %e, "Scheduled update failed"),
        }
    }

    info!("Scheduler loop exited");
}
