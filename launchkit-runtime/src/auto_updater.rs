//! Background update loop.
//!
//! Every `interval` minutes: read the current version, scan, and download the
//! latest version into the pending slots when it differs. Never promotes;
//! the next launch commits what was staged.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};

use launchkit_core::StorageService;
use launchkit_staging::PackageManager;

use crate::error::LauncherError;

struct Running {
    shutdown: broadcast::Sender<()>,
    handle: JoinHandle<()>,
}

pub struct AutoUpdater {
    storage: StorageService,
    manager: Arc<PackageManager>,
    /// `None` when the configured interval is not positive.
    period: Option<Duration>,
    running: Mutex<Option<Running>>,
}

impl AutoUpdater {
    pub fn new(storage: StorageService, manager: Arc<PackageManager>, interval_minutes: i64) -> Self {
        let minutes = u64::try_from(interval_minutes).ok().filter(|minutes| *minutes > 0);
        let period = minutes.and_then(|minutes| {
            let seconds = minutes.checked_mul(60);
            if seconds.is_none() {
                tracing::warn!(interval_minutes, "auto update interval is too large; auto updates are disabled");
            }
            seconds.map(Duration::from_secs)
        });
        Self::with_period(storage, manager, period)
    }

    pub fn with_period(
        storage: StorageService,
        manager: Arc<PackageManager>,
        period: Option<Duration>,
    ) -> Self {
        Self {
            storage,
            manager,
            period,
            running: Mutex::new(None),
        }
    }

    pub fn is_running(&self) -> bool {
        self.lock().as_ref().is_some_and(|r| !r.handle.is_finished())
    }

    /// Start the loop on the current tokio runtime. Returns `false` when the
    /// updater is disabled or already running.
    pub fn start(&self) -> bool {
        let Some(period) = self.period else {
            tracing::info!("auto update interval is not positive; auto updates are disabled");
            return false;
        };

        let mut running = self.lock();
        if running.as_ref().is_some_and(|r| !r.handle.is_finished()) {
            tracing::info!("auto updater already running");
            return false;
        }

        let Some(first_tick) = Instant::now().checked_add(period) else {
            tracing::warn!(period_secs = period.as_secs(), "auto update interval is too large; auto updates are disabled");
            return false;
        };

        let (shutdown, shutdown_rx) = broadcast::channel::<()>(1);
        let storage = self.storage.clone();
        let manager = self.manager.clone();
        let handle = tokio::spawn(update_loop(storage, manager, first_tick, period, shutdown_rx));
        *running = Some(Running { shutdown, handle });

        tracing::info!(period_secs = period.as_secs(), "auto updater started");
        true
    }

    /// Cancel future ticks. A tick already in progress runs to completion.
    pub fn stop(&self) {
        if let Some(running) = self.lock().take() {
            // The loop may already be gone; nothing to cancel then.
            let _ = running.shutdown.send(());
            tracing::info!("auto updater stopped");
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Option<Running>> {
        self.running.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for AutoUpdater {
    fn drop(&mut self) {
        self.stop();
    }
}

async fn update_loop(
    storage: StorageService,
    manager: Arc<PackageManager>,
    first_tick: Instant,
    period: Duration,
    mut shutdown_rx: broadcast::Receiver<()>,
) {
    let mut ticker = interval_at(first_tick, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = shutdown_rx.recv() => break,
            _ = ticker.tick() => {
                let storage = storage.clone();
                let manager = manager.clone();
                let result = tokio::task::spawn_blocking(move || check_for_update(&storage, &manager))
                    .await
                    .map_err(|e| LauncherError::Task(format!("update check task join failure: {e}")))
                    .and_then(|inner| inner);
                if let Err(err) = result {
                    tracing::error!(error = %err, "auto update check failed");
                }
            }
        }
    }
}

/// One tick: scan and stage the latest version when it differs.
pub fn check_for_update(storage: &StorageService, manager: &PackageManager) -> Result<bool, LauncherError> {
    let current = storage.get_current_version()?;
    let scan = manager.scan(&current)?;
    if !scan.has_newer {
        tracing::debug!(current = %current, "no update available");
        return Ok(false);
    }
    tracing::info!(current = %current, latest = %scan.latest_version, "update available; staging");
    manager.download_version(&scan.latest_version)?;
    Ok(true)
}
