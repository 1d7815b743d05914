//! Lifecycle controller: owns the running state, the tick schedule and the watchdog

use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

use crate::clock::Clock;
use crate::config::MonitorSettings;
use crate::detector::{ChangeDetector, CheckOutcome};
use crate::fetcher::PageFetcher;
use crate::notifier::{deliver, record, Destination, Notifier};
use crate::records::{
    MonitoringConfig, NotificationKind, NotificationRecord, RunStatus, UpdateConfig,
};
use crate::schedule::Schedule;
use crate::store::RecordStore;

const TEST_MESSAGE: &str =
    "✅ Test message from Forum Monitor\n\nYour Telegram connection is working correctly!";

/// Timing knobs for the controller
#[derive(Debug, Clone, Copy)]
pub struct ControllerSettings {
    pub watchdog_interval: Duration,
    pub restart_grace: Duration,
}

impl Default for ControllerSettings {
    fn default() -> Self {
        Self::from(&MonitorSettings::default())
    }
}

impl From<&MonitorSettings> for ControllerSettings {
    fn from(settings: &MonitorSettings) -> Self {
        Self {
            watchdog_interval: settings.watchdog_interval,
            restart_grace: settings.restart_grace,
        }
    }
}

/// Whether polling is active
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunState {
    Stopped,
    Running,
}

/// What a single watchdog evaluation concluded
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WatchdogVerdict {
    /// The controller is stopped, nothing to watch
    Idle,
    Healthy,
    /// A stall was detected and the restart succeeded
    Recovered,
    /// A stall was detected and the restart failed with the given error
    RecoveryFailed(String),
}

/// An active run: its epoch, tick schedule and cancellation handle
#[derive(Debug)]
struct Run {
    epoch: u64,
    schedule: Schedule,
    cancel: CancellationToken,
}

type BoxedResult<T> = Pin<Box<dyn Future<Output = crate::Result<T>> + Send>>;

#[derive(Debug)]
struct Inner {
    store: Arc<dyn RecordStore>,
    notifier: Arc<dyn Notifier>,
    clock: Arc<dyn Clock>,
    detector: ChangeDetector,
    settings: ControllerSettings,
    shutdown: CancellationToken,
    /// Serializes start/stop/restart; `Some` while running
    run: Mutex<Option<Run>>,
    /// Bumped on every start and stop so stale timers become no-ops
    epoch: AtomicU64,
}

/// Handle to the lifecycle controller, cheap to clone
#[derive(Debug, Clone)]
pub struct Controller {
    inner: Arc<Inner>,
}

impl Controller {
    pub fn new(
        store: Arc<dyn RecordStore>,
        fetcher: Arc<dyn PageFetcher>,
        notifier: Arc<dyn Notifier>,
        clock: Arc<dyn Clock>,
        settings: ControllerSettings,
        shutdown: CancellationToken,
    ) -> Self {
        let detector = ChangeDetector::new(
            Arc::clone(&store),
            fetcher,
            Arc::clone(&notifier),
            Arc::clone(&clock),
        );
        Self {
            inner: Arc::new(Inner {
                store,
                notifier,
                clock,
                detector,
                settings,
                shutdown,
                run: Mutex::new(None),
                epoch: AtomicU64::new(0),
            }),
        }
    }

    /// Start polling. Fails if already running or no configuration exists.
    pub async fn start(&self) -> crate::Result<RunStatus> {
        let mut run = self.inner.run.lock().await;
        if run.is_some() {
            return Err(crate::ForumWatchError::AlreadyRunning);
        }
        self.inner.start_locked(&mut run).await
    }

    /// Stop polling. Fails if not running.
    pub async fn stop(&self) -> crate::Result<RunStatus> {
        let mut run = self.inner.run.lock().await;
        let current = run.take().ok_or(crate::ForumWatchError::NotRunning)?;
        self.inner.stop_locked(current).await
    }

    /// Stop (if running), wait for in-flight work to drain, then start again
    pub async fn restart(&self) -> crate::Result<RunStatus> {
        self.inner.restart().await
    }

    pub async fn state(&self) -> RunState {
        if self.inner.run.lock().await.is_some() {
            RunState::Running
        } else {
            RunState::Stopped
        }
    }

    /// The active tick schedule, if running
    pub async fn schedule(&self) -> Option<Schedule> {
        self.inner.run.lock().await.as_ref().map(|r| r.schedule)
    }

    pub async fn status(&self) -> crate::Result<RunStatus> {
        self.inner.store.status().await
    }

    pub async fn config(&self) -> crate::Result<Option<MonitoringConfig>> {
        self.inner.store.config().await
    }

    pub async fn notifications(&self, limit: usize) -> crate::Result<Vec<NotificationRecord>> {
        self.inner.store.notifications(limit).await
    }

    /// Validate and persist a new configuration, restarting if running so
    /// the new interval applies immediately
    pub async fn update_config(&self, update: &UpdateConfig) -> crate::Result<MonitoringConfig> {
        update.validate()?;
        let saved = self
            .inner
            .store
            .save_config(update, self.inner.clock.now())
            .await?;
        tracing::info!(
            "Configuration updated: url={}, interval={} min",
            saved.forum_url,
            saved.check_interval
        );

        if self.state().await == RunState::Running {
            self.restart().await?;
        }
        Ok(saved)
    }

    /// Run one check now. Only allowed while running.
    pub async fn manual_check(&self) -> crate::Result<CheckOutcome> {
        if self.state().await != RunState::Running {
            return Err(crate::ForumWatchError::NotRunning);
        }
        self.inner.detector.check().await
    }

    /// Send a one-off test message without touching any state
    pub async fn test_notify(&self) -> crate::Result<()> {
        let config = self
            .inner
            .store
            .config()
            .await?
            .ok_or(crate::ForumWatchError::ConfigMissing)?;
        self.inner
            .notifier
            .send(&Destination::from_config(&config), TEST_MESSAGE)
            .await
    }

    /// Send a status summary to the operator channel. Returns the summary.
    pub async fn health_check(&self) -> crate::Result<String> {
        let running = self.state().await == RunState::Running;
        let status = self.inner.store.status().await?;
        let config = self.inner.store.config().await?;
        let now = self.inner.clock.now();

        let message = if running {
            let uptime = status.uptime_minutes(now).unwrap_or(0);
            let interval = config
                .map(|c| c.check_interval.to_string())
                .unwrap_or_else(|| "?".to_string());
            let last_check = status
                .last_check_at
                .map(|t| t.format("%Y-%m-%d %H:%M:%S UTC").to_string())
                .unwrap_or_else(|| "Never".to_string());
            format!(
                "🟢 <b>Service Status: Running</b>\n\n\
                 ⏱ Uptime: {} minutes\n\
                 📊 Total notifications: {}\n\
                 🔄 Check interval: {} minutes\n\
                 ✅ Last check: {}",
                uptime, status.total_notifications_sent, interval, last_check
            )
        } else {
            "🔴 <b>Service Status: Not Running</b>\n\nThe monitoring service is currently stopped."
                .to_string()
        };

        self.inner.deliver(&message).await;
        record(
            self.inner.store.as_ref(),
            "Health check completed and sent to Telegram",
            NotificationKind::Info,
            self.inner.clock.now(),
        )
        .await;
        Ok(message)
    }

    /// Evaluate staleness once and recover if stalled
    pub async fn watchdog_pass(&self) -> crate::Result<WatchdogVerdict> {
        self.inner.watchdog_pass().await
    }

    /// Reconcile a status left behind by a previous process.
    ///
    /// A persisted `isRunning=true` has no live timers behind it; it is reset
    /// to stopped and, when `resume` is set, the controller is started again.
    pub async fn resume(&self, resume: bool) -> crate::Result<RunState> {
        let status = self.inner.store.status().await?;
        if !status.is_running || self.state().await == RunState::Running {
            return Ok(self.state().await);
        }

        tracing::info!("Previous run did not shut down cleanly, reconciling status");
        self.inner
            .store
            .update_status(Box::new(RunStatus::mark_stopped), self.inner.clock.now())
            .await?;

        if resume {
            self.start().await?;
        }
        Ok(self.state().await)
    }

    /// Cancel timers for process exit, leaving the persisted status as is so
    /// the next boot can resume
    pub async fn shutdown(&self) {
        self.inner.shutdown.cancel();
        if let Some(run) = self.inner.run.lock().await.take() {
            run.cancel.cancel();
            self.inner.epoch.fetch_add(1, Ordering::SeqCst);
            tracing::debug!("Run {} cancelled for shutdown", run.epoch);
        }
    }
}

impl Inner {
    fn is_current(&self, epoch: u64) -> bool {
        self.epoch.load(Ordering::SeqCst) == epoch
    }

    async fn deliver(&self, text: &str) -> bool {
        deliver(
            self.notifier.as_ref(),
            self.store.as_ref(),
            self.clock.as_ref(),
            text,
        )
        .await
    }

    async fn start_locked(self: &Arc<Self>, run: &mut Option<Run>) -> crate::Result<RunStatus> {
        let config = self
            .store
            .config()
            .await?
            .ok_or(crate::ForumWatchError::ConfigMissing)?;
        let schedule = Schedule::from_interval(config.check_interval)?;

        let now = self.clock.now();
        self.store
            .update_status(Box::new(move |s| s.mark_started(now)), now)
            .await?;

        self.deliver("⏰ <b>Monitoring started</b>\n\nThe monitoring service is now running.")
            .await;
        record(
            self.store.as_ref(),
            "Monitoring service started",
            NotificationKind::Success,
            self.clock.now(),
        )
        .await;

        let epoch = self.epoch.fetch_add(1, Ordering::SeqCst) + 1;
        let cancel = self.shutdown.child_token();
        tokio::spawn(tick_loop(Arc::clone(self), epoch, schedule, cancel.clone()));
        tokio::spawn(watchdog_loop(
            Arc::clone(self),
            epoch,
            self.settings.watchdog_interval,
            cancel.clone(),
        ));

        tracing::info!(
            "Monitoring started (run {}, schedule '{}')",
            epoch,
            schedule
        );
        *run = Some(Run {
            epoch,
            schedule,
            cancel,
        });
        self.store.status().await
    }

    async fn stop_locked(&self, run: Run) -> crate::Result<RunStatus> {
        run.cancel.cancel();
        self.epoch.fetch_add(1, Ordering::SeqCst);

        let status = self
            .store
            .update_status(Box::new(RunStatus::mark_stopped), self.clock.now())
            .await?;
        record(
            self.store.as_ref(),
            "Monitoring service stopped",
            NotificationKind::Info,
            self.clock.now(),
        )
        .await;
        tracing::info!("Monitoring stopped (run {})", run.epoch);

        // Best effort, the stop has already taken effect
        self.deliver("🛑 <b>Service stopped</b>\n\nMonitoring has been paused.")
            .await;
        Ok(status)
    }

    async fn restart(self: &Arc<Self>) -> crate::Result<RunStatus> {
        let mut run = self.run.lock().await;
        if let Some(current) = run.take() {
            self.stop_locked(current).await?;
            tokio::time::sleep(self.settings.restart_grace).await;
        }
        self.start_locked(&mut run).await?;
        record(
            self.store.as_ref(),
            "Monitoring service restarted",
            NotificationKind::Success,
            self.clock.now(),
        )
        .await;
        self.store.status().await
    }

    /// Boxed so the watchdog, which restarts, and start, which spawns the
    /// watchdog, do not form a recursive future type
    fn restart_boxed(self: Arc<Self>) -> BoxedResult<RunStatus> {
        Box::pin(async move { self.restart().await })
    }

    async fn watchdog_pass(self: &Arc<Self>) -> crate::Result<WatchdogVerdict> {
        if self.run.lock().await.is_none() {
            return Ok(WatchdogVerdict::Idle);
        }

        let status = self.store.status().await?;
        let interval_minutes = self
            .store
            .config()
            .await?
            .map(|c| c.check_interval)
            .unwrap_or(30);
        let now = self.clock.now();

        let Some(elapsed) = stall_reference(&status).map(|at| now - at) else {
            return Ok(WatchdogVerdict::Healthy);
        };
        let threshold = chrono::Duration::minutes(i64::from(interval_minutes) * 2);
        if elapsed <= threshold {
            tracing::debug!(
                "Watchdog: last activity {}s ago, threshold {}s",
                elapsed.num_seconds(),
                threshold.num_seconds()
            );
            return Ok(WatchdogVerdict::Healthy);
        }

        let stalled = crate::ForumWatchError::Stalled(format!(
            "no check for {} minutes, expected every {} minutes",
            elapsed.num_minutes(),
            interval_minutes
        ));
        tracing::warn!("Watchdog: {}", stalled);
        record(
            self.store.as_ref(),
            "Watchdog: Service appears to be stalled. Attempting recovery...",
            NotificationKind::Error,
            now,
        )
        .await;
        self.deliver("🚫 <b>Service appears stalled</b>\n\nAttempting automatic recovery...")
            .await;

        match Arc::clone(self).restart_boxed().await {
            Ok(_) => {
                tracing::info!("Watchdog: recovery succeeded");
                self.deliver("✅ <b>Service recovered successfully</b>")
                    .await;
                Ok(WatchdogVerdict::Recovered)
            }
            Err(e) => {
                tracing::warn!("Watchdog: recovery failed: {}", e);
                self.deliver(
                    "❌ <b>Failed to recover service</b>\n\nManual intervention may be required.",
                )
                .await;
                Ok(WatchdogVerdict::RecoveryFailed(e.to_string()))
            }
        }
    }
}

/// Latest sign of life: the last check, or the start of the current run
fn stall_reference(status: &RunStatus) -> Option<DateTime<Utc>> {
    match (status.last_check_at, status.service_started_at) {
        (Some(check), Some(started)) => Some(check.max(started)),
        (check, started) => check.or(started),
    }
}

async fn tick_loop(inner: Arc<Inner>, epoch: u64, schedule: Schedule, cancel: CancellationToken) {
    tracing::debug!(
        "Tick loop for run {} started, nominal period {:?}",
        epoch,
        schedule.period()
    );
    let mut target = schedule.next_after(inner.clock.now());

    loop {
        let wait = (target - inner.clock.now()).to_std().unwrap_or_default();
        tokio::select! {
            _ = tokio::time::sleep(wait) => {}
            _ = cancel.cancelled() => break,
        }
        if cancel.is_cancelled() || !inner.is_current(epoch) {
            break;
        }

        match inner.detector.check().await {
            Ok(outcome) => tracing::debug!("Scheduled check at {}: {:?}", target, outcome),
            Err(e) => tracing::warn!("Scheduled check failed: {}", e),
        }

        target = schedule.next_after(target.max(inner.clock.now()));
    }
    tracing::debug!("Tick loop for run {} cancelled", epoch);
}

async fn watchdog_loop(
    inner: Arc<Inner>,
    epoch: u64,
    period: Duration,
    cancel: CancellationToken,
) {
    loop {
        tokio::select! {
            _ = tokio::time::sleep(period) => {}
            _ = cancel.cancelled() => break,
        }
        if cancel.is_cancelled() || !inner.is_current(epoch) {
            break;
        }

        match inner.watchdog_pass().await {
            Ok(WatchdogVerdict::RecoveryFailed(e)) => {
                tracing::warn!("Watchdog recovery failed, will re-evaluate next cycle: {}", e)
            }
            Ok(verdict) => tracing::debug!("Watchdog: {:?}", verdict),
            Err(e) => tracing::warn!("Watchdog evaluation failed: {}", e),
        }
    }
    tracing::debug!("Watchdog for run {} cancelled", epoch);
}
