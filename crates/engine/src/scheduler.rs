use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::{watch, Mutex, RwLock};
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use common::{Error, Result, SchedulerStatus};

use crate::checker::AlarmChecker;

/// Cloneable handle to the periodic alarm check loop.
///
/// Created once at startup and shared with the chat front-end and the status
/// API. At most one loop task exists per scheduler: `start` refuses to spawn
/// a second one, and `stop` waits for the current tick to finish before
/// returning.
#[derive(Clone)]
pub struct AlarmScheduler {
    inner: Arc<Inner>,
}

struct Inner {
    checker: Arc<AlarmChecker>,
    interval: Duration,
    running: Mutex<Option<RunningLoop>>,
    is_running: AtomicBool,
    next_tick: Arc<RwLock<Option<DateTime<Utc>>>>,
}

struct RunningLoop {
    shutdown_tx: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

impl AlarmScheduler {
    pub fn new(checker: AlarmChecker, interval: Duration) -> Self {
        Self {
            inner: Arc::new(Inner {
                checker: Arc::new(checker),
                interval,
                running: Mutex::new(None),
                is_running: AtomicBool::new(false),
                next_tick: Arc::new(RwLock::new(None)),
            }),
        }
    }

    pub fn interval(&self) -> Duration {
        self.inner.interval
    }

    /// Spawn the check loop. The first tick fires one full interval after
    /// this call.
    ///
    /// Returns `Error::AlreadyRunning` (and spawns nothing) if a loop is
    /// already active.
    pub async fn start(&self) -> Result<()> {
        let mut running = self.inner.running.lock().await;
        if running.as_ref().is_some_and(|r| !r.handle.is_finished()) {
            warn!("Scheduler is already running");
            return Err(Error::AlreadyRunning);
        }

        // Published before the loop exists so `status()` never sees a
        // running scheduler without a due time.
        *self.inner.next_tick.write().await = Some(due_after(self.inner.interval));

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let handle = tokio::spawn(run_loop(
            self.inner.checker.clone(),
            self.inner.interval,
            shutdown_rx,
            self.inner.next_tick.clone(),
        ));

        *running = Some(RunningLoop {
            shutdown_tx,
            handle,
        });
        self.inner.is_running.store(true, Ordering::SeqCst);
        info!(interval_secs = self.inner.interval.as_secs(), "Scheduler started");
        Ok(())
    }

    /// Stop the loop and wait for an in-progress tick to finish.
    /// Stopping an already stopped scheduler is a no-op.
    pub async fn stop(&self) {
        let mut running = self.inner.running.lock().await;
        let Some(active) = running.take() else {
            debug!("Scheduler already stopped");
            return;
        };

        self.inner.is_running.store(false, Ordering::SeqCst);
        let _ = active.shutdown_tx.send(true);
        if let Err(e) = active.handle.await {
            error!(error = %e, "Scheduler loop ended abnormally");
        }

        *self.inner.next_tick.write().await = None;
        info!("Scheduler stopped");
    }

    pub async fn status(&self) -> SchedulerStatus {
        let running = self.inner.is_running.load(Ordering::SeqCst);
        SchedulerStatus {
            running,
            next_tick: if running { *self.inner.next_tick.read().await } else { None },
            scheduled_jobs: usize::from(running),
        }
    }
}

async fn run_loop(
    checker: Arc<AlarmChecker>,
    period: Duration,
    mut shutdown_rx: watch::Receiver<bool>,
    next_tick: Arc<RwLock<Option<DateTime<Utc>>>>,
) {
    let mut ticker = interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;
            _ = shutdown_rx.changed() => break,
            _ = ticker.tick() => {}
        }

        // Each tick runs in its own task so a panic ends that tick only.
        let tick_checker = checker.clone();
        match tokio::spawn(async move { tick_checker.check_alarms().await }).await {
            Ok(report) => debug!(?report, "Tick finished"),
            Err(e) => error!(error = %e, "Alarm check tick aborted"),
        }

        *next_tick.write().await = Some(due_after(period));
    }

    debug!("Scheduler loop exited");
}

fn due_after(period: Duration) -> DateTime<Utc> {
    Utc::now() + chrono::Duration::from_std(period).unwrap_or_else(|_| chrono::Duration::zero())
}
