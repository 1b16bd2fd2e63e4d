//! Periodic automatic backup.
//!
//! # Responsibility
//! - Run a backup job at a fixed interval on one background thread.
//! - Expose start/stop/interval controls and a status view.
//!
//! # Invariants
//! - At most one worker thread is alive at any time.
//! - `start` while running restarts the timer; `stop` is idempotent.
//! - A disabled scheduler (short-lived deployments) never spawns a thread.
//! - `stop` returns only after the worker has exited.

use log::{debug, info, warn};
use parking_lot::Mutex;
use serde::Serialize;
use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// Default cadence: once a day.
pub const DEFAULT_INTERVAL: Duration = Duration::from_millis(24 * 60 * 60 * 1000);

/// Job invoked on every tick.
pub type ScheduledJob = Arc<dyn Fn() + Send + Sync>;

/// Scheduler state reported to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AutoBackupStatus {
    pub running: bool,
    pub interval_ms: u64,
    /// `false` when the deployment cannot keep an in-process timer alive.
    pub enabled: bool,
}

struct Worker {
    stop_tx: Sender<()>,
    handle: JoinHandle<()>,
}

struct SchedulerState {
    interval: Duration,
    worker: Option<Worker>,
}

/// Fixed-interval runner for the backup job.
pub struct AutoBackup {
    job: ScheduledJob,
    enabled: bool,
    state: Mutex<SchedulerState>,
}

impl AutoBackup {
    /// Creates a stopped scheduler.
    ///
    /// `enabled = false` turns every `start` into a logged no-op.
    pub fn new(job: ScheduledJob, interval: Duration, enabled: bool) -> Self {
        Self {
            job,
            enabled,
            state: Mutex::new(SchedulerState {
                interval: sanitize_interval(interval),
                worker: None,
            }),
        }
    }

    /// Starts ticking at the current interval, restarting any running timer.
    ///
    /// Returns whether a worker is running afterwards.
    pub fn start(&self) -> bool {
        let mut state = self.state.lock();
        self.restart_locked(&mut state)
    }

    /// Changes the interval and restarts the timer.
    pub fn set_interval(&self, interval: Duration) -> bool {
        let mut state = self.state.lock();
        state.interval = sanitize_interval(interval);
        self.restart_locked(&mut state)
    }

    /// Cancels the pending timer if any.
    pub fn stop(&self) {
        let mut state = self.state.lock();
        if stop_worker(&mut state) {
            info!("event=auto_backup_stop module=schedule status=ok");
        }
    }

    pub fn status(&self) -> AutoBackupStatus {
        let state = self.state.lock();
        AutoBackupStatus {
            running: state.worker.is_some(),
            interval_ms: u64::try_from(state.interval.as_millis()).unwrap_or(u64::MAX),
            enabled: self.enabled,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    fn restart_locked(&self, state: &mut SchedulerState) -> bool {
        stop_worker(state);
        if !self.enabled {
            info!(
                "event=auto_backup_start module=schedule status=skipped reason=short_lived_deployment"
            );
            return false;
        }

        let interval = state.interval;
        let job = Arc::clone(&self.job);
        let (stop_tx, stop_rx) = mpsc::channel::<()>();
        let spawned = thread::Builder::new()
            .name("coursekeep-auto-backup".to_string())
            .spawn(move || loop {
                match stop_rx.recv_timeout(interval) {
                    Err(RecvTimeoutError::Timeout) => {
                        debug!("event=auto_backup_tick module=schedule status=start");
                        job();
                    }
                    Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                }
            });

        match spawned {
            Ok(handle) => {
                state.worker = Some(Worker { stop_tx, handle });
                info!(
                    "event=auto_backup_start module=schedule status=ok interval_ms={}",
                    interval.as_millis()
                );
                true
            }
            Err(err) => {
                warn!("event=auto_backup_start module=schedule status=error error={err}");
                false
            }
        }
    }
}

impl Drop for AutoBackup {
    fn drop(&mut self) {
        stop_worker(&mut self.state.lock());
    }
}

fn stop_worker(state: &mut SchedulerState) -> bool {
    let Some(worker) = state.worker.take() else {
        return false;
    };
    let _ = worker.stop_tx.send(());
    if worker.handle.join().is_err() {
        warn!("event=auto_backup_stop module=schedule status=error reason=worker_panicked");
    }
    true
}

fn sanitize_interval(interval: Duration) -> Duration {
    if interval.is_zero() {
        Duration::from_millis(1)
    } else {
        interval
    }
}
