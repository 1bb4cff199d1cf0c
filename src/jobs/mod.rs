//! Scheduled Jobs
//!
//! Background jobs for periodic maintenance tasks.
//! Currently this is the lock-expiry sweep, which reclaims entries whose
//! holder crashed or forgot to release.

use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};

use crate::domain::CancellationSignal;
use crate::locks::LockManager;

// =========================================================================
// Lock Expiry Sweep Job
// =========================================================================

/// Remove expired locks from the table
pub fn sweep_expired_locks(locks: &LockManager) -> usize {
    let removed = locks.sweep_expired();

    if removed > 0 {
        tracing::debug!(
            locks_removed = removed,
            remaining = locks.active_locks(),
            "Swept expired locks"
        );
    }

    removed
}

// =========================================================================
// Job Scheduler
// =========================================================================

/// Configuration for job scheduler
#[derive(Debug, Clone)]
pub struct JobSchedulerConfig {
    /// Interval for the lock expiry sweep (default: 100ms)
    pub lock_sweep_interval: Duration,
}

impl Default for JobSchedulerConfig {
    fn default() -> Self {
        Self {
            lock_sweep_interval: Duration::from_millis(100),
        }
    }
}

/// Job Scheduler - runs periodic maintenance tasks
pub struct JobScheduler {
    locks: Arc<LockManager>,
    config: JobSchedulerConfig,
}

impl JobScheduler {
    /// Create a new job scheduler
    pub fn new(locks: Arc<LockManager>) -> Self {
        Self {
            locks,
            config: JobSchedulerConfig::default(),
        }
    }

    /// Create with custom configuration
    pub fn with_config(locks: Arc<LockManager>, config: JobSchedulerConfig) -> Self {
        Self { locks, config }
    }

    /// Start the job scheduler in the background.
    /// The loop exits once `shutdown` is cancelled.
    pub fn start(self, shutdown: CancellationSignal) -> SchedulerHandle {
        let signal = shutdown.clone();
        let task = tokio::spawn(async move {
            self.run(signal).await;
        });

        SchedulerHandle { shutdown, task }
    }

    /// Run the scheduler loop
    async fn run(&self, shutdown: CancellationSignal) {
        tracing::info!(
            sweep_interval_ms = self.config.lock_sweep_interval.as_millis() as u64,
            "Job scheduler started"
        );

        let mut sweep_interval = interval(self.config.lock_sweep_interval);
        sweep_interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = sweep_interval.tick() => {
                    sweep_expired_locks(&self.locks);
                }
            }
        }

        tracing::info!("Job scheduler stopped");
    }

    /// Run all maintenance jobs once (for manual trigger or testing)
    pub fn run_all_once(&self) -> MaintenanceReport {
        MaintenanceReport {
            expired_locks_removed: sweep_expired_locks(&self.locks),
            completed_at: Utc::now(),
        }
    }
}

/// Handle to a running scheduler
#[derive(Debug)]
pub struct SchedulerHandle {
    shutdown: CancellationSignal,
    task: JoinHandle<()>,
}

impl SchedulerHandle {
    /// Stop the scheduler and wait for its loop to exit
    pub async fn shutdown(self) {
        self.shutdown.cancel();
        if let Err(e) = self.task.await {
            tracing::error!(error = %e, "Job scheduler task failed");
        }
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

/// Report from running maintenance jobs
#[derive(Debug, Clone, Default)]
pub struct MaintenanceReport {
    pub expired_locks_removed: usize,
    pub completed_at: DateTime<Utc>,
}

// =========================================================================
// Tests
// =========================================================================
