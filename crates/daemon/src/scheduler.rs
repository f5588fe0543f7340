//! Attachment cleanup scheduler.
//!
//! Ticks on the configured interval until shutdown is signalled. Cleanup
//! semantics are undefined, so a cycle only reports that nothing was done.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Notify;
use tokio::time;
use tracing::{debug, info, warn};

use elog_core::config::CleanupConfig;

/// Aggregate statistics across cleanup cycles.
#[derive(Default)]
pub struct SchedulerStats {
    pub total_cycles: AtomicU64,
    pub skipped_cycles: AtomicU64,
}

/// Periodic attachment cleanup task.
///
/// If a cycle is still running when the next tick fires, that tick is
/// skipped rather than queued.
pub struct CleanupScheduler {
    interval: Duration,
    unused_after: Duration,
    running: Arc<AtomicBool>,
    stats: Arc<SchedulerStats>,
}

impl CleanupScheduler {
    pub fn new(config: &CleanupConfig) -> Self {
        Self {
            interval: Duration::from_secs(config.interval_secs),
            unused_after: Duration::from_secs(config.unused_after_mins.saturating_mul(60)),
            running: Arc::new(AtomicBool::new(false)),
            stats: Arc::new(SchedulerStats::default()),
        }
    }

    pub fn stats(&self) -> Arc<SchedulerStats> {
        self.stats.clone()
    }

    /// Main loop. Returns once `shutdown` is notified.
    pub async fn run(&self, shutdown: Arc<Notify>) {
        info!(
            interval_secs = self.interval.as_secs(),
            unused_after_secs = self.unused_after.as_secs(),
            "cleanup scheduler started"
        );

        let mut interval = time::interval(self.interval);
        // The first tick fires immediately; give the service time to start.
        interval.tick().await;

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    self.maybe_run_cycle().await;
                }
                _ = shutdown.notified() => {
                    info!("cleanup scheduler stopping");
                    break;
                }
            }
        }
    }

    async fn maybe_run_cycle(&self) {
        if self
            .running
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            self.stats.skipped_cycles.fetch_add(1, Ordering::SeqCst);
            warn!("skipping cleanup cycle: previous cycle still running");
            return;
        }

        let cycle = self.stats.total_cycles.fetch_add(1, Ordering::SeqCst) + 1;
        debug!(cycle, "starting cleanup cycle");
        self.run_cycle(cycle);

        self.running.store(false, Ordering::SeqCst);
    }

    fn run_cycle(&self, cycle: u64) {
        warn!(
            cycle,
            unused_after_secs = self.unused_after.as_secs(),
            "attachment cleanup is not implemented; nothing was removed"
        );
    }
}
