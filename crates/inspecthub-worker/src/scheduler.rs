//! Cron scheduler for periodic queue maintenance.

use std::sync::Arc;
use std::time::Duration;

use tokio_cron_scheduler::{Job as CronJob, JobScheduler};
use tracing;

use inspecthub_core::error::{AppError, ErrorKind};
use inspecthub_core::result::AppResult;

use crate::queue::JobQueue;

/// Cron-based scheduler for periodic background tasks
pub struct CronScheduler {
    /// The underlying job scheduler
    scheduler: JobScheduler,
    /// Job queue the tasks operate on
    queue: Arc<JobQueue>,
}

impl std::fmt::Debug for CronScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CronScheduler").finish()
    }
}

fn scheduler_error(context: &str, err: impl std::fmt::Display) -> AppError {
    AppError::new(ErrorKind::Internal, format!("{context}: {err}"))
}

impl CronScheduler {
    /// Create a new cron scheduler
    pub async fn new(queue: Arc<JobQueue>) -> AppResult<Self> {
        let scheduler = JobScheduler::new()
            .await
            .map_err(|e| scheduler_error("Failed to create scheduler", e))?;

        Ok(Self { scheduler, queue })
    }

    /// Start the scheduler
    pub async fn start(&self) -> AppResult<()> {
        self.scheduler
            .start()
            .await
            .map_err(|e| scheduler_error("Failed to start scheduler", e))?;

        tracing::info!("Cron scheduler started");
        Ok(())
    }

    /// Shutdown the scheduler
    pub async fn shutdown(&mut self) -> AppResult<()> {
        self.scheduler
            .shutdown()
            .await
            .map_err(|e| scheduler_error("Failed to shutdown scheduler", e))?;

        tracing::info!("Cron scheduler shut down");
        Ok(())
    }

    /// Stale-job sweep: jobs left in `processing` longer than `stale_after`
    /// (a worker crashed or lost its connection mid-attempt) are failed as a
    /// lost attempt so they re-enter the retry cycle.
    pub async fn register_stale_job_sweep(
        &self,
        cron: &str,
        stale_after: Duration,
    ) -> AppResult<()> {
        let queue = Arc::clone(&self.queue);
        let job = CronJob::new_async(cron, move |_uuid, _lock| {
            let queue = Arc::clone(&queue);
            Box::pin(async move {
                tracing::debug!("Running stale job sweep");
                if let Err(e) = queue.reclaim_stale(stale_after).await {
                    tracing::error!(error = %e, "Stale job sweep failed");
                }
            })
        })
        .map_err(|e| scheduler_error("Failed to create stale job sweep schedule", e))?;

        self.scheduler
            .add(job)
            .await
            .map_err(|e| scheduler_error("Failed to add stale job sweep schedule", e))?;

        tracing::info!(
            cron = %cron,
            stale_after_seconds = stale_after.as_secs(),
            "Registered: stale job sweep"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use inspecthub_core::config::WorkerConfig;
    use inspecthub_database::memory::MemoryJobStore;

    #[tokio::test(flavor = "multi_thread")]
    async fn test_rejects_invalid_cron() {
        let store = Arc::new(MemoryJobStore::new());
        let queue = Arc::new(JobQueue::new(store, "w", &WorkerConfig::default()));
        let scheduler = CronScheduler::new(queue).await.unwrap();

        assert!(scheduler
            .register_stale_job_sweep("not a cron", Duration::from_secs(60))
            .await
            .is_err());
        assert!(scheduler
            .register_stale_job_sweep("0 */5 * * * *", Duration::from_secs(60))
            .await
            .is_ok());
    }
}
