//! Worker runner: claims jobs and executes them.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::{Semaphore, watch};
use tokio::time;
use tracing;

use inspecthub_core::config::WorkerConfig;
use inspecthub_core::result::AppResult;
use inspecthub_entity::job::Job;

use crate::executor::JobExecutor;
use crate::queue::JobQueue;

/// Counts from one [`WorkerRunner::process_batch`] call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchSummary {
    /// Jobs claimed
    pub processed: usize,
    /// Jobs recorded as completed
    pub successful: usize,
    /// Jobs that failed (or whose outcome could not be recorded)
    pub failed: usize,
    /// Jobs reclaimed by another worker before their outcome was recorded
    #[serde(default)]
    pub lease_lost: usize,
}

/// How one claimed job ended, from this worker's point of view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum JobOutcome {
    Completed,
    Failed,
    LeaseLost,
}

/// Main worker runner that claims and executes jobs
#[derive(Debug)]
pub struct WorkerRunner {
    /// Job queue for claiming
    queue: Arc<JobQueue>,
    /// Job executor for dispatching
    executor: Arc<JobExecutor>,
    /// Worker configuration
    config: WorkerConfig,
}

impl WorkerRunner {
    /// Create a new worker runner
    pub fn new(queue: Arc<JobQueue>, executor: Arc<JobExecutor>, config: WorkerConfig) -> Self {
        Self {
            queue,
            executor,
            config,
        }
    }

    /// Claim and execute up to `max_jobs` jobs one after another.
    ///
    /// Stops early once nothing is eligible. Handler failures are recorded
    /// on the job and counted; only a failing claim aborts the batch.
    pub async fn process_batch(&self, max_jobs: usize) -> AppResult<BatchSummary> {
        let mut summary = BatchSummary::default();

        for _ in 0..max_jobs {
            let Some(job) = self.queue.claim_next().await? else {
                break;
            };

            summary.processed += 1;
            match execute_job(&self.queue, &self.executor, job).await {
                JobOutcome::Completed => summary.successful += 1,
                JobOutcome::Failed => summary.failed += 1,
                JobOutcome::LeaseLost => summary.lease_lost += 1,
            }
        }

        tracing::info!(
            processed = summary.processed,
            successful = summary.successful,
            failed = summary.failed,
            lease_lost = summary.lease_lost,
            worker_id = %self.queue.worker_id(),
            "Batch finished"
        );

        Ok(summary)
    }

    /// Start the worker runner; runs until the shutdown signal is received
    ///
    /// At most `concurrency` jobs run at once. On shutdown no further jobs
    /// are claimed and in-flight ones get `shutdown_grace_seconds` to finish.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        let concurrency = self.config.concurrency.max(1);
        tracing::info!(
            worker_id = %self.queue.worker_id(),
            concurrency,
            poll_interval_seconds = self.config.poll_interval_seconds,
            "Worker started"
        );

        let semaphore = Arc::new(Semaphore::new(concurrency));
        let poll_interval = Duration::from_secs(self.config.poll_interval_seconds);

        loop {
            if *shutdown.borrow() {
                break;
            }

            let permit = tokio::select! {
                permit = semaphore.clone().acquire_owned() => match permit {
                    Ok(permit) => permit,
                    Err(_) => break,
                },
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    continue;
                }
            };

            match self.queue.claim_next().await {
                Ok(Some(job)) => {
                    let queue = Arc::clone(&self.queue);
                    let executor = Arc::clone(&self.executor);
                    tokio::spawn(async move {
                        let _permit = permit;
                        execute_job(&queue, &executor, job).await;
                    });
                    continue;
                }
                Ok(None) => {
                    drop(permit);
                    tracing::trace!("No jobs available");
                }
                Err(e) => {
                    drop(permit);
                    tracing::error!(error = %e, "Failed to claim job");
                }
            }

            tokio::select! {
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
                _ = time::sleep(poll_interval) => {}
            }
        }

        tracing::info!(
            worker_id = %self.queue.worker_id(),
            "Worker waiting for in-flight jobs to complete"
        );

        let permits = u32::try_from(concurrency).unwrap_or(u32::MAX);
        let grace = Duration::from_secs(self.config.shutdown_grace_seconds);
        if time::timeout(grace, semaphore.acquire_many(permits)).await.is_err() {
            tracing::warn!(
                grace_seconds = self.config.shutdown_grace_seconds,
                "In-flight jobs still running after grace period; they will be reclaimed as stale"
            );
        }

        tracing::info!(worker_id = %self.queue.worker_id(), "Worker shut down");
    }
}

/// Run one claimed job and record its outcome.
///
/// A write that finds the job no longer held by this worker means the
/// stale-job sweep handed it elsewhere; the late outcome is dropped.
async fn execute_job(queue: &JobQueue, executor: &JobExecutor, job: Job) -> JobOutcome {
    let recorded = match executor.execute(&job).await {
        Ok(result) => match queue.complete(job.id, result.as_ref()).await {
            Ok(true) => {
                tracing::info!(job_id = %job.id, job_type = %job.job_type, "Job completed");
                return JobOutcome::Completed;
            }
            Ok(false) => false,
            Err(e) => {
                tracing::error!(job_id = %job.id, error = %e, "Failed to mark job as completed");
                return JobOutcome::Failed;
            }
        },
        Err(err) if err.is_retryable() => {
            tracing::warn!(
                job_id = %job.id,
                job_type = %job.job_type,
                attempt = job.retry_count + 1,
                max_retries = job.max_retries,
                error = %err,
                "Job failed (transient)"
            );
            match queue.fail(&job, err.message(), err.details()).await {
                Ok(updated) => updated.is_some(),
                Err(e) => {
                    tracing::error!(job_id = %job.id, error = %e, "Failed to mark job as failed");
                    true
                }
            }
        }
        Err(err) => {
            tracing::error!(
                job_id = %job.id,
                job_type = %job.job_type,
                error = %err,
                "Job failed permanently"
            );
            match queue
                .fail_permanently(job.id, err.message(), err.details())
                .await
            {
                Ok(updated) => updated.is_some(),
                Err(e) => {
                    tracing::error!(job_id = %job.id, error = %e, "Failed to mark job as failed");
                    true
                }
            }
        }
    };

    if recorded {
        JobOutcome::Failed
    } else {
        tracing::warn!(
            job_id = %job.id,
            worker_id = %queue.worker_id(),
            "Lease lost before outcome was recorded; job now belongs to another worker"
        );
        JobOutcome::LeaseLost
    }
}
