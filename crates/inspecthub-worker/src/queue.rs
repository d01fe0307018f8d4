//! Job queue abstraction for enqueuing and claiming background jobs.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing;
use uuid::Uuid;

use inspecthub_core::config::WorkerConfig;
use inspecthub_core::error::AppError;
use inspecthub_core::result::AppResult;
use inspecthub_core::traits::clock::{Clock, SystemClock};
use inspecthub_database::JobStore;
use inspecthub_entity::job::{CreateJob, Job, JobStatus};

use crate::retry::RetryPolicy;

/// Parameters for creating a new job
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnqueueRequest {
    /// Type of job (e.g., "sharepoint_export")
    pub job_type: String,
    /// Job payload as JSON
    pub payload: Value,
    /// Priority, higher first (default 0)
    pub priority: Option<i32>,
    /// Attempts allowed (default from worker settings)
    pub max_retries: Option<i32>,
    /// Earliest claim time (default now)
    pub scheduled_at: Option<DateTime<Utc>>,
}

impl EnqueueRequest {
    /// Request with every optional field defaulted.
    pub fn new(job_type: impl Into<String>, payload: Value) -> Self {
        Self {
            job_type: job_type.into(),
            payload,
            priority: None,
            max_retries: None,
            scheduled_at: None,
        }
    }

    /// Set the priority.
    pub fn priority(mut self, priority: i32) -> Self {
        self.priority = Some(priority);
        self
    }

    /// Set the retry budget.
    pub fn max_retries(mut self, max_retries: i32) -> Self {
        self.max_retries = Some(max_retries);
        self
    }

    /// Defer the first attempt.
    pub fn scheduled_at(mut self, at: DateTime<Utc>) -> Self {
        self.scheduled_at = Some(at);
        self
    }
}

/// Job queue for enqueuing and claiming work
#[derive(Debug, Clone)]
pub struct JobQueue {
    /// Durable job records
    store: Arc<dyn JobStore>,
    /// Worker identifier for claiming jobs
    worker_id: String,
    /// Backoff applied to retryable failures
    retry: RetryPolicy,
    /// Retry budget for jobs enqueued without one
    default_max_retries: i32,
    clock: Arc<dyn Clock>,
}

impl JobQueue {
    /// Create a new job queue
    pub fn new(
        store: Arc<dyn JobStore>,
        worker_id: impl Into<String>,
        config: &WorkerConfig,
    ) -> Self {
        Self {
            store,
            worker_id: worker_id.into(),
            retry: RetryPolicy::from_config(config),
            default_max_retries: config.default_max_retries,
            clock: Arc::new(SystemClock),
        }
    }

    /// Replace the retry policy
    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Read time from `clock` instead of the system clock
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// This queue's worker identifier
    pub fn worker_id(&self) -> &str {
        &self.worker_id
    }

    /// Enqueue a new job
    pub async fn enqueue(&self, request: EnqueueRequest) -> AppResult<Job> {
        if request.job_type.trim().is_empty() {
            return Err(AppError::validation("Job type must not be empty"));
        }

        let max_retries = request.max_retries.unwrap_or(self.default_max_retries);
        if max_retries < 1 {
            return Err(AppError::validation(format!(
                "max_retries must be at least 1, got {max_retries}"
            )));
        }

        let data = CreateJob {
            job_type: request.job_type,
            payload: request.payload,
            priority: request.priority.unwrap_or(0),
            max_retries,
            scheduled_at: request.scheduled_at.unwrap_or_else(|| self.clock.now()),
        };

        let job = self.store.enqueue(&data).await?;

        tracing::debug!(
            job_id = %job.id,
            job_type = %job.job_type,
            priority = job.priority,
            "Enqueued job"
        );

        Ok(job)
    }

    /// Claim the next eligible job for this worker
    pub async fn claim_next(&self) -> AppResult<Option<Job>> {
        let job = self.store.claim_next(&self.worker_id).await?;

        if let Some(job) = &job {
            tracing::debug!(
                job_id = %job.id,
                job_type = %job.job_type,
                worker_id = %self.worker_id,
                "Claimed job"
            );
        }

        Ok(job)
    }

    /// Mark a job as completed successfully
    ///
    /// Returns `false` when this worker no longer holds the job (it was
    /// reclaimed as stale); nothing is written in that case.
    pub async fn complete(&self, job_id: Uuid, result: Option<&Value>) -> AppResult<bool> {
        let recorded = self
            .store
            .mark_completed(job_id, &self.worker_id, result)
            .await?;
        if recorded {
            tracing::debug!(job_id = %job_id, "Job completed");
        }
        Ok(recorded)
    }

    /// Record a retryable failure of `job`'s current attempt
    ///
    /// `None` when this worker no longer holds the job.
    pub async fn fail(
        &self,
        job: &Job,
        message: &str,
        details: Option<&Value>,
    ) -> AppResult<Option<Job>> {
        let delay = self.retry.delay_for(job.retry_count + 1);
        let delay_seconds = i64::try_from(delay.as_secs()).unwrap_or(i64::MAX);

        let Some(updated) = self
            .store
            .mark_failed(job.id, &self.worker_id, message, details, delay_seconds)
            .await?
        else {
            return Ok(None);
        };

        if updated.retries_exhausted() {
            tracing::warn!(
                job_id = %job.id,
                retry_count = updated.retry_count,
                "Job retries exhausted"
            );
        } else {
            tracing::debug!(
                job_id = %job.id,
                retry_count = updated.retry_count,
                retry_in_seconds = delay_seconds,
                "Job scheduled for retry"
            );
        }

        Ok(Some(updated))
    }

    /// Record a failure that must not be retried
    ///
    /// `None` when this worker no longer holds the job.
    pub async fn fail_permanently(
        &self,
        job_id: Uuid,
        message: &str,
        details: Option<&Value>,
    ) -> AppResult<Option<Job>> {
        let updated = self
            .store
            .mark_failed_permanently(job_id, &self.worker_id, message, details)
            .await?;
        if updated.is_some() {
            tracing::debug!(job_id = %job_id, "Job failed permanently");
        }
        Ok(updated)
    }

    /// Look up a job
    pub async fn find(&self, job_id: Uuid) -> AppResult<Option<Job>> {
        self.store.find_by_id(job_id).await
    }

    /// Reclaim jobs stuck in `processing` for longer than `stale_after`
    pub async fn reclaim_stale(&self, stale_after: std::time::Duration) -> AppResult<u64> {
        let age = chrono::Duration::from_std(stale_after)
            .map_err(|e| AppError::validation(format!("Invalid stale-job age: {e}")))?;
        let cutoff = self.clock.now() - age;

        let reclaimed = self.store.reclaim_stale(cutoff).await?;
        if reclaimed > 0 {
            tracing::warn!(reclaimed, cutoff = %cutoff, "Reclaimed stale jobs");
        }
        Ok(reclaimed)
    }

    /// Get queue statistics
    pub async fn stats(&self) -> AppResult<QueueStats> {
        Ok(QueueStats {
            pending: self.store.count_by_status(JobStatus::Pending).await?,
            processing: self.store.count_by_status(JobStatus::Processing).await?,
            completed: self.store.count_by_status(JobStatus::Completed).await?,
            failed: self.store.count_by_status(JobStatus::Failed).await?,
            worker_id: self.worker_id.clone(),
        })
    }
}

/// Queue statistics
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueStats {
    /// Number of pending jobs
    pub pending: i64,
    /// Number of jobs being processed
    pub processing: i64,
    /// Number of completed jobs
    pub completed: i64,
    /// Number of failed jobs (retryable and terminal)
    pub failed: i64,
    /// Current worker identifier
    pub worker_id: String,
}
