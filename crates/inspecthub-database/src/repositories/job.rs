//! Job repository: PostgreSQL job records and the skip-locked claim.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::PgPool;
use uuid::Uuid;

use inspecthub_core::error::{AppError, ErrorKind};
use inspecthub_core::result::AppResult;
use inspecthub_entity::job::{CreateJob, Job, JobStatus};

use crate::store::JobStore;

/// Claims the best eligible row in one statement. The inner `SELECT ...
/// FOR UPDATE SKIP LOCKED` row-locks the candidate and makes concurrent
/// claimers skip it; the outer `UPDATE` flips it to `processing` before the
/// lock is released at commit.
const CLAIM_NEXT_SQL: &str = "\
    UPDATE jobs SET status = 'processing', started_at = NOW(), locked_by = $1, updated_at = NOW() \
    WHERE id = ( \
        SELECT id FROM jobs \
        WHERE scheduled_at <= NOW() \
          AND (status = 'pending' OR (status = 'failed' AND retry_count < max_retries)) \
        ORDER BY priority DESC, scheduled_at ASC, created_at ASC \
        FOR UPDATE SKIP LOCKED \
        LIMIT 1 \
    ) RETURNING *";

/// Repository for background job persistence and queue operations.
#[derive(Debug, Clone)]
pub struct JobRepository {
    pool: PgPool,
}

impl JobRepository {
    /// Create a new job repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Jobs that are terminally failed, newest first.
    pub async fn find_terminal_failures(&self, limit: i64) -> AppResult<Vec<Job>> {
        sqlx::query_as::<_, Job>(
            "SELECT * FROM jobs WHERE status = 'failed' AND retry_count >= max_retries \
             ORDER BY updated_at DESC LIMIT $1",
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to list failed jobs", e))
    }
}

#[async_trait]
impl JobStore for JobRepository {
    async fn enqueue(&self, data: &CreateJob) -> AppResult<Job> {
        sqlx::query_as::<_, Job>(
            "INSERT INTO jobs (job_type, payload, priority, max_retries, scheduled_at) \
             VALUES ($1, $2, $3, $4, $5) RETURNING *",
        )
        .bind(&data.job_type)
        .bind(&data.payload)
        .bind(data.priority)
        .bind(data.max_retries)
        .bind(data.scheduled_at)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to enqueue job", e))
    }

    async fn claim_next(&self, worker_id: &str) -> AppResult<Option<Job>> {
        sqlx::query_as::<_, Job>(CLAIM_NEXT_SQL)
            .bind(worker_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to claim job", e))
    }

    async fn mark_completed(
        &self,
        job_id: Uuid,
        worker_id: &str,
        result: Option<&Value>,
    ) -> AppResult<bool> {
        let done = sqlx::query(
            "UPDATE jobs SET status = 'completed', result = $3, completed_at = NOW(), \
             error_message = NULL, error_details = NULL, locked_by = NULL, updated_at = NOW() \
             WHERE id = $1 AND status = 'processing' AND locked_by = $2",
        )
        .bind(job_id)
        .bind(worker_id)
        .bind(result)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to complete job", e))?;

        Ok(done.rows_affected() > 0)
    }

    async fn mark_failed(
        &self,
        job_id: Uuid,
        worker_id: &str,
        message: &str,
        details: Option<&Value>,
        retry_delay_seconds: i64,
    ) -> AppResult<Option<Job>> {
        // Right-hand sides see the pre-update row, hence `retry_count + 1`.
        sqlx::query_as::<_, Job>(
            "UPDATE jobs SET status = 'failed', retry_count = retry_count + 1, \
             error_message = $3, error_details = $4, locked_by = NULL, \
             completed_at = CASE WHEN retry_count + 1 >= max_retries THEN NOW() ELSE NULL END, \
             scheduled_at = CASE WHEN retry_count + 1 >= max_retries THEN scheduled_at \
                            ELSE NOW() + ($5::BIGINT * INTERVAL '1 second') END, \
             updated_at = NOW() \
             WHERE id = $1 AND status = 'processing' AND locked_by = $2 RETURNING *",
        )
        .bind(job_id)
        .bind(worker_id)
        .bind(message)
        .bind(details)
        .bind(retry_delay_seconds)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to mark job as failed", e))
    }

    async fn mark_failed_permanently(
        &self,
        job_id: Uuid,
        worker_id: &str,
        message: &str,
        details: Option<&Value>,
    ) -> AppResult<Option<Job>> {
        sqlx::query_as::<_, Job>(
            "UPDATE jobs SET status = 'failed', \
             retry_count = GREATEST(retry_count + 1, max_retries), \
             error_message = $3, error_details = $4, locked_by = NULL, \
             completed_at = NOW(), updated_at = NOW() \
             WHERE id = $1 AND status = 'processing' AND locked_by = $2 RETURNING *",
        )
        .bind(job_id)
        .bind(worker_id)
        .bind(message)
        .bind(details)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to mark job as failed", e))
    }

    async fn find_by_id(&self, job_id: Uuid) -> AppResult<Option<Job>> {
        sqlx::query_as::<_, Job>("SELECT * FROM jobs WHERE id = $1")
            .bind(job_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to find job", e))
    }

    async fn count_by_status(&self, status: JobStatus) -> AppResult<i64> {
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM jobs WHERE status = $1")
            .bind(status)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to count jobs", e))
    }

    async fn reclaim_stale(&self, started_before: DateTime<Utc>) -> AppResult<u64> {
        let result = sqlx::query(
            "UPDATE jobs SET status = 'failed', retry_count = retry_count + 1, \
             error_message = 'Lease expired: no outcome recorded by worker', \
             error_details = jsonb_build_object('locked_by', locked_by, 'started_at', started_at), \
             locked_by = NULL, \
             completed_at = CASE WHEN retry_count + 1 >= max_retries THEN NOW() ELSE NULL END, \
             updated_at = NOW() \
             WHERE status = 'processing' AND started_at < $1",
        )
        .bind(started_before)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to reclaim stale jobs", e)
        })?;
        Ok(result.rows_affected())
    }
}
