//! Store traits the worker and exporter are written against.
//!
//! The PostgreSQL repositories in [`crate::repositories`] are the
//! production implementations; [`crate::memory`] holds in-process ones.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use uuid::Uuid;

use inspecthub_core::result::AppResult;
use inspecthub_entity::credential::UserCredential;
use inspecthub_entity::inspection::{Inspection, InspectionSyncUpdate};
use inspecthub_entity::job::{CreateJob, Job, JobStatus};
use inspecthub_entity::sync::{CreateSyncLogEntry, SyncLogEntry};

/// Durable job records and the atomic claim protocol.
///
/// Implementations must make [`JobStore::claim_next`] a single atomic step:
/// no two callers may ever receive the same job while it is `processing`.
#[async_trait]
pub trait JobStore: Send + Sync + std::fmt::Debug + 'static {
    /// Persist a new `pending` job.
    async fn enqueue(&self, data: &CreateJob) -> AppResult<Job>;

    /// Take the next eligible job, moving it to `processing`.
    ///
    /// Eligible: `scheduled_at <= now` and either `pending`, or `failed`
    /// with `retry_count < max_retries`. Highest priority first, then
    /// earliest `scheduled_at`. Returns `None` when nothing is eligible.
    async fn claim_next(&self, worker_id: &str) -> AppResult<Option<Job>>;

    /// Record success and clear error fields.
    ///
    /// Outcome writes only apply while `worker_id` still holds the job in
    /// `processing`. Returns `false` when the lease was lost (the job was
    /// reclaimed, finished elsewhere, or does not exist) and nothing changed.
    async fn mark_completed(
        &self,
        job_id: Uuid,
        worker_id: &str,
        result: Option<&Value>,
    ) -> AppResult<bool>;

    /// Record a failed attempt.
    ///
    /// Increments `retry_count`; when it reaches `max_retries` the job is
    /// terminal (`completed_at` set), otherwise it becomes eligible again
    /// after `retry_delay_seconds`. `None` when the lease was lost.
    async fn mark_failed(
        &self,
        job_id: Uuid,
        worker_id: &str,
        message: &str,
        details: Option<&Value>,
        retry_delay_seconds: i64,
    ) -> AppResult<Option<Job>>;

    /// Record a failure that must not be retried; the job becomes terminal.
    /// `None` when the lease was lost.
    async fn mark_failed_permanently(
        &self,
        job_id: Uuid,
        worker_id: &str,
        message: &str,
        details: Option<&Value>,
    ) -> AppResult<Option<Job>>;

    /// Find a job by ID.
    async fn find_by_id(&self, job_id: Uuid) -> AppResult<Option<Job>>;

    /// Count jobs in a status.
    async fn count_by_status(&self, status: JobStatus) -> AppResult<i64>;

    /// Fail every `processing` job started before `started_before` as a
    /// lost attempt. Returns the number of jobs reclaimed.
    async fn reclaim_stale(&self, started_before: DateTime<Utc>) -> AppResult<u64>;
}

/// Append-only sync audit log.
#[async_trait]
pub trait SyncLogStore: Send + Sync + std::fmt::Debug + 'static {
    /// Append an entry.
    async fn append(&self, data: &CreateSyncLogEntry) -> AppResult<SyncLogEntry>;

    /// History for one inspection, newest first.
    async fn find_by_inspection(&self, inspection_id: Uuid) -> AppResult<Vec<SyncLogEntry>>;

    /// Failure entries recorded at or after `since`, newest first.
    async fn find_failures_since(&self, since: DateTime<Utc>) -> AppResult<Vec<SyncLogEntry>>;
}

/// Inspection lookup and sync-projection updates.
#[async_trait]
pub trait InspectionStore: Send + Sync + std::fmt::Debug + 'static {
    /// Find an inspection by ID.
    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Inspection>>;

    /// Overwrite the denormalized sync fields.
    async fn update_sync_state(&self, id: Uuid, update: &InspectionSyncUpdate) -> AppResult<()>;
}

/// Per-user delegated credentials.
#[async_trait]
pub trait CredentialStore: Send + Sync + std::fmt::Debug + 'static {
    /// Load a user's stored credential.
    async fn find_by_user(&self, user_id: Uuid) -> AppResult<Option<UserCredential>>;

    /// Insert or replace a user's credential.
    async fn save(&self, credential: &UserCredential) -> AppResult<()>;
}
