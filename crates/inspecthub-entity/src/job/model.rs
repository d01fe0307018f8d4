//! Job entity model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use super::status::JobStatus;

/// A unit of deferred, retryable work.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Job {
    /// Unique job identifier.
    pub id: Uuid,
    /// Handler selector (e.g., `"sharepoint_export"`).
    pub job_type: String,
    /// Handler-specific payload (JSON).
    pub payload: serde_json::Value,
    /// Current job status.
    pub status: JobStatus,
    /// Higher values are claimed first.
    pub priority: i32,
    /// Earliest instant at which the job may be claimed.
    pub scheduled_at: DateTime<Utc>,
    /// When the current (or last) attempt started.
    pub started_at: Option<DateTime<Utc>>,
    /// Set on success and on terminal failure.
    pub completed_at: Option<DateTime<Utc>>,
    /// Number of failed attempts so far.
    pub retry_count: i32,
    /// Attempts allowed before the job becomes terminal.
    pub max_retries: i32,
    /// Last failure message.
    pub error_message: Option<String>,
    /// Structured detail attached to the last failure.
    pub error_details: Option<serde_json::Value>,
    /// Handler output on success.
    pub result: Option<serde_json::Value>,
    /// Worker currently owning the job.
    pub locked_by: Option<String>,
    /// When the job was created.
    pub created_at: DateTime<Utc>,
    /// When the job was last updated.
    pub updated_at: DateTime<Utc>,
}

impl Job {
    /// Whether the retry budget is spent.
    pub fn retries_exhausted(&self) -> bool {
        self.retry_count >= self.max_retries
    }

    /// Whether the job will never be claimed again.
    pub fn is_terminal(&self) -> bool {
        match self.status {
            JobStatus::Completed => true,
            JobStatus::Failed => self.retries_exhausted(),
            JobStatus::Pending | JobStatus::Processing => false,
        }
    }

    /// Whether the claim predicate admits this job at `now`.
    pub fn is_claimable(&self, now: DateTime<Utc>) -> bool {
        if self.scheduled_at > now {
            return false;
        }
        match self.status {
            JobStatus::Pending => true,
            JobStatus::Failed => !self.retries_exhausted(),
            JobStatus::Processing | JobStatus::Completed => false,
        }
    }
}

/// Data required to create a new job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateJob {
    /// Handler selector.
    pub job_type: String,
    /// Handler-specific payload.
    pub payload: serde_json::Value,
    /// Priority (higher first).
    pub priority: i32,
    /// Attempts allowed.
    pub max_retries: i32,
    /// Earliest claim time.
    pub scheduled_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn job(status: JobStatus, retry_count: i32, max_retries: i32) -> Job {
        let now = Utc::now();
        Job {
            id: Uuid::new_v4(),
            job_type: "sharepoint_export".to_string(),
            payload: serde_json::json!({}),
            status,
            priority: 0,
            scheduled_at: now,
            started_at: None,
            completed_at: None,
            retry_count,
            max_retries,
            error_message: None,
            error_details: None,
            result: None,
            locked_by: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_failed_with_budget_is_claimable() {
        let j = job(JobStatus::Failed, 1, 3);
        assert!(j.is_claimable(Utc::now()));
        assert!(!j.is_terminal());
    }

    #[test]
    fn test_exhausted_failure_is_terminal() {
        let j = job(JobStatus::Failed, 3, 3);
        assert!(!j.is_claimable(Utc::now()));
        assert!(j.is_terminal());
    }

    #[test]
    fn test_future_schedule_not_claimable() {
        let mut j = job(JobStatus::Pending, 0, 3);
        j.scheduled_at = Utc::now() + Duration::minutes(5);
        assert!(!j.is_claimable(Utc::now()));
    }

    #[test]
    fn test_processing_not_claimable() {
        let j = job(JobStatus::Processing, 0, 3);
        assert!(!j.is_claimable(Utc::now()));
    }
}
