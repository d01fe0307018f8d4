//! In-process job store.

use std::cmp::Reverse;
use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde_json::Value;
use tokio::sync::Mutex;
use uuid::Uuid;

use inspecthub_core::result::AppResult;
use inspecthub_core::traits::clock::{Clock, SystemClock};
use inspecthub_entity::job::{CreateJob, Job, JobStatus};

use crate::store::JobStore;

/// Job store backed by a mutex-guarded map.
#[derive(Debug, Clone)]
pub struct MemoryJobStore {
    jobs: Arc<Mutex<HashMap<Uuid, Job>>>,
    clock: Arc<dyn Clock>,
}

impl MemoryJobStore {
    /// Create an empty store on wall-clock time.
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    /// Create an empty store reading time from `clock`.
    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            jobs: Arc::new(Mutex::new(HashMap::new())),
            clock,
        }
    }

    /// Snapshot of every job, oldest first.
    pub async fn all(&self) -> Vec<Job> {
        let jobs = self.jobs.lock().await;
        let mut all: Vec<Job> = jobs.values().cloned().collect();
        all.sort_by_key(|j| j.created_at);
        all
    }
}

impl Default for MemoryJobStore {
    fn default() -> Self {
        Self::new()
    }
}

fn record_failure(job: &mut Job, message: &str, details: Option<&Value>, now: DateTime<Utc>) {
    job.status = JobStatus::Failed;
    job.error_message = Some(message.to_string());
    job.error_details = details.cloned();
    job.locked_by = None;
    job.updated_at = now;
    job.completed_at = if job.retries_exhausted() { Some(now) } else { None };
}

/// The job, if `worker_id` still holds it in `processing`.
fn owned<'a>(
    jobs: &'a mut HashMap<Uuid, Job>,
    job_id: Uuid,
    worker_id: &str,
) -> Option<&'a mut Job> {
    jobs.get_mut(&job_id).filter(|j| {
        j.status == JobStatus::Processing && j.locked_by.as_deref() == Some(worker_id)
    })
}

#[async_trait]
impl JobStore for MemoryJobStore {
    async fn enqueue(&self, data: &CreateJob) -> AppResult<Job> {
        let now = self.clock.now();
        let job = Job {
            id: Uuid::new_v4(),
            job_type: data.job_type.clone(),
            payload: data.payload.clone(),
            status: JobStatus::Pending,
            priority: data.priority,
            scheduled_at: data.scheduled_at,
            started_at: None,
            completed_at: None,
            retry_count: 0,
            max_retries: data.max_retries,
            error_message: None,
            error_details: None,
            result: None,
            locked_by: None,
            created_at: now,
            updated_at: now,
        };
        self.jobs.lock().await.insert(job.id, job.clone());
        Ok(job)
    }

    async fn claim_next(&self, worker_id: &str) -> AppResult<Option<Job>> {
        let now = self.clock.now();
        let mut jobs = self.jobs.lock().await;

        let next_id = jobs
            .values()
            .filter(|j| j.is_claimable(now))
            .max_by_key(|j| (j.priority, Reverse(j.scheduled_at), Reverse(j.created_at)))
            .map(|j| j.id);

        Ok(next_id.and_then(|id| {
            jobs.get_mut(&id).map(|job| {
                job.status = JobStatus::Processing;
                job.started_at = Some(now);
                job.locked_by = Some(worker_id.to_string());
                job.updated_at = now;
                job.clone()
            })
        }))
    }

    async fn mark_completed(
        &self,
        job_id: Uuid,
        worker_id: &str,
        result: Option<&Value>,
    ) -> AppResult<bool> {
        let now = self.clock.now();
        let mut jobs = self.jobs.lock().await;
        let Some(job) = owned(&mut jobs, job_id, worker_id) else {
            return Ok(false);
        };
        job.status = JobStatus::Completed;
        job.result = result.cloned();
        job.completed_at = Some(now);
        job.error_message = None;
        job.error_details = None;
        job.locked_by = None;
        job.updated_at = now;
        Ok(true)
    }

    async fn mark_failed(
        &self,
        job_id: Uuid,
        worker_id: &str,
        message: &str,
        details: Option<&Value>,
        retry_delay_seconds: i64,
    ) -> AppResult<Option<Job>> {
        let now = self.clock.now();
        let mut jobs = self.jobs.lock().await;
        let Some(job) = owned(&mut jobs, job_id, worker_id) else {
            return Ok(None);
        };
        job.retry_count += 1;
        record_failure(job, message, details, now);
        if !job.retries_exhausted() {
            job.scheduled_at = now + Duration::seconds(retry_delay_seconds);
        }
        Ok(Some(job.clone()))
    }

    async fn mark_failed_permanently(
        &self,
        job_id: Uuid,
        worker_id: &str,
        message: &str,
        details: Option<&Value>,
    ) -> AppResult<Option<Job>> {
        let now = self.clock.now();
        let mut jobs = self.jobs.lock().await;
        let Some(job) = owned(&mut jobs, job_id, worker_id) else {
            return Ok(None);
        };
        job.retry_count = (job.retry_count + 1).max(job.max_retries);
        record_failure(job, message, details, now);
        Ok(Some(job.clone()))
    }

    async fn find_by_id(&self, job_id: Uuid) -> AppResult<Option<Job>> {
        Ok(self.jobs.lock().await.get(&job_id).cloned())
    }

    async fn count_by_status(&self, status: JobStatus) -> AppResult<i64> {
        let jobs = self.jobs.lock().await;
        Ok(jobs.values().filter(|j| j.status == status).count() as i64)
    }

    async fn reclaim_stale(&self, started_before: DateTime<Utc>) -> AppResult<u64> {
        let now = self.clock.now();
        let mut jobs = self.jobs.lock().await;
        let mut reclaimed = 0;
        for job in jobs.values_mut() {
            let stale = job.status == JobStatus::Processing
                && job.started_at.is_some_and(|started| started < started_before);
            if stale {
                let details = serde_json::json!({
                    "locked_by": job.locked_by,
                    "started_at": job.started_at,
                });
                job.retry_count += 1;
                record_failure(
                    job,
                    "Lease expired: no outcome recorded by worker",
                    Some(&details),
                    now,
                );
                reclaimed += 1;
            }
        }
        Ok(reclaimed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use inspecthub_core::traits::clock::ManualClock;

    fn create(priority: i32, scheduled_at: DateTime<Utc>, max_retries: i32) -> CreateJob {
        CreateJob {
            job_type: "sharepoint_export".to_string(),
            payload: serde_json::json!({"priority": priority}),
            priority,
            max_retries,
            scheduled_at,
        }
    }

    fn manual_store() -> (Arc<ManualClock>, MemoryJobStore) {
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let store = MemoryJobStore::with_clock(clock.clone());
        (clock, store)
    }

    #[tokio::test]
    async fn test_claim_orders_by_priority() {
        let (clock, store) = manual_store();
        let at = clock.now();
        for p in [1, 5, 3] {
            store.enqueue(&create(p, at, 3)).await.unwrap();
        }

        let mut order = Vec::new();
        while let Some(job) = store.claim_next("w1").await.unwrap() {
            order.push(job.priority);
        }
        assert_eq!(order, vec![5, 3, 1]);
    }

    #[tokio::test]
    async fn test_equal_priority_prefers_earlier_schedule() {
        let (clock, store) = manual_store();
        let now = clock.now();
        let late = store
            .enqueue(&create(2, now - Duration::seconds(10), 3))
            .await
            .unwrap();
        let early = store
            .enqueue(&create(2, now - Duration::seconds(60), 3))
            .await
            .unwrap();

        assert_eq!(store.claim_next("w").await.unwrap().unwrap().id, early.id);
        assert_eq!(store.claim_next("w").await.unwrap().unwrap().id, late.id);
    }

    #[tokio::test]
    async fn test_future_jobs_wait_for_schedule() {
        let (clock, store) = manual_store();
        let job = store
            .enqueue(&create(0, clock.now() + Duration::minutes(5), 3))
            .await
            .unwrap();

        assert!(store.claim_next("w").await.unwrap().is_none());
        clock.advance(Duration::minutes(5));
        let claimed = store.claim_next("w").await.unwrap().unwrap();
        assert_eq!(claimed.id, job.id);
        assert_eq!(claimed.status, JobStatus::Processing);
        assert_eq!(claimed.locked_by.as_deref(), Some("w"));
    }

    #[tokio::test]
    async fn test_retry_delay_defers_reclaim() {
        let (clock, store) = manual_store();
        let job = store.enqueue(&create(0, clock.now(), 3)).await.unwrap();
        store.claim_next("w").await.unwrap().unwrap();

        let failed = store
            .mark_failed(job.id, "w", "timeout", None, 60)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(failed.retry_count, 1);
        assert!(failed.completed_at.is_none());
        assert!(store.claim_next("w").await.unwrap().is_none());

        clock.advance(Duration::seconds(60));
        assert!(store.claim_next("w").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_permanent_failure_is_terminal() {
        let (clock, store) = manual_store();
        let job = store.enqueue(&create(0, clock.now(), 5)).await.unwrap();
        store.claim_next("w").await.unwrap().unwrap();

        let failed = store
            .mark_failed_permanently(job.id, "w", "inspection missing", None)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(failed.retry_count, 5);
        assert!(failed.completed_at.is_some());
        assert!(failed.is_terminal());
        assert!(store.claim_next("w").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_completion_clears_errors() {
        let (clock, store) = manual_store();
        let job = store.enqueue(&create(0, clock.now(), 3)).await.unwrap();
        store.claim_next("w").await.unwrap().unwrap();
        store.mark_failed(job.id, "w", "boom", None, 0).await.unwrap();
        store.claim_next("w").await.unwrap().unwrap();

        let result = serde_json::json!({"fileId": "abc"});
        assert!(store.mark_completed(job.id, "w", Some(&result)).await.unwrap());

        let stored = store.find_by_id(job.id).await.unwrap().unwrap();
        assert_eq!(stored.status, JobStatus::Completed);
        assert!(stored.error_message.is_none());
        assert_eq!(stored.result, Some(result));
        assert_eq!(stored.retry_count, 1);
    }

    #[tokio::test]
    async fn test_reclaim_stale_processing_jobs() {
        let (clock, store) = manual_store();
        let stuck = store.enqueue(&create(0, clock.now(), 2)).await.unwrap();
        store.claim_next("crashed-worker").await.unwrap().unwrap();

        clock.advance(Duration::minutes(45));
        let reclaimed = store
            .reclaim_stale(clock.now() - Duration::minutes(30))
            .await
            .unwrap();
        assert_eq!(reclaimed, 1);

        let job = store.find_by_id(stuck.id).await.unwrap().unwrap();
        assert_eq!(job.status, JobStatus::Failed);
        assert_eq!(job.retry_count, 1);
        assert_eq!(job.error_details.unwrap()["locked_by"], "crashed-worker");

        let again = store.claim_next("healthy-worker").await.unwrap().unwrap();
        assert_eq!(again.id, stuck.id);
    }

    #[tokio::test]
    async fn test_mark_unknown_job_reports_lost_lease() {
        let store = MemoryJobStore::new();
        assert!(!store.mark_completed(Uuid::new_v4(), "w", None).await.unwrap());
        let failed = store
            .mark_failed(Uuid::new_v4(), "w", "boom", None, 0)
            .await;
        assert!(failed.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_late_outcome_after_reclaim_is_ignored() {
        let (clock, store) = manual_store();
        let job = store.enqueue(&create(0, clock.now(), 5)).await.unwrap();
        store.claim_next("A").await.unwrap().unwrap();

        clock.advance(Duration::minutes(45));
        store
            .reclaim_stale(clock.now() - Duration::minutes(30))
            .await
            .unwrap();
        let second = store.claim_next("B").await.unwrap().unwrap();
        assert_eq!(second.id, job.id);

        let late_fail = store.mark_failed(job.id, "A", "timeout", None, 0).await;
        assert!(late_fail.unwrap().is_none());
        assert!(!store.mark_completed(job.id, "A", None).await.unwrap());
        let late_permanent = store
            .mark_failed_permanently(job.id, "A", "bad", None)
            .await;
        assert!(late_permanent.unwrap().is_none());

        let current = store.find_by_id(job.id).await.unwrap().unwrap();
        assert_eq!(current.status, JobStatus::Processing);
        assert_eq!(current.locked_by.as_deref(), Some("B"));
        assert_eq!(current.retry_count, 1);
        assert!(store.claim_next("C").await.unwrap().is_none());

        assert!(store.mark_completed(job.id, "B", None).await.unwrap());
        let done = store.find_by_id(job.id).await.unwrap().unwrap();
        assert_eq!(done.status, JobStatus::Completed);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_claims_are_exclusive() {
        let store = MemoryJobStore::new();
        store.enqueue(&create(0, Utc::now(), 3)).await.unwrap();

        let claims = (0..16).map(|i| {
            let store = store.clone();
            tokio::spawn(async move { store.claim_next(&format!("w{i}")).await.unwrap() })
        });
        let results = futures::future::join_all(claims).await;
        let winners = results
            .into_iter()
            .filter(|r| matches!(r, Ok(Some(_))))
            .count();
        assert_eq!(winners, 1);
    }
}
