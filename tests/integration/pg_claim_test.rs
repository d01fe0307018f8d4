//! Claim protocol against PostgreSQL.
//!
//! Runs only when `INSPECTHUB_TEST_DATABASE_URL` points at a disposable
//! database; the `jobs` table is emptied first.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::{Duration, Utc};

use inspecthub_core::config::DatabaseConfig;
use inspecthub_database::repositories::JobRepository;
use inspecthub_database::{DatabasePool, JobStore};
use inspecthub_entity::job::{CreateJob, JobStatus};

async fn repository() -> Option<(Arc<JobRepository>, sqlx::PgPool)> {
    let url = std::env::var("INSPECTHUB_TEST_DATABASE_URL").ok()?;
    let config = DatabaseConfig {
        url,
        max_connections: 16,
        min_connections: 1,
        connect_timeout_seconds: 10,
        idle_timeout_seconds: 60,
    };

    let db = DatabasePool::connect(&config, "inspecthub-tests").await.unwrap();
    inspecthub_database::migration::run_migrations(db.pool()).await.unwrap();
    sqlx::query("DELETE FROM jobs").execute(db.pool()).await.unwrap();
    let pool = db.into_pool();
    Some((Arc::new(JobRepository::new(pool.clone())), pool))
}

fn job(priority: i32, max_retries: i32) -> CreateJob {
    CreateJob {
        job_type: "sharepoint_export".to_string(),
        payload: serde_json::json!({"priority": priority}),
        priority,
        max_retries,
        scheduled_at: Utc::now() - Duration::seconds(5),
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_pg_claim_protocol() {
    let Some((repo, pool)) = repository().await else {
        eprintln!("INSPECTHUB_TEST_DATABASE_URL not set, skipping");
        return;
    };

    // Priority ordering.
    for p in [1, 5, 3] {
        repo.enqueue(&job(p, 3)).await.unwrap();
    }
    let mut order = Vec::new();
    while let Some(claimed) = repo.claim_next("w").await.unwrap() {
        assert_eq!(claimed.status, JobStatus::Processing);
        order.push(claimed.priority);
    }
    assert_eq!(order, vec![5, 3, 1]);
    sqlx::query("DELETE FROM jobs").execute(&pool).await.unwrap();

    // Retry exhaustion.
    let created = repo.enqueue(&job(0, 3)).await.unwrap();
    for attempt in 1..=3 {
        let claimed = repo.claim_next("w").await.unwrap().unwrap();
        assert_eq!(claimed.id, created.id);
        let details = serde_json::json!({"attempt": attempt});
        let failed = repo
            .mark_failed(claimed.id, "w", "boom", Some(&details), 0)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(failed.retry_count, attempt);
        assert_eq!(failed.completed_at.is_some(), attempt == 3);
    }
    assert!(repo.claim_next("w").await.unwrap().is_none());
    sqlx::query("DELETE FROM jobs").execute(&pool).await.unwrap();

    // Mutual exclusion under SKIP LOCKED.
    for _ in 0..40 {
        repo.enqueue(&job(0, 3)).await.unwrap();
    }
    let workers = (0..8).map(|n| {
        let repo = repo.clone();
        tokio::spawn(async move {
            let mut claimed = Vec::new();
            while let Some(job) = repo.claim_next(&format!("worker-{n}")).await.unwrap() {
                claimed.push(job.id);
            }
            claimed
        })
    });
    let mut seen = HashSet::new();
    for claimed in futures::future::join_all(workers).await {
        for id in claimed.unwrap() {
            assert!(seen.insert(id), "job {id} claimed twice");
        }
    }
    assert_eq!(seen.len(), 40);
    assert_eq!(repo.count_by_status(JobStatus::Processing).await.unwrap(), 40);

    // Stale reclaim.
    let reclaimed = repo.reclaim_stale(Utc::now() + Duration::seconds(60)).await.unwrap();
    assert_eq!(reclaimed, 40);
    assert_eq!(repo.count_by_status(JobStatus::Failed).await.unwrap(), 40);
    sqlx::query("DELETE FROM jobs").execute(&pool).await.unwrap();

    // Outcomes from a worker whose lease was reclaimed are not applied.
    let created = repo.enqueue(&job(0, 5)).await.unwrap();
    repo.claim_next("A").await.unwrap().unwrap();
    repo.reclaim_stale(Utc::now() + Duration::seconds(60))
        .await
        .unwrap();
    let second = repo.claim_next("B").await.unwrap().unwrap();
    assert_eq!(second.id, created.id);

    let late = repo.mark_failed(created.id, "A", "timeout", None, 0).await;
    assert!(late.unwrap().is_none());
    assert!(!repo.mark_completed(created.id, "A", None).await.unwrap());
    let late_permanent = repo
        .mark_failed_permanently(created.id, "A", "bad", None)
        .await;
    assert!(late_permanent.unwrap().is_none());

    let current = repo.find_by_id(created.id).await.unwrap().unwrap();
    assert_eq!(current.status, JobStatus::Processing);
    assert_eq!(current.locked_by.as_deref(), Some("B"));
    assert_eq!(current.retry_count, 1);
    assert!(repo.claim_next("C").await.unwrap().is_none());
    assert!(repo.mark_completed(created.id, "B", None).await.unwrap());
}
