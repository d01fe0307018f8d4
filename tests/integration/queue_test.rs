//! Claim protocol properties of the in-process job store driven through
//! the queue.

use std::collections::HashSet;
use std::sync::Arc;

use inspecthub_core::config::WorkerConfig;
use inspecthub_database::memory::MemoryJobStore;
use inspecthub_worker::queue::{EnqueueRequest, JobQueue};
use inspecthub_worker::RetryPolicy;

fn queue(store: Arc<MemoryJobStore>, worker_id: &str) -> JobQueue {
    JobQueue::new(store, worker_id, &WorkerConfig::default())
        .with_retry_policy(RetryPolicy::immediate())
}

#[tokio::test]
async fn test_claims_follow_priority() {
    let store = Arc::new(MemoryJobStore::new());
    let queue = queue(store, "w1");
    for priority in [1, 5, 3] {
        queue
            .enqueue(
                EnqueueRequest::new("sharepoint_export", serde_json::json!({}))
                    .priority(priority),
            )
            .await
            .unwrap();
    }

    let mut order = Vec::new();
    while let Some(job) = queue.claim_next().await.unwrap() {
        order.push(job.priority);
    }
    assert_eq!(order, vec![5, 3, 1]);
}

#[tokio::test]
async fn test_retry_budget_of_three() {
    let store = Arc::new(MemoryJobStore::new());
    let queue = queue(store, "w1");
    queue
        .enqueue(EnqueueRequest::new("sharepoint_export", serde_json::json!({})).max_retries(3))
        .await
        .unwrap();

    for attempt in 1..=3 {
        let job = queue.claim_next().await.unwrap().expect("job should be claimable");
        let failed = queue.fail(&job, "remote unavailable", None).await.unwrap().unwrap();
        assert_eq!(failed.retry_count, attempt);
    }

    assert!(queue.claim_next().await.unwrap().is_none());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_workers_never_share_a_job() {
    let store = Arc::new(MemoryJobStore::new());
    let producer = queue(store.clone(), "producer");
    for _ in 0..50 {
        producer
            .enqueue(EnqueueRequest::new("sharepoint_export", serde_json::json!({})))
            .await
            .unwrap();
    }

    let workers = (0..8).map(|n| {
        let queue = queue(store.clone(), &format!("worker-{n}"));
        tokio::spawn(async move {
            let mut claimed = Vec::new();
            while let Some(job) = queue.claim_next().await.unwrap() {
                assert_eq!(job.locked_by.as_deref(), Some(queue.worker_id()));
                claimed.push(job.id);
                tokio::task::yield_now().await;
            }
            claimed
        })
    });

    let mut seen = HashSet::new();
    let mut total = 0;
    for claimed in futures::future::join_all(workers).await {
        for id in claimed.unwrap() {
            total += 1;
            assert!(seen.insert(id), "job {id} claimed twice");
        }
    }
    assert_eq!(total, 50);
}
