//! End-to-end tests of the `sharepoint_export` job through the worker.

mod helpers;

use chrono::{Duration, Utc};
use uuid::Uuid;

use inspecthub_database::{CredentialStore, InspectionStore, JobStore};
use inspecthub_entity::credential::UserCredential;
use inspecthub_entity::job::{Job, JobStatus};
use inspecthub_entity::sync::{SyncOutcome, SyncStatus, SyncType};
use inspecthub_worker::BatchSummary;
use inspecthub_worker::queue::EnqueueRequest;

use std::sync::atomic::Ordering;

async fn enqueue_export(h: &helpers::Harness, payload: serde_json::Value) -> Job {
    h.queue
        .enqueue(EnqueueRequest::new("sharepoint_export", payload))
        .await
        .unwrap()
}

async fn job(h: &helpers::Harness, id: Uuid) -> Job {
    h.jobs.find_by_id(id).await.unwrap().unwrap()
}

#[tokio::test]
async fn test_single_export_completes() {
    let h = helpers::Harness::new();
    let inspection_id = h.add_inspection("1042").await;
    let queued = enqueue_export(
        &h,
        serde_json::json!({"inspectionId": inspection_id, "formType": "fire_extinguisher"}),
    )
    .await;

    let summary = h.runner.process_batch(1).await.unwrap();
    assert_eq!(
        summary,
        BatchSummary {
            processed: 1,
            successful: 1,
            failed: 0,
            lease_lost: 0,
        }
    );

    let done = job(&h, queued.id).await;
    assert_eq!(done.status, JobStatus::Completed);
    assert!(done.completed_at.is_some());
    assert!(done.locked_by.is_none());
    let result = done.result.unwrap();
    assert_eq!(result["method"], "service");
    assert_eq!(result["outcome"], "created");
    assert_eq!(
        result["path"],
        "Inspections/Fire Extinguisher/2024/03-March/Fire Extinguisher 1042.xlsx"
    );

    let log = h.sync_log.all().await;
    assert_eq!(log.len(), 1);
    assert_eq!(log[0].status, SyncOutcome::Success);
    assert_eq!(log[0].sync_type, SyncType::Create);
    assert_eq!(log[0].metadata.as_ref().unwrap()["job_id"], queued.id.to_string());

    let inspection = h.inspections.find_by_id(inspection_id).await.unwrap().unwrap();
    assert_eq!(inspection.sync_status, SyncStatus::Synced);
    assert_eq!(inspection.remote_file_id.as_deref(), result["fileId"].as_str());
    assert!(inspection.last_synced_at.is_some());
}

#[tokio::test]
async fn test_skip_policy_writes_once() {
    let h = helpers::Harness::new();
    let inspection_id = h.add_inspection("7").await;
    let payload = serde_json::json!({
        "inspectionId": inspection_id,
        "formType": "fire_extinguisher",
        "conflictPolicy": "skip",
    });

    let first = enqueue_export(&h, payload.clone()).await;
    h.runner.process_batch(1).await.unwrap();
    let second = enqueue_export(&h, payload).await;
    h.runner.process_batch(1).await.unwrap();

    assert_eq!(h.library.write_count(), 1);

    let first = job(&h, first.id).await.result.unwrap();
    let second = job(&h, second.id).await.result.unwrap();
    assert_eq!(first["outcome"], "created");
    assert_eq!(second["outcome"], "skipped");
    assert_eq!(first["fileId"], second["fileId"]);

    let log = h.sync_log.all().await;
    assert_eq!(log.len(), 2);
    assert_eq!(log[1].sync_type, SyncType::Update);
}

#[tokio::test]
async fn test_version_policy_rewrites_same_path() {
    let h = helpers::Harness::new();
    let inspection_id = h.add_inspection("8").await;
    let payload =
        serde_json::json!({"inspectionId": inspection_id, "formType": "fire_extinguisher"});

    enqueue_export(&h, payload.clone()).await;
    enqueue_export(&h, payload).await;
    let summary = h.runner.process_batch(5).await.unwrap();

    assert_eq!(summary.successful, 2);
    assert_eq!(h.library.write_count(), 2);
    assert_eq!(h.library.items.lock().await.len(), 1);
}

#[tokio::test]
async fn test_missing_delegated_credential_falls_back_to_service() {
    let h = helpers::Harness::new();
    let inspection_id = h.add_inspection("9").await;
    let queued = enqueue_export(
        &h,
        serde_json::json!({
            "inspectionId": inspection_id,
            "formType": "fire_extinguisher",
            "userId": Uuid::new_v4(),
        }),
    )
    .await;

    h.runner.process_batch(1).await.unwrap();

    let done = job(&h, queued.id).await;
    assert_eq!(done.status, JobStatus::Completed);
    assert_eq!(done.result.unwrap()["method"], "service");
}

#[tokio::test]
async fn test_valid_delegated_credential_is_used() {
    let h = helpers::Harness::new();
    let inspection_id = h.add_inspection("10").await;
    let user_id = Uuid::new_v4();
    h.credentials
        .save(&UserCredential {
            user_id,
            access_token: "user-token".to_string(),
            refresh_token: Some("refresh".to_string()),
            expires_at: Utc::now() + Duration::hours(1),
            updated_at: Utc::now(),
        })
        .await
        .unwrap();

    let queued = enqueue_export(
        &h,
        serde_json::json!({
            "inspectionId": inspection_id,
            "formType": "fire_extinguisher",
            "userId": user_id,
        }),
    )
    .await;
    h.runner.process_batch(1).await.unwrap();

    assert_eq!(job(&h, queued.id).await.result.unwrap()["method"], "delegated");
    assert_eq!(h.tokens.service_grants.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_missing_inspection_fails_permanently() {
    let h = helpers::Harness::new();
    let queued = enqueue_export(
        &h,
        serde_json::json!({"inspectionId": Uuid::new_v4(), "formType": "fire_extinguisher"}),
    )
    .await;

    let summary = h.runner.process_batch(5).await.unwrap();
    assert_eq!(summary.processed, 1);
    assert_eq!(summary.failed, 1);

    let failed = job(&h, queued.id).await;
    assert_eq!(failed.status, JobStatus::Failed);
    assert!(failed.is_terminal());
    assert!(failed.error_message.unwrap().contains("not found"));
    assert!(h.sync_log.all().await.is_empty());
}

#[tokio::test]
async fn test_malformed_payload_fails_permanently() {
    let h = helpers::Harness::new();
    let queued = enqueue_export(&h, serde_json::json!({"formType": "fire_extinguisher"})).await;

    h.runner.process_batch(5).await.unwrap();
    assert!(job(&h, queued.id).await.is_terminal());
}

#[tokio::test]
async fn test_outage_retries_until_exhausted() {
    let h = helpers::Harness::new();
    h.library.unavailable.store(true, Ordering::SeqCst);
    let inspection_id = h.add_inspection("11").await;
    let queued = enqueue_export(
        &h,
        serde_json::json!({"inspectionId": inspection_id, "formType": "fire_extinguisher"}),
    )
    .await;

    let summary = h.runner.process_batch(10).await.unwrap();
    assert_eq!(summary.processed, 3);
    assert_eq!(summary.failed, 3);

    let failed = job(&h, queued.id).await;
    assert_eq!(failed.retry_count, 3);
    assert!(failed.is_terminal());
    assert!(h.queue.claim_next().await.unwrap().is_none());

    let log = h.sync_log.all().await;
    assert_eq!(log.len(), 3);
    assert!(log.iter().all(|e| e.status == SyncOutcome::Failure));

    let inspection = h.inspections.find_by_id(inspection_id).await.unwrap().unwrap();
    assert_eq!(inspection.sync_status, SyncStatus::Failed);
}

#[tokio::test]
async fn test_recovers_after_outage() {
    let h = helpers::Harness::new();
    h.library.unavailable.store(true, Ordering::SeqCst);
    let inspection_id = h.add_inspection("12").await;
    let queued = enqueue_export(
        &h,
        serde_json::json!({"inspectionId": inspection_id, "formType": "fire_extinguisher"}),
    )
    .await;

    h.runner.process_batch(1).await.unwrap();
    h.library.unavailable.store(false, Ordering::SeqCst);
    let summary = h.runner.process_batch(1).await.unwrap();
    assert_eq!(summary.successful, 1);

    let done = job(&h, queued.id).await;
    assert_eq!(done.status, JobStatus::Completed);
    assert_eq!(done.retry_count, 1);

    let statuses: Vec<SyncOutcome> = h.sync_log.all().await.iter().map(|e| e.status).collect();
    assert_eq!(statuses, vec![SyncOutcome::Failure, SyncOutcome::Success]);
}
