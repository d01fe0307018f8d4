//! Shared test harness: an in-process worker wired with memory stores and
//! fake remote collaborators.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{Duration, TimeZone, Utc};
use serde_json::Value;
use tokio::sync::Mutex;
use uuid::Uuid;

use inspecthub_core::config::WorkerConfig;
use inspecthub_core::error::AppError;
use inspecthub_core::result::AppResult;
use inspecthub_core::traits::clock::{Clock, SystemClock};
use inspecthub_core::traits::renderer::{DocumentRenderer, RenderedDocument};
use inspecthub_database::memory::{
    MemoryCredentialStore, MemoryInspectionStore, MemoryJobStore, MemorySyncLogStore,
};
use inspecthub_entity::inspection::Inspection;
use inspecthub_entity::sync::SyncStatus;
use inspecthub_sharepoint::auth::{
    DelegatedCredentialResolver, ServiceCredentialProvider, TokenClient, TokenGrant,
};
use inspecthub_sharepoint::{DocumentLibrary, DocumentUploader, RemoteItem, RemotePath};
use inspecthub_worker::export::{ExportSettings, InspectionExporter};
use inspecthub_worker::jobs::SharePointExportJobHandler;
use inspecthub_worker::{JobExecutor, JobQueue, RetryPolicy, WorkerRunner};

/// Renders every form as a fixed workbook.
#[derive(Debug)]
pub struct FakeRenderer;

#[async_trait]
impl DocumentRenderer for FakeRenderer {
    async fn render(&self, _: &str, form_data: &Value, _: &Value) -> AppResult<RenderedDocument> {
        Ok(RenderedDocument {
            content: Bytes::from(form_data.to_string()),
            extension: "xlsx".to_string(),
            content_type: "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"
                .to_string(),
        })
    }
}

/// Token endpoint that issues a service token and refuses refreshes.
#[derive(Debug, Default)]
pub struct FakeTokenClient {
    pub service_grants: AtomicUsize,
}

#[async_trait]
impl TokenClient for FakeTokenClient {
    async fn client_credentials(&self) -> AppResult<TokenGrant> {
        self.service_grants.fetch_add(1, Ordering::SeqCst);
        Ok(TokenGrant {
            access_token: "service-token".to_string(),
            refresh_token: None,
            expires_in: 3600,
        })
    }

    async fn refresh(&self, _: &str) -> AppResult<TokenGrant> {
        Err(AppError::authentication("invalid_grant"))
    }
}

/// In-memory document library that can be switched into an outage.
#[derive(Debug, Default)]
pub struct FakeLibrary {
    pub items: Mutex<HashMap<String, RemoteItem>>,
    pub writes: AtomicUsize,
    pub unavailable: AtomicBool,
}

impl FakeLibrary {
    fn check(&self) -> AppResult<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            Err(AppError::service_unavailable("503 Service Unavailable"))
        } else {
            Ok(())
        }
    }

    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DocumentLibrary for FakeLibrary {
    async fn ensure_folder(&self, _: &str, _: &RemotePath) -> AppResult<()> {
        self.check()
    }

    async fn find_item(&self, _: &str, path: &RemotePath) -> AppResult<Option<RemoteItem>> {
        self.check()?;
        Ok(self.items.lock().await.get(&path.to_string()).cloned())
    }

    async fn put_content(
        &self,
        _: &str,
        path: &RemotePath,
        _: Bytes,
        _: &str,
    ) -> AppResult<RemoteItem> {
        self.check()?;
        self.writes.fetch_add(1, Ordering::SeqCst);
        let mut items = self.items.lock().await;
        let item = items
            .entry(path.to_string())
            .or_insert_with(|| RemoteItem {
                id: Uuid::new_v4().to_string(),
                name: path.file_name().unwrap_or_default().to_string(),
                web_url: format!("https://contoso.sharepoint.com/{path}"),
            })
            .clone();
        Ok(item)
    }
}

/// A worker process with every collaborator in memory.
pub struct Harness {
    pub jobs: Arc<MemoryJobStore>,
    pub inspections: Arc<MemoryInspectionStore>,
    pub sync_log: Arc<MemorySyncLogStore>,
    pub credentials: Arc<MemoryCredentialStore>,
    pub library: Arc<FakeLibrary>,
    pub tokens: Arc<FakeTokenClient>,
    pub queue: Arc<JobQueue>,
    pub runner: WorkerRunner,
}

impl Harness {
    /// Harness whose failed jobs are retried without delay.
    pub fn new() -> Self {
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        let jobs = Arc::new(MemoryJobStore::new());
        let inspections = Arc::new(MemoryInspectionStore::new());
        let sync_log = Arc::new(MemorySyncLogStore::new());
        let credentials = Arc::new(MemoryCredentialStore::new());
        let library = Arc::new(FakeLibrary::default());
        let tokens = Arc::new(FakeTokenClient::default());

        let exporter = InspectionExporter::new(
            inspections.clone(),
            sync_log.clone(),
            Arc::new(FakeRenderer),
            DocumentUploader::new(library.clone(), clock.clone()),
            Some(Arc::new(DelegatedCredentialResolver::new(
                credentials.clone(),
                tokens.clone(),
                clock.clone(),
                Duration::minutes(5),
            ))),
            Arc::new(ServiceCredentialProvider::new(
                tokens.clone(),
                clock.clone(),
                Duration::minutes(5),
            )),
            clock,
            ExportSettings::default(),
        );

        let config = WorkerConfig::default();
        let queue = Arc::new(
            JobQueue::new(jobs.clone(), "test-worker", &config)
                .with_retry_policy(RetryPolicy::immediate()),
        );
        let mut executor = JobExecutor::new();
        executor.register(Arc::new(SharePointExportJobHandler::new(Arc::new(exporter))));
        let runner = WorkerRunner::new(queue.clone(), Arc::new(executor), config);

        Self {
            jobs,
            inspections,
            sync_log,
            credentials,
            library,
            tokens,
            queue,
            runner,
        }
    }

    /// Store a pending inspection and return its ID.
    pub async fn add_inspection(&self, number: &str) -> Uuid {
        let id = Uuid::new_v4();
        let now = Utc::now();
        self.inspections
            .insert(Inspection {
                id,
                inspection_number: number.to_string(),
                form_type: "fire_extinguisher".to_string(),
                inspected_at: Utc.with_ymd_and_hms(2024, 3, 14, 10, 0, 0).unwrap(),
                form_data: serde_json::json!({"gauge": "green", "tag": number}),
                sync_status: SyncStatus::Pending,
                remote_file_id: None,
                remote_file_url: None,
                last_synced_at: None,
                created_at: now,
                updated_at: now,
            })
            .await;
        id
    }
}
