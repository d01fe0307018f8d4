//! Production wiring of the queue, the export pipeline and the executor.

use std::sync::Arc;

use chrono::Duration;
use sqlx::PgPool;
use uuid::Uuid;

use inspecthub_core::config::{AppConfig, WorkerConfig};
use inspecthub_core::result::AppResult;
use inspecthub_core::traits::clock::{Clock, SystemClock};
use inspecthub_database::repositories::{
    CredentialRepository, InspectionRepository, JobRepository, SyncLogRepository,
};
use inspecthub_sharepoint::auth::{
    DelegatedCredentialResolver, OAuthTokenClient, ServiceCredentialProvider, TokenClient,
};
use inspecthub_sharepoint::library::GraphDocumentLibrary;
use inspecthub_sharepoint::DocumentUploader;

use crate::executor::JobExecutor;
use crate::export::{ExportSettings, HttpDocumentRenderer, InspectionExporter};
use crate::jobs::{SHAREPOINT_EXPORT_JOB_TYPE, SharePointExportJobHandler};
use crate::queue::JobQueue;
use crate::runner::WorkerRunner;

/// Identifier for this process: `{host}-{pid}-{random}`.
pub fn default_worker_id() -> String {
    let host = std::env::var("HOSTNAME").unwrap_or_else(|_| "worker".to_string());
    let suffix = Uuid::new_v4().simple().to_string();
    format!("{host}-{}-{}", std::process::id(), &suffix[..8])
}

/// Queue over the PostgreSQL job table.
pub fn job_queue(pool: PgPool, worker_id: &str, config: &WorkerConfig) -> JobQueue {
    JobQueue::new(Arc::new(JobRepository::new(pool)), worker_id, config)
}

/// Everything a worker process needs to claim and execute jobs.
#[derive(Debug, Clone)]
pub struct WorkerContext {
    /// Job queue bound to this worker's identifier
    pub queue: Arc<JobQueue>,
    /// Executor with every handler registered
    pub executor: Arc<JobExecutor>,
    /// Worker settings
    pub config: WorkerConfig,
}

impl WorkerContext {
    /// Build the queue and register the export handler.
    pub fn from_config(config: &AppConfig, pool: PgPool, worker_id: &str) -> AppResult<Self> {
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        let skew = Duration::seconds(config.sharepoint.token_expiry_skew_seconds);

        let token_client: Arc<dyn TokenClient> =
            Arc::new(OAuthTokenClient::from_config(&config.sharepoint)?);
        let library = Arc::new(GraphDocumentLibrary::from_config(&config.sharepoint)?);
        let renderer = Arc::new(HttpDocumentRenderer::from_config(&config.renderer)?);

        let exporter = InspectionExporter::new(
            Arc::new(InspectionRepository::new(pool.clone())),
            Arc::new(SyncLogRepository::new(pool.clone())),
            renderer,
            DocumentUploader::new(library, Arc::clone(&clock)),
            Some(Arc::new(DelegatedCredentialResolver::new(
                Arc::new(CredentialRepository::new(pool.clone())),
                Arc::clone(&token_client),
                Arc::clone(&clock),
                skew,
            ))),
            Arc::new(ServiceCredentialProvider::new(
                token_client,
                Arc::clone(&clock),
                skew,
            )),
            clock,
            ExportSettings::from_config(&config.sharepoint)?,
        );

        let mut executor = JobExecutor::new();
        executor.register(Arc::new(SharePointExportJobHandler::new(Arc::new(exporter))));
        executor.ensure_registered(&[SHAREPOINT_EXPORT_JOB_TYPE])?;

        Ok(Self {
            queue: Arc::new(job_queue(pool, worker_id, &config.worker)),
            executor: Arc::new(executor),
            config: config.worker.clone(),
        })
    }

    /// A runner over this context.
    pub fn runner(&self) -> WorkerRunner {
        WorkerRunner::new(
            Arc::clone(&self.queue),
            Arc::clone(&self.executor),
            self.config.clone(),
        )
    }
}
