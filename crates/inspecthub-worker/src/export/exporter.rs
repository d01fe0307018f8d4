//! Exports one inspection to the document library.

use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing;
use uuid::Uuid;

use inspecthub_core::config::SharePointConfig;
use inspecthub_core::error::{AppError, ErrorKind};
use inspecthub_core::result::AppResult;
use inspecthub_core::traits::clock::Clock;
use inspecthub_core::traits::renderer::{DocumentRenderer, RenderedDocument};
use inspecthub_database::{InspectionStore, SyncLogStore};
use inspecthub_entity::inspection::{Inspection, InspectionSyncUpdate};
use inspecthub_entity::sync::{CreateSyncLogEntry, SyncOutcome, SyncStatus, SyncType};
use inspecthub_sharepoint::auth::{DelegatedCredentialResolver, ServiceCredentialProvider};
use inspecthub_sharepoint::path::export_path;
use inspecthub_sharepoint::{
    ConflictPolicy, CredentialTier, DocumentUploader, RemotePath, UploadOutcome, UploadResult,
};

/// One export attempt.
#[derive(Debug, Clone)]
pub struct ExportRequest {
    /// Inspection to export.
    pub inspection_id: Uuid,
    /// Form type used for rendering and the target folder.
    pub form_type: String,
    /// Form data to render; the inspection's stored data when absent.
    pub form_data: Option<Value>,
    /// Passed through to the renderer.
    pub metadata: Value,
    /// User whose delegated credential is tried first.
    pub user_id: Option<Uuid>,
    /// Duplicate handling; the configured default when absent.
    pub conflict_policy: Option<ConflictPolicy>,
    /// Zero-based attempt number.
    pub attempt: i32,
    /// Job driving this attempt, recorded in the audit log.
    pub job_id: Option<Uuid>,
}

/// Identity of the exported document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportResult {
    /// Remote document identifier.
    pub file_id: String,
    /// Remote document URL.
    pub file_url: String,
    /// Path the document was written to.
    pub path: String,
    /// Credential tier that performed the upload.
    pub method: CredentialTier,
    /// What happened at the target path.
    pub outcome: UploadOutcome,
}

/// Export settings taken from the document library configuration.
#[derive(Debug, Clone)]
pub struct ExportSettings {
    /// Folder under which exports are placed.
    pub root_folder: String,
    /// Policy used when a request does not choose one.
    pub default_conflict_policy: ConflictPolicy,
}

impl ExportSettings {
    /// Settings from configuration; an unknown default policy is a
    /// configuration error.
    pub fn from_config(config: &SharePointConfig) -> AppResult<Self> {
        let default_conflict_policy = ConflictPolicy::from_str(&config.default_conflict_policy)
            .map_err(|e| AppError::new(ErrorKind::Configuration, e.message))?;

        Ok(Self {
            root_folder: config.root_folder.clone(),
            default_conflict_policy,
        })
    }
}

impl Default for ExportSettings {
    fn default() -> Self {
        Self {
            root_folder: "Inspections".to_string(),
            default_conflict_policy: ConflictPolicy::default(),
        }
    }
}

/// Renders an inspection and uploads it, trying the submitting user's
/// delegated credential before the service credential.
#[derive(Debug, Clone)]
pub struct InspectionExporter {
    inspections: Arc<dyn InspectionStore>,
    sync_log: Arc<dyn SyncLogStore>,
    renderer: Arc<dyn DocumentRenderer>,
    uploader: DocumentUploader,
    delegated: Option<Arc<DelegatedCredentialResolver>>,
    service: Arc<ServiceCredentialProvider>,
    clock: Arc<dyn Clock>,
    settings: ExportSettings,
}

impl InspectionExporter {
    /// Create an exporter. Without a delegated resolver every upload uses
    /// the service credential.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        inspections: Arc<dyn InspectionStore>,
        sync_log: Arc<dyn SyncLogStore>,
        renderer: Arc<dyn DocumentRenderer>,
        uploader: DocumentUploader,
        delegated: Option<Arc<DelegatedCredentialResolver>>,
        service: Arc<ServiceCredentialProvider>,
        clock: Arc<dyn Clock>,
        settings: ExportSettings,
    ) -> Self {
        Self {
            inspections,
            sync_log,
            renderer,
            uploader,
            delegated,
            service,
            clock,
            settings,
        }
    }

    /// Export the inspection named by `request`.
    ///
    /// A missing inspection fails with `NotFound` before anything is
    /// recorded. Every other failure is written to the audit log and the
    /// sync projection, then returned.
    pub async fn export(&self, request: &ExportRequest) -> AppResult<ExportResult> {
        let inspection = self
            .inspections
            .find_by_id(request.inspection_id)
            .await?
            .ok_or_else(|| {
                AppError::not_found(format!("Inspection {} not found", request.inspection_id))
            })?;

        if request.attempt > 0 {
            self.set_status(inspection.id, SyncStatus::Retrying).await;
        }

        let sync_type = if inspection.remote_file_id.is_some() {
            SyncType::Update
        } else {
            SyncType::Create
        };
        let policy = request
            .conflict_policy
            .unwrap_or(self.settings.default_conflict_policy);

        match self.render_and_upload(&inspection, request, policy).await {
            Ok((upload, method)) => {
                let result = ExportResult {
                    file_id: upload.item.id.clone(),
                    file_url: upload.item.web_url.clone(),
                    path: upload.path.to_string(),
                    method,
                    outcome: upload.outcome,
                };
                self.record_success(&inspection, request, sync_type, policy, &result)
                    .await;
                Ok(result)
            }
            Err(err) => {
                self.record_failure(&inspection, request, sync_type, policy, &err)
                    .await;
                Err(err)
            }
        }
    }

    async fn render_and_upload(
        &self,
        inspection: &Inspection,
        request: &ExportRequest,
        policy: ConflictPolicy,
    ) -> AppResult<(UploadResult, CredentialTier)> {
        let form_data = request.form_data.as_ref().unwrap_or(&inspection.form_data);
        let document = self
            .renderer
            .render(&request.form_type, form_data, &request.metadata)
            .await?;

        let path = export_path(
            &self.settings.root_folder,
            &request.form_type,
            inspection.inspected_at,
            &inspection.inspection_number,
            &document.extension,
        );

        self.upload_with_fallback(request, &path, &document, policy)
            .await
    }

    /// Delegated tier first (when a user is known), then the service tier.
    /// At most one upload per tier.
    async fn upload_with_fallback(
        &self,
        request: &ExportRequest,
        path: &RemotePath,
        document: &RenderedDocument,
        policy: ConflictPolicy,
    ) -> AppResult<(UploadResult, CredentialTier)> {
        if let (Some(user_id), Some(delegated)) = (request.user_id, &self.delegated) {
            let attempt = async {
                let token = delegated.resolve(user_id).await?;
                self.uploader
                    .upload(
                        &token.token,
                        path,
                        document.content.clone(),
                        &document.content_type,
                        policy,
                    )
                    .await
            };

            match attempt.await {
                Ok(upload) => return Ok((upload, CredentialTier::Delegated)),
                Err(e) => {
                    tracing::warn!(
                        inspection_id = %request.inspection_id,
                        %user_id,
                        error = %e,
                        "Delegated upload failed, falling back to service credential"
                    );
                }
            }
        }

        let token = self.service.access_token().await?;
        match self
            .uploader
            .upload(
                &token.token,
                path,
                document.content.clone(),
                &document.content_type,
                policy,
            )
            .await
        {
            Ok(upload) => Ok((upload, CredentialTier::Service)),
            Err(e) => {
                if e.kind == ErrorKind::Authentication {
                    self.service.invalidate().await;
                }
                Err(e)
            }
        }
    }

    async fn record_success(
        &self,
        inspection: &Inspection,
        request: &ExportRequest,
        sync_type: SyncType,
        policy: ConflictPolicy,
        result: &ExportResult,
    ) {
        let entry = CreateSyncLogEntry {
            inspection_id: inspection.id,
            sync_type,
            status: SyncOutcome::Success,
            error_message: None,
            metadata: Some(serde_json::json!({
                "remote_file_id": result.file_id,
                "remote_file_url": result.file_url,
                "path": result.path,
                "credential_tier": result.method,
                "upload_outcome": result.outcome,
                "conflict_policy": policy,
                "job_id": request.job_id,
                "attempt": request.attempt,
            })),
        };
        if let Err(e) = self.sync_log.append(&entry).await {
            tracing::error!(
                inspection_id = %inspection.id,
                error = %e,
                "Failed to append sync log entry"
            );
        }

        let update = InspectionSyncUpdate::synced(
            result.file_id.clone(),
            result.file_url.clone(),
            self.clock.now(),
        );
        if let Err(e) = self.inspections.update_sync_state(inspection.id, &update).await {
            tracing::error!(
                inspection_id = %inspection.id,
                error = %e,
                "Failed to update sync state"
            );
        }

        tracing::info!(
            inspection_id = %inspection.id,
            path = %result.path,
            method = %result.method,
            outcome = %result.outcome,
            "Inspection exported"
        );
    }

    async fn record_failure(
        &self,
        inspection: &Inspection,
        request: &ExportRequest,
        sync_type: SyncType,
        policy: ConflictPolicy,
        err: &AppError,
    ) {
        let entry = CreateSyncLogEntry {
            inspection_id: inspection.id,
            sync_type,
            status: SyncOutcome::Failure,
            error_message: Some(err.to_string()),
            metadata: Some(serde_json::json!({
                "error_kind": err.kind,
                "conflict_policy": policy,
                "job_id": request.job_id,
                "attempt": request.attempt,
            })),
        };
        if let Err(e) = self.sync_log.append(&entry).await {
            tracing::error!(
                inspection_id = %inspection.id,
                error = %e,
                "Failed to append sync log entry"
            );
        }

        self.set_status(inspection.id, SyncStatus::Failed).await;

        tracing::warn!(
            inspection_id = %inspection.id,
            attempt = request.attempt,
            error = %err,
            "Inspection export failed"
        );
    }

    async fn set_status(&self, inspection_id: Uuid, status: SyncStatus) {
        let update = InspectionSyncUpdate::status(status);
        if let Err(e) = self.inspections.update_sync_state(inspection_id, &update).await {
            tracing::error!(%inspection_id, error = %e, "Failed to update sync state");
        }
    }
}
