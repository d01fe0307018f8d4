//! Inspection export job handler.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing;
use uuid::Uuid;

use inspecthub_entity::job::Job;
use inspecthub_sharepoint::ConflictPolicy;

use crate::executor::{JobExecutionError, JobHandler};
use crate::export::{ExportRequest, InspectionExporter};

/// Job type handled by [`SharePointExportJobHandler`].
pub const SHAREPOINT_EXPORT_JOB_TYPE: &str = "sharepoint_export";

/// Payload of a `sharepoint_export` job.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportPayload {
    /// Inspection to export
    pub inspection_id: Uuid,
    /// Form type of the inspection
    pub form_type: String,
    /// Form data override
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub form_data: Option<Value>,
    /// Renderer metadata
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Value>,
    /// Submitting user, for the delegated credential
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<Uuid>,
    /// Duplicate handling override
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conflict_policy: Option<ConflictPolicy>,
}

impl ExportPayload {
    /// Minimal payload for an inspection.
    pub fn new(inspection_id: Uuid, form_type: impl Into<String>) -> Self {
        Self {
            inspection_id,
            form_type: form_type.into(),
            form_data: None,
            metadata: None,
            user_id: None,
            conflict_policy: None,
        }
    }

    /// Parse a job payload; malformed payloads can never succeed.
    pub fn from_job(job: &Job) -> Result<Self, JobExecutionError> {
        serde_json::from_value(job.payload.clone()).map_err(|e| {
            JobExecutionError::permanent(format!("Invalid sharepoint_export payload: {e}"))
        })
    }

    fn into_request(self, job: &Job) -> ExportRequest {
        ExportRequest {
            inspection_id: self.inspection_id,
            form_type: self.form_type,
            form_data: self.form_data,
            metadata: self.metadata.unwrap_or_else(|| serde_json::json!({})),
            user_id: self.user_id,
            conflict_policy: self.conflict_policy,
            attempt: job.retry_count,
            job_id: Some(job.id),
        }
    }
}

/// Handles inspection export jobs
#[derive(Debug)]
pub struct SharePointExportJobHandler {
    /// Export pipeline
    exporter: Arc<InspectionExporter>,
}

impl SharePointExportJobHandler {
    /// Create a new export job handler
    pub fn new(exporter: Arc<InspectionExporter>) -> Self {
        Self { exporter }
    }
}

#[async_trait]
impl JobHandler for SharePointExportJobHandler {
    fn job_type(&self) -> &str {
        SHAREPOINT_EXPORT_JOB_TYPE
    }

    async fn execute(&self, job: &Job) -> Result<Option<Value>, JobExecutionError> {
        let payload = ExportPayload::from_job(job)?;
        let inspection_id = payload.inspection_id;

        tracing::info!(
            job_id = %job.id,
            %inspection_id,
            form_type = %payload.form_type,
            "Exporting inspection"
        );

        let request = payload.into_request(job);
        let result = self.exporter.export(&request).await?;

        let value = serde_json::to_value(&result)
            .map_err(|e| JobExecutionError::transient(format!("Failed to serialize result: {e}")))?;
        Ok(Some(value))
    }
}
