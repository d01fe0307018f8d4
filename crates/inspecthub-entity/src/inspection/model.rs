//! Inspection entity model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::sync::SyncStatus;

/// The business record being exported.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Inspection {
    /// Unique inspection identifier.
    pub id: Uuid,
    /// Human-facing inspection number, used in the remote file name.
    pub inspection_number: String,
    /// Form type the inspection was filled in with.
    pub form_type: String,
    /// When the inspection took place; selects the month folder.
    pub inspected_at: DateTime<Utc>,
    /// Captured form data.
    pub form_data: serde_json::Value,
    /// Denormalized latest sync state.
    pub sync_status: SyncStatus,
    /// Remote document identifier of the latest successful export.
    pub remote_file_id: Option<String>,
    /// Browser URL of the remote document.
    pub remote_file_url: Option<String>,
    /// When the latest successful export finished.
    pub last_synced_at: Option<DateTime<Utc>>,
    /// When the inspection was created.
    pub created_at: DateTime<Utc>,
    /// When the inspection was last updated.
    pub updated_at: DateTime<Utc>,
}

/// Sync projection written after an export attempt.
///
/// `None` remote fields leave the stored values untouched, so a failed
/// attempt does not erase the locator of an earlier successful export.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InspectionSyncUpdate {
    /// New sync status.
    pub sync_status: SyncStatus,
    /// Remote document identifier.
    pub remote_file_id: Option<String>,
    /// Remote document URL.
    pub remote_file_url: Option<String>,
    /// Completion time of a successful export.
    pub last_synced_at: Option<DateTime<Utc>>,
}

impl InspectionSyncUpdate {
    /// Projection for a successful export.
    pub fn synced(file_id: String, file_url: String, at: DateTime<Utc>) -> Self {
        Self {
            sync_status: SyncStatus::Synced,
            remote_file_id: Some(file_id),
            remote_file_url: Some(file_url),
            last_synced_at: Some(at),
        }
    }

    /// Projection carrying only a status change.
    pub fn status(sync_status: SyncStatus) -> Self {
        Self {
            sync_status,
            remote_file_id: None,
            remote_file_url: None,
            last_synced_at: None,
        }
    }
}
