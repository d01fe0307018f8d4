//! Sync audit entry entity model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use super::status::{SyncOutcome, SyncType};

/// An immutable record of one sync attempt for an inspection.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct SyncLogEntry {
    /// Unique entry identifier.
    pub id: Uuid,
    /// Inspection the attempt was for.
    pub inspection_id: Uuid,
    /// Create or update.
    pub sync_type: SyncType,
    /// Success or failure.
    pub status: SyncOutcome,
    /// Error text for failures.
    pub error_message: Option<String>,
    /// Remote file id, credential tier, upload outcome and the like.
    pub metadata: Option<serde_json::Value>,
    /// When the attempt finished.
    pub created_at: DateTime<Utc>,
}

/// Data required to append a sync audit entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateSyncLogEntry {
    /// Inspection the attempt was for.
    pub inspection_id: Uuid,
    /// Create or update.
    pub sync_type: SyncType,
    /// Success or failure.
    pub status: SyncOutcome,
    /// Error text for failures.
    pub error_message: Option<String>,
    /// Free-form diagnostics.
    pub metadata: Option<serde_json::Value>,
}
