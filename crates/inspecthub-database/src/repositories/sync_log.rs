//! Sync audit log repository.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use inspecthub_core::error::{AppError, ErrorKind};
use inspecthub_core::result::AppResult;
use inspecthub_entity::sync::{CreateSyncLogEntry, SyncLogEntry};

use crate::store::SyncLogStore;

/// Repository for sync audit entries. Insert-only.
#[derive(Debug, Clone)]
pub struct SyncLogRepository {
    pool: PgPool,
}

impl SyncLogRepository {
    /// Create a new sync log repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SyncLogStore for SyncLogRepository {
    async fn append(&self, data: &CreateSyncLogEntry) -> AppResult<SyncLogEntry> {
        sqlx::query_as::<_, SyncLogEntry>(
            "INSERT INTO sync_log (inspection_id, sync_type, status, error_message, metadata) \
             VALUES ($1, $2, $3, $4, $5) RETURNING *",
        )
        .bind(data.inspection_id)
        .bind(data.sync_type)
        .bind(data.status)
        .bind(&data.error_message)
        .bind(&data.metadata)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to append sync log entry", e)
        })
    }

    async fn find_by_inspection(&self, inspection_id: Uuid) -> AppResult<Vec<SyncLogEntry>> {
        sqlx::query_as::<_, SyncLogEntry>(
            "SELECT * FROM sync_log WHERE inspection_id = $1 ORDER BY created_at DESC",
        )
        .bind(inspection_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to load sync history", e))
    }

    async fn find_failures_since(&self, since: DateTime<Utc>) -> AppResult<Vec<SyncLogEntry>> {
        sqlx::query_as::<_, SyncLogEntry>(
            "SELECT * FROM sync_log WHERE status = 'failure' AND created_at >= $1 \
             ORDER BY created_at DESC",
        )
        .bind(since)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to load sync failures", e))
    }
}
