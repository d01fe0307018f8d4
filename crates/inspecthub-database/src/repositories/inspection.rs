//! Inspection repository (sync projection only).

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use inspecthub_core::error::{AppError, ErrorKind};
use inspecthub_core::result::AppResult;
use inspecthub_entity::inspection::{Inspection, InspectionSyncUpdate};

use crate::store::InspectionStore;

/// Repository for the export-relevant columns of `inspections`.
#[derive(Debug, Clone)]
pub struct InspectionRepository {
    pool: PgPool,
}

impl InspectionRepository {
    /// Create a new inspection repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl InspectionStore for InspectionRepository {
    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Inspection>> {
        sqlx::query_as::<_, Inspection>("SELECT * FROM inspections WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to find inspection", e))
    }

    async fn update_sync_state(&self, id: Uuid, update: &InspectionSyncUpdate) -> AppResult<()> {
        let result = sqlx::query(
            "UPDATE inspections SET sync_status = $2, \
             remote_file_id = COALESCE($3, remote_file_id), \
             remote_file_url = COALESCE($4, remote_file_url), \
             last_synced_at = COALESCE($5, last_synced_at), \
             updated_at = NOW() \
             WHERE id = $1",
        )
        .bind(id)
        .bind(update.sync_status)
        .bind(&update.remote_file_id)
        .bind(&update.remote_file_url)
        .bind(update.last_synced_at)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to update inspection sync state", e)
        })?;

        if result.rows_affected() == 0 {
            return Err(AppError::not_found(format!("Inspection {id} not found")));
        }
        Ok(())
    }
}
