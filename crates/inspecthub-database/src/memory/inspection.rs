//! In-process inspection store.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;
use uuid::Uuid;

use inspecthub_core::error::AppError;
use inspecthub_core::result::AppResult;
use inspecthub_core::traits::clock::{Clock, SystemClock};
use inspecthub_entity::inspection::{Inspection, InspectionSyncUpdate};

use crate::store::InspectionStore;

/// Inspections held in a map keyed by ID.
#[derive(Debug, Clone)]
pub struct MemoryInspectionStore {
    inspections: Arc<Mutex<HashMap<Uuid, Inspection>>>,
    clock: Arc<dyn Clock>,
}

impl MemoryInspectionStore {
    /// Create an empty store on wall-clock time.
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    /// Create an empty store reading time from `clock`.
    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            inspections: Arc::new(Mutex::new(HashMap::new())),
            clock,
        }
    }

    /// Insert or replace an inspection.
    pub async fn insert(&self, inspection: Inspection) {
        self.inspections
            .lock()
            .await
            .insert(inspection.id, inspection);
    }
}

impl Default for MemoryInspectionStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl InspectionStore for MemoryInspectionStore {
    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Inspection>> {
        Ok(self.inspections.lock().await.get(&id).cloned())
    }

    async fn update_sync_state(&self, id: Uuid, update: &InspectionSyncUpdate) -> AppResult<()> {
        let mut inspections = self.inspections.lock().await;
        let inspection = inspections
            .get_mut(&id)
            .ok_or_else(|| AppError::not_found(format!("Inspection {id} not found")))?;

        inspection.sync_status = update.sync_status;
        if let Some(file_id) = &update.remote_file_id {
            inspection.remote_file_id = Some(file_id.clone());
        }
        if let Some(url) = &update.remote_file_url {
            inspection.remote_file_url = Some(url.clone());
        }
        if let Some(at) = update.last_synced_at {
            inspection.last_synced_at = Some(at);
        }
        inspection.updated_at = self.clock.now();
        Ok(())
    }
}
