//! In-process sync audit log.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
use uuid::Uuid;

use inspecthub_core::result::AppResult;
use inspecthub_core::traits::clock::{Clock, SystemClock};
use inspecthub_entity::sync::{CreateSyncLogEntry, SyncLogEntry, SyncOutcome};

use crate::store::SyncLogStore;

/// Append-only vector of audit entries.
#[derive(Debug, Clone)]
pub struct MemorySyncLogStore {
    entries: Arc<Mutex<Vec<SyncLogEntry>>>,
    clock: Arc<dyn Clock>,
}

impl MemorySyncLogStore {
    /// Create an empty log on wall-clock time.
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    /// Create an empty log reading time from `clock`.
    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: Arc::new(Mutex::new(Vec::new())),
            clock,
        }
    }

    /// Every entry in insertion order.
    pub async fn all(&self) -> Vec<SyncLogEntry> {
        self.entries.lock().await.clone()
    }
}

impl Default for MemorySyncLogStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SyncLogStore for MemorySyncLogStore {
    async fn append(&self, data: &CreateSyncLogEntry) -> AppResult<SyncLogEntry> {
        let entry = SyncLogEntry {
            id: Uuid::new_v4(),
            inspection_id: data.inspection_id,
            sync_type: data.sync_type,
            status: data.status,
            error_message: data.error_message.clone(),
            metadata: data.metadata.clone(),
            created_at: self.clock.now(),
        };
        self.entries.lock().await.push(entry.clone());
        Ok(entry)
    }

    async fn find_by_inspection(&self, inspection_id: Uuid) -> AppResult<Vec<SyncLogEntry>> {
        let entries = self.entries.lock().await;
        Ok(entries
            .iter()
            .rev()
            .filter(|e| e.inspection_id == inspection_id)
            .cloned()
            .collect())
    }

    async fn find_failures_since(&self, since: DateTime<Utc>) -> AppResult<Vec<SyncLogEntry>> {
        let entries = self.entries.lock().await;
        Ok(entries
            .iter()
            .rev()
            .filter(|e| e.status == SyncOutcome::Failure && e.created_at >= since)
            .cloned()
            .collect())
    }
}
