//! In-process delegated credential store.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;
use uuid::Uuid;

use inspecthub_core::result::AppResult;
use inspecthub_entity::credential::UserCredential;

use crate::store::CredentialStore;

/// Credentials held in a map keyed by user.
#[derive(Debug, Clone, Default)]
pub struct MemoryCredentialStore {
    credentials: Arc<Mutex<HashMap<Uuid, UserCredential>>>,
}

impl MemoryCredentialStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CredentialStore for MemoryCredentialStore {
    async fn find_by_user(&self, user_id: Uuid) -> AppResult<Option<UserCredential>> {
        Ok(self.credentials.lock().await.get(&user_id).cloned())
    }

    async fn save(&self, credential: &UserCredential) -> AppResult<()> {
        self.credentials
            .lock()
            .await
            .insert(credential.user_id, credential.clone());
        Ok(())
    }
}
