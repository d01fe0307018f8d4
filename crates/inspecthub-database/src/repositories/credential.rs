//! Delegated credential repository.

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use inspecthub_core::error::{AppError, ErrorKind};
use inspecthub_core::result::AppResult;
use inspecthub_entity::credential::UserCredential;

use crate::store::CredentialStore;

/// Repository for per-user document library tokens.
#[derive(Debug, Clone)]
pub struct CredentialRepository {
    pool: PgPool,
}

impl CredentialRepository {
    /// Create a new credential repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CredentialStore for CredentialRepository {
    async fn find_by_user(&self, user_id: Uuid) -> AppResult<Option<UserCredential>> {
        sqlx::query_as::<_, UserCredential>("SELECT * FROM user_credentials WHERE user_id = $1")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to load credential", e))
    }

    async fn save(&self, credential: &UserCredential) -> AppResult<()> {
        sqlx::query(
            "INSERT INTO user_credentials \
             (user_id, access_token, refresh_token, expires_at, updated_at) \
             VALUES ($1, $2, $3, $4, NOW()) \
             ON CONFLICT (user_id) DO UPDATE SET access_token = EXCLUDED.access_token, \
             refresh_token = EXCLUDED.refresh_token, expires_at = EXCLUDED.expires_at, \
             updated_at = NOW()",
        )
        .bind(credential.user_id)
        .bind(&credential.access_token)
        .bind(&credential.refresh_token)
        .bind(credential.expires_at)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to save credential", e))?;
        Ok(())
    }
}
