//! Stored delegated credential.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// An access token obtained on behalf of a user, with its refresh token.
#[derive(Clone, Serialize, Deserialize, FromRow)]
pub struct UserCredential {
    /// Owning user.
    pub user_id: Uuid,
    /// Bearer token for the document library.
    pub access_token: String,
    /// Token used for the `refresh_token` grant.
    pub refresh_token: Option<String>,
    /// Access token expiry.
    pub expires_at: DateTime<Utc>,
    /// When the credential was last written.
    pub updated_at: DateTime<Utc>,
}

impl std::fmt::Debug for UserCredential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UserCredential")
            .field("user_id", &self.user_id)
            .field("access_token", &"****")
            .field("has_refresh_token", &self.refresh_token.is_some())
            .field("expires_at", &self.expires_at)
            .finish()
    }
}
