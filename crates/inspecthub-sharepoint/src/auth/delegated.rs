//! Delegated-tier credentials stored per user.

use std::sync::Arc;

use chrono::Duration;
use tracing;
use uuid::Uuid;

use inspecthub_core::error::AppError;
use inspecthub_core::result::AppResult;
use inspecthub_core::traits::clock::Clock;
use inspecthub_database::store::CredentialStore;
use inspecthub_entity::credential::UserCredential;

use super::AccessToken;
use super::client::TokenClient;

/// Loads a user's stored token and refreshes it when it is about to expire.
#[derive(Debug)]
pub struct DelegatedCredentialResolver {
    store: Arc<dyn CredentialStore>,
    client: Arc<dyn TokenClient>,
    clock: Arc<dyn Clock>,
    skew: Duration,
}

impl DelegatedCredentialResolver {
    /// Create a resolver.
    pub fn new(
        store: Arc<dyn CredentialStore>,
        client: Arc<dyn TokenClient>,
        clock: Arc<dyn Clock>,
        skew: Duration,
    ) -> Self {
        Self {
            store,
            client,
            clock,
            skew,
        }
    }

    /// Return a usable token for `user_id`.
    ///
    /// Fails with an authentication error when the user has no stored
    /// credential, or when it is expired and cannot be refreshed.
    pub async fn resolve(&self, user_id: Uuid) -> AppResult<AccessToken> {
        let credential = self.store.find_by_user(user_id).await?.ok_or_else(|| {
            AppError::authentication(format!("No delegated credential for user {user_id}"))
        })?;

        let now = self.clock.now();
        let current = AccessToken {
            token: credential.access_token.clone(),
            expires_at: credential.expires_at,
        };
        if current.is_fresh(now, self.skew) {
            return Ok(current);
        }

        let refresh_token = credential.refresh_token.as_deref().ok_or_else(|| {
            AppError::authentication(format!(
                "Delegated credential for user {user_id} expired and has no refresh token"
            ))
        })?;

        tracing::debug!(%user_id, "Refreshing delegated access token");
        let grant = self.client.refresh(refresh_token).await?;
        let token = AccessToken::expiring_in(grant.access_token, now, grant.expires_in)?;

        let refreshed = UserCredential {
            user_id,
            access_token: token.token.clone(),
            refresh_token: grant.refresh_token.or(credential.refresh_token),
            expires_at: token.expires_at,
            updated_at: now,
        };
        self.store.save(&refreshed).await?;

        Ok(token)
    }
}
