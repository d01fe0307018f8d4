//! Service-tier credential with a per-process cache.

use std::sync::Arc;

use chrono::Duration;
use tokio::sync::Mutex;
use tracing;

use inspecthub_core::result::AppResult;
use inspecthub_core::traits::clock::Clock;

use super::AccessToken;
use super::client::TokenClient;

/// Hands out the application token, fetching a new one only when the cached
/// token is within `skew` of expiry.
#[derive(Debug)]
pub struct ServiceCredentialProvider {
    client: Arc<dyn TokenClient>,
    clock: Arc<dyn Clock>,
    skew: Duration,
    cached: Mutex<Option<AccessToken>>,
}

impl ServiceCredentialProvider {
    /// Create a provider with an empty cache.
    pub fn new(client: Arc<dyn TokenClient>, clock: Arc<dyn Clock>, skew: Duration) -> Self {
        Self {
            client,
            clock,
            skew,
            cached: Mutex::new(None),
        }
    }

    /// Return a fresh service token.
    ///
    /// The cache lock is held across the fetch so concurrent exports share a
    /// single token request.
    pub async fn access_token(&self) -> AppResult<AccessToken> {
        let mut cached = self.cached.lock().await;
        let now = self.clock.now();

        if let Some(token) = cached.as_ref() {
            if token.is_fresh(now, self.skew) {
                return Ok(token.clone());
            }
        }

        let grant = self.client.client_credentials().await?;
        let token = AccessToken::expiring_in(grant.access_token, now, grant.expires_in)?;
        tracing::info!(expires_at = %token.expires_at, "Obtained service access token");
        *cached = Some(token.clone());
        Ok(token)
    }

    /// Drop the cached token, e.g. after the library rejected it.
    pub async fn invalidate(&self) {
        *self.cached.lock().await = None;
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use chrono::Utc;

    use inspecthub_core::error::AppError;
    use inspecthub_core::traits::clock::ManualClock;

    use super::*;
    use crate::auth::client::TokenGrant;

    #[derive(Debug, Default)]
    struct CountingClient {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl TokenClient for CountingClient {
        async fn client_credentials(&self) -> AppResult<TokenGrant> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            Ok(TokenGrant {
                access_token: format!("svc-{n}"),
                refresh_token: None,
                expires_in: 3600,
            })
        }

        async fn refresh(&self, _refresh_token: &str) -> AppResult<TokenGrant> {
            Err(AppError::internal("not used"))
        }
    }

    #[tokio::test]
    async fn test_token_is_cached_until_skew() {
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let client = Arc::new(CountingClient::default());
        let provider =
            ServiceCredentialProvider::new(client.clone(), clock.clone(), Duration::minutes(5));

        let first = provider.access_token().await.unwrap();
        let second = provider.access_token().await.unwrap();
        assert_eq!(first.token, "svc-1");
        assert_eq!(second.token, "svc-1");
        assert_eq!(client.calls.load(Ordering::SeqCst), 1);

        clock.advance(Duration::minutes(56));
        let third = provider.access_token().await.unwrap();
        assert_eq!(third.token, "svc-2");
        assert_eq!(client.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_invalidate_forces_refetch() {
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let client = Arc::new(CountingClient::default());
        let provider = ServiceCredentialProvider::new(client.clone(), clock, Duration::zero());

        provider.access_token().await.unwrap();
        provider.invalidate().await;
        let token = provider.access_token().await.unwrap();
        assert_eq!(token.token, "svc-2");
    }
}
