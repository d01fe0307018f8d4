//! OAuth token endpoint client.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tracing;

use inspecthub_core::config::SharePointConfig;
use inspecthub_core::error::{AppError, ErrorKind};
use inspecthub_core::result::AppResult;

/// Tokens returned by a successful grant.
#[derive(Clone)]
pub struct TokenGrant {
    /// New access token.
    pub access_token: String,
    /// Rotated refresh token, when the endpoint issues one.
    pub refresh_token: Option<String>,
    /// Lifetime of the access token in seconds.
    pub expires_in: i64,
}

impl std::fmt::Debug for TokenGrant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenGrant")
            .field("expires_in", &self.expires_in)
            .field("has_refresh_token", &self.refresh_token.is_some())
            .finish()
    }
}

/// The two grants the exporter relies on.
#[async_trait]
pub trait TokenClient: Send + Sync + std::fmt::Debug + 'static {
    /// `client_credentials` grant (service tier).
    async fn client_credentials(&self) -> AppResult<TokenGrant>;

    /// `refresh_token` grant (delegated tier).
    async fn refresh(&self, refresh_token: &str) -> AppResult<TokenGrant>;
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default = "default_expires_in")]
    expires_in: i64,
}

#[derive(Debug, Deserialize)]
struct TokenErrorResponse {
    error: String,
    #[serde(default)]
    error_description: Option<String>,
}

fn default_expires_in() -> i64 {
    3600
}

/// Form-encoded client for an OAuth 2.0 token endpoint.
#[derive(Debug, Clone)]
pub struct OAuthTokenClient {
    http: reqwest::Client,
    token_url: String,
    client_id: String,
    client_secret: String,
    scope: String,
}

impl OAuthTokenClient {
    /// Build a client from the document library settings.
    pub fn from_config(config: &SharePointConfig) -> AppResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_seconds))
            .build()
            .map_err(|e| {
                AppError::with_source(ErrorKind::Configuration, "Failed to build HTTP client", e)
            })?;

        Ok(Self {
            http,
            token_url: config.token_endpoint(),
            client_id: config.client_id.clone(),
            client_secret: config.client_secret.clone(),
            scope: config.scope.clone(),
        })
    }

    async fn request(&self, grant: &str, extra: &[(&str, &str)]) -> AppResult<TokenGrant> {
        let mut form = vec![
            ("grant_type", grant),
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.as_str()),
            ("scope", self.scope.as_str()),
        ];
        form.extend_from_slice(extra);

        tracing::debug!(grant, url = %self.token_url, "Requesting access token");

        let response = self
            .http
            .post(&self.token_url)
            .form(&form)
            .send()
            .await
            .map_err(|e| {
                AppError::with_source(ErrorKind::ExternalService, "Token endpoint unreachable", e)
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let reason = serde_json::from_str::<TokenErrorResponse>(&body)
                .map(|e| match e.error_description {
                    Some(desc) => format!("{}: {}", e.error, desc),
                    None => e.error,
                })
                .unwrap_or(body);
            let kind = if status.is_client_error() {
                ErrorKind::Authentication
            } else {
                ErrorKind::ExternalService
            };
            return Err(AppError::new(
                kind,
                format!("Token request ({grant}) failed with {status}: {reason}"),
            ));
        }

        let token: TokenResponse = response.json().await.map_err(|e| {
            AppError::with_source(ErrorKind::Serialization, "Malformed token response", e)
        })?;

        Ok(TokenGrant {
            access_token: token.access_token,
            refresh_token: token.refresh_token,
            expires_in: token.expires_in,
        })
    }
}

#[async_trait]
impl TokenClient for OAuthTokenClient {
    async fn client_credentials(&self) -> AppResult<TokenGrant> {
        self.request("client_credentials", &[]).await
    }

    async fn refresh(&self, refresh_token: &str) -> AppResult<TokenGrant> {
        self.request("refresh_token", &[("refresh_token", refresh_token)])
            .await
    }
}
