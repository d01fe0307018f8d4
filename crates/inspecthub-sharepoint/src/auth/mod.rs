//! Credentials for the document library.
//!
//! Two tiers exist: a **delegated** token acting for the user who submitted
//! the inspection, and a **service** token acting as the application. The
//! exporter tries the first and falls back to the second.

pub mod client;
pub mod delegated;
pub mod service;

use std::fmt;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use inspecthub_core::error::{AppError, ErrorKind};
use inspecthub_core::result::AppResult;

pub use client::{OAuthTokenClient, TokenClient, TokenGrant};
pub use delegated::DelegatedCredentialResolver;
pub use service::ServiceCredentialProvider;

/// A bearer token with its expiry.
#[derive(Clone, PartialEq, Eq)]
pub struct AccessToken {
    /// Bearer token value.
    pub token: String,
    /// Instant after which the token is rejected.
    pub expires_at: DateTime<Utc>,
}

impl AccessToken {
    /// Build a token that expires `expires_in_seconds` after `now`.
    ///
    /// The lifetime comes from the token endpoint; one that does not fit a
    /// timestamp is rejected as a malformed response.
    pub fn expiring_in(
        token: String,
        now: DateTime<Utc>,
        expires_in_seconds: i64,
    ) -> AppResult<Self> {
        let expires_at = Duration::try_seconds(expires_in_seconds)
            .and_then(|lifetime| now.checked_add_signed(lifetime))
            .ok_or_else(|| {
                AppError::new(
                    ErrorKind::Serialization,
                    format!("Token lifetime out of range: {expires_in_seconds}s"),
                )
            })?;

        Ok(Self { token, expires_at })
    }

    /// Whether the token is still usable at `now`, keeping `skew` in reserve.
    pub fn is_fresh(&self, now: DateTime<Utc>, skew: Duration) -> bool {
        now.checked_add_signed(skew)
            .is_some_and(|deadline| deadline < self.expires_at)
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccessToken")
            .field("token", &"****")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// Which credential tier performed an upload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CredentialTier {
    /// Token acting on behalf of a user.
    Delegated,
    /// Application token from the `client_credentials` grant.
    Service,
}

impl CredentialTier {
    /// Return the tier as a lowercase string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Delegated => "delegated",
            Self::Service => "service",
        }
    }
}

impl fmt::Display for CredentialTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
