//! Document library (SharePoint drive) and identity provider configuration.

use serde::{Deserialize, Serialize};

/// Settings for the remote document library and its token endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SharePointConfig {
    /// Directory (tenant) identifier.
    pub tenant_id: String,
    /// Application (client) identifier.
    pub client_id: String,
    /// Application secret used for both grant types.
    pub client_secret: String,
    /// Drive identifier of the target document library.
    pub drive_id: String,
    /// Token endpoint; defaults to the tenant's v2.0 endpoint.
    #[serde(default)]
    pub token_url: Option<String>,
    /// Scope requested for both credential tiers.
    #[serde(default = "default_scope")]
    pub scope: String,
    /// Base URL of the Graph API.
    #[serde(default = "default_graph_base_url")]
    pub graph_base_url: String,
    /// Folder inside the drive under which exports are placed.
    #[serde(default = "default_root_folder")]
    pub root_folder: String,
    /// Duplicate handling when the payload does not choose one.
    #[serde(default = "default_conflict_policy")]
    pub default_conflict_policy: String,
    /// Seconds before expiry at which a cached token is considered stale.
    #[serde(default = "default_token_skew")]
    pub token_expiry_skew_seconds: i64,
    /// Per-request timeout in seconds.
    #[serde(default = "default_request_timeout")]
    pub request_timeout_seconds: u64,
}

impl SharePointConfig {
    /// Resolve the token endpoint URL.
    pub fn token_endpoint(&self) -> String {
        match &self.token_url {
            Some(url) => url.clone(),
            None => format!(
                "https://login.microsoftonline.com/{}/oauth2/v2.0/token",
                self.tenant_id
            ),
        }
    }
}

fn default_scope() -> String {
    "https://graph.microsoft.com/.default".to_string()
}

fn default_graph_base_url() -> String {
    "https://graph.microsoft.com/v1.0".to_string()
}

fn default_root_folder() -> String {
    "Inspections".to_string()
}

fn default_conflict_policy() -> String {
    "version".to_string()
}

fn default_token_skew() -> i64 {
    300
}

fn default_request_timeout() -> u64 {
    30
}
