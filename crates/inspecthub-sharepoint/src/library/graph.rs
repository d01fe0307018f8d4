//! Graph drive API implementation of [`DocumentLibrary`].
//!
//! Items are addressed by path (`/drives/{id}/root:/a/b/c.xlsx`). Uploads use
//! the simple `PUT .../content` call, which the service limits to 4 MiB
//! bodies; rendered inspection workbooks stay well below that.

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::{StatusCode, Url};
use serde::Deserialize;

use inspecthub_core::config::SharePointConfig;
use inspecthub_core::error::{AppError, ErrorKind};
use inspecthub_core::result::AppResult;

use super::{DocumentLibrary, RemoteItem};
use crate::path::RemotePath;

#[derive(Debug, Deserialize)]
struct DriveItem {
    id: String,
    name: String,
    #[serde(rename = "webUrl", default)]
    web_url: String,
}

impl From<DriveItem> for RemoteItem {
    fn from(item: DriveItem) -> Self {
        Self {
            id: item.id,
            name: item.name,
            web_url: item.web_url,
        }
    }
}

/// Document library client for a single drive.
#[derive(Debug, Clone)]
pub struct GraphDocumentLibrary {
    http: reqwest::Client,
    base_url: String,
    drive_id: String,
}

impl GraphDocumentLibrary {
    /// Create a client for `drive_id` under `base_url`.
    pub fn new(base_url: &str, drive_id: &str, timeout: Duration) -> AppResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| {
                AppError::with_source(ErrorKind::Configuration, "Failed to build HTTP client", e)
            })?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            drive_id: drive_id.to_string(),
        })
    }

    /// Create a client from the document library settings.
    pub fn from_config(config: &SharePointConfig) -> AppResult<Self> {
        Self::new(
            &config.graph_base_url,
            &config.drive_id,
            Duration::from_secs(config.request_timeout_seconds),
        )
    }

    /// Build `{base}/drives/{drive}/root:/{path}[:/{action}]`.
    fn item_url(&self, path: &RemotePath, action: Option<&str>) -> AppResult<Url> {
        let mut url = Url::parse(&format!("{}/drives/{}", self.base_url, self.drive_id))
            .map_err(|e| {
                AppError::with_source(ErrorKind::Configuration, "Invalid Graph base URL", e)
            })?;

        {
            let mut segments = url
                .path_segments_mut()
                .map_err(|_| AppError::configuration("Graph base URL cannot carry a path"))?;
            segments.pop_if_empty();

            if path.is_root() {
                segments.push("root");
            } else {
                segments.push("root:");
                let names = path.segments();
                let last = names.len() - 1;
                for (i, name) in names.iter().enumerate() {
                    if i == last && action.is_some() {
                        segments.push(&format!("{name}:"));
                    } else {
                        segments.push(name);
                    }
                }
            }

            if let Some(action) = action {
                segments.push(action);
            }
        }

        Ok(url)
    }

    async fn send(
        &self,
        request: reqwest::RequestBuilder,
        what: &str,
    ) -> AppResult<reqwest::Response> {
        request.send().await.map_err(|e| {
            AppError::with_source(
                ErrorKind::ExternalService,
                format!("Document library request failed ({what})"),
                e,
            )
        })
    }
}

/// Map a non-success response to an error carrying the body text.
async fn status_error(response: reqwest::Response, what: &str) -> AppError {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    let kind = match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => ErrorKind::Authentication,
        StatusCode::TOO_MANY_REQUESTS | StatusCode::SERVICE_UNAVAILABLE => {
            ErrorKind::ServiceUnavailable
        }
        _ => ErrorKind::ExternalService,
    };
    AppError::new(kind, format!("Document library {what} returned {status}: {body}"))
}

async fn parse_item(response: reqwest::Response, what: &str) -> AppResult<RemoteItem> {
    response
        .json::<DriveItem>()
        .await
        .map(RemoteItem::from)
        .map_err(|e| {
            AppError::with_source(
                ErrorKind::Serialization,
                format!("Malformed drive item in {what} response"),
                e,
            )
        })
}

#[async_trait]
impl DocumentLibrary for GraphDocumentLibrary {
    async fn ensure_folder(&self, token: &str, folder: &RemotePath) -> AppResult<()> {
        let (parent, name) = match (folder.parent(), folder.file_name()) {
            (Some(parent), Some(name)) => (parent, name.to_string()),
            _ => return Ok(()),
        };

        let url = self.item_url(&parent, Some("children"))?;

        let body = serde_json::json!({
            "name": name,
            "folder": {},
            "@microsoft.graph.conflictBehavior": "fail",
        });

        let response = self
            .send(self.http.post(url).bearer_auth(token).json(&body), "create folder")
            .await?;

        match response.status() {
            s if s.is_success() => {
                tracing::debug!(folder = %folder, "Created folder");
                Ok(())
            }
            // Listings are eventually consistent; a concurrent or earlier
            // create surfaces as a name conflict.
            StatusCode::CONFLICT => Ok(()),
            _ => Err(status_error(response, "create folder").await),
        }
    }

    async fn find_item(&self, token: &str, path: &RemotePath) -> AppResult<Option<RemoteItem>> {
        let url = self.item_url(path, None)?;
        let response = self
            .send(self.http.get(url).bearer_auth(token), "lookup")
            .await?;

        match response.status() {
            StatusCode::NOT_FOUND => Ok(None),
            s if s.is_success() => parse_item(response, "lookup").await.map(Some),
            _ => Err(status_error(response, "lookup").await),
        }
    }

    async fn put_content(
        &self,
        token: &str,
        path: &RemotePath,
        content: Bytes,
        content_type: &str,
    ) -> AppResult<RemoteItem> {
        let mut url = self.item_url(path, Some("content"))?;
        url.query_pairs_mut()
            .append_pair("@microsoft.graph.conflictBehavior", "replace");

        let size = content.len();
        let response = self
            .send(
                self.http
                    .put(url)
                    .bearer_auth(token)
                    .header(reqwest::header::CONTENT_TYPE, content_type)
                    .body(content),
                "upload",
            )
            .await?;

        if !response.status().is_success() {
            return Err(status_error(response, "upload").await);
        }

        let item = parse_item(response, "upload").await?;
        tracing::debug!(path = %path, item_id = %item.id, size, "Uploaded document");
        Ok(item)
    }
}
