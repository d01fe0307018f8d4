//! [`DocumentRenderer`] backed by the rendering service.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use inspecthub_core::config::RendererConfig;
use inspecthub_core::error::{AppError, ErrorKind};
use inspecthub_core::result::AppResult;
use inspecthub_core::traits::renderer::{DocumentRenderer, RenderedDocument};

const XLSX: &str = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";
const DOCX: &str = "application/vnd.openxmlformats-officedocument.wordprocessingml.document";

/// Posts form data to `{url}/render/{form_type}` and takes the response
/// body as the document.
#[derive(Debug, Clone)]
pub struct HttpDocumentRenderer {
    http: reqwest::Client,
    base_url: String,
}

impl HttpDocumentRenderer {
    /// Create a renderer client from its settings.
    pub fn from_config(config: &RendererConfig) -> AppResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .map_err(|e| {
                AppError::with_source(ErrorKind::Configuration, "Failed to build HTTP client", e)
            })?;

        Ok(Self {
            http,
            base_url: config.url.trim_end_matches('/').to_string(),
        })
    }
}

/// File extension for a rendered content type.
fn extension_for(content_type: &str) -> &'static str {
    let mime = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();

    match mime.as_str() {
        XLSX => "xlsx",
        DOCX => "docx",
        "application/pdf" => "pdf",
        "text/csv" => "csv",
        "application/json" => "json",
        _ => "bin",
    }
}

#[async_trait]
impl DocumentRenderer for HttpDocumentRenderer {
    async fn render(
        &self,
        form_type: &str,
        form_data: &Value,
        metadata: &Value,
    ) -> AppResult<RenderedDocument> {
        let url = format!("{}/render/{}", self.base_url, form_type);
        let body = serde_json::json!({
            "formData": form_data,
            "metadata": metadata,
        });

        let response = self
            .http
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                AppError::with_source(ErrorKind::ExternalService, "Renderer unreachable", e)
            })?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let kind = if status.is_client_error() {
                ErrorKind::Validation
            } else {
                ErrorKind::ExternalService
            };
            return Err(AppError::new(
                kind,
                format!("Renderer returned {status} for form type '{form_type}': {text}"),
            ));
        }

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or(XLSX)
            .to_string();

        let content = response.bytes().await.map_err(|e| {
            AppError::with_source(ErrorKind::ExternalService, "Failed to read rendered document", e)
        })?;

        Ok(RenderedDocument {
            content,
            extension: extension_for(&content_type).to_string(),
            content_type,
        })
    }
}
