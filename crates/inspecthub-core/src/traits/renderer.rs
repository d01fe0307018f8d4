//! Export artifact rendering.

use async_trait::async_trait;
use bytes::Bytes;
use serde_json::Value;

use crate::result::AppResult;

/// A rendered export artifact ready for upload.
#[derive(Debug, Clone)]
pub struct RenderedDocument {
    /// Document body.
    pub content: Bytes,
    /// File extension without the leading dot (e.g. `"xlsx"`).
    pub extension: String,
    /// MIME type sent with the upload.
    pub content_type: String,
}

/// Turns a form's data into the document stored in the library.
///
/// Treated as a pure function by the export job; template filling lives
/// behind this trait.
#[async_trait]
pub trait DocumentRenderer: Send + Sync + std::fmt::Debug + 'static {
    /// Render `form_data` using the template for `form_type`.
    async fn render(
        &self,
        form_type: &str,
        form_data: &Value,
        metadata: &Value,
    ) -> AppResult<RenderedDocument>;
}
