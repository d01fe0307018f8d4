//! Remote document library seam.

pub mod graph;

use async_trait::async_trait;
use bytes::Bytes;
use serde::{Deserialize, Serialize};

use inspecthub_core::result::AppResult;

use crate::path::RemotePath;

pub use graph::GraphDocumentLibrary;

/// Identity of an object in the library.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteItem {
    /// Library-assigned item identifier.
    pub id: String,
    /// Item name.
    pub name: String,
    /// Browser URL.
    pub web_url: String,
}

/// Hierarchical, bearer-authenticated document storage.
///
/// Every call takes the token explicitly so one client instance serves
/// both credential tiers.
#[async_trait]
pub trait DocumentLibrary: Send + Sync + std::fmt::Debug + 'static {
    /// Create `folder` if missing. "Already exists" is success.
    async fn ensure_folder(&self, token: &str, folder: &RemotePath) -> AppResult<()>;

    /// Look up the object at `path`.
    async fn find_item(&self, token: &str, path: &RemotePath) -> AppResult<Option<RemoteItem>>;

    /// Create or replace the object at `path`.
    async fn put_content(
        &self,
        token: &str,
        path: &RemotePath,
        content: Bytes,
        content_type: &str,
    ) -> AppResult<RemoteItem>;
}
