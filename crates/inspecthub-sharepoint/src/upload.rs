//! Idempotent upload: folder creation, existence check, then the conflict
//! policy.

use std::sync::Arc;

use bytes::Bytes;
use tracing;

use inspecthub_core::result::AppResult;
use inspecthub_core::traits::clock::Clock;

use crate::conflict::{ConflictPolicy, UploadOutcome};
use crate::library::{DocumentLibrary, RemoteItem};
use crate::path::RemotePath;

/// Timestamp format appended by [`ConflictPolicy::Rename`].
const RENAME_SUFFIX_FORMAT: &str = "_%Y%m%d_%H%M%S";

/// What an upload produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadResult {
    /// The remote object now representing the document.
    pub item: RemoteItem,
    /// What actually happened at the target path.
    pub outcome: UploadOutcome,
    /// Final path (differs from the requested one after a rename).
    pub path: RemotePath,
}

/// Writes documents into a [`DocumentLibrary`] under a [`ConflictPolicy`].
#[derive(Debug, Clone)]
pub struct DocumentUploader {
    library: Arc<dyn DocumentLibrary>,
    clock: Arc<dyn Clock>,
}

impl DocumentUploader {
    /// Create an uploader.
    pub fn new(library: Arc<dyn DocumentLibrary>, clock: Arc<dyn Clock>) -> Self {
        Self { library, clock }
    }

    /// Upload `content` to `path` with the given bearer token.
    pub async fn upload(
        &self,
        token: &str,
        path: &RemotePath,
        content: Bytes,
        content_type: &str,
        policy: ConflictPolicy,
    ) -> AppResult<UploadResult> {
        for folder in path.ancestors() {
            self.library.ensure_folder(token, &folder).await?;
        }

        let existing = self.library.find_item(token, path).await?;

        let (target, outcome) = match (existing, policy) {
            (None, _) => (path.clone(), UploadOutcome::Created),
            (Some(item), ConflictPolicy::Skip) => {
                tracing::info!(path = %path, item_id = %item.id, "Target exists, skipping upload");
                return Ok(UploadResult {
                    item,
                    outcome: UploadOutcome::Skipped,
                    path: path.clone(),
                });
            }
            (Some(_), ConflictPolicy::Rename) => {
                let suffix = self.clock.now().format(RENAME_SUFFIX_FORMAT).to_string();
                (path.with_suffix(&suffix), UploadOutcome::Created)
            }
            (Some(_), ConflictPolicy::Overwrite | ConflictPolicy::Version) => {
                (path.clone(), UploadOutcome::Overwritten)
            }
        };

        let item = self
            .library
            .put_content(token, &target, content, content_type)
            .await?;

        tracing::info!(
            path = %target,
            item_id = %item.id,
            policy = %policy,
            outcome = %outcome,
            "Uploaded document"
        );

        Ok(UploadResult {
            item,
            outcome,
            path: target,
        })
    }
}
