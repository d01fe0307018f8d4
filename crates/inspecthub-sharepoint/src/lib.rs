//! # inspecthub-sharepoint
//!
//! Client side of the remote document library:
//! - **auth**: token endpoint client, cached service credential, and
//!   refreshable per-user delegated credentials
//! - **library**: the [`DocumentLibrary`](library::DocumentLibrary) seam and
//!   its Graph drive implementation
//! - **path**: deterministic target paths for exported inspections
//! - **upload**: folder creation plus duplicate handling per
//!   [`ConflictPolicy`](conflict::ConflictPolicy)

pub mod auth;
pub mod conflict;
pub mod library;
pub mod path;
pub mod upload;

pub use auth::{AccessToken, CredentialTier};
pub use conflict::{ConflictPolicy, UploadOutcome};
pub use library::{DocumentLibrary, RemoteItem};
pub use path::RemotePath;
pub use upload::{DocumentUploader, UploadResult};
