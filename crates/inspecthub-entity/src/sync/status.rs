//! Sync enumerations shared by the audit log and the inspection projection.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Whether an attempt created the remote document or replaced a known one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "sync_type", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum SyncType {
    /// First export of the inspection.
    Create,
    /// Re-export of an inspection that already has a remote file.
    Update,
}

/// Outcome of one sync attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "sync_outcome", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum SyncOutcome {
    /// The document reached the library.
    Success,
    /// Both credential tiers failed or rendering failed.
    Failure,
}

/// Denormalized sync state displayed on the inspection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "sync_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum SyncStatus {
    /// Never attempted.
    Pending,
    /// Latest attempt succeeded.
    Synced,
    /// Latest attempt failed.
    Failed,
    /// A retry attempt is under way.
    Retrying,
}

impl SyncType {
    /// Return the type as a lowercase string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Update => "update",
        }
    }
}

impl SyncOutcome {
    /// Return the outcome as a lowercase string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Failure => "failure",
        }
    }
}

impl SyncStatus {
    /// Return the status as a lowercase string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Synced => "synced",
            Self::Failed => "failed",
            Self::Retrying => "retrying",
        }
    }
}

impl fmt::Display for SyncType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl fmt::Display for SyncOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl fmt::Display for SyncStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
