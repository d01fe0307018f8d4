//! Duplicate handling at the target path.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use inspecthub_core::error::AppError;

/// What to do when an object already exists at the target path.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConflictPolicy {
    /// Replace the existing object in place.
    Overwrite,
    /// Keep the existing object and return its identity without writing.
    Skip,
    /// Write a new object next to it with a timestamp suffix.
    Rename,
    /// Write through and let the library's version history keep the old one.
    #[default]
    Version,
}

/// What an upload actually did, recorded in the audit log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UploadOutcome {
    /// A new object was written.
    Created,
    /// An existing object was replaced (or gained a new version).
    Overwritten,
    /// The existing object was kept.
    Skipped,
}

impl ConflictPolicy {
    /// Return the policy as a lowercase string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Overwrite => "overwrite",
            Self::Skip => "skip",
            Self::Rename => "rename",
            Self::Version => "version",
        }
    }
}

impl UploadOutcome {
    /// Return the outcome as a lowercase string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Overwritten => "overwritten",
            Self::Skipped => "skipped",
        }
    }
}

impl fmt::Display for ConflictPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl fmt::Display for UploadOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ConflictPolicy {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "overwrite" | "replace" => Ok(Self::Overwrite),
            "skip" => Ok(Self::Skip),
            "rename" => Ok(Self::Rename),
            "version" => Ok(Self::Version),
            other => Err(AppError::validation(format!(
                "Unknown conflict policy '{other}'"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_version() {
        assert_eq!(ConflictPolicy::default(), ConflictPolicy::Version);
    }

    #[test]
    fn test_parse() {
        assert_eq!("Skip".parse::<ConflictPolicy>().unwrap(), ConflictPolicy::Skip);
        assert_eq!(
            "replace".parse::<ConflictPolicy>().unwrap(),
            ConflictPolicy::Overwrite
        );
        assert!("merge".parse::<ConflictPolicy>().is_err());
    }

    #[test]
    fn test_serde_lowercase() {
        let json = serde_json::to_string(&UploadOutcome::Overwritten).unwrap();
        assert_eq!(json, "\"overwritten\"");
        let policy: ConflictPolicy = serde_json::from_str("\"rename\"").unwrap();
        assert_eq!(policy, ConflictPolicy::Rename);
    }
}
