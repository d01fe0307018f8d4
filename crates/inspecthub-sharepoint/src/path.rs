//! Remote paths and the deterministic export location.
//!
//! The same inspection always maps to the same path, which is what turns
//! a retried upload into a replace instead of a duplicate.

use std::fmt;

use chrono::{DateTime, Utc};

/// Characters the document library rejects in item names.
const FORBIDDEN: &[char] = &['"', '*', ':', '<', '>', '?', '/', '\\', '|', '#', '%'];

/// A slash-separated path inside the drive, stored as sanitized segments.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RemotePath {
    segments: Vec<String>,
}

impl RemotePath {
    /// The drive root.
    pub fn root() -> Self {
        Self {
            segments: Vec::new(),
        }
    }

    /// Parse a `/`-separated path; empty segments are dropped.
    pub fn parse(path: &str) -> Self {
        Self {
            segments: path
                .split('/')
                .filter(|s| !s.trim().is_empty())
                .map(sanitize_segment)
                .collect(),
        }
    }

    /// Append one segment (sanitized).
    pub fn join(&self, segment: &str) -> Self {
        let mut segments = self.segments.clone();
        segments.push(sanitize_segment(segment));
        Self { segments }
    }

    /// Whether this is the drive root.
    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    /// Path segments.
    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// Last segment.
    pub fn file_name(&self) -> Option<&str> {
        self.segments.last().map(String::as_str)
    }

    /// Containing folder.
    pub fn parent(&self) -> Option<RemotePath> {
        if self.segments.is_empty() {
            return None;
        }
        Some(Self {
            segments: self.segments[..self.segments.len() - 1].to_vec(),
        })
    }

    /// Every ancestor folder from the top down, excluding the root.
    pub fn ancestors(&self) -> Vec<RemotePath> {
        (1..self.segments.len())
            .map(|n| Self {
                segments: self.segments[..n].to_vec(),
            })
            .collect()
    }

    /// Insert `suffix` before the extension of the last segment.
    pub fn with_suffix(&self, suffix: &str) -> Self {
        let mut segments = self.segments.clone();
        if let Some(last) = segments.last_mut() {
            *last = match last.rfind('.') {
                Some(dot) if dot > 0 => format!("{}{}{}", &last[..dot], suffix, &last[dot..]),
                _ => format!("{last}{suffix}"),
            };
        }
        Self { segments }
    }
}

impl fmt::Display for RemotePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.segments.join("/"))
    }
}

/// Replace characters the library rejects and trim trailing dots/spaces.
pub fn sanitize_segment(segment: &str) -> String {
    let cleaned: String = segment
        .chars()
        .map(|c| if FORBIDDEN.contains(&c) || c.is_control() { '_' } else { c })
        .collect();
    let trimmed = cleaned.trim().trim_end_matches('.').trim_end();
    if trimmed.is_empty() {
        "_".to_string()
    } else {
        trimmed.to_string()
    }
}

/// `"fire_extinguisher"` → `"Fire Extinguisher"`.
pub fn form_type_title(form_type: &str) -> String {
    form_type
        .split(['_', '-', ' '])
        .filter(|w| !w.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Target location of an exported inspection:
/// `{root}/{Form Type}/{YYYY}/{MM-Month}/{Form Type} {number}.{ext}`.
pub fn export_path(
    root_folder: &str,
    form_type: &str,
    inspected_at: DateTime<Utc>,
    inspection_number: &str,
    extension: &str,
) -> RemotePath {
    let title = form_type_title(form_type);
    let extension = extension.trim_start_matches('.');
    RemotePath::parse(root_folder)
        .join(&title)
        .join(&inspected_at.format("%Y").to_string())
        .join(&inspected_at.format("%m-%B").to_string())
        .join(&format!("{title} {inspection_number}.{extension}"))
}
