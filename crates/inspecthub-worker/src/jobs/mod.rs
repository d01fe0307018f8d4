//! Job handler implementations.

pub mod sharepoint_export;

pub use sharepoint_export::{SHAREPOINT_EXPORT_JOB_TYPE, SharePointExportJobHandler};
