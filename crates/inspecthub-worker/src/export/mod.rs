//! Inspection export pipeline: render, upload with credential fallback,
//! then record the outcome in the audit log and the sync projection.

pub mod exporter;
pub mod renderer;

pub use exporter::{ExportRequest, ExportResult, ExportSettings, InspectionExporter};
pub use renderer::HttpDocumentRenderer;
