//! Inspection entities (export-relevant columns only).

pub mod model;

pub use model::{Inspection, InspectionSyncUpdate};
