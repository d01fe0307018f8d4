//! Sync audit log entities.

pub mod model;
pub mod status;

pub use model::{CreateSyncLogEntry, SyncLogEntry};
pub use status::{SyncOutcome, SyncStatus, SyncType};
