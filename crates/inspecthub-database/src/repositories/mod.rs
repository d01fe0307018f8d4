//! PostgreSQL repository implementations of the store traits.

pub mod credential;
pub mod inspection;
pub mod job;
pub mod sync_log;

pub use credential::CredentialRepository;
pub use inspection::InspectionRepository;
pub use job::JobRepository;
pub use sync_log::SyncLogRepository;
