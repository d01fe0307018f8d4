//! In-process store implementations.
//!
//! Every mutation happens under a single async mutex per store, which is
//! what makes [`MemoryJobStore::claim_next`](crate::store::JobStore::claim_next)
//! atomic. Used by the test suites and single-process tooling.

mod credential;
mod inspection;
mod job;
mod sync_log;

pub use credential::MemoryCredentialStore;
pub use inspection::MemoryInspectionStore;
pub use job::MemoryJobStore;
pub use sync_log::MemorySyncLogStore;
