//! # inspecthub-database
//!
//! Persistence for the export subsystem: the store traits the worker is
//! written against, their PostgreSQL repositories, and in-process
//! implementations used by tests and single-process tooling.

pub mod connection;
pub mod memory;
pub mod migration;
pub mod repositories;
pub mod store;

pub use connection::DatabasePool;
pub use store::{CredentialStore, InspectionStore, JobStore, SyncLogStore};
