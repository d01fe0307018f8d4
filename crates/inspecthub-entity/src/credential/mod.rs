//! Delegated (per-user) credential entities.

pub mod model;

pub use model::UserCredential;
