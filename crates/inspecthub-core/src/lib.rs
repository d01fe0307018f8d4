//! # inspecthub-core
//!
//! Core crate for the InspectHub export subsystem. Contains configuration
//! schemas, the unified error system and the narrow traits through which
//! the worker reaches its external collaborators (clock, renderer).
//!
//! This crate has **no** internal dependencies on other InspectHub crates.

pub mod config;
pub mod error;
pub mod result;
pub mod traits;

pub use error::AppError;
pub use result::AppResult;
