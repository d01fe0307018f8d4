//! # inspecthub-entity
//!
//! Domain entity models for the InspectHub export subsystem. Every struct
//! in this crate represents a database table row or a domain value object.
//! Database entities derive `sqlx::FromRow`.

pub mod credential;
pub mod inspection;
pub mod job;
pub mod sync;
