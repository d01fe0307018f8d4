//! Background job processing for InspectHub.
//!
//! This crate provides:
//! - A job queue over a [`JobStore`](inspecthub_database::JobStore) with
//!   validation, defaults and retry backoff
//! - A job executor that dispatches jobs to the registered handler
//! - A worker runner that claims and executes jobs, in batches or as a
//!   long-running poll loop
//! - A cron scheduler that reclaims jobs abandoned by crashed workers
//! - The inspection export pipeline and its `sharepoint_export` job handler

pub mod context;
pub mod executor;
pub mod export;
pub mod jobs;
pub mod queue;
pub mod retry;
pub mod runner;
pub mod scheduler;

pub use context::WorkerContext;
pub use executor::{JobExecutionError, JobExecutor, JobHandler};
pub use queue::{EnqueueRequest, JobQueue, QueueStats};
pub use retry::RetryPolicy;
pub use runner::{BatchSummary, WorkerRunner};
pub use scheduler::CronScheduler;
