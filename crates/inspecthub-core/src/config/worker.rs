//! Background worker configuration.

use serde::{Deserialize, Serialize};

/// Background job worker configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerConfig {
    /// Whether the worker is enabled.
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Number of jobs processed concurrently by one worker process.
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
    /// Interval in seconds between job queue polls when idle.
    #[serde(default = "default_poll_interval")]
    pub poll_interval_seconds: u64,
    /// Retry budget given to jobs enqueued without an explicit one.
    #[serde(default = "default_max_retries")]
    pub default_max_retries: i32,
    /// First retry delay in seconds; doubles on every further failure.
    #[serde(default = "default_retry_base_delay")]
    pub retry_base_delay_seconds: u64,
    /// Upper bound for the retry delay in seconds.
    #[serde(default = "default_retry_max_delay")]
    pub retry_max_delay_seconds: u64,
    /// Jobs left in `processing` longer than this are reclaimed (0 disables).
    #[serde(default = "default_stale_after")]
    pub stale_after_seconds: u64,
    /// Cron expression (with seconds) for the stale-job sweep.
    #[serde(default = "default_stale_sweep_cron")]
    pub stale_sweep_cron: String,
    /// Seconds to wait for in-flight jobs on shutdown.
    #[serde(default = "default_shutdown_grace")]
    pub shutdown_grace_seconds: u64,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            concurrency: default_concurrency(),
            poll_interval_seconds: default_poll_interval(),
            default_max_retries: default_max_retries(),
            retry_base_delay_seconds: default_retry_base_delay(),
            retry_max_delay_seconds: default_retry_max_delay(),
            stale_after_seconds: default_stale_after(),
            stale_sweep_cron: default_stale_sweep_cron(),
            shutdown_grace_seconds: default_shutdown_grace(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_concurrency() -> usize {
    4
}

fn default_poll_interval() -> u64 {
    5
}

fn default_max_retries() -> i32 {
    3
}

fn default_retry_base_delay() -> u64 {
    30
}

fn default_retry_max_delay() -> u64 {
    3600
}

fn default_stale_after() -> u64 {
    1800
}

fn default_stale_sweep_cron() -> String {
    "0 */5 * * * *".to_string()
}

fn default_shutdown_grace() -> u64 {
    30
}
