//! Job executor: dispatches jobs to registered handlers.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tracing;

use inspecthub_core::error::{AppError, ErrorKind};
use inspecthub_core::result::AppResult;
use inspecthub_entity::job::Job;

/// Trait for job handler implementations
#[async_trait]
pub trait JobHandler: Send + Sync + std::fmt::Debug {
    /// Get the job type this handler processes
    fn job_type(&self) -> &str;

    /// Execute the job, returning the result stored on the job record
    async fn execute(&self, job: &Job) -> Result<Option<Value>, JobExecutionError>;
}

/// Error from job execution
#[derive(Debug, thiserror::Error)]
pub enum JobExecutionError {
    /// Failure that may succeed on a later attempt
    #[error("Transient job failure: {message}")]
    Transient {
        /// Human-readable failure
        message: String,
        /// Structured detail stored in `error_details`
        details: Option<Value>,
    },

    /// Failure that no retry can fix; the job becomes terminal
    #[error("Permanent job failure: {message}")]
    Permanent {
        /// Human-readable failure
        message: String,
        /// Structured detail stored in `error_details`
        details: Option<Value>,
    },
}

impl JobExecutionError {
    /// Transient failure without details.
    pub fn transient(message: impl Into<String>) -> Self {
        Self::Transient {
            message: message.into(),
            details: None,
        }
    }

    /// Permanent failure without details.
    pub fn permanent(message: impl Into<String>) -> Self {
        Self::Permanent {
            message: message.into(),
            details: None,
        }
    }

    /// Attach structured details.
    pub fn with_details(self, details: Value) -> Self {
        match self {
            Self::Transient { message, .. } => Self::Transient {
                message,
                details: Some(details),
            },
            Self::Permanent { message, .. } => Self::Permanent {
                message,
                details: Some(details),
            },
        }
    }

    /// Whether the job should be attempted again.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Transient { .. })
    }

    /// The failure message.
    pub fn message(&self) -> &str {
        match self {
            Self::Transient { message, .. } | Self::Permanent { message, .. } => message,
        }
    }

    /// The structured details, if any.
    pub fn details(&self) -> Option<&Value> {
        match self {
            Self::Transient { details, .. } | Self::Permanent { details, .. } => details.as_ref(),
        }
    }
}

impl From<AppError> for JobExecutionError {
    fn from(err: AppError) -> Self {
        let message = err.to_string();
        let details = Some(serde_json::json!({ "kind": err.kind.to_string() }));
        if err.kind.is_retryable() {
            Self::Transient { message, details }
        } else {
            Self::Permanent { message, details }
        }
    }
}

/// Dispatches jobs to the appropriate handler based on job_type
#[derive(Debug, Default)]
pub struct JobExecutor {
    /// Registered job handlers by type
    handlers: HashMap<String, Arc<dyn JobHandler>>,
}

impl JobExecutor {
    /// Create a new job executor
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a job handler
    pub fn register(&mut self, handler: Arc<dyn JobHandler>) {
        let job_type = handler.job_type().to_string();
        tracing::info!(job_type = %job_type, "Registered job handler");
        self.handlers.insert(job_type, handler);
    }

    /// Execute a job by dispatching to the correct handler
    pub async fn execute(&self, job: &Job) -> Result<Option<Value>, JobExecutionError> {
        let handler = self.handlers.get(&job.job_type).ok_or_else(|| {
            JobExecutionError::permanent(format!(
                "No handler registered for job type '{}'",
                job.job_type
            ))
        })?;

        tracing::info!(
            job_id = %job.id,
            job_type = %job.job_type,
            attempt = job.retry_count + 1,
            max_retries = job.max_retries,
            "Executing job"
        );

        handler.execute(job).await
    }

    /// Check if a handler is registered for a job type
    pub fn has_handler(&self, job_type: &str) -> bool {
        self.handlers.contains_key(job_type)
    }

    /// Fail unless every listed job type has a handler.
    pub fn ensure_registered(&self, job_types: &[&str]) -> AppResult<()> {
        let missing: Vec<&str> = job_types
            .iter()
            .copied()
            .filter(|t| !self.has_handler(t))
            .collect();

        if missing.is_empty() {
            Ok(())
        } else {
            Err(AppError::new(
                ErrorKind::Configuration,
                format!("No handler registered for job types: {}", missing.join(", ")),
            ))
        }
    }

    /// Get the list of registered job types, sorted
    pub fn registered_types(&self) -> Vec<String> {
        let mut types: Vec<String> = self.handlers.keys().cloned().collect();
        types.sort();
        types
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use inspecthub_entity::job::JobStatus;
    use uuid::Uuid;

    #[derive(Debug)]
    struct EchoHandler;

    #[async_trait]
    impl JobHandler for EchoHandler {
        fn job_type(&self) -> &str {
            "echo"
        }

        async fn execute(&self, job: &Job) -> Result<Option<Value>, JobExecutionError> {
            Ok(Some(job.payload.clone()))
        }
    }

    fn job(job_type: &str) -> Job {
        let now = Utc::now();
        Job {
            id: Uuid::new_v4(),
            job_type: job_type.to_string(),
            payload: serde_json::json!({"n": 1}),
            status: JobStatus::Processing,
            priority: 0,
            scheduled_at: now,
            started_at: Some(now),
            completed_at: None,
            retry_count: 0,
            max_retries: 3,
            error_message: None,
            error_details: None,
            result: None,
            locked_by: Some("w".to_string()),
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn test_dispatches_by_type() {
        let mut executor = JobExecutor::new();
        executor.register(Arc::new(EchoHandler));

        let result = executor.execute(&job("echo")).await.unwrap();
        assert_eq!(result, Some(serde_json::json!({"n": 1})));
    }

    #[tokio::test]
    async fn test_unknown_type_is_permanent() {
        let executor = JobExecutor::new();
        let err = executor.execute(&job("nope")).await.unwrap_err();
        assert!(!err.is_retryable());
        assert!(err.message().contains("nope"));
    }

    #[test]
    fn test_ensure_registered() {
        let mut executor = JobExecutor::new();
        executor.register(Arc::new(EchoHandler));

        assert!(executor.ensure_registered(&["echo"]).is_ok());
        let err = executor.ensure_registered(&["echo", "sharepoint_export"]).unwrap_err();
        assert_eq!(err.kind, ErrorKind::Configuration);
        assert!(err.message.contains("sharepoint_export"));
    }

    #[test]
    fn test_app_error_conversion() {
        let missing: JobExecutionError = AppError::not_found("Inspection gone").into();
        assert!(!missing.is_retryable());

        let outage: JobExecutionError = AppError::external("Graph returned 503").into();
        assert!(outage.is_retryable());
        assert_eq!(outage.details(), Some(&serde_json::json!({"kind": "EXTERNAL_SERVICE"})));
    }
}
