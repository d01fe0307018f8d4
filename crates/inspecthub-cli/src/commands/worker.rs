//! Worker and job queue CLI commands.

use clap::{Args, Subcommand};
use serde::Serialize;
use tabled::Tabled;
use uuid::Uuid;

use crate::output::{self, OutputFormat};
use inspecthub_core::error::AppError;
use inspecthub_database::repositories::JobRepository;
use inspecthub_sharepoint::ConflictPolicy;
use inspecthub_worker::context::{WorkerContext, default_worker_id, job_queue};
use inspecthub_worker::jobs::SHAREPOINT_EXPORT_JOB_TYPE;
use inspecthub_worker::jobs::sharepoint_export::ExportPayload;
use inspecthub_worker::queue::EnqueueRequest;

/// Arguments for worker commands
#[derive(Debug, Args)]
pub struct WorkerArgs {
    /// Worker subcommand
    #[command(subcommand)]
    pub command: WorkerCommand,
}

/// Worker subcommands
#[derive(Debug, Subcommand)]
pub enum WorkerCommand {
    /// Show queue status
    Status,
    /// Enqueue an inspection export
    EnqueueExport {
        /// Inspection ID
        inspection_id: Uuid,
        /// Form type of the inspection
        #[arg(long)]
        form_type: String,
        /// Submitting user, for the delegated credential
        #[arg(long)]
        user_id: Option<Uuid>,
        /// Duplicate handling: overwrite, skip, rename or version
        #[arg(long)]
        conflict_policy: Option<ConflictPolicy>,
        /// Job priority (higher first)
        #[arg(long)]
        priority: Option<i32>,
        /// Attempts allowed
        #[arg(long)]
        max_retries: Option<i32>,
    },
    /// Claim and execute up to N jobs in this process, then exit
    ProcessBatch {
        /// Maximum number of jobs
        #[arg(short = 'n', long, default_value = "10")]
        max_jobs: usize,
    },
    /// List jobs that failed terminally
    Failed {
        /// Number of results
        #[arg(short, long, default_value = "20")]
        limit: i64,
    },
}

/// Terminal failure display row
#[derive(Debug, Serialize, Tabled)]
struct FailedJobRow {
    /// Job ID
    id: String,
    /// Job type
    job_type: String,
    /// Attempts used
    attempts: String,
    /// Finished at
    finished: String,
    /// Last error
    error: String,
}

/// Execute worker commands
pub async fn execute(
    args: &WorkerArgs,
    config_path: &str,
    format: OutputFormat,
) -> Result<(), AppError> {
    let config = super::load_config(config_path)?;
    let pool = super::create_db_pool(&config).await?;

    match &args.command {
        WorkerCommand::Status => {
            let queue = job_queue(pool, "inspecthub-cli", &config.worker);
            let stats = queue.stats().await?;

            output::print_summary(
                "Job Queue Status",
                &stats,
                &[
                    ("Pending", stats.pending.to_string()),
                    ("Processing", stats.processing.to_string()),
                    ("Failed", stats.failed.to_string()),
                    ("Completed", stats.completed.to_string()),
                    ("Worker Enabled", config.worker.enabled.to_string()),
                    ("Concurrency", config.worker.concurrency.to_string()),
                ],
                format,
            );
        }
        WorkerCommand::EnqueueExport {
            inspection_id,
            form_type,
            user_id,
            conflict_policy,
            priority,
            max_retries,
        } => {
            let mut payload = ExportPayload::new(*inspection_id, form_type.clone());
            payload.user_id = *user_id;
            payload.conflict_policy = *conflict_policy;

            let request = EnqueueRequest {
                job_type: SHAREPOINT_EXPORT_JOB_TYPE.to_string(),
                payload: serde_json::to_value(&payload)?,
                priority: *priority,
                max_retries: *max_retries,
                scheduled_at: None,
            };

            let queue = job_queue(pool, "inspecthub-cli", &config.worker);
            let job = queue.enqueue(request).await?;
            output::print_success(&format!(
                "Export of inspection {inspection_id} enqueued (job id: {})",
                job.id
            ));
        }
        WorkerCommand::ProcessBatch { max_jobs } => {
            let context = WorkerContext::from_config(&config, pool, &default_worker_id())?;
            let summary = context.runner().process_batch(*max_jobs).await?;

            output::print_summary(
                "Batch Result",
                &summary,
                &[
                    ("Processed", summary.processed.to_string()),
                    ("Successful", summary.successful.to_string()),
                    ("Failed", summary.failed.to_string()),
                    ("Lease Lost", summary.lease_lost.to_string()),
                ],
                format,
            );
        }
        WorkerCommand::Failed { limit } => {
            let jobs = JobRepository::new(pool).find_terminal_failures(*limit).await?;

            let rows: Vec<FailedJobRow> = jobs
                .iter()
                .map(|j| FailedJobRow {
                    id: j.id.to_string(),
                    job_type: j.job_type.clone(),
                    attempts: format!("{}/{}", j.retry_count, j.max_retries),
                    finished: j
                        .completed_at
                        .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
                        .unwrap_or_default(),
                    error: output::truncate(j.error_message.as_deref().unwrap_or_default(), 60),
                })
                .collect();

            output::print_list(&rows, format);
        }
    }

    Ok(())
}
