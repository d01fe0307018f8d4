//! Sync audit log CLI commands.

use clap::{Args, Subcommand};
use serde::Serialize;
use tabled::Tabled;
use uuid::Uuid;

use crate::output::{self, OutputFormat};
use inspecthub_core::error::AppError;
use inspecthub_database::SyncLogStore;
use inspecthub_database::repositories::SyncLogRepository;
use inspecthub_entity::sync::SyncLogEntry;

/// Arguments for audit commands
#[derive(Debug, Args)]
pub struct AuditArgs {
    /// Audit subcommand
    #[command(subcommand)]
    pub command: AuditCommand,
}

/// Audit subcommands
#[derive(Debug, Subcommand)]
pub enum AuditCommand {
    /// Sync history of one inspection, newest first
    History {
        /// Inspection ID
        inspection_id: Uuid,
    },
    /// Failed sync attempts in a recent window
    Failures {
        /// Hours of history to show
        #[arg(long, default_value = "24")]
        hours: i64,
    },
}

/// Audit display row
#[derive(Debug, Serialize, Tabled)]
struct SyncLogRow {
    /// Time
    time: String,
    /// Inspection ID
    inspection: String,
    /// Create or update
    sync_type: String,
    /// Success or failure
    status: String,
    /// Credential tier / outcome, or the error
    detail: String,
}

impl From<&SyncLogEntry> for SyncLogRow {
    fn from(entry: &SyncLogEntry) -> Self {
        let detail = match &entry.error_message {
            Some(error) => output::truncate(error, 60),
            None => entry
                .metadata
                .as_ref()
                .map(|m| {
                    format!(
                        "{} / {}",
                        m["credential_tier"].as_str().unwrap_or("-"),
                        m["upload_outcome"].as_str().unwrap_or("-")
                    )
                })
                .unwrap_or_default(),
        };

        Self {
            time: entry.created_at.format("%Y-%m-%d %H:%M:%S").to_string(),
            inspection: entry.inspection_id.to_string(),
            sync_type: entry.sync_type.to_string(),
            status: entry.status.to_string(),
            detail,
        }
    }
}

/// Execute audit commands
pub async fn execute(
    args: &AuditArgs,
    config_path: &str,
    format: OutputFormat,
) -> Result<(), AppError> {
    let config = super::load_config(config_path)?;
    let pool = super::create_db_pool(&config).await?;
    let sync_log = SyncLogRepository::new(pool);

    let entries = match &args.command {
        AuditCommand::History { inspection_id } => {
            sync_log.find_by_inspection(*inspection_id).await?
        }
        AuditCommand::Failures { hours } => {
            let since = chrono::Utc::now() - chrono::Duration::hours(*hours);
            sync_log.find_failures_since(since).await?
        }
    };

    let rows: Vec<SyncLogRow> = entries.iter().map(SyncLogRow::from).collect();
    output::print_list(&rows, format);
    Ok(())
}
