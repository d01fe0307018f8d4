//! CLI command definitions and dispatch.

pub mod audit;
pub mod migrate;
pub mod worker;

use clap::{Parser, Subcommand};
use sqlx::PgPool;

use crate::output::OutputFormat;
use inspecthub_core::config::AppConfig;
use inspecthub_core::error::AppError;

/// InspectHub: inspection export queue administration
#[derive(Debug, Parser)]
#[command(name = "inspecthub", version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "config/default.toml")]
    pub config: String,

    /// Output format
    #[arg(short, long, value_enum, default_value = "table")]
    pub format: OutputFormat,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level commands
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Apply database migrations
    Migrate,
    /// Job queue and worker management
    Worker(worker::WorkerArgs),
    /// Sync audit log
    Audit(audit::AuditArgs),
}

impl Cli {
    /// Execute the CLI command
    pub async fn execute(&self) -> Result<(), AppError> {
        match &self.command {
            Commands::Migrate => migrate::execute(&self.config).await,
            Commands::Worker(args) => worker::execute(args, &self.config, self.format).await,
            Commands::Audit(args) => audit::execute(args, &self.config, self.format).await,
        }
    }
}

/// Helper: load configuration from file
pub fn load_config(config_path: &str) -> Result<AppConfig, AppError> {
    AppConfig::load_file(config_path)
}

/// Helper: create database pool from config
pub async fn create_db_pool(config: &AppConfig) -> Result<PgPool, AppError> {
    let pool =
        inspecthub_database::DatabasePool::connect(&config.database, "inspecthub-cli").await?;
    Ok(pool.into_pool())
}
