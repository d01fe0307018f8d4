//! InspectHub export worker
//!
//! Wires the job queue, the export pipeline and the cron sweep together
//! and runs the poll loop until interrupted.

use std::time::Duration;

use tokio::sync::watch;
use tracing;
use tracing_subscriber::{EnvFilter, fmt};

use inspecthub_core::config::AppConfig;
use inspecthub_core::error::AppError;
use inspecthub_worker::context::{WorkerContext, default_worker_id};
use inspecthub_worker::scheduler::CronScheduler;

#[tokio::main]
async fn main() {
    let config = match load_configuration() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load configuration: {e}");
            std::process::exit(1);
        }
    };

    init_logging(&config);

    if let Err(e) = run(config).await {
        tracing::error!(error = %e, "Worker error");
        std::process::exit(1);
    }
}

/// Load configuration from file and environment
///
/// `INSPECTHUB_CONFIG` names a single file; otherwise `config/default.toml`
/// is merged with `config/{INSPECTHUB_ENV}.toml`.
fn load_configuration() -> Result<AppConfig, AppError> {
    match std::env::var("INSPECTHUB_CONFIG") {
        Ok(path) => AppConfig::load_file(&path),
        Err(_) => {
            let env = std::env::var("INSPECTHUB_ENV").unwrap_or_else(|_| "development".to_string());
            AppConfig::load(&env)
        }
    }
}

/// Initialize tracing/logging
fn init_logging(config: &AppConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.logging.level));

    match config.logging.format.as_str() {
        "json" => {
            fmt()
                .json()
                .with_env_filter(filter)
                .with_target(true)
                .with_thread_ids(true)
                .init();
        }
        _ => {
            fmt()
                .pretty()
                .with_env_filter(filter)
                .with_target(true)
                .init();
        }
    }
}

/// Main worker run function
async fn run(config: AppConfig) -> Result<(), AppError> {
    tracing::info!("Starting InspectHub worker v{}", env!("CARGO_PKG_VERSION"));

    if !config.worker.enabled {
        tracing::warn!("Worker disabled by configuration, exiting");
        return Ok(());
    }

    // ── Step 1: Database connection + migrations ─────────────────
    let worker_id = default_worker_id();
    tracing::info!("Connecting to database...");
    let db = inspecthub_database::DatabasePool::connect(&config.database, &worker_id).await?;

    tracing::info!("Running database migrations...");
    inspecthub_database::migration::run_migrations(db.pool()).await?;
    tracing::info!("Database migrations complete");

    // ── Step 2: Queue, export pipeline, handlers ─────────────────
    let context = WorkerContext::from_config(&config, db.pool().clone(), &worker_id)?;
    tracing::info!(
        worker_id = %worker_id,
        job_types = ?context.executor.registered_types(),
        "Job handlers registered"
    );

    // ── Step 3: Stale-job sweep ──────────────────────────────────
    let mut scheduler = CronScheduler::new(context.queue.clone()).await?;
    if config.worker.stale_after_seconds > 0 {
        scheduler
            .register_stale_job_sweep(
                &config.worker.stale_sweep_cron,
                Duration::from_secs(config.worker.stale_after_seconds),
            )
            .await?;
    }
    scheduler.start().await?;

    // ── Step 4: Poll loop until ctrl-c ───────────────────────────
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => tracing::info!("Shutdown signal received"),
            Err(e) => tracing::error!(error = %e, "Failed to listen for shutdown signal"),
        }
        let _ = shutdown_tx.send(true);
    });

    context.runner().run(shutdown_rx).await;

    scheduler.shutdown().await?;
    db.pool().close().await;
    tracing::info!("InspectHub worker stopped");
    Ok(())
}
