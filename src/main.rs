//! MedRec Maintenance Daemon
//!
//! Entry point that wires configuration, the database pool, and the
//! scheduled maintenance jobs together, then runs until shutdown.

use std::sync::Arc;

use tracing;
use tracing_subscriber::{EnvFilter, fmt};

use medrec_core::config::AppConfig;
use medrec_core::error::AppError;
use medrec_database::DatabasePool;
use medrec_database::repositories::MaintenanceRepository;
use medrec_worker::backup::BackupArchiver;
use medrec_worker::jobs::{RetentionCleaner, WeeklyBackupJob};
use medrec_worker::scheduler::{JobSpec, MaintenanceScheduler};

#[tokio::main]
async fn main() {
    let env = std::env::var("MEDREC_ENV").unwrap_or_else(|_| "development".to_string());

    let config = match AppConfig::load(&env) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load configuration: {e}");
            std::process::exit(1);
        }
    };

    init_logging(&config);

    if let Err(e) = run(config).await {
        tracing::error!("Maintenance daemon error: {}", e);
        std::process::exit(1);
    }
}

/// Initialize tracing/logging.
fn init_logging(config: &AppConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.logging.level));

    match config.logging.format.as_str() {
        "json" => {
            fmt()
                .json()
                .with_env_filter(filter)
                .with_target(true)
                .init();
        }
        _ => {
            fmt().pretty().with_env_filter(filter).with_target(true).init();
        }
    }
}

/// Main daemon run function.
async fn run(config: AppConfig) -> Result<(), AppError> {
    tracing::info!("Starting MedRec maintenance v{}", env!("CARGO_PKG_VERSION"));

    // ── Step 1: Create the backup directory ──────────────────────
    tokio::fs::create_dir_all(&config.backup.backup_root)
        .await
        .map_err(|e| {
            AppError::storage(format!(
                "Failed to create backup dir '{}': {}",
                config.backup.backup_root, e
            ))
        })?;

    // ── Step 2: Database connection ──────────────────────────────
    let db_pool = DatabasePool::connect(&config.database).await?;

    // ── Step 3: Build the maintenance jobs ───────────────────────
    let timezone: chrono_tz::Tz = config.maintenance.timezone.parse().map_err(|_| {
        AppError::configuration(format!(
            "Invalid timezone '{}'",
            config.maintenance.timezone
        ))
    })?;

    let maintenance_repo = Arc::new(MaintenanceRepository::new(db_pool.pool().clone()));
    let cleaner = Arc::new(RetentionCleaner::new(maintenance_repo));
    let archiver = Arc::new(BackupArchiver::new(
        &config.backup,
        config.database.url.clone(),
    ));
    let weekly_backup = Arc::new(WeeklyBackupJob::new(archiver));

    // ── Step 4: Register and start the scheduler ─────────────────
    let mut scheduler = MaintenanceScheduler::new().await?;

    if config.maintenance.enabled {
        let cleanup = Arc::clone(&cleaner);
        scheduler.register(JobSpec::new(
            "daily_cleanup",
            config.maintenance.cleanup_schedule.clone(),
            timezone,
            move || {
                let cleanup = Arc::clone(&cleanup);
                async move {
                    cleanup.run().await;
                    Ok(())
                }
            },
        ));

        let backup = Arc::clone(&weekly_backup);
        scheduler.register(JobSpec::new(
            "weekly_backup",
            config.maintenance.backup_schedule.clone(),
            timezone,
            move || {
                let backup = Arc::clone(&backup);
                async move { backup.run().await }
            },
        ));

        scheduler.start().await?;
    } else {
        tracing::info!("Scheduled maintenance disabled");
    }

    // ── Step 5: Wait for shutdown ────────────────────────────────
    shutdown_signal().await;
    tracing::info!("Shutdown signal received, stopping maintenance daemon...");

    if config.maintenance.enabled {
        scheduler.shutdown().await?;
    }
    db_pool.close().await;

    tracing::info!("MedRec maintenance shut down gracefully");
    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
