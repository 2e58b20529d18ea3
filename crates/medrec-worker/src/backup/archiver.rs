//! Backup creation via external tools.
//!
//! Produces point-in-time artifacts in the backup directory: a `pg_dump`
//! directory dump of the database and a `tar.gz` archive of uploaded
//! files. Each artifact name embeds a sortable timestamp and each
//! successful run rotates its own prefix under the retention policy.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use chrono::{DateTime, Utc};
use tokio::fs;
use tokio::process::Command;
use tracing;

use medrec_core::config::backup::BackupConfig;
use medrec_core::error::{AppError, ErrorKind};
use medrec_core::result::AppResult;

use super::rotation::BackupRotator;

/// Filename prefix for database dump artifacts (directories).
pub const DATABASE_BACKUP_PREFIX: &str = "db_backup_";

/// Filename prefix for uploads archive artifacts (`.tar.gz` files).
pub const UPLOADS_BACKUP_PREFIX: &str = "uploads_backup_";

/// Creates backup artifacts by invoking external tools.
#[derive(Debug)]
pub struct BackupArchiver {
    /// Directory backup artifacts are written to.
    backup_root: PathBuf,
    /// Directory holding uploaded files.
    upload_root: PathBuf,
    /// Connection URL passed to pg_dump.
    database_url: String,
    /// Artifacts retained per prefix after each backup.
    keep_count: usize,
    /// pg_dump binary.
    pg_dump_bin: String,
    /// tar binary.
    tar_bin: String,
    /// Rotator enforcing the retention policy.
    rotator: BackupRotator,
}

impl BackupArchiver {
    /// Create an archiver from backup configuration and the database URL.
    pub fn new(config: &BackupConfig, database_url: impl Into<String>) -> Self {
        let backup_root = PathBuf::from(&config.backup_root);
        Self {
            rotator: BackupRotator::new(&backup_root),
            backup_root,
            upload_root: PathBuf::from(&config.upload_root),
            database_url: database_url.into(),
            keep_count: config.keep_count,
            pg_dump_bin: config.pg_dump_bin.clone(),
            tar_bin: config.tar_bin.clone(),
        }
    }

    /// Dump the database into a timestamped directory artifact.
    ///
    /// Returns the artifact path. A failure aborts this backup run only;
    /// it is logged here and re-raised for the owning job to handle.
    pub async fn create_database_backup(&self) -> AppResult<PathBuf> {
        let timestamp = sortable_timestamp(Utc::now());
        let backup_path = self
            .backup_root
            .join(format!("{DATABASE_BACKUP_PREFIX}{timestamp}"));

        fs::create_dir_all(&self.backup_root).await?;

        let mut command = Command::new(&self.pg_dump_bin);
        command
            .arg("--dbname")
            .arg(&self.database_url)
            .arg("--format")
            .arg("directory")
            .arg("--file")
            .arg(&backup_path);

        match run_backup_command(command, "pg_dump").await {
            Ok(()) => {
                tracing::info!("Database backup completed: {}", backup_path.display());
                self.rotator
                    .rotate(DATABASE_BACKUP_PREFIX, self.keep_count)
                    .await;
                Ok(backup_path)
            }
            Err(e) => {
                tracing::error!("Database backup failed: {}", e);
                Err(e)
            }
        }
    }

    /// Archive the uploads directory into a timestamped `.tar.gz` artifact.
    ///
    /// Returns the artifact path. Failure semantics match
    /// [`create_database_backup`](Self::create_database_backup).
    pub async fn create_uploads_backup(&self) -> AppResult<PathBuf> {
        let timestamp = sortable_timestamp(Utc::now());
        let backup_file = self
            .backup_root
            .join(format!("{UPLOADS_BACKUP_PREFIX}{timestamp}.tar.gz"));

        fs::create_dir_all(&self.backup_root).await?;

        let parent = match self.upload_root.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };
        let dir_name = self.upload_root.file_name().ok_or_else(|| {
            AppError::storage(format!(
                "Upload root '{}' has no directory name",
                self.upload_root.display()
            ))
        })?;

        let mut command = Command::new(&self.tar_bin);
        command
            .arg("-czf")
            .arg(&backup_file)
            .arg("-C")
            .arg(parent)
            .arg(dir_name);

        match run_backup_command(command, "tar").await {
            Ok(()) => {
                tracing::info!("Uploads backup completed: {}", backup_file.display());
                self.rotator
                    .rotate(UPLOADS_BACKUP_PREFIX, self.keep_count)
                    .await;
                Ok(backup_file)
            }
            Err(e) => {
                tracing::error!("Uploads backup failed: {}", e);
                Err(e)
            }
        }
    }
}

/// Run an external backup tool to completion, capturing its output.
async fn run_backup_command(mut command: Command, what: &str) -> AppResult<()> {
    let output = command
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .output()
        .await
        .map_err(|e| {
            AppError::with_source(
                ErrorKind::ExternalService,
                format!("Failed to run {what}: {e}"),
                e,
            )
        })?;

    if !output.status.success() {
        let code = output.status.code().unwrap_or(-1);
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(AppError::external_service(format!(
            "{what} exited with code {code}: {}",
            stderr.chars().take(500).collect::<String>()
        )));
    }

    Ok(())
}

/// Sortable filesystem-safe timestamp: ISO-8601 with `:` and `.`
/// normalized to `-`. Lexicographic order of the output equals
/// chronological order of the input.
fn sortable_timestamp(at: DateTime<Utc>) -> String {
    at.format("%Y-%m-%dT%H-%M-%S-%3fZ").to_string()
}
