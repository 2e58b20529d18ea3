//! Weekly composite backup job.

use std::sync::Arc;

use tracing;

use medrec_core::result::AppResult;

use crate::backup::archiver::BackupArchiver;

/// Runs the full weekly backup cycle: database dump, then uploads archive.
///
/// The steps are sequential and short-circuit: a database backup failure
/// aborts the cycle before the uploads step runs. The next scheduled
/// firing is unaffected.
#[derive(Debug)]
pub struct WeeklyBackupJob {
    /// Backup artifact producer.
    archiver: Arc<BackupArchiver>,
}

impl WeeklyBackupJob {
    /// Create the weekly backup job.
    pub fn new(archiver: Arc<BackupArchiver>) -> Self {
        Self { archiver }
    }

    /// Run one full backup cycle.
    pub async fn run(&self) -> AppResult<()> {
        tracing::info!("Starting weekly backup");
        self.archiver.create_database_backup().await?;
        self.archiver.create_uploads_backup().await?;
        tracing::info!("Weekly backup completed successfully");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use medrec_core::config::backup::BackupConfig;
    use std::path::{Path, PathBuf};
    use tokio::fs;

    fn test_config(root: &Path) -> BackupConfig {
        BackupConfig {
            backup_root: root.join("backups").to_string_lossy().into_owned(),
            upload_root: root.join("uploads").to_string_lossy().into_owned(),
            keep_count: 4,
            pg_dump_bin: "pg_dump".to_string(),
            tar_bin: "tar".to_string(),
        }
    }

    async fn artifact_count(dir: &Path, prefix: &str) -> usize {
        let mut count = 0;
        let mut entries = match fs::read_dir(dir).await {
            Ok(entries) => entries,
            Err(_) => return 0,
        };
        while let Ok(Some(entry)) = entries.next_entry().await {
            if entry.file_name().to_string_lossy().starts_with(prefix) {
                count += 1;
            }
        }
        count
    }

    #[tokio::test]
    async fn test_database_failure_short_circuits_uploads() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = test_config(dir.path());
        config.pg_dump_bin = "false".to_string();

        let upload_root = PathBuf::from(&config.upload_root);
        fs::create_dir_all(&upload_root).await.unwrap();
        fs::write(upload_root.join("scan.pdf"), b"%PDF-1.4").await.unwrap();

        let job = WeeklyBackupJob::new(Arc::new(BackupArchiver::new(
            &config,
            "postgres://localhost/medrec",
        )));

        assert!(job.run().await.is_err());

        // No uploads artifact may exist for a cycle whose dump failed.
        let backup_root = PathBuf::from(&config.backup_root);
        assert_eq!(artifact_count(&backup_root, "uploads_backup_").await, 0);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_full_cycle_produces_both_artifacts() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let mut config = test_config(dir.path());

        let script = dir.path().join("stub_pg_dump");
        std::fs::write(&script, "#!/bin/sh\nmkdir -p \"$6\"\n").unwrap();
        std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();
        config.pg_dump_bin = script.to_string_lossy().into_owned();

        let upload_root = PathBuf::from(&config.upload_root);
        fs::create_dir_all(&upload_root).await.unwrap();
        fs::write(upload_root.join("scan.pdf"), b"%PDF-1.4").await.unwrap();

        let job = WeeklyBackupJob::new(Arc::new(BackupArchiver::new(
            &config,
            "postgres://localhost/medrec",
        )));

        job.run().await.unwrap();

        let backup_root = PathBuf::from(&config.backup_root);
        assert_eq!(artifact_count(&backup_root, "db_backup_").await, 1);
        assert_eq!(artifact_count(&backup_root, "uploads_backup_").await, 1);
    }
}
