//! Backup rotation — retains the N most recent artifacts per prefix.

use std::path::PathBuf;

use tokio::fs;
use tracing;

/// Applies a retention policy to the backup directory.
///
/// Artifact names embed a sortable timestamp, so sorting names descending
/// is equivalent to most-recent-first. Rotation is best effort: a failed
/// deletion is logged and skipped, never fatal.
#[derive(Debug, Clone)]
pub struct BackupRotator {
    /// Directory containing backup artifacts.
    backup_root: PathBuf,
}

impl BackupRotator {
    /// Create a rotator over the given backup directory.
    pub fn new(backup_root: impl Into<PathBuf>) -> Self {
        Self {
            backup_root: backup_root.into(),
        }
    }

    /// Delete all artifacts matching `prefix` beyond the `keep_count` most
    /// recent ones. Returns the number of artifacts removed.
    ///
    /// An unreadable backup directory is treated as nothing to rotate.
    pub async fn rotate(&self, prefix: &str, keep_count: usize) -> usize {
        let mut entries = match fs::read_dir(&self.backup_root).await {
            Ok(entries) => entries,
            Err(e) => {
                tracing::warn!(
                    "Cannot read backup directory '{}', nothing to rotate: {}",
                    self.backup_root.display(),
                    e
                );
                return 0;
            }
        };

        let mut names: Vec<String> = Vec::new();
        while let Ok(Some(entry)) = entries.next_entry().await {
            if let Some(name) = entry.file_name().to_str() {
                if name.starts_with(prefix) {
                    names.push(name.to_string());
                }
            }
        }

        names.sort();
        names.reverse();

        let mut removed = 0;
        for name in names.iter().skip(keep_count) {
            if self.remove_artifact(name).await {
                removed += 1;
            }
        }
        removed
    }

    /// Remove a single artifact by name: directories recursively, files
    /// singly. Returns whether the artifact was actually deleted.
    async fn remove_artifact(&self, name: &str) -> bool {
        let path = self.backup_root.join(name);

        let metadata = match fs::metadata(&path).await {
            Ok(m) => m,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!("Backup '{}' already removed, skipping", name);
                return false;
            }
            Err(e) => {
                tracing::warn!("Cannot stat backup '{}', skipping: {}", name, e);
                return false;
            }
        };

        let result = if metadata.is_dir() {
            fs::remove_dir_all(&path).await
        } else {
            fs::remove_file(&path).await
        };

        match result {
            Ok(()) => {
                tracing::info!("Deleted old backup: {}", name);
                true
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!("Backup '{}' already removed, skipping", name);
                false
            }
            Err(e) => {
                tracing::warn!("Failed to delete old backup '{}': {}", name, e);
                false
            }
        }
    }
}
