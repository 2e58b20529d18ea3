//! Backup pipeline configuration.

use serde::{Deserialize, Serialize};

/// Backup creation and rotation configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackupConfig {
    /// Directory where backup artifacts are written.
    #[serde(default = "default_backup_root")]
    pub backup_root: String,
    /// Directory holding uploaded files to archive.
    #[serde(default = "default_upload_root")]
    pub upload_root: String,
    /// Number of most-recent artifacts to retain per backup kind.
    #[serde(default = "default_keep_count")]
    pub keep_count: usize,
    /// Path to the pg_dump binary.
    #[serde(default = "default_pg_dump_bin")]
    pub pg_dump_bin: String,
    /// Path to the tar binary.
    #[serde(default = "default_tar_bin")]
    pub tar_bin: String,
}

impl Default for BackupConfig {
    fn default() -> Self {
        Self {
            backup_root: default_backup_root(),
            upload_root: default_upload_root(),
            keep_count: default_keep_count(),
            pg_dump_bin: default_pg_dump_bin(),
            tar_bin: default_tar_bin(),
        }
    }
}

fn default_backup_root() -> String {
    "data/backups".to_string()
}

fn default_upload_root() -> String {
    "data/uploads".to_string()
}

fn default_keep_count() -> usize {
    4
}

fn default_pg_dump_bin() -> String {
    "pg_dump".to_string()
}

fn default_tar_bin() -> String {
    "tar".to_string()
}
