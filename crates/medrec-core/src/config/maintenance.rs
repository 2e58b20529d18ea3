//! Scheduled maintenance configuration.

use serde::{Deserialize, Serialize};

/// Configuration for the recurring maintenance jobs.
///
/// Cron expressions use the six-field form with a leading seconds field.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MaintenanceConfig {
    /// Whether scheduled maintenance is enabled.
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// IANA timezone the schedules are evaluated in.
    #[serde(default = "default_timezone")]
    pub timezone: String,
    /// Schedule for the daily record cleanup.
    #[serde(default = "default_cleanup_schedule")]
    pub cleanup_schedule: String,
    /// Schedule for the weekly full backup.
    #[serde(default = "default_backup_schedule")]
    pub backup_schedule: String,
}

impl Default for MaintenanceConfig {
    fn default() -> Self {
        Self {
            enabled: default_true(),
            timezone: default_timezone(),
            cleanup_schedule: default_cleanup_schedule(),
            backup_schedule: default_backup_schedule(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_timezone() -> String {
    "Asia/Manila".to_string()
}

/// Daily at 2:00 AM.
fn default_cleanup_schedule() -> String {
    "0 0 2 * * *".to_string()
}

/// Sunday at 3:00 AM.
fn default_backup_schedule() -> String {
    "0 0 3 * * 0".to_string()
}
