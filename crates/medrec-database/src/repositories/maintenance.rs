//! Maintenance repository implementation.
//!
//! Bulk deletion of operational record collections. Collection names are
//! resolved against a fixed whitelist; caller input never reaches SQL.

use async_trait::async_trait;
use sqlx::PgPool;

use medrec_core::error::{AppError, ErrorKind};
use medrec_core::result::AppResult;
use medrec_core::traits::store::{AUDIT_TRAILS, NOTIFICATIONS, RecordPurger};

/// Repository for bulk maintenance operations on operational records.
#[derive(Debug, Clone)]
pub struct MaintenanceRepository {
    pool: PgPool,
}

impl MaintenanceRepository {
    /// Create a new maintenance repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Delete all notification records. Returns the number removed.
    pub async fn delete_all_notifications(&self) -> AppResult<u64> {
        let result = sqlx::query("DELETE FROM notifications")
            .execute(&self.pool)
            .await
            .map_err(|e| {
                AppError::with_source(ErrorKind::Database, "Failed to delete notifications", e)
            })?;
        Ok(result.rows_affected())
    }

    /// Delete all audit trail records. Returns the number removed.
    pub async fn delete_all_audit_trails(&self) -> AppResult<u64> {
        let result = sqlx::query("DELETE FROM audit_trails")
            .execute(&self.pool)
            .await
            .map_err(|e| {
                AppError::with_source(ErrorKind::Database, "Failed to delete audit trails", e)
            })?;
        Ok(result.rows_affected())
    }
}

#[async_trait]
impl RecordPurger for MaintenanceRepository {
    async fn delete_all(&self, collection: &str) -> AppResult<u64> {
        match collection {
            NOTIFICATIONS => self.delete_all_notifications().await,
            AUDIT_TRAILS => self.delete_all_audit_trails().await,
            other => Err(AppError::validation(format!(
                "Unknown collection '{other}'"
            ))),
        }
    }
}
