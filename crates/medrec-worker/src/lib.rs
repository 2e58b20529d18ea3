//! Background maintenance for MedRec.
//!
//! This crate provides:
//! - A cron scheduler for periodic maintenance tasks
//! - Backup creation and rotation for the database and uploaded files
//! - Scheduled cleanup of stale operational records
//! - A bounded-concurrency primitive for throttling async work

pub mod backup;
pub mod jobs;
pub mod limiter;
pub mod scheduler;

pub use limiter::ConcurrencyLimiter;
pub use scheduler::{JobSpec, MaintenanceScheduler};
