//! Store-deletion capability consumed by the retention cleaner.

use async_trait::async_trait;

use crate::result::AppResult;

/// Collection name for user-facing notifications.
pub const NOTIFICATIONS: &str = "notifications";

/// Collection name for audit trail entries.
pub const AUDIT_TRAILS: &str = "audit_trails";

/// Trait for bulk deletion of a named domain collection.
///
/// The [`RecordPurger`] trait is defined here in `medrec-core` and
/// implemented in `medrec-database` against PostgreSQL. The scheduled
/// cleanup task only depends on this narrow capability, so tests can
/// substitute an in-memory store.
#[async_trait]
pub trait RecordPurger: Send + Sync + std::fmt::Debug + 'static {
    /// Delete every record in the named collection and return the count
    /// removed. Unknown collection names are a validation error.
    async fn delete_all(&self, collection: &str) -> AppResult<u64>;
}
