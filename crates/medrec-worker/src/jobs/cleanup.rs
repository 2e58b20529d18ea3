//! Daily purge of stale operational records.

use std::sync::Arc;

use tracing;

use medrec_core::result::AppResult;
use medrec_core::traits::store::{AUDIT_TRAILS, NOTIFICATIONS, RecordPurger};

/// Clears stale operational data by deleting whole collections.
///
/// This is an unconditional delete, not age-based filtering: the
/// trigger's low daily frequency is the only age control.
#[derive(Debug)]
pub struct RetentionCleaner {
    /// Store-deletion capability.
    store: Arc<dyn RecordPurger>,
}

impl RetentionCleaner {
    /// Create a new retention cleaner over the given store.
    pub fn new(store: Arc<dyn RecordPurger>) -> Self {
        Self { store }
    }

    /// Remove all records in the named collection, returning the count.
    pub async fn purge(&self, collection: &str) -> AppResult<u64> {
        let count = self.store.delete_all(collection).await?;
        tracing::info!("Deleted {} records from '{}'", count, collection);
        Ok(count)
    }

    /// The daily cleanup: purge notifications, then audit trails.
    ///
    /// Each store failure is caught and logged here, so one failed
    /// collection never blocks the other or reaches the scheduler.
    pub async fn run(&self) {
        for collection in [NOTIFICATIONS, AUDIT_TRAILS] {
            if let Err(e) = self.purge(collection).await {
                tracing::error!("Failed to purge '{}': {}", collection, e);
            }
        }
    }
}
