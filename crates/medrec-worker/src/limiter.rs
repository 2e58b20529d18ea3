//! Bounded-concurrency execution primitive.
//!
//! Used wherever many independent async operations must be throttled,
//! e.g. fanning out per-record work without exhausting pool connections
//! or file descriptors.

use std::future::Future;
use std::sync::Arc;

use futures::future;
use tokio::sync::Semaphore;

use medrec_core::error::AppError;
use medrec_core::result::AppResult;

/// Default number of concurrently executing tasks.
pub const DEFAULT_CONCURRENCY: usize = 5;

/// Caps how many submitted asynchronous tasks run at once.
///
/// Backed by a fair counting semaphore: waiters are admitted in FIFO
/// submission order as permits free up. A permit is held for the duration
/// of a task body and released when the task settles, success or failure.
/// The permit pool is scoped to this handle; construct a fresh limiter
/// per batch unless sharing the pool across batches is intended.
#[derive(Debug, Clone)]
pub struct ConcurrencyLimiter {
    /// Permit pool.
    semaphore: Arc<Semaphore>,
}

impl ConcurrencyLimiter {
    /// Create a limiter admitting at most `concurrency` tasks at once.
    ///
    /// # Panics
    ///
    /// Panics if `concurrency` is zero.
    pub fn new(concurrency: usize) -> Self {
        assert!(concurrency > 0, "concurrency must be positive");
        Self {
            semaphore: Arc::new(Semaphore::new(concurrency)),
        }
    }

    /// Run a single task under the limiter.
    ///
    /// The factory is invoked to produce the pending future only once a
    /// permit is available, so queued work is not constructed early.
    pub async fn submit<T, F, Fut>(&self, factory: F) -> AppResult<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = AppResult<T>>,
    {
        let _permit = self
            .semaphore
            .acquire()
            .await
            .map_err(|_| AppError::internal("Concurrency limiter closed"))?;
        factory().await
    }

    /// Run every task factory, returning results in submission order
    /// regardless of completion order.
    ///
    /// Fails as a whole if any individual task fails.
    pub async fn run_all<T, F, Fut>(&self, factories: Vec<F>) -> AppResult<Vec<T>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = AppResult<T>>,
    {
        future::try_join_all(factories.into_iter().map(|f| self.submit(f))).await
    }

    /// Apply `f` to every item with bounded concurrency, preserving input
    /// order in the output. Same aggregate failure contract as
    /// [`run_all`](Self::run_all).
    pub async fn map_concurrently<I, T, F, Fut>(
        &self,
        items: impl IntoIterator<Item = I>,
        f: F,
    ) -> AppResult<Vec<T>>
    where
        F: Fn(I) -> Fut,
        Fut: Future<Output = AppResult<T>>,
    {
        future::try_join_all(items.into_iter().map(|item| self.submit(|| f(item)))).await
    }
}

impl Default for ConcurrencyLimiter {
    fn default() -> Self {
        Self::new(DEFAULT_CONCURRENCY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[tokio::test]
    async fn test_never_exceeds_concurrency() {
        let limiter = ConcurrencyLimiter::new(3);
        let active = Arc::new(AtomicUsize::new(0));
        let max_active = Arc::new(AtomicUsize::new(0));

        let results = limiter
            .map_concurrently(0..20usize, |i| {
                let active = Arc::clone(&active);
                let max_active = Arc::clone(&max_active);
                async move {
                    let now = active.fetch_add(1, Ordering::SeqCst) + 1;
                    max_active.fetch_max(now, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(10)).await;
                    active.fetch_sub(1, Ordering::SeqCst);
                    Ok(i * 2)
                }
            })
            .await
            .unwrap();

        assert_eq!(results, (0..20).map(|i| i * 2).collect::<Vec<_>>());
        assert!(max_active.load(Ordering::SeqCst) <= 3);
    }

    #[tokio::test]
    async fn test_output_order_matches_input_order() {
        let limiter = ConcurrencyLimiter::new(3);

        // Earlier items sleep longer, so completion order is inverted.
        let results = limiter
            .map_concurrently(["slow", "medium", "fast"], |label| async move {
                let delay = match label {
                    "slow" => 50,
                    "medium" => 20,
                    _ => 1,
                };
                tokio::time::sleep(Duration::from_millis(delay)).await;
                Ok(label.to_uppercase())
            })
            .await
            .unwrap();

        assert_eq!(results, vec!["SLOW", "MEDIUM", "FAST"]);
    }

    #[tokio::test]
    async fn test_permit_released_on_failure() {
        let limiter = ConcurrencyLimiter::new(1);

        let failed: AppResult<()> = limiter
            .submit(|| async { Err(AppError::internal("task blew up")) })
            .await;
        assert!(failed.is_err());

        // The single permit must be back in the pool.
        let ok = limiter.submit(|| async { Ok(42) }).await.unwrap();
        assert_eq!(ok, 42);
    }

    #[tokio::test]
    async fn test_run_all_fails_as_a_whole() {
        let limiter = ConcurrencyLimiter::new(2);

        let factories: Vec<Box<dyn FnOnce() -> futures::future::BoxFuture<'static, AppResult<u32>>>> = vec![
            Box::new(|| Box::pin(async { Ok(1) })),
            Box::new(|| Box::pin(async { Err(AppError::internal("nope")) })),
            Box::new(|| Box::pin(async { Ok(3) })),
        ];

        assert!(limiter.run_all(factories).await.is_err());
    }

    #[tokio::test]
    async fn test_run_all_preserves_order() {
        let limiter = ConcurrencyLimiter::default();

        let factories: Vec<Box<dyn FnOnce() -> futures::future::BoxFuture<'static, AppResult<u32>>>> = (0..10)
            .map(|i| {
                let f: Box<dyn FnOnce() -> futures::future::BoxFuture<'static, AppResult<u32>>> =
                    Box::new(move || {
                        Box::pin(async move {
                            tokio::time::sleep(Duration::from_millis(10 - i as u64)).await;
                            Ok(i)
                        })
                    });
                f
            })
            .collect();

        let results = limiter.run_all(factories).await.unwrap();
        assert_eq!(results, (0..10).collect::<Vec<_>>());
    }
}
