//! Cron scheduler for periodic maintenance tasks.

use std::future::Future;
use std::sync::Arc;

use chrono_tz::Tz;
use futures::future::BoxFuture;
use tokio_cron_scheduler::{Job as CronJob, JobScheduler};
use tracing;

use medrec_core::error::AppError;
use medrec_core::result::AppResult;

/// A zero-argument asynchronous action bound to a schedule.
pub type JobTask = Arc<dyn Fn() -> BoxFuture<'static, AppResult<()>> + Send + Sync>;

/// A registered trigger: cron expression, timezone, and the bound task.
///
/// Specs are created from the fixed registration list at process start
/// and are immutable afterwards; the scheduler owns them exclusively.
#[derive(Clone)]
pub struct JobSpec {
    /// Job name used in logs.
    name: String,
    /// Six-field cron expression, seconds first.
    schedule: String,
    /// Timezone the schedule is evaluated in.
    timezone: Tz,
    /// Disabled specs are recorded but never fire.
    enabled: bool,
    /// The action invoked at each firing.
    task: JobTask,
}

impl JobSpec {
    /// Create an enabled job spec.
    pub fn new<F, Fut>(
        name: impl Into<String>,
        schedule: impl Into<String>,
        timezone: Tz,
        task: F,
    ) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = AppResult<()>> + Send + 'static,
    {
        Self {
            name: name.into(),
            schedule: schedule.into(),
            timezone,
            enabled: true,
            task: Arc::new(move || -> BoxFuture<'static, AppResult<()>> { Box::pin(task()) }),
        }
    }

    /// Mark this spec as disabled; it will be skipped at start.
    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    /// The job name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The cron expression.
    pub fn schedule(&self) -> &str {
        &self.schedule
    }

    /// Whether this spec will fire.
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }
}

impl std::fmt::Debug for JobSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JobSpec")
            .field("name", &self.name)
            .field("schedule", &self.schedule)
            .field("timezone", &self.timezone)
            .field("enabled", &self.enabled)
            .finish()
    }
}

/// Cron-based scheduler owning an ordered list of registered job specs.
///
/// Jobs fire independently: the scheduler neither serializes across jobs
/// nor waits for a prior invocation of the same job, so a task running
/// past its next trigger may overlap with itself.
pub struct MaintenanceScheduler {
    /// The underlying job scheduler.
    scheduler: JobScheduler,
    /// Registered job specs in registration order.
    jobs: Vec<JobSpec>,
}

impl std::fmt::Debug for MaintenanceScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MaintenanceScheduler")
            .field("jobs", &self.jobs)
            .finish()
    }
}

impl MaintenanceScheduler {
    /// Create a new scheduler in the stopped state.
    pub async fn new() -> AppResult<Self> {
        let scheduler = JobScheduler::new()
            .await
            .map_err(|e| AppError::internal(format!("Failed to create scheduler: {e}")))?;

        Ok(Self {
            scheduler,
            jobs: Vec::new(),
        })
    }

    /// Add a trigger. Takes effect at `start()`.
    pub fn register(&mut self, spec: JobSpec) {
        tracing::info!("Registered: {} ({})", spec.name(), spec.schedule());
        self.jobs.push(spec);
    }

    /// Registered specs, in registration order.
    pub fn jobs(&self) -> &[JobSpec] {
        &self.jobs
    }

    /// Begin evaluating all registered triggers against wall-clock time.
    ///
    /// Each match invokes the bound task asynchronously. A task error is
    /// caught at the invocation boundary and logged; it never terminates
    /// the scheduler or suppresses later firings of any job.
    pub async fn start(&self) -> AppResult<()> {
        let mut active = 0;
        for spec in &self.jobs {
            if !spec.enabled {
                tracing::info!("Skipping disabled job '{}'", spec.name);
                continue;
            }

            let name = spec.name.clone();
            let task = Arc::clone(&spec.task);
            let job = CronJob::new_async_tz(spec.schedule.as_str(), spec.timezone, move |_uuid, _lock| {
                let name = name.clone();
                let task = Arc::clone(&task);
                Box::pin(async move {
                    tracing::info!("Running scheduled job '{}'", name);
                    if let Err(e) = (task)().await {
                        tracing::error!("Scheduled job '{}' failed: {}", name, e);
                    }
                })
            })
            .map_err(|e| {
                AppError::configuration(format!(
                    "Invalid schedule '{}' for job '{}': {}",
                    spec.schedule, spec.name, e
                ))
            })?;

            self.scheduler
                .add(job)
                .await
                .map_err(|e| AppError::internal(format!("Failed to add job '{}': {}", spec.name, e)))?;
            active += 1;
        }

        self.scheduler
            .start()
            .await
            .map_err(|e| AppError::internal(format!("Failed to start scheduler: {e}")))?;

        tracing::info!("Maintenance scheduler started with {} active job(s)", active);
        Ok(())
    }

    /// Shut down the scheduler.
    pub async fn shutdown(&mut self) -> AppResult<()> {
        self.scheduler
            .shutdown()
            .await
            .map_err(|e| AppError::internal(format!("Failed to shutdown scheduler: {e}")))?;

        tracing::info!("Maintenance scheduler shut down");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use medrec_core::error::ErrorKind;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    async fn wait_for_firings(counter: &AtomicUsize, at_least: usize) -> bool {
        for _ in 0..40 {
            if counter.load(Ordering::SeqCst) >= at_least {
                return true;
            }
            tokio::time::sleep(Duration::from_millis(250)).await;
        }
        false
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_registered_job_fires() {
        let mut scheduler = MaintenanceScheduler::new().await.unwrap();
        let count = Arc::new(AtomicUsize::new(0));

        let counter = Arc::clone(&count);
        scheduler.register(JobSpec::new("tick", "* * * * * *", chrono_tz::UTC, move || {
            let counter = Arc::clone(&counter);
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }
        }));

        scheduler.start().await.unwrap();
        assert!(wait_for_firings(&count, 2).await);
        scheduler.shutdown().await.unwrap();
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_failing_task_does_not_stop_subsequent_firings() {
        let mut scheduler = MaintenanceScheduler::new().await.unwrap();
        let count = Arc::new(AtomicUsize::new(0));

        let counter = Arc::clone(&count);
        scheduler.register(JobSpec::new(
            "always_fails",
            "* * * * * *",
            chrono_tz::UTC,
            move || {
                let counter = Arc::clone(&counter);
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Err(AppError::internal("task blew up"))
                }
            },
        ));

        scheduler.start().await.unwrap();
        assert!(wait_for_firings(&count, 2).await);
        scheduler.shutdown().await.unwrap();
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_disabled_job_does_not_fire() {
        let mut scheduler = MaintenanceScheduler::new().await.unwrap();
        let count = Arc::new(AtomicUsize::new(0));

        let counter = Arc::clone(&count);
        scheduler.register(
            JobSpec::new("dormant", "* * * * * *", chrono_tz::UTC, move || {
                let counter = Arc::clone(&counter);
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Ok(())
                }
            })
            .disabled(),
        );

        scheduler.start().await.unwrap();
        tokio::time::sleep(Duration::from_millis(2500)).await;
        assert_eq!(count.load(Ordering::SeqCst), 0);
        scheduler.shutdown().await.unwrap();
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_invalid_cron_expression_is_rejected() {
        let mut scheduler = MaintenanceScheduler::new().await.unwrap();
        scheduler.register(JobSpec::new(
            "broken",
            "not a cron expression",
            chrono_tz::UTC,
            || async { Ok(()) },
        ));

        let err = scheduler.start().await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::Configuration);
    }
}
