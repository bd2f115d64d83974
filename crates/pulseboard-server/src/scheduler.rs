//! Background job scheduler.
//!
//! Initialises a [`JobScheduler`] at server startup and registers the
//! recurring sync and retention-sweep jobs.

use std::sync::Arc;

use chrono::Utc;
use sqlx::PgPool;
use tokio_cron_scheduler::{Job, JobScheduler, JobSchedulerError};

use pulseboard_engine::{SyncOrchestrator, SyncScope};

/// Builds and starts the background job scheduler.
///
/// Registers the daily sync run and the cache retention sweep. Returns
/// the running [`JobScheduler`] handle, which must be kept alive for the
/// lifetime of the process — dropping it shuts down all jobs.
///
/// # Errors
///
/// Returns [`JobSchedulerError`] if the scheduler cannot be initialised,
/// a job cannot be registered, or the scheduler fails to start.
pub async fn build_scheduler(
    pool: PgPool,
    orchestrator: Arc<SyncOrchestrator>,
    config: Arc<pulseboard_core::AppConfig>,
) -> Result<JobScheduler, JobSchedulerError> {
    let scheduler = JobScheduler::new().await?;

    register_sync_job(&scheduler, Arc::clone(&orchestrator), &config.sync_cron).await?;
    register_sweep_job(&scheduler, pool, Arc::clone(&config)).await?;

    scheduler.start().await?;
    Ok(scheduler)
}

/// Register the daily full-sync job.
///
/// Runs at 04:00 UTC by default (`0 0 4 * * *`), configurable with
/// `PULSE_SYNC_CRON`. Each firing refreshes every active company's
/// default window through the orchestrator.
async fn register_sync_job(
    scheduler: &JobScheduler,
    orchestrator: Arc<SyncOrchestrator>,
    cron: &str,
) -> Result<(), JobSchedulerError> {
    let job = Job::new_async(cron, move |_uuid, _lock| {
        let orchestrator = Arc::clone(&orchestrator);

        Box::pin(async move {
            tracing::info!("scheduler: starting daily sync run");
            match orchestrator.run(SyncScope::All, "scheduler").await {
                Ok(report) => {
                    tracing::info!(
                        succeeded = report.succeeded,
                        failed = report.failed,
                        skipped = report.skipped,
                        duration_ms = report.duration_ms,
                        "scheduler: daily sync run complete"
                    );
                }
                Err(e) => {
                    tracing::error!(error = %e, "scheduler: daily sync run failed");
                }
            }
        })
    })?;

    scheduler.add(job).await?;
    tracing::info!(cron, "scheduler: registered sync job");
    Ok(())
}

/// Register the retention sweep job.
///
/// Runs at 05:30 UTC by default (`0 30 5 * * *`), configurable with
/// `PULSE_SWEEP_CRON`. Deletes point-cache entries and portfolio caches
/// older than the configured retention window.
async fn register_sweep_job(
    scheduler: &JobScheduler,
    pool: PgPool,
    config: Arc<pulseboard_core::AppConfig>,
) -> Result<(), JobSchedulerError> {
    let cron = config.sweep_cron.clone();
    let job = Job::new_async(cron.as_str(), move |_uuid, _lock| {
        let pool = pool.clone();
        let retention = config.cache_policy().retention;

        Box::pin(async move {
            let cache_cutoff = Utc::now() - retention;
            match pulseboard_db::cache::sweep_entries(&pool, cache_cutoff).await {
                Ok(removed) => {
                    tracing::info!(removed, "scheduler: swept expired cache entries");
                }
                Err(e) => {
                    tracing::error!(error = %e, "scheduler: cache sweep failed");
                }
            }

            let portfolio_cutoff = (Utc::now() - retention).date_naive();
            match pulseboard_db::portfolio::prune_portfolios(&pool, portfolio_cutoff).await {
                Ok(removed) => {
                    tracing::info!(removed, "scheduler: pruned old portfolio caches");
                }
                Err(e) => {
                    tracing::error!(error = %e, "scheduler: portfolio prune failed");
                }
            }
        })
    })?;

    scheduler.add(job).await?;
    tracing::info!(cron = %cron, "scheduler: registered sweep job");
    Ok(())
}
