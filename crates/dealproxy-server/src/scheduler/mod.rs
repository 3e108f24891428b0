//! Background job scheduler.
//!
//! Registers the recurring jobs that keep the deal cache warm without
//! request traffic. Jobs only submit work: aggregation runs inline per tick,
//! enrichment is handed to the queue worker.

use std::sync::Arc;
use std::time::Duration;

use dealproxy_core::AppConfig;
use dealproxy_pipeline::{DealService, EnrichMode};
use tokio_cron_scheduler::{Job, JobScheduler, JobSchedulerError};

/// Builds and starts the scheduler. The returned handle must be kept alive
/// for the lifetime of the process.
///
/// # Errors
///
/// Returns [`JobSchedulerError`] if the scheduler cannot be initialised,
/// a job cannot be registered, or the scheduler fails to start.
pub async fn build_scheduler(
    service: Arc<DealService>,
    config: &AppConfig,
) -> Result<JobScheduler, JobSchedulerError> {
    let scheduler = JobScheduler::new().await?;

    register_refresh_job(&scheduler, Arc::clone(&service), config.cache_ttl()).await?;
    register_status_job(&scheduler, Arc::clone(&service), config.status_interval()).await?;
    register_full_enrich_job(&scheduler, service, config.full_enrich_interval()).await?;

    scheduler.start().await?;
    Ok(scheduler)
}

/// Re-aggregates every tracked currency once per TTL.
async fn register_refresh_job(
    scheduler: &JobScheduler,
    service: Arc<DealService>,
    every: Duration,
) -> Result<(), JobSchedulerError> {
    let job = Job::new_repeated_async(every, move |_uuid, _lock| {
        let service = Arc::clone(&service);
        Box::pin(async move {
            tracing::info!("scheduler: refreshing all currencies");
            let results = service.refresh_all().await;
            let failed = results.iter().filter(|(_, r)| r.is_err()).count();
            tracing::info!(
                currencies = results.len(),
                failed,
                "scheduler: refresh tick complete"
            );
        })
    })?;

    scheduler.add(job).await?;
    Ok(())
}

/// Logs cache status and queues a pass for ids still missing metadata.
async fn register_status_job(
    scheduler: &JobScheduler,
    service: Arc<DealService>,
    every: Duration,
) -> Result<(), JobSchedulerError> {
    let job = Job::new_repeated_async(every, move |_uuid, _lock| {
        let service = Arc::clone(&service);
        Box::pin(async move {
            service.log_status().await;
            if service.submit_enrichment(EnrichMode::Missing).await {
                tracing::info!("scheduler: missing-metadata pass queued");
            }
        })
    })?;

    scheduler.add(job).await?;
    Ok(())
}

/// Reloads the store list and queues a pass that re-fetches every id.
async fn register_full_enrich_job(
    scheduler: &JobScheduler,
    service: Arc<DealService>,
    every: Duration,
) -> Result<(), JobSchedulerError> {
    let job = Job::new_repeated_async(every, move |_uuid, _lock| {
        let service = Arc::clone(&service);
        Box::pin(async move {
            match service.reload_stores().await {
                Ok(stores) => tracing::info!(stores, "scheduler: store list reloaded"),
                Err(e) => {
                    // The previous store list stays in use.
                    tracing::error!(error = %e, "scheduler: store list reload failed");
                }
            }
            if service.submit_enrichment(EnrichMode::Full).await {
                tracing::info!("scheduler: full metadata pass queued");
            }
        })
    })?;

    scheduler.add(job).await?;
    Ok(())
}
