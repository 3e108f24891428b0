mod api;
mod middleware;
mod scheduler;

use std::sync::Arc;
use std::time::Duration;

use dealproxy_pipeline::{DealService, PipelineConfig};
use tracing_subscriber::EnvFilter;

use crate::api::{build_app, AppState};

/// Store-list load attempts before the first aggregation.
const STORE_LOAD_ATTEMPTS: u32 = 3;
const STORE_LOAD_RETRY_DELAY: Duration = Duration::from_secs(5);
/// How long shutdown waits for the enrichment worker to record its current id.
const WORKER_SHUTDOWN_GRACE: Duration = Duration::from_secs(10);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = dealproxy_core::load_app_config()?;
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    tracing::info!(
        env = %config.env,
        currencies = ?config.currencies,
        default_currency = %config.default_currency,
        ttl_secs = config.cache_ttl_secs,
        "starting dealproxy"
    );

    let (service, worker) = DealService::from_config(PipelineConfig::from_app_config(&config))?;
    service
        .prewarm(STORE_LOAD_ATTEMPTS, STORE_LOAD_RETRY_DELAY)
        .await;

    let mut scheduler = scheduler::build_scheduler(Arc::clone(&service), &config).await?;

    let app = build_app(AppState {
        service,
        default_currency: config.default_currency.clone(),
    });
    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    tracing::info!(addr = %config.bind_addr, "listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    if let Err(e) = scheduler.shutdown().await {
        tracing::warn!(error = %e, "scheduler did not shut down cleanly");
    }
    worker.shutdown(WORKER_SHUTDOWN_GRACE).await;
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("received shutdown signal, starting graceful shutdown");
}
