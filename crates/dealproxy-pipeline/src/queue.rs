//! Background enrichment queue.
//!
//! Passes are submitted without waiting and drained one at a time by a
//! single worker task, so metadata requests stay sequential process-wide.
//! The channel is bounded: when it is full a submission is dropped and the
//! next scheduled pass picks the ids up again.

use std::sync::Arc;
use std::time::Duration;

use dealproxy_core::Deal;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

use crate::enricher::{app_ids_of, EnrichMode, Enricher};

#[derive(Debug)]
struct EnrichJob {
    app_ids: Vec<String>,
    mode: EnrichMode,
}

/// Cheap, cloneable submission handle.
#[derive(Debug, Clone)]
pub struct EnrichQueue {
    tx: mpsc::Sender<EnrichJob>,
}

/// Owns the worker task. Call [`EnrichWorker::shutdown`] to stop it after
/// the id in progress. Dropping the handle detaches the worker, which then
/// runs until every [`EnrichQueue`] is gone.
#[must_use = "dropping the worker handle gives up the ability to stop it cleanly"]
pub struct EnrichWorker {
    stop: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

impl EnrichQueue {
    /// Spawns the worker on the current runtime.
    #[must_use]
    pub fn spawn(enricher: Arc<Enricher>, capacity: usize) -> (Self, EnrichWorker) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let (stop_tx, stop_rx) = watch::channel(false);
        let handle = tokio::spawn(run_worker(enricher, rx, stop_rx));
        (
            Self { tx },
            EnrichWorker {
                stop: stop_tx,
                handle,
            },
        )
    }

    /// Queues a pass over the app ids of `deals`. Returns `false` if the pass
    /// was dropped (queue full or worker gone) or there was nothing to do.
    pub fn submit(&self, deals: &[Deal], mode: EnrichMode) -> bool {
        self.submit_ids(app_ids_of(deals), mode)
    }

    pub fn submit_ids(&self, app_ids: Vec<String>, mode: EnrichMode) -> bool {
        if app_ids.is_empty() {
            return false;
        }
        let count = app_ids.len();
        match self.tx.try_send(EnrichJob { app_ids, mode }) {
            Ok(()) => {
                tracing::debug!(ids = count, ?mode, "enrichment pass queued");
                true
            }
            Err(mpsc::error::TrySendError::Full(_)) => {
                tracing::warn!(ids = count, ?mode, "enrichment queue full; pass dropped");
                false
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                tracing::warn!(ids = count, ?mode, "enrichment worker stopped; pass dropped");
                false
            }
        }
    }
}

impl EnrichWorker {
    /// Signals the worker to stop and waits up to `grace` for the id in
    /// progress to be recorded.
    pub async fn shutdown(self, grace: Duration) {
        let _ = self.stop.send(true);
        match tokio::time::timeout(grace, self.handle).await {
            Ok(Ok(())) => tracing::info!("enrichment worker stopped"),
            Ok(Err(e)) => tracing::error!(error = %e, "enrichment worker panicked"),
            Err(_) => tracing::warn!("enrichment worker did not stop within grace period"),
        }
    }
}

async fn run_worker(
    enricher: Arc<Enricher>,
    mut rx: mpsc::Receiver<EnrichJob>,
    mut stop: watch::Receiver<bool>,
) {
    let mut stop_open = true;
    loop {
        let job = tokio::select! {
            job = rx.recv() => job,
            changed = stop.changed(), if stop_open => {
                // A dropped handle is not a stop request.
                if changed.is_err() {
                    stop_open = false;
                }
                if *stop.borrow_and_update() {
                    None
                } else {
                    continue;
                }
            }
        };
        let Some(job) = job else { break };

        let ids = job.app_ids.len();
        tracing::info!(ids, mode = ?job.mode, "enrichment pass started");
        let report = enricher.run_pass(job.app_ids, job.mode, &stop).await;
        tracing::info!(
            attempted = report.attempted,
            present = report.present,
            absent = report.absent,
            exhausted = report.exhausted,
            kept = report.kept,
            skipped = report.skipped,
            "enrichment pass finished"
        );

        if *stop.borrow() {
            break;
        }
    }
}
