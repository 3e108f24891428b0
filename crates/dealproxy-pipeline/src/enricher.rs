//! Sequential, throttling-aware metadata enrichment.
//!
//! Each app id is resolved on its own: a failure for one id never stops the
//! pass. Resolutions are written to the [`MetadataStore`] and patched into
//! every cached deal with that id as soon as they are known.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use dealproxy_core::{Deal, MetadataState};
use dealproxy_upstream::{parse_metadata, retry_throttled, AppDetailsClient, BackoffPolicy};
use tokio::sync::watch;

use crate::cache::CurrencyCache;
use crate::metadata_store::MetadataStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EnrichConfig {
    pub policy: BackoffPolicy,
    /// Pause between consecutive app ids, independent of backoff.
    pub item_delay: Duration,
}

impl Default for EnrichConfig {
    fn default() -> Self {
        Self {
            policy: BackoffPolicy::default(),
            item_delay: Duration::from_secs(1),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnrichMode {
    /// Skip ids whose metadata is already present.
    Missing,
    /// Re-fetch everything, present ids included.
    Full,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnrichReport {
    /// Ids that went through a fetch.
    pub attempted: usize,
    pub present: usize,
    pub absent: usize,
    /// Still throttled after the last attempt; left as they were.
    pub exhausted: usize,
    /// Full-mode refreshes that failed and kept the earlier metadata.
    pub kept: usize,
    /// Ids not reached because a stop was requested.
    pub skipped: usize,
}

enum Outcome {
    Resolved(MetadataState),
    Exhausted,
}

/// App ids of `deals` in input order, without repeats.
#[must_use]
pub fn app_ids_of(deals: &[Deal]) -> Vec<String> {
    dedup_ids(deals.iter().filter_map(|d| d.external_app_id.as_deref()))
}

fn dedup_ids<'a, I: IntoIterator<Item = &'a str>>(ids: I) -> Vec<String> {
    let mut seen = HashSet::new();
    ids.into_iter()
        .filter(|id| seen.insert(*id))
        .map(str::to_owned)
        .collect()
}

pub struct Enricher {
    client: Arc<AppDetailsClient>,
    metadata: Arc<MetadataStore>,
    cache: Arc<CurrencyCache>,
    config: EnrichConfig,
}

impl Enricher {
    #[must_use]
    pub fn new(
        client: Arc<AppDetailsClient>,
        metadata: Arc<MetadataStore>,
        cache: Arc<CurrencyCache>,
        config: EnrichConfig,
    ) -> Self {
        Self {
            client,
            metadata,
            cache,
            config,
        }
    }

    /// Enriches the app ids carried by `deals`.
    pub async fn enrich(&self, deals: &[Deal], mode: EnrichMode) -> EnrichReport {
        self.enrich_ids(app_ids_of(deals), mode).await
    }

    /// Enriches `app_ids` (order kept, repeats dropped) to completion.
    pub async fn enrich_ids(&self, app_ids: Vec<String>, mode: EnrichMode) -> EnrichReport {
        // Nothing ever sends on this channel, so the pass always completes.
        let (_stop_tx, stop) = watch::channel(false);
        self.run_pass(app_ids, mode, &stop).await
    }

    /// Runs one pass, checking `stop` between ids. The id in progress
    /// (including its backoff sleeps) always finishes and is recorded.
    pub(crate) async fn run_pass(
        &self,
        app_ids: Vec<String>,
        mode: EnrichMode,
        stop: &watch::Receiver<bool>,
    ) -> EnrichReport {
        let mut report = EnrichReport::default();
        let mut candidates = Vec::new();
        for id in dedup_ids(app_ids.iter().map(String::as_str)) {
            if mode == EnrichMode::Missing && self.metadata.is_present(&id).await {
                continue;
            }
            candidates.push(id);
        }

        let total = candidates.len();
        for (idx, app_id) in candidates.iter().enumerate() {
            if *stop.borrow() {
                report.skipped = total - idx;
                tracing::info!(skipped = report.skipped, "enrichment stopped early");
                break;
            }
            if idx > 0 && !self.config.item_delay.is_zero() {
                tokio::time::sleep(self.config.item_delay).await;
            }

            report.attempted += 1;
            match self.resolve(app_id).await {
                Outcome::Exhausted => report.exhausted += 1,
                Outcome::Resolved(state) => {
                    if mode == EnrichMode::Full
                        && !state.is_present()
                        && self.metadata.is_present(app_id).await
                    {
                        report.kept += 1;
                        continue;
                    }
                    if state.is_present() {
                        report.present += 1;
                    } else {
                        report.absent += 1;
                    }
                    self.metadata.set(app_id, state.clone()).await;
                    let patched = self.cache.patch_metadata(app_id, &state).await;
                    tracing::debug!(app_id = %app_id, status = state.label(), patched, "metadata resolved");
                }
            }
        }
        report
    }

    async fn resolve(&self, app_id: &str) -> Outcome {
        let result = retry_throttled(&self.config.policy, || self.client.fetch(app_id)).await;
        match result {
            Ok(Some(data)) => Outcome::Resolved(MetadataState::Present(parse_metadata(data))),
            Ok(None) => Outcome::Resolved(MetadataState::Absent),
            Err(e) if e.is_throttled() => {
                tracing::warn!(app_id, error = %e, "metadata retries exhausted; leaving for a later pass");
                Outcome::Exhausted
            }
            Err(e) => {
                tracing::warn!(app_id, error = %e, "metadata fetch failed; marking absent");
                Outcome::Resolved(MetadataState::Absent)
            }
        }
    }
}
