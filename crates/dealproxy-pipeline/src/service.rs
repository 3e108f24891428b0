//! The deal service: read path, refresh path and enrichment submission.
//!
//! One `DealService` is built at startup and shared as an `Arc` between the
//! HTTP handlers and the scheduler.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use chrono::{DateTime, Utc};
use dealproxy_core::{Deal, MetadataState};
use dealproxy_upstream::{AppDetailsClient, DealsClient};
use futures::future::join_all;
use serde::ser::SerializeStruct;
use serde::{Serialize, Serializer};

use crate::aggregator::Aggregator;
use crate::cache::{is_expired, CacheEntry, CurrencyCache};
use crate::config::PipelineConfig;
use crate::directory::StoreDirectory;
use crate::enricher::{EnrichMode, Enricher};
use crate::error::PipelineError;
use crate::metadata_store::{MetadataCounts, MetadataStore};
use crate::queue::{EnrichQueue, EnrichWorker};

/// Answer to a deals read. `cached` is true only for a fresh entry.
#[derive(Debug)]
pub struct DealsResponse {
    pub cached: bool,
    pub currency: String,
    entry: Option<Arc<CacheEntry>>,
}

impl DealsResponse {
    #[must_use]
    pub fn deals(&self) -> &[Deal] {
        self.entry
            .as_deref()
            .map(|e| e.deals.as_slice())
            .unwrap_or_default()
    }

    #[must_use]
    pub fn count(&self) -> usize {
        self.deals().len()
    }

    #[must_use]
    pub fn timestamp(&self) -> Option<DateTime<Utc>> {
        self.entry.as_ref().map(|e| e.timestamp)
    }
}

impl Serialize for DealsResponse {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut s = serializer.serialize_struct("DealsResponse", 5)?;
        s.serialize_field("cached", &self.cached)?;
        s.serialize_field("currency", &self.currency)?;
        s.serialize_field("count", &self.count())?;
        s.serialize_field("timestamp", &self.timestamp())?;
        s.serialize_field("deals", self.deals())?;
        s.end()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CurrencyStatus {
    pub currency: String,
    pub count: usize,
    /// Seconds since the entry was stored; `None` before the first success.
    pub age_secs: Option<u64>,
    pub expired: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceStatus {
    pub ready: bool,
    pub stores: usize,
    pub currencies: Vec<CurrencyStatus>,
    pub metadata: MetadataCounts,
}

type InFlight = Arc<Mutex<HashSet<String>>>;

/// Marks one currency as refreshing until dropped.
struct RefreshGuard {
    in_flight: InFlight,
    currency: String,
}

impl Drop for RefreshGuard {
    fn drop(&mut self) {
        self.in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.currency);
    }
}

fn currency_key(currency: &str) -> String {
    currency.trim().to_lowercase()
}

/// Copies states resolved in `metadata` into `entry` where its slots lag
/// behind. Returns how many deals were updated.
async fn apply_known_metadata(entry: &CacheEntry, metadata: &MetadataStore) -> usize {
    let states = metadata
        .get_many(entry.deals.iter().map(|d| d.external_app_id.as_deref()))
        .await;
    let mut updated = 0;
    for (deal, state) in entry.deals.iter().zip(states) {
        if state != MetadataState::Unknown && *deal.metadata.load() != state {
            deal.metadata.store(state);
            updated += 1;
        }
    }
    updated
}

pub struct DealService {
    directory: Arc<StoreDirectory>,
    aggregator: Aggregator,
    cache: Arc<CurrencyCache>,
    metadata: Arc<MetadataStore>,
    queue: EnrichQueue,
    currencies: Vec<String>,
    cache_ttl: Duration,
    in_flight: InFlight,
    refresh_attempts: AtomicU64,
    ready: AtomicBool,
}

impl DealService {
    /// Builds the clients and components and spawns the enrichment worker.
    /// Must be called from within a Tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Upstream`] if either upstream base URL is
    /// invalid or an HTTP client cannot be built.
    pub fn from_config(config: PipelineConfig) -> Result<(Arc<Self>, EnrichWorker), PipelineError> {
        let deals_client = Arc::new(DealsClient::new(
            &config.deals_api_url,
            config.request_timeout_secs,
            &config.user_agent,
        )?);
        let details_client = Arc::new(AppDetailsClient::new(
            &config.metadata_api_url,
            config.metadata_timeout_ms,
            &config.user_agent,
            &config.metadata_locale,
            &config.metadata_region,
        )?);

        let directory = Arc::new(StoreDirectory::new(
            Arc::clone(&deals_client),
            config.priority,
        ));
        let cache = Arc::new(CurrencyCache::new());
        let metadata = Arc::new(MetadataStore::new());
        let aggregator = Aggregator::new(
            deals_client,
            Arc::clone(&directory),
            Arc::clone(&metadata),
            config.aggregate,
        );
        let enricher = Arc::new(Enricher::new(
            details_client,
            Arc::clone(&metadata),
            Arc::clone(&cache),
            config.enrich,
        ));
        let (queue, worker) = EnrichQueue::spawn(enricher, config.queue_capacity);

        let service = Self {
            directory,
            aggregator,
            cache,
            metadata,
            queue,
            currencies: config.currencies.iter().map(|c| currency_key(c)).collect(),
            cache_ttl: config.cache_ttl,
            in_flight: Arc::default(),
            refresh_attempts: AtomicU64::new(0),
            ready: AtomicBool::new(false),
        };
        Ok((Arc::new(service), worker))
    }

    /// Current deals for `currency`. A missing or expired entry starts a
    /// background refresh (unless one is already running) and whatever is
    /// cached, possibly stale or empty, is returned right away.
    pub async fn get_deals(self: &Arc<Self>, currency: &str) -> DealsResponse {
        let key = currency_key(currency);
        let entry = self.cache.get(&key).await;
        let fresh = entry
            .as_deref()
            .is_some_and(|e| !is_expired(e, Utc::now(), self.cache_ttl));
        if !fresh && self.trigger_refresh(&key) {
            tracing::debug!(currency = %key, "stale read; refresh started");
        }
        DealsResponse {
            cached: fresh,
            currency: key,
            entry,
        }
    }

    /// Aggregates `currency`, swaps the result into the cache and queues a
    /// metadata pass for it. Returns the number of deals cached.
    ///
    /// # Errors
    ///
    /// - [`PipelineError::RefreshInProgress`] if this currency is already refreshing.
    /// - [`PipelineError::EmptyStoreSet`] if no accepted store is known.
    /// - [`PipelineError::Upstream`] if the store list or a deal page fails;
    ///   the previous entry stays cached.
    pub async fn refresh(&self, currency: &str) -> Result<usize, PipelineError> {
        let key = currency_key(currency);
        let _guard = self
            .try_begin(&key)
            .ok_or_else(|| PipelineError::RefreshInProgress {
                currency: key.clone(),
            })?;
        self.run_refresh(&key).await
    }

    /// Spawns a refresh of `currency` unless one is already in flight.
    /// Returns whether a refresh was started.
    pub fn trigger_refresh(self: &Arc<Self>, currency: &str) -> bool {
        let key = currency_key(currency);
        let Some(guard) = self.try_begin(&key) else {
            return false;
        };
        let service = Arc::clone(self);
        tokio::spawn(async move {
            if let Err(e) = service.run_refresh(&key).await {
                tracing::error!(currency = %key, error = %e, "background refresh failed");
            }
            drop(guard);
        });
        true
    }

    /// Refreshes every tracked currency concurrently. Failures are logged
    /// and reported per currency; they never affect the others.
    pub async fn refresh_all(&self) -> Vec<(String, Result<usize, PipelineError>)> {
        let results = join_all(self.currencies.iter().map(|c| self.refresh(c))).await;
        let results: Vec<_> = self.currencies.iter().cloned().zip(results).collect();
        for (currency, result) in &results {
            match result {
                Ok(count) => tracing::info!(currency = %currency, deals = count, "currency refreshed"),
                Err(PipelineError::RefreshInProgress { .. }) => {
                    tracing::debug!(currency = %currency, "refresh already running; tick skipped");
                }
                Err(e) => tracing::error!(currency = %currency, error = %e, "currency refresh failed"),
            }
        }
        results
    }

    /// Loads the store list, retrying up to `attempts` times `delay` apart,
    /// then refreshes every tracked currency and marks the service ready.
    ///
    /// Readiness is set even when the store list or some currencies failed:
    /// the next scheduled tick retries them.
    pub async fn prewarm(&self, attempts: u32, delay: Duration) {
        let attempts = attempts.max(1);
        for attempt in 1..=attempts {
            match self.directory.load().await {
                Ok(_) => break,
                Err(e) if attempt < attempts => {
                    tracing::warn!(attempt, error = %e, "store list load failed; retrying");
                    tokio::time::sleep(delay).await;
                }
                Err(e) => {
                    tracing::error!(attempt, error = %e, "store list unavailable; starting without it");
                }
            }
        }

        let results = self.refresh_all().await;
        let warmed = results.iter().filter(|(_, r)| r.is_ok()).count();
        self.ready.store(true, Ordering::SeqCst);
        tracing::info!(warmed, tracked = results.len(), "pre-warm complete");
    }

    /// Reloads the store directory.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Upstream`] if the store list fetch fails.
    pub async fn reload_stores(&self) -> Result<usize, PipelineError> {
        self.directory.load().await
    }

    /// Queues an enrichment pass over every cached app id.
    pub async fn submit_enrichment(&self, mode: EnrichMode) -> bool {
        let ids = self.cache.app_ids().await;
        if ids.is_empty() {
            tracing::debug!(?mode, "no cached app ids to enrich");
            return false;
        }
        self.queue.submit_ids(ids, mode)
    }

    pub async fn status(&self) -> ServiceStatus {
        let now = Utc::now();
        let mut currencies = Vec::with_capacity(self.currencies.len());
        for currency in &self.currencies {
            let entry = self.cache.get(currency).await;
            currencies.push(CurrencyStatus {
                currency: currency.clone(),
                count: entry.as_ref().map_or(0, |e| e.deals.len()),
                age_secs: entry.as_ref().map(|e| e.age(now).as_secs()),
                expired: entry
                    .as_deref()
                    .is_none_or(|e| is_expired(e, now, self.cache_ttl)),
            });
        }
        ServiceStatus {
            ready: self.is_ready(),
            stores: self.directory.len().await,
            currencies,
            metadata: self.metadata.counts().await,
        }
    }

    /// Logs one line per tracked currency plus metadata counts.
    pub async fn log_status(&self) {
        let status = self.status().await;
        for c in &status.currencies {
            tracing::info!(
                currency = %c.currency,
                count = c.count,
                age_secs = ?c.age_secs,
                expired = c.expired,
                "cache status"
            );
        }
        tracing::info!(
            present = status.metadata.present,
            absent = status.metadata.absent,
            stores = status.stores,
            "metadata status"
        );
    }

    #[must_use]
    pub fn is_tracked(&self, currency: &str) -> bool {
        let key = currency_key(currency);
        self.currencies.iter().any(|c| *c == key)
    }

    #[must_use]
    pub fn currencies(&self) -> &[String] {
        &self.currencies
    }

    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::SeqCst)
    }

    /// Refreshes started since construction. Calls rejected because the
    /// currency was already refreshing are not counted.
    #[must_use]
    pub fn refresh_attempts(&self) -> u64 {
        self.refresh_attempts.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn cache(&self) -> &CurrencyCache {
        &self.cache
    }

    #[must_use]
    pub fn metadata(&self) -> &MetadataStore {
        &self.metadata
    }

    fn try_begin(&self, currency: &str) -> Option<RefreshGuard> {
        let mut in_flight = self
            .in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if !in_flight.insert(currency.to_owned()) {
            return None;
        }
        self.refresh_attempts.fetch_add(1, Ordering::SeqCst);
        Some(RefreshGuard {
            in_flight: Arc::clone(&self.in_flight),
            currency: currency.to_owned(),
        })
    }

    async fn run_refresh(&self, currency: &str) -> Result<usize, PipelineError> {
        if !self.directory.is_loaded().await {
            tracing::info!(currency, "store directory empty; loading before refresh");
            self.directory.load().await?;
        }
        let store_ids = self.directory.default_store_ids().await;
        let deals = self.aggregator.aggregate(currency, &store_ids).await?;
        let entry = self.cache.put(currency, deals).await;
        // Resolutions that landed between aggregation and the put patched
        // the previous entry only.
        let caught_up = apply_known_metadata(&entry, &self.metadata).await;
        if caught_up > 0 {
            tracing::debug!(currency, caught_up, "metadata applied to new entry");
        }
        self.queue.submit(&entry.deals, EnrichMode::Missing);
        Ok(entry.deals.len())
    }
}
