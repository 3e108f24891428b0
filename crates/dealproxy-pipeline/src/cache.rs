//! Latest aggregated deals per currency.
//!
//! `put` swaps a whole [`CacheEntry`]; readers holding an older `Arc` keep a
//! consistent view of that generation. The one in-place mutation is
//! [`CurrencyCache::patch_metadata`], which replaces individual deals'
//! metadata slots and leaves everything else (including the timestamp) alone.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use dealproxy_core::{Deal, MetadataState};
use tokio::sync::RwLock;

#[derive(Debug)]
pub struct CacheEntry {
    pub currency: String,
    pub timestamp: DateTime<Utc>,
    pub deals: Vec<Deal>,
}

impl CacheEntry {
    /// Age at `now`, clamped to zero for clock skew.
    #[must_use]
    pub fn age(&self, now: DateTime<Utc>) -> Duration {
        (now - self.timestamp).to_std().unwrap_or(Duration::ZERO)
    }
}

/// `now - entry.timestamp > ttl`.
#[must_use]
pub fn is_expired(entry: &CacheEntry, now: DateTime<Utc>, ttl: Duration) -> bool {
    match chrono::Duration::from_std(ttl) {
        Ok(ttl) => now - entry.timestamp > ttl,
        // A TTL too large for chrono never expires.
        Err(_) => false,
    }
}

fn currency_key(currency: &str) -> String {
    currency.trim().to_lowercase()
}

#[derive(Debug, Default)]
pub struct CurrencyCache {
    entries: RwLock<HashMap<String, Arc<CacheEntry>>>,
}

impl CurrencyCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get(&self, currency: &str) -> Option<Arc<CacheEntry>> {
        self.entries
            .read()
            .await
            .get(&currency_key(currency))
            .cloned()
    }

    /// Replaces the entry for `currency` with `deals`, stamped now.
    pub async fn put(&self, currency: &str, deals: Vec<Deal>) -> Arc<CacheEntry> {
        self.put_at(currency, deals, Utc::now()).await
    }

    /// [`Self::put`] with an explicit timestamp.
    pub async fn put_at(
        &self,
        currency: &str,
        deals: Vec<Deal>,
        timestamp: DateTime<Utc>,
    ) -> Arc<CacheEntry> {
        let key = currency_key(currency);
        let entry = Arc::new(CacheEntry {
            currency: key.clone(),
            timestamp,
            deals,
        });
        self.entries.write().await.insert(key, Arc::clone(&entry));
        entry
    }

    /// Sets the metadata of every cached deal (any currency) carrying
    /// `app_id`. Returns how many deals were patched.
    pub async fn patch_metadata(&self, app_id: &str, state: &MetadataState) -> usize {
        let entries = self.entries.read().await;
        let mut patched = 0;
        for entry in entries.values() {
            for deal in entry.deals.iter().filter(|d| d.has_app_id(app_id)) {
                deal.metadata.store(state.clone());
                patched += 1;
            }
        }
        patched
    }

    /// All entries, ordered by currency code.
    pub async fn entries(&self) -> Vec<Arc<CacheEntry>> {
        let mut out: Vec<Arc<CacheEntry>> = self.entries.read().await.values().cloned().collect();
        out.sort_by(|a, b| a.currency.cmp(&b.currency));
        out
    }

    /// Cached currency codes, sorted.
    pub async fn currencies(&self) -> Vec<String> {
        let mut out: Vec<String> = self.entries.read().await.keys().cloned().collect();
        out.sort();
        out
    }

    /// App ids across all cached deals, deduplicated, in currency-code then
    /// deal order.
    pub async fn app_ids(&self) -> Vec<String> {
        let mut seen = HashSet::new();
        let mut out = Vec::new();
        for entry in self.entries().await {
            for id in entry.deals.iter().filter_map(|d| d.external_app_id.as_deref()) {
                if seen.insert(id.to_owned()) {
                    out.push(id.to_owned());
                }
            }
        }
        out
    }
}
