//! Store id → name mapping and the derived default store set.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use dealproxy_core::{normalize_store_name, Store, StorePriority};
use dealproxy_upstream::DealsClient;
use tokio::sync::RwLock;

use crate::error::PipelineError;

/// Immutable view of one successful store-list load.
#[derive(Debug, Default)]
pub struct StoreSnapshot {
    stores: HashMap<String, Store>,
    default_ids: BTreeSet<String>,
}

impl StoreSnapshot {
    /// Builds the mapping; the default set holds active stores whose
    /// normalized name is in `priority`.
    #[must_use]
    pub fn build(stores: Vec<Store>, priority: &StorePriority) -> Self {
        let default_ids = stores
            .iter()
            .filter(|s| s.is_active && priority.accepts(&s.name))
            .map(|s| s.id.clone())
            .collect();
        let stores = stores.into_iter().map(|s| (s.id.clone(), s)).collect();
        Self {
            stores,
            default_ids,
        }
    }

    #[must_use]
    pub fn name_of(&self, store_id: &str) -> Option<&str> {
        self.stores.get(store_id).map(|s| s.name.as_str())
    }

    #[must_use]
    pub fn default_ids(&self) -> &BTreeSet<String> {
        &self.default_ids
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.stores.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.stores.is_empty()
    }
}

/// Holds the latest store list. Reloads swap the whole snapshot; a failed
/// reload leaves the previous one in place.
pub struct StoreDirectory {
    client: Arc<DealsClient>,
    priority: StorePriority,
    snapshot: RwLock<Arc<StoreSnapshot>>,
}

impl StoreDirectory {
    #[must_use]
    pub fn new(client: Arc<DealsClient>, priority: StorePriority) -> Self {
        Self {
            client,
            priority,
            snapshot: RwLock::new(Arc::new(StoreSnapshot::default())),
        }
    }

    /// Fetches the store list and replaces the mapping. Returns the number
    /// of stores loaded.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Upstream`] if the fetch fails; the previous
    /// mapping is kept.
    pub async fn load(&self) -> Result<usize, PipelineError> {
        let raw = self.client.fetch_stores().await?;
        let stores: Vec<Store> = raw
            .into_iter()
            .map(|s| Store {
                id: s.store_id.trim().to_owned(),
                name: normalize_store_name(&s.store_name),
                is_active: s.is_active != 0,
            })
            .collect();

        let next = Arc::new(StoreSnapshot::build(stores, &self.priority));
        let count = next.len();
        let accepted = next.default_ids().len();
        *self.snapshot.write().await = next;

        tracing::info!(stores = count, accepted, "store directory loaded");
        Ok(count)
    }

    pub async fn snapshot(&self) -> Arc<StoreSnapshot> {
        Arc::clone(&*self.snapshot.read().await)
    }

    pub async fn store_name(&self, store_id: &str) -> Option<String> {
        self.snapshot().await.name_of(store_id).map(str::to_owned)
    }

    pub async fn default_store_ids(&self) -> BTreeSet<String> {
        self.snapshot().await.default_ids().clone()
    }

    pub async fn is_loaded(&self) -> bool {
        !self.snapshot().await.is_empty()
    }

    pub async fn len(&self) -> usize {
        self.snapshot().await.len()
    }

    #[must_use]
    pub fn priority(&self) -> &StorePriority {
        &self.priority
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store(id: &str, name: &str, is_active: bool) -> Store {
        Store {
            id: id.to_owned(),
            name: name.to_owned(),
            is_active,
        }
    }

    #[test]
    fn default_set_is_active_accepted_stores() {
        let snapshot = StoreSnapshot::build(
            vec![
                store("1", "steam", true),
                store("11", "humble store", true),
                store("15", "fanatical", false),
                store("30", "some other shop", true),
            ],
            &StorePriority::default(),
        );
        let ids: Vec<&str> = snapshot.default_ids().iter().map(String::as_str).collect();
        assert_eq!(ids, vec!["1", "11"]);
        assert_eq!(snapshot.name_of("15"), Some("fanatical"));
        assert_eq!(snapshot.name_of("30"), Some("some other shop"));
        assert_eq!(snapshot.len(), 4);
    }

    #[test]
    fn unknown_id_has_no_name() {
        let snapshot = StoreSnapshot::default();
        assert!(snapshot.name_of("1").is_none());
        assert!(snapshot.is_empty());
    }
}
