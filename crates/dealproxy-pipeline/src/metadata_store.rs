//! Process-wide app id → metadata state map. Grows monotonically.

use std::collections::HashMap;

use dealproxy_core::MetadataState;
use tokio::sync::RwLock;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetadataCounts {
    pub present: usize,
    pub absent: usize,
}

#[derive(Debug, Default)]
pub struct MetadataStore {
    states: RwLock<HashMap<String, MetadataState>>,
}

impl MetadataStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// State for `app_id`; ids never written are `Unknown`.
    pub async fn get(&self, app_id: &str) -> MetadataState {
        self.states
            .read()
            .await
            .get(app_id)
            .cloned()
            .unwrap_or_default()
    }

    /// Looks up several ids under one read lock, in input order.
    pub async fn get_many<'a, I>(&self, app_ids: I) -> Vec<MetadataState>
    where
        I: IntoIterator<Item = Option<&'a str>>,
    {
        let states = self.states.read().await;
        app_ids
            .into_iter()
            .map(|id| {
                id.and_then(|id| states.get(id).cloned())
                    .unwrap_or_default()
            })
            .collect()
    }

    /// Records a resolved state. Writing `Unknown` is a no-op so an entry
    /// never goes back to "not fetched".
    pub async fn set(&self, app_id: &str, state: MetadataState) {
        if state == MetadataState::Unknown {
            return;
        }
        self.states.write().await.insert(app_id.to_owned(), state);
    }

    pub async fn is_present(&self, app_id: &str) -> bool {
        self.states
            .read()
            .await
            .get(app_id)
            .is_some_and(MetadataState::is_present)
    }

    pub async fn counts(&self) -> MetadataCounts {
        let states = self.states.read().await;
        let present = states.values().filter(|s| s.is_present()).count();
        MetadataCounts {
            present,
            absent: states.len() - present,
        }
    }
}
