use std::sync::{Arc, PoisonError, RwLock};

use rust_decimal::Decimal;
use serde::{Serialize, Serializer};

/// Per-title metadata fetched from the app-details API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Metadata {
    pub title: String,
    /// Free-text release date exactly as the upstream renders it, e.g. `"18 Apr, 2011"`.
    pub release_date: Option<String>,
    /// First four-digit group found in `release_date`, e.g. `"2011"`.
    pub release_year: Option<String>,
    pub genres: Vec<String>,
    pub publishers: Vec<String>,
    /// Critic score (0 to 100) when the upstream has one.
    pub rating_score: Option<u32>,
}

/// What is known about an app's metadata.
///
/// `Unknown` means no fetch has resolved yet (or the last one ran out of
/// throttling retries); `Absent` means the upstream answered and there is
/// nothing to show.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "data", rename_all = "lowercase")]
pub enum MetadataState {
    #[default]
    Unknown,
    Absent,
    Present(Metadata),
}

impl MetadataState {
    #[must_use]
    pub fn is_present(&self) -> bool {
        matches!(self, MetadataState::Present(_))
    }

    #[must_use]
    pub fn metadata(&self) -> Option<&Metadata> {
        match self {
            MetadataState::Present(m) => Some(m),
            MetadataState::Unknown | MetadataState::Absent => None,
        }
    }

    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            MetadataState::Unknown => "unknown",
            MetadataState::Absent => "absent",
            MetadataState::Present(_) => "present",
        }
    }
}

/// Independently swappable metadata field of a [`Deal`].
///
/// Readers always get a whole state (`Arc` snapshot); writers replace the
/// whole state. Nothing else about the owning deal changes.
#[derive(Debug, Default)]
pub struct MetadataSlot(RwLock<Arc<MetadataState>>);

impl MetadataSlot {
    #[must_use]
    pub fn new(state: MetadataState) -> Self {
        Self(RwLock::new(Arc::new(state)))
    }

    #[must_use]
    pub fn load(&self) -> Arc<MetadataState> {
        Arc::clone(&self.0.read().unwrap_or_else(PoisonError::into_inner))
    }

    pub fn store(&self, state: MetadataState) {
        let next = Arc::new(state);
        *self.0.write().unwrap_or_else(PoisonError::into_inner) = next;
    }
}

impl Serialize for MetadataSlot {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.load().as_ref().serialize(serializer)
    }
}

/// A priced offer for one game at one store, after deduplication.
#[derive(Debug, Serialize)]
pub struct Deal {
    pub game_id: String,
    /// Platform app id used to key metadata. Aggregated deals always carry one.
    pub external_app_id: Option<String>,
    pub store_id: String,
    /// Normalized (trimmed, lowercase) store name.
    pub store_name: String,
    pub sale_price: Decimal,
    pub normal_price: Option<Decimal>,
    /// Discount percentage as reported upstream.
    pub savings: Option<Decimal>,
    pub title: Option<String>,
    pub deal_id: Option<String>,
    pub thumb: Option<String>,
    pub metadata: MetadataSlot,
}

impl Deal {
    /// Returns `true` if this deal's app id equals `app_id`.
    #[must_use]
    pub fn has_app_id(&self, app_id: &str) -> bool {
        self.external_app_id.as_deref() == Some(app_id)
    }
}
